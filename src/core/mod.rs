pub mod completion;
pub mod engine;
pub mod error;
pub mod flow;
pub mod message;
pub mod output;
pub mod settings;
pub mod variables;
