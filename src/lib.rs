//! # agentflow
//!
//! Run declarative, multi-step conversations against an LLM chat endpoint,
//! let the model call named capabilities along the way, and keep the
//! transcript.
//!
//! ## Features
//!
//! - **Checked Variables**: Every `{placeholder}` must be supplied, and nothing else may be
//! - **Forced Function Calls**: A task can require one capability call before the model answers
//! - **One Transcript**: All tasks of a flow share a single, append-only conversation
//! - **Built-in Capabilities**: `get_url`, `save_file`, `summarize_text` and `create_image`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agentflow::prelude::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let client = Client::new(config.openai());
//!
//! let mut variables = HashMap::new();
//! variables.insert("topic".to_string(), "otters".to_string());
//! let flow = FlowLoader::new(&config.flows_dir).load("write_poem", &variables)?;
//!
//! let output: Arc<dyn Output> = Arc::new(DirectoryOutput::create(&config.outputs_dir, flow.name())?);
//! let registry = CapabilityRegistry::builtin(client.clone(), output.clone());
//! let engine = Engine::new(Arc::new(client), registry, output);
//!
//! let path = engine.run(&flow).await?;
//! println!("Find outputs at {}", path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`core`](crate::core): Flows, variables, messages, settings and the conversation engine
//! - [`capability`]: The capability trait, the registry and the built-ins
//! - [`llm`]: The OpenAI-compatible client
//! - [`config`]: Environment configuration
//! - [`prelude`]: Commonly used types and traits (import with `use agentflow::prelude::*`)

// ============================================================================
// Modules
// ============================================================================

pub mod capability;
pub mod config;
pub mod core;
pub mod llm;

// ============================================================================
// Public Re-exports
// ============================================================================

// Core types
pub use crate::core::completion::Completion;
pub use crate::core::engine::{Engine, TRANSCRIPT_NAME, Transcript};
pub use crate::core::error::FlowError;
pub use crate::core::flow::{Flow, FlowLoader, FlowSource, Task, TaskSource};
pub use crate::core::message::{CapabilityCall, Message, Reply, Role};
pub use crate::core::output::{Contents, DirectoryOutput, Output, OutputError};
pub use crate::core::settings::{CallMode, CallSettings, PartialSettings, Settings};

// Capabilities
pub use crate::capability::{
    Capability, CapabilityDefinition, CapabilityError, CapabilityHandle, CapabilityRegistry,
};

// LLM client
pub use crate::llm::{Client, LLMError, OpenAiConfig, RetryPolicy};

pub use crate::config::{Config, ConfigError};

// ============================================================================
// Prelude
// ============================================================================

/// The main prelude: everything needed to load and run a flow.
///
/// # Example
/// ```rust
/// use agentflow::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        CallMode,
        CallSettings,
        // Capabilities
        Capability,
        CapabilityDefinition,
        CapabilityError,
        CapabilityRegistry,
        // LLM
        Client,
        Completion,
        Config,
        Contents,
        DirectoryOutput,
        // Core
        Engine,
        Flow,
        FlowError,
        FlowLoader,
        Message,
        OpenAiConfig,
        Output,
        Reply,
        Settings,
        Transcript,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
