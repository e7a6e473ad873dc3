use std::path::PathBuf;

use thiserror::Error;

use crate::capability::CapabilityError;
use crate::core::output::OutputError;
use crate::llm::error::LLMError;

/// Everything that can abort loading or running a flow.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow not found: {}", path.display())]
    FlowNotFound { path: PathBuf },

    #[error("Failed to read flow {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid flow document {name}: {source}")]
    FlowParse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed placeholder at byte {position}: {reason}")]
    MalformedTemplate { position: usize, reason: &'static str },

    #[error("Extra variables provided: {}", .0.join(", "))]
    ExtraVariables(Vec<String>),

    #[error("Missing variable values for: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("Capability {name} failed: {source}")]
    CapabilityExecution {
        name: String,
        #[source]
        source: CapabilityError,
    },

    #[error("Completion call failed: {0}")]
    Completion(#[from] LLMError),

    #[error("Model called capability {requested} but the task allows {}", .expected.as_deref().unwrap_or("none"))]
    UnexpectedCapabilityCall {
        expected: Option<String>,
        requested: String,
    },

    #[error("Model called capability {0} again after receiving its result")]
    RepeatedCapabilityCall(String),

    #[error("Model reply had neither content nor a capability call (task {task})")]
    EmptyReply { task: usize },

    #[error("Failed to save output: {0}")]
    Output(#[from] OutputError),
}
