//! Capabilities: named, schema-described operations the model may ask for.

pub mod create_image;
pub mod get_url;
pub mod registry;
pub mod save_file;
pub mod summarize_text;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::output::OutputError;
use crate::llm::error::LLMError;

pub use create_image::CreateImage;
pub use get_url::GetUrl;
pub use registry::CapabilityRegistry;
pub use save_file::SaveFile;
pub use summarize_text::SummarizeText;

/// The schema a capability advertises to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object.
    pub parameters: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Completion(#[from] LLMError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("{0}")]
    Failed(String),
}

/// A callable capability.
#[async_trait]
pub trait Capability: Send + Sync {
    fn definition(&self) -> CapabilityDefinition;

    /// Runs the capability with a JSON-encoded argument object.
    async fn execute(&self, arguments: &str) -> Result<String, CapabilityError>;
}

/// Shared handle to a resolved capability.
pub type CapabilityHandle = Arc<dyn Capability>;

/// Decodes a JSON argument string into the capability's typed input.
pub fn parse_arguments<T: DeserializeOwned>(arguments: &str) -> Result<T, CapabilityError> {
    serde_json::from_str(arguments).map_err(CapabilityError::InvalidArguments)
}
