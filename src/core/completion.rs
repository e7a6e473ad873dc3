use async_trait::async_trait;

use crate::capability::CapabilityDefinition;
use crate::core::message::{Message, Reply};
use crate::core::settings::CallSettings;
use crate::llm::error::LLMError;

/// The chat-completion boundary the conversation engine talks to.
///
/// Implementations own retry, timeouts and authentication; the engine treats
/// every call as either a valid reply or a fatal error.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn respond(
        &self,
        call: &CallSettings<'_>,
        messages: &[Message],
        capabilities: &[CapabilityDefinition],
    ) -> Result<Reply, LLMError>;
}
