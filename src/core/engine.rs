//! The conversation engine: drives a flow's tasks against the completion
//! collaborator and persists the resulting transcript.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::capability::{CapabilityDefinition, CapabilityHandle, CapabilityRegistry};
use crate::core::completion::Completion;
use crate::core::error::FlowError;
use crate::core::flow::{Flow, Task};
use crate::core::message::{Message, Reply};
use crate::core::output::{Contents, Output, OutputError};
use crate::core::settings::CallMode;

/// Name under which the transcript of a run is saved.
pub const TRANSCRIPT_NAME: &str = "messages.json";

/// The ordered, append-only message history of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Capabilities a flow may use, resolved once per run.
struct Resolved {
    handles: HashMap<String, CapabilityHandle>,
    definitions: Vec<CapabilityDefinition>,
}

/// Runs flows one task at a time on a single shared transcript.
pub struct Engine {
    completion: Arc<dyn Completion>,
    registry: CapabilityRegistry,
    output: Arc<dyn Output>,
}

impl Engine {
    pub fn new(
        completion: Arc<dyn Completion>,
        registry: CapabilityRegistry,
        output: Arc<dyn Output>,
    ) -> Self {
        Self {
            completion,
            registry,
            output,
        }
    }

    /// Runs every task of `flow` and saves the transcript as
    /// [`TRANSCRIPT_NAME`]. Nothing is saved unless every task succeeds.
    pub async fn run(&self, flow: &Flow) -> Result<PathBuf, FlowError> {
        let transcript = self.converse(flow).await?;
        let value = serde_json::to_value(&transcript).map_err(OutputError::from)?;
        let path = self.output.save(TRANSCRIPT_NAME, Contents::Json(&value))?;
        log::info!("Flow {} finished, transcript at {}", flow.name(), path.display());
        Ok(path)
    }

    /// Runs every task of `flow` and returns the transcript without saving it.
    pub async fn converse(&self, flow: &Flow) -> Result<Transcript, FlowError> {
        let resolved = self.resolve(flow)?;

        let mut transcript = Transcript::new();
        if let Some(system) = flow.system_message() {
            transcript.push(Message::system(system));
        }

        let total = flow.tasks().len();
        for (index, task) in flow.tasks().iter().enumerate() {
            log::info!("Task {}/{}: {}", index + 1, total, task.instruction());
            self.run_task(index + 1, task, &resolved, &mut transcript)
                .await?;
        }

        Ok(transcript)
    }

    /// Resolves each distinct capability the flow names, before any model call.
    fn resolve(&self, flow: &Flow) -> Result<Resolved, FlowError> {
        let mut handles = HashMap::new();
        let mut definitions = Vec::new();
        for name in flow.capabilities() {
            let handle = self.registry.resolve(name)?;
            definitions.push(handle.definition());
            handles.insert(name.to_string(), handle);
        }
        Ok(Resolved {
            handles,
            definitions,
        })
    }

    async fn run_task(
        &self,
        number: usize,
        task: &Task,
        resolved: &Resolved,
        transcript: &mut Transcript,
    ) -> Result<(), FlowError> {
        transcript.push(Message::user(task.instruction()));

        let first = match task.capability() {
            Some(name) => task.settings().call(CallMode::Force(name.to_string())),
            None => task.settings().call(CallMode::None),
        };
        let reply = self
            .completion
            .respond(&first, transcript.messages(), &resolved.definitions)
            .await?;

        let call = match reply {
            Reply::Content(content) => {
                log::info!("Assistant: {}", content);
                transcript.push(Message::assistant(content));
                return Ok(());
            }
            Reply::Empty => return Err(FlowError::EmptyReply { task: number }),
            Reply::CapabilityCall(call) => call,
        };

        if task.capability() != Some(call.name.as_str()) {
            return Err(FlowError::UnexpectedCapabilityCall {
                expected: task.capability().map(str::to_string),
                requested: call.name,
            });
        }
        let handle = resolved
            .handles
            .get(&call.name)
            .ok_or_else(|| FlowError::CapabilityNotFound(call.name.clone()))?;

        log::info!("Function call: {}({})", call.name, call.arguments);
        let result = handle
            .execute(&call.arguments)
            .await
            .map_err(|source| FlowError::CapabilityExecution {
                name: call.name.clone(),
                source,
            })?;
        log::info!("Function result: {}", result);

        let name = call.name.clone();
        transcript.push(Message::CapabilityCall(call));
        transcript.push(Message::function(name, result));

        let follow_up = task.settings().call(CallMode::None);
        match self
            .completion
            .respond(&follow_up, transcript.messages(), &resolved.definitions)
            .await?
        {
            Reply::Content(content) => {
                log::info!("Assistant: {}", content);
                transcript.push(Message::assistant(content));
                Ok(())
            }
            Reply::CapabilityCall(again) => Err(FlowError::RepeatedCapabilityCall(again.name)),
            Reply::Empty => Err(FlowError::EmptyReply { task: number }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, CapabilityError};
    use crate::core::flow::FlowSource;
    use crate::core::message::CapabilityCall;
    use crate::core::settings::{CallSettings, Settings};
    use crate::llm::LLMError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<Reply>>,
        modes: Mutex<Vec<CallMode>>,
    }

    impl Scripted {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                modes: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Completion for Scripted {
        async fn respond(
            &self,
            call: &CallSettings<'_>,
            _messages: &[Message],
            _capabilities: &[CapabilityDefinition],
        ) -> Result<Reply, LLMError> {
            self.modes.lock().unwrap().push(call.mode.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LLMError::InvalidResponse("script exhausted".to_string()))
        }
    }

    struct Upper;

    #[async_trait]
    impl Capability for Upper {
        fn definition(&self) -> CapabilityDefinition {
            CapabilityDefinition {
                name: "upper".to_string(),
                description: "Uppercase the text.".to_string(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn execute(&self, arguments: &str) -> Result<String, CapabilityError> {
            Ok(arguments.to_uppercase())
        }
    }

    struct NoOutput;

    impl Output for NoOutput {
        fn save(&self, name: &str, _contents: Contents<'_>) -> Result<PathBuf, OutputError> {
            Ok(PathBuf::from(name))
        }
    }

    fn engine(completion: Arc<Scripted>) -> Engine {
        let mut registry = CapabilityRegistry::new();
        registry.register("upper", || Arc::new(Upper));
        Engine::new(completion, registry, Arc::new(NoOutput))
    }

    fn flow(doc: serde_json::Value) -> Flow {
        let source: FlowSource = serde_json::from_value(doc).unwrap();
        Flow::from_source("test", source, &Settings::default(), &HashMap::new()).unwrap()
    }

    #[tokio::test]
    async fn test_forced_call_then_follow_up_without_functions() {
        let completion = Scripted::new(vec![
            Reply::CapabilityCall(CapabilityCall::new("upper", "abc")),
            Reply::Content("Done.".to_string()),
        ]);
        let flow = flow(json!({
            "tasks": [{"action": "Shout", "settings": {"function_call": "upper"}}]
        }));

        let transcript = engine(completion.clone()).converse(&flow).await.unwrap();
        assert_eq!(
            transcript.messages(),
            &[
                Message::user("Shout"),
                Message::CapabilityCall(CapabilityCall::new("upper", "abc")),
                Message::function("upper", "ABC"),
                Message::assistant("Done."),
            ]
        );
        assert_eq!(
            *completion.modes.lock().unwrap(),
            vec![CallMode::Force("upper".to_string()), CallMode::None]
        );
    }

    #[tokio::test]
    async fn test_content_reply_resolves_forced_task() {
        let completion = Scripted::new(vec![Reply::Content("No need.".to_string())]);
        let flow = flow(json!({
            "tasks": [{"action": "Shout", "settings": {"function_call": "upper"}}]
        }));

        let transcript = engine(completion).converse(&flow).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1], Message::assistant("No need."));
    }

    #[tokio::test]
    async fn test_empty_reply_names_the_task() {
        let completion = Scripted::new(vec![Reply::Content("ok".to_string()), Reply::Empty]);
        let flow = flow(json!({"tasks": [{"action": "one"}, {"action": "two"}]}));

        let err = engine(completion).converse(&flow).await.unwrap_err();
        assert!(matches!(err, FlowError::EmptyReply { task: 2 }));
    }

    #[tokio::test]
    async fn test_transcript_serializes_as_message_list() {
        let completion = Scripted::new(vec![Reply::Content("Hi!".to_string())]);
        let flow = flow(json!({"system_message": "Be nice.", "tasks": [{"action": "Hello"}]}));

        let transcript = engine(completion).converse(&flow).await.unwrap();
        assert_eq!(
            serde_json::to_value(&transcript).unwrap(),
            json!([
                {"role": "system", "content": "Be nice."},
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Hi!"}
            ])
        );
    }
}
