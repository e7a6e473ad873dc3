//! Transcript entries and completion replies.
//!
//! A [`Message`] is serialized in the chat-completions wire form
//! (`{"role": ..., "content": ..., "name"?, "function_call"?}`), which is
//! also the form the transcript is persisted in.

use serde::{Deserialize, Serialize};

/// A capability invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityCall {
    pub name: String,
    /// JSON-encoded argument object, exactly as the model produced it.
    pub arguments: String,
}

impl CapabilityCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireMessage", try_from = "WireMessage")]
pub enum Message {
    System(String),
    User(String),
    /// A plain textual reply from the model.
    Assistant(String),
    /// A reply that asks for a capability instead of answering.
    CapabilityCall(CapabilityCall),
    /// The result of executing a capability.
    Function { name: String, content: String },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(content.into())
    }

    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System(_) => Role::System,
            Message::User(_) => Role::User,
            Message::Assistant(_) | Message::CapabilityCall(_) => Role::Assistant,
            Message::Function { .. } => Role::Function,
        }
    }

    /// Textual content, if this message carries any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Message::System(c) | Message::User(c) | Message::Assistant(c) => Some(c),
            Message::Function { content, .. } => Some(content),
            Message::CapabilityCall(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<CapabilityCall>,
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        let role = message.role();
        let (content, name, function_call) = match message {
            Message::System(c) | Message::User(c) | Message::Assistant(c) => (Some(c), None, None),
            Message::CapabilityCall(call) => (None, None, Some(call)),
            Message::Function { name, content } => (Some(content), Some(name), None),
        };
        WireMessage {
            role,
            content,
            name,
            function_call,
        }
    }
}

impl TryFrom<WireMessage> for Message {
    type Error = String;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        match (wire.role, wire.content, wire.name, wire.function_call) {
            (Role::System, Some(c), _, None) => Ok(Message::System(c)),
            (Role::User, Some(c), _, None) => Ok(Message::User(c)),
            (Role::Assistant, _, _, Some(call)) => Ok(Message::CapabilityCall(call)),
            (Role::Assistant, Some(c), _, None) => Ok(Message::Assistant(c)),
            (Role::Function, Some(content), Some(name), None) => {
                Ok(Message::Function { name, content })
            }
            (role, ..) => Err(format!("malformed {:?} message", role)),
        }
    }
}

/// What a single completion call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Content(String),
    CapabilityCall(CapabilityCall),
    /// Neither content nor a capability call.
    Empty,
}

impl Reply {
    /// Builds a reply from the optional parts of a response message.
    /// Non-empty content wins over a capability call.
    pub fn from_parts(content: Option<String>, call: Option<CapabilityCall>) -> Self {
        match (content, call) {
            (Some(text), _) if !text.is_empty() => Reply::Content(text),
            (_, Some(call)) => Reply::CapabilityCall(call),
            _ => Reply::Empty,
        }
    }
}
