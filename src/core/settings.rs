use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Model identifier used when neither the flow nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Sampling temperature used when a task does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// Configuration for the model calls of a single task.
///
/// Unset numeric values are never forwarded; the endpoint's own defaults apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub model: String,
    /// Capability the task forces the model to call, if any. Sent as a
    /// [`CallMode`], never as a plain setting.
    #[serde(skip)]
    pub capability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

impl Settings {
    /// Default settings bound to the given model.
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Per-request configuration for this task's settings.
    pub fn call(&self, mode: CallMode) -> CallSettings<'_> {
        CallSettings {
            settings: self,
            mode,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            capability: None,
            temperature: Some(DEFAULT_TEMPERATURE),
            top_p: None,
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }
}

/// Settings as written in a flow document: every key optional, unknown keys rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSettings {
    pub model: Option<String>,
    pub function_call: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
}

impl PartialSettings {
    /// Fills every unset key from `defaults`.
    pub fn merge_over(self, defaults: &Settings) -> Settings {
        Settings {
            model: self.model.unwrap_or_else(|| defaults.model.clone()),
            capability: self.function_call.or_else(|| defaults.capability.clone()),
            temperature: self.temperature.or(defaults.temperature),
            top_p: self.top_p.or(defaults.top_p),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            presence_penalty: self.presence_penalty.or(defaults.presence_penalty),
            frequency_penalty: self.frequency_penalty.or(defaults.frequency_penalty),
        }
    }
}

/// Whether, and which, capability the model may call on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallMode {
    /// The model must answer with content.
    None,
    /// The model must call the named capability.
    Force(String),
}

impl Serialize for CallMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CallMode::None => serializer.serialize_str("none"),
            CallMode::Force(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("name", name)?;
                map.end()
            }
        }
    }
}

/// The immutable configuration of one completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSettings<'a> {
    pub settings: &'a Settings,
    pub mode: CallMode,
}
