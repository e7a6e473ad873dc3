//! `summarize_text`: a one-shot summarization call against the completion endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::capability::{Capability, CapabilityDefinition, CapabilityError, parse_arguments};
use crate::core::completion::Completion;
use crate::core::message::{Message, Reply};
use crate::core::settings::{CallMode, Settings};

pub const NAME: &str = "summarize_text";

pub const DEFAULT_INSTRUCTIONS: &str = "Return a summary that succinctly captures its main points.";

/// Rough characters-per-token ratio for English text.
const CHARS_PER_TOKEN: usize = 4;
/// Input cap, leaving room for the instructions and the summary.
const MAX_INPUT_TOKENS: usize = 14_000;

const SMALL_MODEL: (&str, usize) = ("gpt-3.5-turbo", 4_000);
const LARGE_MODEL: (&str, usize) = ("gpt-3.5-turbo-16k", 16_000);

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Arguments {
    text_to_summarize: String,
    #[serde(default)]
    instructions: Option<String>,
}

pub struct SummarizeText {
    completion: Arc<dyn Completion>,
}

impl SummarizeText {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Capability for SummarizeText {
    fn definition(&self) -> CapabilityDefinition {
        CapabilityDefinition {
            name: NAME.to_string(),
            description: "Summarizes text.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text_to_summarize": {
                        "type": "string",
                        "description": "The text to summarize."
                    },
                    "instructions": {
                        "type": "string",
                        "description": "Instructions for summarizing the text.",
                        "default": DEFAULT_INSTRUCTIONS
                    }
                },
                "required": ["text_to_summarize"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<String, CapabilityError> {
        let args: Arguments = parse_arguments(arguments)?;
        let instructions = args.instructions.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS);
        let text = truncate(&args.text_to_summarize, MAX_INPUT_TOKENS * CHARS_PER_TOKEN);

        let messages = [
            Message::system(format!("You are an AI summarizer. {}", instructions)),
            Message::user(format!("Text to summarize: {}", text)),
        ];
        let settings = select_settings(estimate_tokens(&messages)?);
        log::debug!(
            "Summarizing {} chars with {} (max_tokens={:?})",
            text.len(),
            settings.model,
            settings.max_tokens
        );

        match self
            .completion
            .respond(&settings.call(CallMode::None), &messages, &[])
            .await?
        {
            Reply::Content(summary) => Ok(summary),
            Reply::CapabilityCall(call) => Err(CapabilityError::Failed(format!(
                "summarizer asked for capability {} instead of answering",
                call.name
            ))),
            Reply::Empty => Err(CapabilityError::Failed(
                "summarizer returned an empty reply".to_string(),
            )),
        }
    }
}

/// First `max_chars` characters of `text`.
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn estimate_tokens(messages: &[Message]) -> Result<usize, CapabilityError> {
    let serialized =
        serde_json::to_string(messages).map_err(|e| CapabilityError::Failed(e.to_string()))?;
    Ok(serialized.chars().count() / CHARS_PER_TOKEN)
}

/// Picks the smallest model whose context fits the prompt; the rest of the
/// context becomes the reply budget.
fn select_settings(prompt_tokens: usize) -> Settings {
    let (model, budget) = if prompt_tokens > SMALL_MODEL.1 {
        LARGE_MODEL
    } else {
        SMALL_MODEL
    };
    let max_tokens = u32::try_from(budget.saturating_sub(prompt_tokens)).unwrap_or(u32::MAX);
    Settings {
        model: model.to_string(),
        temperature: Some(0.0),
        max_tokens: Some(max_tokens),
        ..Settings::default()
    }
}
