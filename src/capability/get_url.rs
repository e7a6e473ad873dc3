//! `get_url`: fetch a page as raw HTML or as plain text.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::capability::{Capability, CapabilityDefinition, CapabilityError, parse_arguments};

pub const NAME: &str = "get_url";

fn html_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid html regex")
}

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| html_regex(r"(?is)<script\b.*?</script\s*>"));
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| html_regex(r"(?is)<style\b.*?</style\s*>"));
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| html_regex(r"(?s)<!--.*?-->"));
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| html_regex(r"(?i)<\s*(br|/p|/div|/h[1-6]|/li|/tr)\b[^>]*>"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| html_regex(r"(?s)<[^>]*>"));
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| html_regex(r"\n\s*\n+"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Html,
    Text,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Arguments {
    url: String,
    #[serde(default)]
    format: Format,
}

/// Fetches the contents of a URL with a plain GET.
pub struct GetUrl {
    http: reqwest::Client,
}

impl GetUrl {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Capability for GetUrl {
    fn definition(&self) -> CapabilityDefinition {
        CapabilityDefinition {
            name: NAME.to_string(),
            description: "Fetch the contents of a URL.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL to fetch content from."
                    },
                    "format": {
                        "type": "string",
                        "enum": ["html", "text"],
                        "default": "html",
                        "description": "The format of the returned content. If 'html', the full HTML will be returned. If 'text', only the text will be returned."
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<String, CapabilityError> {
        let args: Arguments = parse_arguments(arguments)?;
        log::debug!("Fetching {} as {:?}", args.url, args.format);

        let response = self.http.get(&args.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Status {
                url: args.url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(match args.format {
            Format::Html => body,
            Format::Text => html_to_text(&body),
        })
    }
}

/// Reduces an HTML document to its visible text.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = COMMENT_RE.replace_all(&text, "");
    let text = BLOCK_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    BLANK_LINES_RE
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    const ENTITIES: [(&str, &str); 8] = [
        ("&nbsp;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&apos;", "'"),
        ("&#39;", "'"),
        ("&#x27;", "'"),
        // last, so that "&amp;lt;" stays "&lt;"
        ("&amp;", "&"),
    ];
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, replacement)| {
            acc.replace(entity, replacement)
        })
}
