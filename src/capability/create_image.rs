//! `create_image`: generate an image from a prompt and store it with the run.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::capability::{Capability, CapabilityDefinition, CapabilityError, parse_arguments};
use crate::core::output::{Contents, Output};
use crate::llm::Client;

pub const NAME: &str = "create_image";

const IMAGE_COUNT: u32 = 1;
const IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Arguments {
    prompt: String,
}

pub struct CreateImage {
    client: Client,
    output: Arc<dyn Output>,
}

impl CreateImage {
    pub fn new(client: Client, output: Arc<dyn Output>) -> Self {
        Self { client, output }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CapabilityError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Capability for CreateImage {
    fn definition(&self) -> CapabilityDefinition {
        CapabilityDefinition {
            name: NAME.to_string(),
            description: "Create an image from a description.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "The prompt that describes the image. Be specific and detailed about the content and style of the image."
                    }
                },
                "required": ["prompt"]
            }),
        }
    }

    /// Returns the file name of the stored image.
    async fn execute(&self, arguments: &str) -> Result<String, CapabilityError> {
        let args: Arguments = parse_arguments(arguments)?;

        let url = self
            .client
            .generate_image(&args.prompt, IMAGE_COUNT, IMAGE_SIZE)
            .await?;
        log::debug!("Image generated at {}", url);

        let bytes = self.download(&url).await?;
        let file_name = format!("{}.png", Uuid::new_v4());
        self.output.save(&file_name, Contents::Bytes(&bytes))?;
        Ok(file_name)
    }
}
