//! `save_file`: write a text file into the run's output.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::capability::{Capability, CapabilityDefinition, CapabilityError, parse_arguments};
use crate::core::output::{Contents, Output};

pub const NAME: &str = "save_file";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Arguments {
    file_name: String,
    file_contents: String,
}

pub struct SaveFile {
    output: Arc<dyn Output>,
}

impl SaveFile {
    pub fn new(output: Arc<dyn Output>) -> Self {
        Self { output }
    }
}

#[async_trait]
impl Capability for SaveFile {
    fn definition(&self) -> CapabilityDefinition {
        CapabilityDefinition {
            name: NAME.to_string(),
            description: "Save a file to the output directory.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_name": {
                        "type": "string",
                        "description": "The name of the file, including its extension. For example, test.txt."
                    },
                    "file_contents": {
                        "type": "string",
                        "description": "The contents of the file."
                    }
                },
                "required": ["file_name", "file_contents"]
            }),
        }
    }

    /// Returns the path of the saved file.
    async fn execute(&self, arguments: &str) -> Result<String, CapabilityError> {
        let args: Arguments = parse_arguments(arguments)?;
        let path = self
            .output
            .save(&args.file_name, Contents::Text(&args.file_contents))?;
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::output::{DirectoryOutput, OutputError};

    fn capability() -> (tempfile::TempDir, DirectoryOutput, SaveFile) {
        let dir = tempfile::tempdir().unwrap();
        let output = DirectoryOutput::create(dir.path(), "save").unwrap();
        let capability = SaveFile::new(Arc::new(output.clone()));
        (dir, output, capability)
    }

    #[tokio::test]
    async fn test_saves_into_run_directory() {
        let (_dir, output, capability) = capability();
        let args = json!({"file_name": "poem.txt", "file_contents": "Roses are red"});

        let path = capability.execute(&args.to_string()).await.unwrap();
        assert_eq!(path, output.dir().join("poem.txt").display().to_string());
        assert_eq!(
            std::fs::read_to_string(output.dir().join("poem.txt")).unwrap(),
            "Roses are red"
        );
    }

    #[tokio::test]
    async fn test_rejects_paths() {
        let (_dir, _output, capability) = capability();
        let args = json!({"file_name": "../escape.txt", "file_contents": "x"});

        let err = capability.execute(&args.to_string()).await.unwrap_err();
        assert!(matches!(
            err,
            CapabilityError::Output(OutputError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_requires_contents() {
        let (_dir, _output, capability) = capability();
        let err = capability
            .execute(r#"{"file_name": "a.txt"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments(_)));
    }
}
