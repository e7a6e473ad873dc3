//! Persistence of run artifacts (transcript, saved files, images).

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Invalid output file name: {0:?}")]
    InvalidName(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Something to be saved.
#[derive(Debug, Clone, Copy)]
pub enum Contents<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
    /// Structured content, written as 4-space indented JSON.
    Json(&'a serde_json::Value),
}

/// Where a run stores what it produces.
pub trait Output: Send + Sync {
    /// Saves `contents` under `name` and returns the resulting location.
    fn save(&self, name: &str, contents: Contents<'_>) -> Result<PathBuf, OutputError>;
}

/// Saves everything into one directory per run, named
/// `<flow>_<YYYY_MM_DD_HH_MM_SS>`.
#[derive(Debug, Clone)]
pub struct DirectoryOutput {
    dir: PathBuf,
}

impl DirectoryOutput {
    /// Creates the run directory under `base_dir`.
    pub fn create(base_dir: impl AsRef<Path>, flow_name: &str) -> Result<Self, OutputError> {
        let timestamp = chrono::Local::now().format("%Y_%m_%d_%H_%M_%S");
        let dir = base_dir
            .as_ref()
            .join(format!("{}_{}", flow_name, timestamp));
        fs::create_dir_all(&dir).map_err(|source| OutputError::Io {
            path: dir.clone(),
            source,
        })?;
        log::debug!("Created output directory {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Output for DirectoryOutput {
    fn save(&self, name: &str, contents: Contents<'_>) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(checked_file_name(name)?);
        let bytes = match contents {
            Contents::Text(text) => text.as_bytes().to_vec(),
            Contents::Bytes(bytes) => bytes.to_vec(),
            Contents::Json(value) => to_indented_json(value)?,
        };

        let mut file = fs::File::create(&path).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        file.write_all(&bytes).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;

        log::info!("Saved {}", path.display());
        Ok(path)
    }
}

/// Accepts a bare file name only; anything that could leave the run directory is rejected.
fn checked_file_name(name: &str) -> Result<&Path, OutputError> {
    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(path),
        _ => Err(OutputError::InvalidName(name.to_string())),
    }
}

fn to_indented_json(value: &serde_json::Value) -> Result<Vec<u8>, OutputError> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_directory_is_named_after_flow() {
        let base = tempfile::tempdir().unwrap();
        let output = DirectoryOutput::create(base.path(), "demo").unwrap();
        assert!(output.dir().is_dir());
        let dir_name = output.dir().file_name().unwrap().to_string_lossy().to_string();
        assert!(dir_name.starts_with("demo_"));
        // demo_ + YYYY_MM_DD_HH_MM_SS
        assert_eq!(dir_name.len(), "demo_".len() + 19);
    }

    #[test]
    fn test_save_text_and_bytes() {
        let base = tempfile::tempdir().unwrap();
        let output = DirectoryOutput::create(base.path(), "demo").unwrap();

        let path = output.save("note.txt", Contents::Text("hello")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        let path = output.save("img.png", Contents::Bytes(&[1, 2, 3])).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_save_json_uses_four_space_indent() {
        let base = tempfile::tempdir().unwrap();
        let output = DirectoryOutput::create(base.path(), "demo").unwrap();
        let value = json!([{"role": "user"}]);

        let path = output.save("messages.json", Contents::Json(&value)).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "[\n    {\n        \"role\": \"user\"\n    }\n]");
    }

    #[test]
    fn test_rejects_names_leaving_the_directory() {
        let base = tempfile::tempdir().unwrap();
        let output = DirectoryOutput::create(base.path(), "demo").unwrap();
        for name in ["../escape.txt", "/etc/passwd", "a/b.txt", "", ".."] {
            assert!(
                matches!(
                    output.save(name, Contents::Text("x")),
                    Err(OutputError::InvalidName(_))
                ),
                "{name:?} should be rejected"
            );
        }
    }
}
