//! Flow documents: loading, default merging and variable substitution.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::FlowError;
use crate::core::settings::{PartialSettings, Settings};
use crate::core::variables;

/// A flow document as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowSource {
    pub system_message: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSource {
    pub action: String,
    #[serde(default)]
    pub settings: Option<PartialSettings>,
}

/// One scripted conversational step.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    instruction: String,
    settings: Settings,
}

impl Task {
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Capability this task forces the model to call, if any.
    pub fn capability(&self) -> Option<&str> {
        self.settings.capability.as_deref()
    }
}

/// A named, fully substituted, ordered list of tasks.
///
/// A `Flow` only exists after its variables have been validated and
/// substituted; it cannot be observed in a pre-substitution state.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    name: String,
    system_message: Option<String>,
    tasks: Vec<Task>,
}

impl Flow {
    /// Builds a flow from an already parsed document.
    pub fn from_source(
        name: impl Into<String>,
        source: FlowSource,
        defaults: &Settings,
        variables: &HashMap<String, String>,
    ) -> Result<Self, FlowError> {
        let mut texts: Vec<&str> = Vec::with_capacity(source.tasks.len() + 1);
        if let Some(system) = &source.system_message {
            texts.push(system);
        }
        texts.extend(source.tasks.iter().map(|t| t.action.as_str()));

        let mut rendered = variables::substitute_all(&texts, variables)?.into_iter();
        let system_message = match source.system_message {
            Some(_) => rendered.next(),
            None => None,
        };

        let tasks = source
            .tasks
            .into_iter()
            .zip(rendered)
            .map(|(task, instruction)| Task {
                instruction,
                settings: task.settings.unwrap_or_default().merge_over(defaults),
            })
            .collect();

        Ok(Self {
            name: name.into(),
            system_message,
            tasks,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Distinct capability names referenced by the tasks, in first-use order.
    pub fn capabilities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.tasks.iter().filter_map(Task::capability) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Loads `<flows_dir>/<name>.json` documents.
#[derive(Debug, Clone)]
pub struct FlowLoader {
    flows_dir: PathBuf,
    defaults: Settings,
}

impl FlowLoader {
    pub fn new(flows_dir: impl Into<PathBuf>) -> Self {
        Self {
            flows_dir: flows_dir.into(),
            defaults: Settings::default(),
        }
    }

    /// Settings that partially specified tasks are merged over.
    pub fn with_defaults(mut self, defaults: Settings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn flows_dir(&self) -> &Path {
        &self.flows_dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.flows_dir.join(format!("{}.json", name))
    }

    pub fn load(&self, name: &str, variables: &HashMap<String, String>) -> Result<Flow, FlowError> {
        let path = self.path_for(name);
        log::debug!("Loading flow {} from {}", name, path.display());

        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                FlowError::FlowNotFound { path: path.clone() }
            } else {
                FlowError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let source: FlowSource =
            serde_json::from_str(&text).map_err(|source| FlowError::FlowParse {
                name: name.to_string(),
                source,
            })?;

        let flow = Flow::from_source(name, source, &self.defaults, variables)?;
        log::info!("Loaded flow {} with {} tasks", name, flow.tasks().len());
        Ok(flow)
    }
}
