//! Static mapping from capability names to factories.

use std::collections::HashMap;
use std::sync::Arc;

use crate::capability::{
    CapabilityHandle, CreateImage, GetUrl, SaveFile, SummarizeText, create_image, get_url,
    save_file, summarize_text,
};
use crate::core::error::FlowError;
use crate::core::output::Output;
use crate::llm::Client;

type Factory = Box<dyn Fn() -> CapabilityHandle + Send + Sync>;

/// Resolves capability names to fresh handles.
#[derive(Default)]
pub struct CapabilityRegistry {
    factories: HashMap<String, Factory>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in capabilities: `get_url`, `save_file`,
    /// `summarize_text` and `create_image`.
    pub fn builtin(client: Client, output: Arc<dyn Output>) -> Self {
        let mut registry = Self::new();

        let http = client.http().clone();
        registry.register(get_url::NAME, move || Arc::new(GetUrl::new(http.clone())));

        let save_output = output.clone();
        registry.register(save_file::NAME, move || {
            Arc::new(SaveFile::new(save_output.clone()))
        });

        let completion = Arc::new(client.clone());
        registry.register(summarize_text::NAME, move || {
            Arc::new(SummarizeText::new(completion.clone()))
        });

        registry.register(create_image::NAME, move || {
            Arc::new(CreateImage::new(client.clone(), output.clone()))
        });

        registry
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> CapabilityHandle + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            log::warn!("Capability {} was already registered, replacing it", name);
        }
        self.factories.insert(name, Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn resolve(&self, name: &str) -> Result<CapabilityHandle, FlowError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| FlowError::CapabilityNotFound(name.to_string()))
    }
}
