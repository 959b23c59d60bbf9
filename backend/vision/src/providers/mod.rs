pub mod gemini;
pub mod mock;
pub mod openai;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bendline_core::{BendlineError, VisionProvider};

pub use gemini::GeminiProvider;
pub use mock::MockVisionProvider;
pub use openai::OpenAiProvider;

/// What is needed to construct a hosted provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// "openai" | "gemini"
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// Build the configured provider. A missing API key is a config error.
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn VisionProvider>, BendlineError> {
    let api_key = settings
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            BendlineError::Config(format!("no API key for vision provider '{}'", settings.provider))
        })?;

    let provider: Arc<dyn VisionProvider> = match settings.provider.as_str() {
        "openai" => {
            let mut p = OpenAiProvider::new(api_key).with_timeout(settings.timeout);
            if let Some(url) = &settings.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        "gemini" => {
            let mut p = GeminiProvider::new(api_key).with_timeout(settings.timeout);
            if let Some(url) = &settings.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        other => {
            return Err(BendlineError::Config(format!(
                "unknown vision provider '{other}'"
            )))
        }
    };
    Ok(provider)
}

/// Vision providers, looked up by name.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn VisionProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registry holding the one provider the config selects.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, BendlineError> {
        let mut registry = Self::new();
        registry.register(settings.provider.clone(), build_provider(settings)?);
        Ok(registry)
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn VisionProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn VisionProvider>, BendlineError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| BendlineError::Config(format!("vision provider '{name}' is not registered")))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str, key: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            provider: provider.into(),
            api_key: key.map(String::from),
            base_url: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn builds_known_providers() {
        assert_eq!(build_provider(&settings("openai", Some("k"))).unwrap().name(), "openai");
        assert_eq!(build_provider(&settings("gemini", Some("k"))).unwrap().name(), "gemini");
    }

    #[test]
    fn rejects_missing_key_and_unknown_provider() {
        assert!(matches!(
            build_provider(&settings("openai", Some("  "))),
            Err(BendlineError::Config(_))
        ));
        assert!(matches!(
            build_provider(&settings("ollama", Some("k"))),
            Err(BendlineError::Config(_))
        ));
    }

    #[test]
    fn registry_looks_up_by_name() {
        let mut registry = ProviderRegistry::from_settings(&settings("gemini", Some("k"))).unwrap();
        registry.register("mock", Arc::new(MockVisionProvider::new("mock")));

        assert_eq!(registry.names(), vec!["gemini", "mock"]);
        assert_eq!(registry.get("mock").unwrap().name(), "mock");
        assert!(matches!(registry.get("openai"), Err(BendlineError::Config(_))));
    }
}
