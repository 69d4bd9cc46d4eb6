//! Runtime configuration
//!
//! Loaded from YAML. Every field has a default, so an empty file (or no file)
//! is valid. Lookup order: explicit path, `./kbweave.yaml`, then
//! `<config dir>/kbweave/config.yaml`.

use crate::llm::OpenAiSettings;
use crate::pipeline::{GenerationOptions, Throttle};
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const LOCAL_CONFIG: &str = "kbweave.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("API key not set: export {0}")]
    MissingApiKey(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ontology_path: PathBuf,
    pub store_path: PathBuf,
    /// Where deduplication writes its candidate collection
    pub dedup_output_path: PathBuf,
    pub completion: CompletionConfig,
    pub generation: GenerationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ontology_path: PathBuf::from("ontology.json"),
            store_path: PathBuf::from("knowledge_base.json"),
            dedup_output_path: PathBuf::from("knowledge_base_deduplicated.json"),
            completion: CompletionConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer credential
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 8000,
            top_p: 1.0,
            timeout_secs: 60,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Pause after each successful generation, in milliseconds
    pub throttle_ms: u64,
    pub system_prompt: Option<String>,
    pub audience: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 1000,
            system_prompt: None,
            audience: prompts::DEFAULT_AUDIENCE.to_string(),
        }
    }
}

impl Config {
    /// Parse a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Resolve and load the effective configuration, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit.map(Path::to_path_buf).or_else(Self::discover) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// First existing config file among the default locations
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("kbweave").join("config.yaml"))
            .filter(|p| p.is_file())
    }

    /// Apply `KBWEAVE_*` overrides using the given variable lookup
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("KBWEAVE_STORE") {
            self.store_path = PathBuf::from(v);
        }
        if let Some(v) = var("KBWEAVE_ONTOLOGY") {
            self.ontology_path = PathBuf::from(v);
        }
        if let Some(v) = var("KBWEAVE_MODEL") {
            self.completion.model = v;
        }
    }

    /// Build client settings, reading the API key from the environment
    pub fn openai_settings(&self) -> Result<OpenAiSettings, ConfigError> {
        self.openai_settings_with(|key| std::env::var(key).ok())
    }

    pub fn openai_settings_with(
        &self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<OpenAiSettings, ConfigError> {
        let c = &self.completion;
        let api_key = var(&c.api_key_env)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(c.api_key_env.clone()))?;
        Ok(OpenAiSettings {
            endpoint: c.endpoint.clone(),
            api_key,
            model: c.model.clone(),
            max_tokens: c.max_tokens,
            top_p: c.top_p,
            timeout: Duration::from_secs(c.timeout_secs),
        })
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.completion.temperature,
            throttle: Throttle::fixed(Duration::from_millis(self.generation.throttle_ms)),
            system_prompt: self.generation.system_prompt.clone(),
            audience: self.generation.audience.clone(),
            limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml(
            "store_path: data/kb.json\ncompletion:\n  model: gpt-4o\ngeneration:\n  throttle_ms: 0\n",
        )
        .unwrap();
        assert_eq!(config.store_path, PathBuf::from("data/kb.json"));
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.max_tokens, 8000);
        assert_eq!(config.generation.throttle_ms, 0);
        assert_eq!(config.ontology_path, PathBuf::from("ontology.json"));
    }

    #[test]
    fn env_overrides_paths_and_model() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "KBWEAVE_STORE" => Some("/tmp/kb.json".to_string()),
            "KBWEAVE_MODEL" => Some("local-model".to_string()),
            _ => None,
        });
        assert_eq!(config.store_path, PathBuf::from("/tmp/kb.json"));
        assert_eq!(config.completion.model, "local-model");
        assert_eq!(config.ontology_path, PathBuf::from("ontology.json"));
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let config = Config::default();
        let err = config.openai_settings_with(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey(ref name) if name == "OPENAI_API_KEY"));

        let settings = config
            .openai_settings_with(|_| Some("sk-test".to_string()))
            .unwrap();
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "completion: [not, a, map]").unwrap();
        assert!(matches!(
            Config::from_file(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn generation_options_follow_config() {
        let mut config = Config::default();
        config.generation.throttle_ms = 250;
        config.completion.temperature = 0.2;
        let options = config.generation_options();
        assert_eq!(options.throttle.delay(), Duration::from_millis(250));
        assert_eq!(options.temperature, 0.2);
    }
}
