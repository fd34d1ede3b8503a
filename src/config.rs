use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PacklingoError, Result};

/// Default release asset of the community translation dictionary.
pub const DEFAULT_DICT_URL: &str = "https://github.com/VM-Chinese-translate-group/i18n-Dict-Extender/releases/latest/download/Dict-Mini.json";

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_context_limit() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub translation: TranslationConfig,
    pub llm: LlmConfig,
    pub dictionary: DictionaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Target language identifier (used in the system prompt)
    pub target_lang: String,
    /// Content category subdirectories to process, in order
    pub categories: Vec<String>,
    /// Maximum entries submitted to the LLM per call
    pub batch_size: usize,
    /// Fixed delay between batches, for rate limiting
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Maximum dictionary entries included as prompt context
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible endpoint base URL
    pub base_url: String,
    /// API key; empty means the LLM phase is skipped entirely
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries per batch before it is skipped
    pub max_retries: u32,
}

impl LlmConfig {
    /// Credentials present means the LLM phase can run at all.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Remote location of the dictionary snapshot
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            translation: TranslationConfig {
                target_lang: "zh_cn".to_string(),
                categories: vec![
                    "mods".to_string(),
                    "kubejs".to_string(),
                    "ftbquests".to_string(),
                ],
                batch_size: 50,
                batch_delay_ms: 1000,
                context_limit: 100,
            },
            llm: LlmConfig {
                base_url: String::new(),
                api_key: String::new(),
                model: String::new(),
                temperature: 0.3,
                timeout_secs: 120,
                max_retries: 30,
            },
            dictionary: DictionaryConfig {
                url: DEFAULT_DICT_URL.to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PacklingoError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| PacklingoError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PacklingoError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| PacklingoError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply credential overrides from the environment. Secrets never live
    /// in the config file itself.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            if !url.is_empty() {
                self.llm.base_url = url;
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.llm.api_key = key;
            }
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL_ID") {
            if !model.is_empty() {
                self.llm.model = model;
            }
        }
    }

    /// Working directory for the dictionary cache and logs.
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(".packlingo")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.translation.batch_size, 50);
        assert_eq!(parsed.translation.batch_delay_ms, 1000);
        assert_eq!(parsed.llm.max_retries, 30);
        assert_eq!(parsed.dictionary.url, DEFAULT_DICT_URL);
    }

    #[test]
    fn test_llm_unconfigured_without_api_key() {
        let config = Config::default();
        assert!(!config.llm.is_configured());

        let mut config = config;
        config.llm.api_key = "sk-test".to_string();
        assert!(config.llm.is_configured());
    }

    #[test]
    fn test_partial_config_uses_serde_defaults() {
        let toml_str = r#"
            [translation]
            target_lang = "zh_cn"
            categories = ["mods"]
            batch_size = 10

            [llm]
            base_url = ""
            api_key = ""
            model = ""
            temperature = 0.3
            timeout_secs = 60
            max_retries = 5

            [dictionary]
            url = "https://example.com/dict.json"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.translation.batch_delay_ms, 1000);
        assert_eq!(config.translation.context_limit, 100);
    }
}
