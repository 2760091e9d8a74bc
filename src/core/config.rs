//! Configuration management for Archflow.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::GenerationMethod;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Step catalog settings
    pub catalog: CatalogConfig,

    /// Generation backend settings
    pub ai: AiConfig,

    /// Execution pipeline settings
    pub pipeline: PipelineConfig,
}

/// Step catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path of the step-definition YAML
    pub definitions: PathBuf,
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Backend (claude, ollama, dry-run)
    pub provider: String,

    /// Model to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Method tried first for every sub-stage
    pub method: GenerationMethod,

    /// Output token limit per call
    pub max_tokens: u32,

    /// Transport connect timeout
    pub connect_timeout_secs: u64,

    /// Transport read timeout
    pub read_timeout_secs: u64,

    /// Ollama-specific settings
    pub ollama: OllamaConfig,
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama server URL
    pub base_url: String,

    /// Model to use
    pub model: String,
}

/// Execution pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between consecutive backend calls
    pub inter_call_delay_ms: u64,

    /// Maximum retrieved passages appended to a prompt
    pub max_passages: usize,

    /// Characters of each completed step's result carried into later prompts
    pub context_chars_per_step: usize,

    /// Maximum length of a step summary
    pub summary_chars: usize,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.archflow.toml` in current directory
    /// 2. `~/.config/archflow/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".archflow.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = ?path, "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<()> {
        let config_dir = Self::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&config_dir)?;

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_dir.join("config.toml"), content)?;

        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("archflow"))
    }

    /// Get the global config file path.
    pub fn global_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }
}

impl PipelineConfig {
    /// Pause between consecutive backend calls.
    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { definitions: PathBuf::from("prompts/steps.yaml") }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "claude".to_string(),
            model: None,
            method: GenerationMethod::Reasoning,
            max_tokens: 4096,
            connect_timeout_secs: 10,
            read_timeout_secs: 180,
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:11434".to_string(), model: "llama3.2".to_string() }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_call_delay_ms: 1000,
            max_passages: 3,
            context_chars_per_step: 1200,
            summary_chars: 240,
        }
    }
}
