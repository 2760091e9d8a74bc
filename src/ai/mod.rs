//! Generation backend integration.
//!
//! Every analysis sub-stage is one call to a text-generation backend. Calls go
//! through [`GenerationAdapter`], which escalates across generation methods
//! when a backend answers with an empty output.
//!
//! ## Backends
//!
//! - `claude` - Anthropic Messages API (requires `ANTHROPIC_API_KEY`)
//! - `ollama` - local Ollama server
//! - `dry-run` - deterministic offline output

mod adapter;
#[cfg(feature = "ai")]
mod claude;
mod dry_run;
#[cfg(feature = "ai")]
mod ollama;

pub use adapter::{GenerationAdapter, MethodChain, GENERATION_FAILED_MESSAGE};
#[cfg(feature = "ai")]
pub use claude::ClaudeProvider;
pub use dry_run::DryRunBackend;
#[cfg(feature = "ai")]
pub use ollama::OllamaProvider;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::AiConfig;
use crate::error::AnalysisResult;

/// Way of calling a backend. The adapter escalates through these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    /// Reasoning-enabled call returning both reasoning and output
    #[default]
    Reasoning,

    /// Plain chat call
    Chat,

    /// Bare completion call
    Completion,
}

impl GenerationMethod {
    /// Get the string representation of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Chat => "chat",
            Self::Completion => "completion",
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reasoning" => Ok(Self::Reasoning),
            "chat" => Ok(Self::Chat),
            "completion" => Ok(Self::Completion),
            other => anyhow::bail!("Unknown generation method: {other}"),
        }
    }
}

/// What a backend produced for one prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    /// Reasoning trace, when the method exposes one
    pub reasoning: String,

    /// Answer text
    pub output: String,
}

impl Generation {
    /// Create a generation with output only.
    pub fn output(output: impl Into<String>) -> Self {
        Self { reasoning: String::new(), output: output.into() }
    }

    /// Whether the answer is blank.
    pub fn is_empty(&self) -> bool {
        self.output.trim().is_empty()
    }
}

/// Trait for text-generation backends.
///
/// Implementations report hard failures as
/// [`AnalysisError::GenerationBackendFailure`](crate::AnalysisError::GenerationBackendFailure)
/// and may return either an empty [`Generation`] or
/// [`AnalysisError::EmptyGenerationResult`](crate::AnalysisError::EmptyGenerationResult)
/// when nothing came back.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text for a prompt with the given method.
    async fn generate(&self, prompt: &str, method: GenerationMethod)
        -> AnalysisResult<Generation>;

    /// Get the backend name.
    fn name(&self) -> &str;
}

/// Build the backend selected in configuration.
pub fn backend_from_config(
    config: &AiConfig,
    dry_run: bool,
) -> anyhow::Result<Arc<dyn GenerationBackend>> {
    if dry_run {
        return Ok(Arc::new(DryRunBackend::new()));
    }

    match config.provider.as_str() {
        "dry-run" => Ok(Arc::new(DryRunBackend::new())),
        #[cfg(feature = "ai")]
        "claude" => Ok(Arc::new(ClaudeProvider::new(config)?)),
        #[cfg(feature = "ai")]
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        other => anyhow::bail!("Unsupported generation backend: {other}"),
    }
}
