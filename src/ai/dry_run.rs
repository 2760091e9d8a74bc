//! Offline backend for previews.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Generation, GenerationBackend, GenerationMethod};
use crate::error::AnalysisResult;

static SECTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"section titled "([^"]+)""#).expect("valid section pattern"));

/// Backend that answers every prompt with deterministic placeholder text.
#[derive(Debug, Clone, Default)]
pub struct DryRunBackend;

impl DryRunBackend {
    /// Create a new dry-run backend.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationBackend for DryRunBackend {
    async fn generate(
        &self,
        prompt: &str,
        method: GenerationMethod,
    ) -> AnalysisResult<Generation> {
        let section = SECTION_PATTERN
            .captures_iter(prompt)
            .last()
            .and_then(|c| c.get(1))
            .map_or("Analysis", |m| m.as_str());

        Ok(Generation {
            reasoning: format!("dry run via {method}"),
            output: format!(
                "DRY RUN: {section} would be generated here ({} prompt characters).",
                prompt.chars().count()
            ),
        })
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_names_section() {
        let backend = DryRunBackend::new();
        let prompt = "BASE\nHARD CONSTRAINT: Write ONLY the section titled \"Site Table\".";
        let result = backend.generate(prompt, GenerationMethod::Chat).await.unwrap();
        assert!(result.output.starts_with("DRY RUN: Site Table"));
        assert_eq!(result.reasoning, "dry run via chat");
    }

    #[tokio::test]
    async fn test_dry_run_without_section() {
        let result =
            DryRunBackend::new().generate("plain", GenerationMethod::Reasoning).await.unwrap();
        assert!(result.output.starts_with("DRY RUN: Analysis"));
    }
}
