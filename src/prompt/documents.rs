//! Document collaborators.
//!
//! The core never ingests documents itself; it only needs a summary blob and
//! a way to look up passages for steps that ask for them.

use std::path::Path;

/// Source of a document summary and retrievable passages.
pub trait DocumentSource: Send + Sync {
    /// Summary text (possibly empty).
    fn summary(&self) -> &str;

    /// Up to `limit` passages relevant to `query`.
    fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<String>>;
}

/// In-memory plain-text document with naive term-overlap retrieval.
#[derive(Debug, Clone, Default)]
pub struct TextDocument {
    summary: String,
    paragraphs: Vec<String>,
}

const SUMMARY_CHARS: usize = 800;

impl TextDocument {
    /// Create from text. The summary defaults to the leading paragraphs.
    pub fn new(text: &str) -> Self {
        let paragraphs: Vec<String> = text
            .split("\n\n")
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|p| !p.is_empty())
            .collect();

        let mut summary = String::new();
        for paragraph in &paragraphs {
            if summary.len() + paragraph.len() > SUMMARY_CHARS && !summary.is_empty() {
                break;
            }
            if !summary.is_empty() {
                summary.push('\n');
            }
            summary.push_str(paragraph);
        }

        Self { summary, paragraphs }
    }

    /// Load a plain-text file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(&content))
    }

    /// Override the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Number of paragraphs available for retrieval.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }
}

impl DocumentSource for TextDocument {
    fn summary(&self) -> &str {
        &self.summary
    }

    fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        let terms: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
            .map(str::to_lowercase)
            .collect();

        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, usize)> = self
            .paragraphs
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let lower = p.to_lowercase();
                let score = terms.iter().filter(|t| lower.contains(t.as_str())).count();
                (score > 0).then_some((i, score))
            })
            .collect();

        // Highest score first, earlier paragraphs win ties
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored.into_iter().take(limit).map(|(i, _)| self.paragraphs[i].clone()).collect())
    }
}
