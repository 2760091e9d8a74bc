//! Execution history entries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::Step;

/// Sentences that read like a takeaway.
static INSIGHT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(recommend\w*|should|must|key|priority|opportunit\w*|critical)\b")
        .expect("valid insight pattern")
});

/// Sentence boundaries within one line.
static SENTENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]?").expect("valid sentence pattern"));

/// List markers and emphasis stripped from extracted lines.
static DECORATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*+>]\s+|\d+[.)]\s+)+|\*\*|__").expect("valid decoration pattern")
});

/// Result of one sub-stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    /// Output section label
    pub label: String,

    /// Generated section text
    pub output: String,

    /// Reasoning trace, when the backend returned one
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
}

/// One successfully executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Catalog step id
    pub step_id: String,

    /// Step title
    pub title: String,

    /// Base prompt the sub-stages were derived from
    pub prompt: String,

    /// Sub-stage results keyed by stage index
    pub results: BTreeMap<usize, StageResult>,

    /// Short summary extracted from the result
    pub summary: String,

    /// Key takeaway extracted from the result
    pub insight: String,

    /// Combined result of all sub-stages
    pub result: String,

    /// When the step finished
    pub completed_at: DateTime<Utc>,
}

impl StepRecord {
    /// Build a record from the finished sub-stages of a step.
    pub fn new(
        step: &Step,
        prompt: String,
        results: BTreeMap<usize, StageResult>,
        summary_chars: usize,
    ) -> Self {
        let result = combine(&results);
        let summary = summarize(&results, summary_chars);
        let insight = extract_insight(&results, summary_chars);

        Self {
            step_id: step.id.clone(),
            title: step.title.clone(),
            prompt,
            results,
            summary,
            insight,
            result,
            completed_at: Utc::now(),
        }
    }

    /// Digest of this record for later prompts.
    pub fn digest(&self, position: usize, max_chars: usize) -> String {
        let mut digest = format!("## [{position}] {}\n", self.title);
        if !self.summary.is_empty() {
            digest.push_str(&format!("Summary: {}\n", self.summary));
        }
        if !self.insight.is_empty() {
            digest.push_str(&format!("Insight: {}\n", self.insight));
        }
        digest.push_str(&truncate_chars(&self.result, max_chars));
        digest.push('\n');
        digest
    }
}

/// Join stage results as `"<label>\n<result>"` blocks in stage order.
pub fn combine(results: &BTreeMap<usize, StageResult>) -> String {
    results
        .values()
        .map(|stage| format!("{}\n{}", stage.label, stage.output.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First prose line of the first stage.
fn summarize(results: &BTreeMap<usize, StageResult>, max_chars: usize) -> String {
    results
        .values()
        .flat_map(|stage| content_lines(&stage.output))
        .next()
        .map(|line| truncate_chars(&line, max_chars))
        .unwrap_or_default()
}

/// First takeaway-like sentence, searching the last stage first.
fn extract_insight(results: &BTreeMap<usize, StageResult>, max_chars: usize) -> String {
    let found = results.values().rev().find_map(|stage| {
        content_lines(&stage.output).find_map(|line| {
            SENTENCE_PATTERN
                .find_iter(&line)
                .map(|m| m.as_str().trim())
                .find(|sentence| INSIGHT_PATTERN.is_match(sentence))
                .map(str::to_string)
        })
    });

    found
        .or_else(|| results.values().next_back().and_then(|s| content_lines(&s.output).last()))
        .map(|line| truncate_chars(&line, max_chars))
        .unwrap_or_default()
}

/// Non-empty lines that are neither headings, table rows, nor rules.
fn content_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with('|')
                && !line.chars().all(|c| matches!(c, '-' | '=' | '*' | '_' | ' '))
        })
        .map(|line| DECORATION_PATTERN.replace_all(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
}

/// Cut text to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
