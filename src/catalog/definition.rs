//! Declarative step definitions.
//!
//! Each catalog step is paired with a prompt declaration loaded from a YAML
//! file at startup. Validation and defaulting happen once, here, so the prompt
//! compiler can read every field without existence checks.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Step;
use crate::ai::GenerationMethod;
use crate::error::{AnalysisError, AnalysisResult};

/// Maximum number of output-structure sections (and therefore sub-stages) per step.
pub const MAX_OUTPUT_SECTIONS: usize = 4;

const DEFAULT_ROLE: &str = "a senior architectural planner";

/// Prompt declaration for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Catalog step id this definition belongs to
    pub id: String,

    /// What the analysis should achieve
    #[serde(default)]
    pub goal: String,

    /// Persona the backend should adopt
    #[serde(default = "default_role")]
    pub role: String,

    /// Ordered task list
    #[serde(default)]
    pub tasks: Vec<String>,

    /// Labels of the output sections; one sub-stage per label
    #[serde(default)]
    pub output_structure: Vec<String>,

    /// Phrases the answer must contain
    #[serde(default)]
    pub required_phrases: Vec<String>,

    /// Hard constraints
    #[serde(default)]
    pub constraints: Vec<String>,

    /// Tone directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    /// Format directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Retrieve document passages for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_search: Option<DocumentSearch>,

    /// Preferred generation method for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<GenerationMethod>,
}

/// Document-search trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSearch {
    /// Search query (defaults to the step goal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Passage limit (defaults to the configured maximum)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl StepDefinition {
    /// Default declaration for a catalog step that has none.
    pub fn fallback_for(step: &Step) -> Self {
        Self {
            id: step.id.clone(),
            goal: step.title.clone(),
            role: default_role(),
            tasks: vec![step.description.clone()],
            output_structure: Vec::new(),
            required_phrases: Vec::new(),
            constraints: Vec::new(),
            tone: None,
            format: None,
            document_search: None,
            method: None,
        }
    }

    /// Search query to use when the step triggers a document search.
    pub fn search_query(&self) -> Option<&str> {
        self.document_search
            .as_ref()
            .map(|search| search.query.as_deref().unwrap_or(self.goal.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    steps: Vec<StepDefinition>,
}

/// Validated collection of step definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    definitions: Vec<StepDefinition>,
}

impl DefinitionSet {
    /// Load definitions from a YAML file.
    ///
    /// A missing file is a configuration error, not a per-step one.
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        if !path.exists() {
            return Err(AnalysisError::ConfigurationMissing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let set = Self::from_yaml_str(&content)?;
        tracing::debug!(path = ?path, count = set.len(), "Loaded step definitions");
        Ok(set)
    }

    /// Parse definitions from a YAML string.
    pub fn from_yaml_str(content: &str) -> AnalysisResult<Self> {
        let file: DefinitionFile = serde_yaml::from_str(content)?;
        Self::validated(file.steps)
    }

    /// Validate and normalize a list of definitions.
    pub fn validated(mut definitions: Vec<StepDefinition>) -> AnalysisResult<Self> {
        let mut seen = HashSet::new();

        for (i, def) in definitions.iter_mut().enumerate() {
            if def.id.trim().is_empty() {
                return Err(AnalysisError::InvalidDefinition(format!(
                    "definition {} has no id",
                    i + 1
                )));
            }
            if !seen.insert(def.id.clone()) {
                return Err(AnalysisError::InvalidDefinition(format!(
                    "duplicate definition for '{}'",
                    def.id
                )));
            }
            def.output_structure.retain(|label| !label.trim().is_empty());
            if def.output_structure.len() > MAX_OUTPUT_SECTIONS {
                tracing::warn!(
                    step = def.id,
                    declared = def.output_structure.len(),
                    "Output structure truncated to {} sections",
                    MAX_OUTPUT_SECTIONS
                );
                def.output_structure.truncate(MAX_OUTPUT_SECTIONS);
            }
        }

        Ok(Self { definitions })
    }

    /// Get the definition for a step id.
    pub fn get(&self, id: &str) -> Option<&StepDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Definition for a step, falling back to one derived from the catalog entry.
    pub fn resolve(&self, step: &Step) -> StepDefinition {
        self.get(&step.id).cloned().unwrap_or_else(|| StepDefinition::fallback_for(step))
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
