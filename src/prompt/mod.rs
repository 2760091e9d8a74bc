//! Prompt compilation.
//!
//! One step definition plus the session inputs become a single base prompt.
//! Sub-stage prompts are derived from the base by appending a hard constraint
//! that restricts the answer to one labeled output section.

mod documents;
mod fields;

pub use documents::{DocumentSource, TextDocument};
pub use fields::{ProjectFields, NOT_AVAILABLE};

use crate::catalog::{StepDefinition, MAX_OUTPUT_SECTIONS};

/// Section labels used when a step declares no output structure.
pub const DEFAULT_SECTIONS: [&str; MAX_OUTPUT_SECTIONS] = [
    "Requirement Table",
    "Reasoning Narrative",
    "Precedent Comparison",
    "Strategic Recommendation",
];

/// Session inputs shared by every step's prompt.
#[derive(Clone, Copy)]
pub struct PromptInputs<'a> {
    /// User-supplied project fields
    pub fields: &'a ProjectFields,

    /// Digest of all previously completed steps
    pub prior_context: &'a str,

    /// Uploaded document, if any
    pub documents: Option<&'a dyn DocumentSource>,
}

/// One constrained generation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubStagePrompt {
    /// Position within the step
    pub index: usize,

    /// Output section this stage must produce
    pub label: String,

    /// Full prompt text
    pub prompt: String,
}

/// Assembles prompt text.
#[derive(Debug, Clone)]
pub struct PromptCompiler {
    max_passages: usize,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self { max_passages: 3 }
    }
}

impl PromptCompiler {
    /// Create a compiler retrieving at most `max_passages` passages per step.
    pub fn new(max_passages: usize) -> Self {
        Self { max_passages }
    }

    /// Build the base analysis prompt for a step.
    pub fn compile_base(&self, def: &StepDefinition, inputs: &PromptInputs<'_>) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!("You are {}.\n", def.role));
        if !def.goal.is_empty() {
            prompt.push_str(&format!("Goal: {}\n", def.goal));
        }

        prompt.push_str("\n## Project Information\n");
        for (label, value) in inputs.fields.entries() {
            prompt.push_str(&format!("- {label}: {value}\n"));
        }

        let summary = inputs.documents.map(|d| d.summary().trim()).unwrap_or("");
        prompt.push_str("\n## Document Summary\n");
        prompt.push_str(if summary.is_empty() { NOT_AVAILABLE } else { summary });
        prompt.push('\n');

        prompt.push_str("\n## Prior Analysis\n");
        if inputs.prior_context.trim().is_empty() {
            prompt.push_str("No earlier steps have been completed.\n");
        } else {
            prompt.push_str(inputs.prior_context.trim_end());
            prompt.push('\n');
        }

        if !def.tasks.is_empty() {
            prompt.push_str("\n## Tasks\n");
            for (i, task) in def.tasks.iter().enumerate() {
                prompt.push_str(&format!("{}. {task}\n", i + 1));
            }
        }

        prompt.push_str("\n## Output Structure\n");
        for (i, label) in section_labels(def).iter().enumerate() {
            prompt.push_str(&format!("{}. {label}\n", i + 1));
        }

        if !def.constraints.is_empty() || !def.required_phrases.is_empty() {
            prompt.push_str("\n## Constraints\n");
            for constraint in &def.constraints {
                prompt.push_str(&format!("- {constraint}\n"));
            }
            if !def.required_phrases.is_empty() {
                let phrases: Vec<String> =
                    def.required_phrases.iter().map(|p| format!("\"{p}\"")).collect();
                prompt.push_str(&format!("- Use these phrases verbatim: {}\n", phrases.join(", ")));
            }
        }

        if def.tone.is_some() || def.format.is_some() {
            prompt.push_str("\n## Tone and Format\n");
            if let Some(tone) = &def.tone {
                prompt.push_str(&format!("- Tone: {tone}\n"));
            }
            if let Some(format) = &def.format {
                prompt.push_str(&format!("- Format: {format}\n"));
            }
        }

        if let Some(section) = self.passages_section(def, inputs) {
            prompt.push_str(&section);
        }

        prompt
    }

    /// Retrieved passages as a labeled section, or `None` when the step
    /// declares no search, nothing matched, or retrieval failed.
    fn passages_section(&self, def: &StepDefinition, inputs: &PromptInputs<'_>) -> Option<String> {
        let query = def.search_query()?;
        let documents = inputs.documents?;
        let limit = def
            .document_search
            .as_ref()
            .and_then(|s| s.limit)
            .map_or(self.max_passages, |l| l.min(self.max_passages));

        let passages = match documents.search(query, limit) {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!(step = def.id, error = %e, "Document search failed, section omitted");
                return None;
            }
        };
        if passages.is_empty() {
            return None;
        }

        let mut section = String::from("\n## Reference Passages\n");
        for (i, passage) in passages.iter().take(limit).enumerate() {
            section.push_str(&format!("[{}] {}\n", i + 1, passage.trim()));
        }
        Some(section)
    }

    /// Derive the `index`-th sub-stage prompt from a base prompt.
    ///
    /// Returns `None` past the last possible stage.
    pub fn compile_sub_stage(
        base: &str,
        def: &StepDefinition,
        index: usize,
    ) -> Option<SubStagePrompt> {
        let label = def
            .output_structure
            .get(index)
            .cloned()
            .or_else(|| DEFAULT_SECTIONS.get(index).map(|s| (*s).to_string()))?;

        let total = stage_count(def);
        let prompt = format!(
            "{base}\n## Stage {} of {total}: {label}\n\
             HARD CONSTRAINT: Write ONLY the section titled \"{label}\". \
             Do not produce any other section, preamble, or closing remarks.\n",
            index + 1,
        );

        Some(SubStagePrompt { index, label, prompt })
    }

    /// Every sub-stage prompt for a step, in declaration order.
    pub fn compile_sub_stages(base: &str, def: &StepDefinition) -> Vec<SubStagePrompt> {
        (0..stage_count(def)).filter_map(|i| Self::compile_sub_stage(base, def, i)).collect()
    }
}

/// Number of sub-stages a step runs.
pub fn stage_count(def: &StepDefinition) -> usize {
    if def.output_structure.is_empty() {
        DEFAULT_SECTIONS.len()
    } else {
        def.output_structure.len().min(MAX_OUTPUT_SECTIONS)
    }
}

/// Output section labels a step produces.
pub fn section_labels(def: &StepDefinition) -> Vec<String> {
    if def.output_structure.is_empty() {
        DEFAULT_SECTIONS.iter().map(|s| (*s).to_string()).collect()
    } else {
        def.output_structure.iter().take(MAX_OUTPUT_SECTIONS).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DefinitionSet, DocumentSearch, StepCatalog};

    struct FailingDocs;

    impl DocumentSource for FailingDocs {
        fn summary(&self) -> &str {
            "Brief from the owner."
        }

        fn search(&self, _query: &str, _limit: usize) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("index offline")
        }
    }

    fn definition() -> StepDefinition {
        let yaml = r#"
steps:
  - id: site_analysis
    role: an urban analyst
    goal: Understand the site
    tasks: [Describe access, Describe climate]
    output_structure: [Site Table, Site Narrative]
    required_phrases: [site potential]
    constraints: [Cite sources]
    tone: Professional
    format: Markdown
    document_search:
      query: river zoning
"#;
        DefinitionSet::from_yaml_str(yaml).unwrap().get("site_analysis").cloned().unwrap()
    }

    #[test]
    fn test_base_sections_in_fixed_order() {
        let fields = ProjectFields { owner: Some("ACME".into()), ..Default::default() };
        let docs = TextDocument::new("Intro.\n\nThe river frontage has zoning limits.");
        let inputs =
            PromptInputs { fields: &fields, prior_context: "", documents: Some(&docs) };

        let prompt = PromptCompiler::default().compile_base(&definition(), &inputs);

        let order = [
            "You are an urban analyst.",
            "## Project Information",
            "## Document Summary",
            "## Prior Analysis",
            "## Tasks",
            "## Output Structure",
            "## Constraints",
            "## Tone and Format",
            "## Reference Passages",
        ];
        let positions: Vec<usize> = order.iter().map(|s| prompt.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(prompt.contains("- Owner: ACME\n"));
        assert!(prompt.contains("## Tone and Format\n- Tone: Professional\n- Format: Markdown\n"));
        assert!(prompt.contains(&format!("- Site location: {NOT_AVAILABLE}")));
        assert!(prompt.contains("\"site potential\""));
        assert!(prompt.contains("The river frontage has zoning limits."));
    }

    #[test]
    fn test_retrieval_failure_omits_section() {
        let fields = ProjectFields::default();
        let inputs = PromptInputs { fields: &fields, prior_context: "", documents: Some(&FailingDocs) };

        let prompt = PromptCompiler::default().compile_base(&definition(), &inputs);
        assert!(!prompt.contains("## Reference Passages"));
        assert!(prompt.contains("Brief from the owner."));
    }

    #[test]
    fn test_passage_limit_capped() {
        let mut def = definition();
        def.document_search = Some(DocumentSearch { query: Some("zoning".into()), limit: Some(10) });
        let text = (0..6).map(|i| format!("zoning rule {i}")).collect::<Vec<_>>().join("\n\n");
        let docs = TextDocument::new(&text);
        let fields = ProjectFields::default();
        let inputs = PromptInputs { fields: &fields, prior_context: "", documents: Some(&docs) };

        let prompt = PromptCompiler::new(2).compile_base(&def, &inputs);
        assert!(prompt.contains("[2] zoning rule 1"));
        assert!(!prompt.contains("[3]"));
    }

    #[test]
    fn test_prior_context_included() {
        let fields = ProjectFields::default();
        let inputs = PromptInputs {
            fields: &fields,
            prior_context: "## [1] Project Overview\nSummary: offices",
            documents: None,
        };
        let prompt = PromptCompiler::default().compile_base(&definition(), &inputs);
        assert!(prompt.contains("Summary: offices"));
        assert!(!prompt.contains("No earlier steps"));
    }

    #[test]
    fn test_two_declared_sections_give_two_stages() {
        let def = definition();
        let stages = PromptCompiler::compile_sub_stages("BASE", &def);
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].label, "Site Table");
        assert_eq!(stages[1].label, "Site Narrative");
        assert!(stages[0].prompt.starts_with("BASE"));
        assert!(stages[1].prompt.contains("Write ONLY the section titled \"Site Narrative\""));
    }

    #[test]
    fn test_no_declaration_gives_four_default_stages() {
        let step = StepCatalog::builtin().find("market_research").unwrap();
        let def = StepDefinition::fallback_for(step);
        let stages = PromptCompiler::compile_sub_stages("BASE", &def);
        let labels: Vec<&str> = stages.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, DEFAULT_SECTIONS.to_vec());
    }

    #[test]
    fn test_sub_stage_index_falls_back_to_default_label() {
        let def = definition();
        let stage = PromptCompiler::compile_sub_stage("BASE", &def, 3).unwrap();
        assert_eq!(stage.label, "Strategic Recommendation");
        assert!(PromptCompiler::compile_sub_stage("BASE", &def, 4).is_none());
    }
}
