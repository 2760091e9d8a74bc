//! Serialized workflow form.
//!
//! This is the only format `import` accepts. Purpose and objective travel as
//! their display labels and are parsed back through the closed enumerations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Workflow;
use crate::catalog::{Objective, Purpose, Step, Tier};
use crate::error::{AnalysisError, AnalysisResult};

/// Exported workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// Purpose label
    pub purpose: String,

    /// Primary objective label
    pub objective: String,

    /// Steps, active partition first
    pub steps: Vec<StepDescriptor>,
}

/// One exported step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    pub required: bool,
    pub recommended: bool,
    pub optional: bool,
    pub order: u32,
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Whether the step lives in the custom partition
    #[serde(default)]
    pub custom: bool,
}

impl StepDescriptor {
    fn from_step(step: &Step, custom: bool) -> Self {
        Self {
            id: step.id.clone(),
            title: step.title.clone(),
            description: step.description.clone(),
            required: step.tier == Tier::Required,
            recommended: step.tier == Tier::Recommended,
            optional: step.tier == Tier::Optional,
            order: step.order,
            category: step.category.clone(),
            dependencies: step.dependencies.clone(),
            custom,
        }
    }

    fn tier(&self) -> AnalysisResult<Tier> {
        match (self.required, self.recommended, self.optional) {
            (true, false, false) => Ok(Tier::Required),
            (false, true, false) => Ok(Tier::Recommended),
            (false, false, true) => Ok(Tier::Optional),
            _ => Err(AnalysisError::InvalidRecord(format!(
                "step '{}' must carry exactly one tier flag",
                self.id
            ))),
        }
    }

    fn to_step(&self) -> AnalysisResult<Step> {
        Ok(Step {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            tier: self.tier()?,
            order: self.order,
            category: self.category.clone(),
            dependencies: self.dependencies.clone(),
        })
    }
}

impl WorkflowRecord {
    /// Capture a workflow.
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let steps = workflow
            .active
            .iter()
            .map(|s| StepDescriptor::from_step(s, false))
            .chain(workflow.custom.iter().map(|s| StepDescriptor::from_step(s, true)))
            .collect();

        Self {
            purpose: workflow.purpose.label().to_string(),
            objective: workflow.objective.label().to_string(),
            steps,
        }
    }

    /// Rebuild the workflow this record describes.
    pub fn to_workflow(&self) -> AnalysisResult<Workflow> {
        let purpose: Purpose = self.purpose.parse()?;
        let objective: Objective = self.objective.parse()?;

        let mut seen = HashSet::new();
        let mut active = Vec::new();
        let mut custom = Vec::new();

        for descriptor in &self.steps {
            if !seen.insert(descriptor.id.as_str()) {
                tracing::warn!(step = descriptor.id, "Duplicate step in record ignored");
                continue;
            }
            let step = descriptor.to_step()?;
            if descriptor.custom {
                custom.push(step);
            } else {
                active.push(step);
            }
        }

        Ok(Workflow { purpose, objective, active, custom })
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> AnalysisResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(content: &str) -> AnalysisResult<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
