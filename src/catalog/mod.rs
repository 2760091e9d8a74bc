//! Taxonomy and step catalog.
//!
//! The catalog is static: purposes, objectives, and the step entries for each
//! tier never change after process start. All lookups are pure.
//!
//! ## Tiers
//!
//! - **Required** - always present, never removable (orders 1..3)
//! - **Recommended** - suggested per objective
//! - **Optional** - a separate pool the user may add from

mod definition;
mod steps;
mod taxonomy;

pub use definition::{DefinitionSet, DocumentSearch, StepDefinition, MAX_OUTPUT_SECTIONS};
pub use taxonomy::{Objective, Purpose};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Tier of a step. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Required,
    Recommended,
    Optional,
}

impl Tier {
    /// Get the string representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Recommended => "recommended",
            Self::Optional => "optional",
        }
    }
}

/// One unit of analysis work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique key
    pub id: String,

    /// Display title
    pub title: String,

    /// Short description of the analysis
    pub description: String,

    /// Removability / default-inclusion class
    pub tier: Tier,

    /// Default position in the sequence
    pub order: u32,

    /// Free-form grouping label
    pub category: String,

    /// Ids this step builds on (informational)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl Step {
    /// Create a new step.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        tier: Tier,
        order: u32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            tier,
            order,
            category: category.into(),
            dependencies: Vec::new(),
        }
    }

    /// Declare the steps this one builds on.
    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies = ids.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Whether this step can never be removed from a workflow.
    pub fn is_required(&self) -> bool {
        self.tier == Tier::Required
    }
}

/// Immutable registry of every step, keyed by tier and objective.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    required: Vec<Step>,
    recommended: Vec<(Objective, Vec<Step>)>,
    optional: Vec<Step>,
}

static BUILTIN: Lazy<StepCatalog> = Lazy::new(steps::builtin_catalog);

impl StepCatalog {
    /// Assemble a catalog from its parts.
    pub fn new(
        required: Vec<Step>,
        recommended: Vec<(Objective, Vec<Step>)>,
        optional: Vec<Step>,
    ) -> Self {
        Self { required, recommended, optional }
    }

    /// The built-in catalog.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Objectives valid for a purpose.
    pub fn objectives_for(&self, purpose: Purpose) -> &'static [Objective] {
        purpose.objectives()
    }

    /// The always-present steps, in order.
    pub fn required_steps(&self) -> &[Step] {
        &self.required
    }

    /// Steps recommended for an objective (empty if none are registered).
    pub fn recommended_steps(&self, objective: Objective) -> &[Step] {
        self.recommended
            .iter()
            .find(|(o, _)| *o == objective)
            .map(|(_, steps)| steps.as_slice())
            .unwrap_or(&[])
    }

    /// The addable pool.
    pub fn optional_steps(&self) -> &[Step] {
        &self.optional
    }

    /// Look up an optional step by id.
    pub fn find_optional(&self, id: &str) -> Option<&Step> {
        self.optional.iter().find(|s| s.id == id)
    }

    /// Look up a step across all tiers, returning the first catalog occurrence.
    pub fn find(&self, id: &str) -> Option<&Step> {
        self.all_steps().find(|s| s.id == id)
    }

    /// Iterate every catalog entry in insertion order (duplicates included).
    pub fn all_steps(&self) -> impl Iterator<Item = &Step> {
        self.required
            .iter()
            .chain(self.recommended.iter().flat_map(|(_, steps)| steps.iter()))
            .chain(self.optional.iter())
    }
}
