//! Workflow composition.
//!
//! A workflow is the ordered, user-editable set of steps chosen for one
//! analysis session. It keeps two partitions:
//!
//! - `active` - steps suggested for the selection (required steps always live here)
//! - `custom` - steps the user added or moved around
//!
//! The composer is the sole authority for sequencing; [`WorkflowComposer::final_order`]
//! is what the execution pipeline consumes.

mod record;

pub use record::{StepDescriptor, WorkflowRecord};

use std::collections::HashSet;

use crate::catalog::{Objective, Purpose, Step, StepCatalog};
use crate::error::{AnalysisError, AnalysisResult};

/// Ordered set of steps for one analysis session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    /// Building-use category
    pub purpose: Purpose,

    /// First objective of the selection
    pub objective: Objective,

    /// Suggested steps, required ones included
    pub active: Vec<Step>,

    /// User-added or reordered steps
    pub custom: Vec<Step>,
}

impl Workflow {
    /// Whether any partition already holds a step id.
    pub fn contains(&self, id: &str) -> bool {
        self.active.iter().chain(self.custom.iter()).any(|s| s.id == id)
    }

    /// Ids across both partitions, active first.
    pub fn ids(&self) -> Vec<&str> {
        self.active.iter().chain(self.custom.iter()).map(|s| s.id.as_str()).collect()
    }

    /// Total number of steps.
    pub fn len(&self) -> usize {
        self.active.len() + self.custom.len()
    }

    /// Whether the workflow has no steps.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.custom.is_empty()
    }
}

/// Builds and edits workflows against a step catalog.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowComposer<'a> {
    catalog: &'a StepCatalog,
}

impl<'a> WorkflowComposer<'a> {
    /// Create a composer over a catalog.
    pub fn new(catalog: &'a StepCatalog) -> Self {
        Self { catalog }
    }

    /// Composer over the built-in catalog.
    pub fn builtin() -> WorkflowComposer<'static> {
        WorkflowComposer { catalog: StepCatalog::builtin() }
    }

    /// The catalog this composer reads from.
    pub fn catalog(&self) -> &'a StepCatalog {
        self.catalog
    }

    /// Suggest a workflow for a purpose and an ordered objective selection.
    ///
    /// Required steps come first, then each objective's recommended steps in
    /// selection order. The first occurrence of an id wins; the result is
    /// stably sorted by `order`.
    pub fn suggest(&self, purpose: Purpose, objectives: &[Objective]) -> AnalysisResult<Workflow> {
        let primary = *objectives.first().ok_or(AnalysisError::NoObjectives)?;

        let offered = self.catalog.objectives_for(purpose);
        for objective in objectives {
            if !offered.contains(objective) {
                tracing::debug!(%purpose, %objective, "Objective not offered for purpose");
            }
        }

        let candidates = self.catalog.required_steps().iter().chain(
            objectives.iter().flat_map(|objective| self.catalog.recommended_steps(*objective)),
        );

        let mut seen = HashSet::new();
        let mut active: Vec<Step> =
            candidates.filter(|step| seen.insert(step.id.clone())).cloned().collect();
        active.sort_by_key(|step| step.order);

        tracing::debug!(%purpose, steps = active.len(), "Suggested workflow");

        Ok(Workflow { purpose, objective: primary, active, custom: Vec::new() })
    }

    /// Append an optional step to the custom list. Unknown ids are ignored.
    pub fn add_optional(&self, mut workflow: Workflow, step_id: &str) -> Workflow {
        match self.catalog.find_optional(step_id) {
            Some(step) if !workflow.contains(step_id) => workflow.custom.push(step.clone()),
            Some(_) => tracing::debug!(step = step_id, "Optional step already present"),
            None => tracing::debug!(step = step_id, "Unknown optional step ignored"),
        }
        workflow
    }

    /// Remove a step. Required steps are never removed.
    pub fn remove(&self, mut workflow: Workflow, step_id: &str) -> Workflow {
        workflow.active.retain(|step| step.is_required() || step.id != step_id);
        workflow.custom.retain(|step| step.id != step_id);
        workflow
    }

    /// Reorder both partitions per `new_order`.
    ///
    /// Ids not present in the workflow are skipped. Steps the caller did not
    /// mention keep their relative order after the mentioned ones. The result
    /// is split back into required steps (`active`) and everything else
    /// (`custom`).
    pub fn reorder(&self, workflow: Workflow, new_order: &[&str]) -> Workflow {
        let Workflow { purpose, objective, active, custom } = workflow;
        let mut pool: Vec<Option<Step>> = active.into_iter().chain(custom).map(Some).collect();

        let mut ordered = Vec::with_capacity(pool.len());
        for id in new_order {
            if let Some(slot) = pool.iter_mut().find(|s| s.as_ref().is_some_and(|s| s.id == *id)) {
                ordered.extend(slot.take());
            }
        }
        ordered.extend(pool.into_iter().flatten());

        let (active, custom) = ordered.into_iter().partition(Step::is_required);
        Workflow { purpose, objective, active, custom }
    }

    /// Execution order: both partitions, stably sorted by `order`.
    pub fn final_order(&self, workflow: &Workflow) -> Vec<Step> {
        let mut steps: Vec<Step> =
            workflow.active.iter().chain(workflow.custom.iter()).cloned().collect();
        steps.sort_by_key(|step| step.order);
        steps
    }

    /// Serializable form of a workflow.
    pub fn export(&self, workflow: &Workflow) -> WorkflowRecord {
        WorkflowRecord::from_workflow(workflow)
    }

    /// Rebuild a workflow from its serialized form.
    pub fn import(&self, record: &WorkflowRecord) -> AnalysisResult<Workflow> {
        record.to_workflow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Tier;

    fn ids(steps: &[Step]) -> Vec<&str> {
        steps.iter().map(|s| s.id.as_str()).collect()
    }

    fn office_workflow() -> Workflow {
        WorkflowComposer::builtin()
            .suggest(Purpose::Office, &[Objective::MarketAnalysis, Objective::DesignGuideline])
            .unwrap()
    }

    #[test]
    fn test_suggest_office_market_and_design() {
        let workflow = office_workflow();
        assert_eq!(workflow.objective, Objective::MarketAnalysis);
        assert_eq!(
            ids(&workflow.active),
            vec![
                "project_overview",
                "site_analysis",
                "regulation_review",
                "market_research",
                "design_concept",
                "design_guideline",
            ]
        );
        let orders: Vec<u32> = workflow.active.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 4, 5]);
        assert!(workflow.custom.is_empty());
    }

    #[test]
    fn test_suggest_requires_objective() {
        let result = WorkflowComposer::builtin().suggest(Purpose::Office, &[]);
        assert!(matches!(result, Err(AnalysisError::NoObjectives)));
    }

    #[test]
    fn test_suggest_dedupes_shared_step_first_seen_wins() {
        let composer = WorkflowComposer::builtin();

        let design_first = composer
            .suggest(Purpose::Office, &[Objective::DesignGuideline, Objective::MassStudy])
            .unwrap();
        let concept: Vec<&Step> =
            design_first.active.iter().filter(|s| s.id == "design_concept").collect();
        assert_eq!(concept.len(), 1);
        assert_eq!(concept[0].order, 4);

        let mass_first = composer
            .suggest(Purpose::Office, &[Objective::MassStudy, Objective::DesignGuideline])
            .unwrap();
        let concept = mass_first.active.iter().find(|s| s.id == "design_concept").unwrap();
        assert_eq!(concept.order, 5);
    }

    #[test]
    fn test_suggest_contains_required_for_every_purpose() {
        let composer = WorkflowComposer::builtin();
        for purpose in Purpose::all() {
            let workflow = composer.suggest(*purpose, purpose.objectives()).unwrap();
            for required in composer.catalog().required_steps() {
                assert!(workflow.contains(&required.id), "{purpose} missing {}", required.id);
            }
            let mut seen = HashSet::new();
            assert!(workflow.ids().into_iter().all(|id| seen.insert(id)));
        }
    }

    #[test]
    fn test_add_optional() {
        let composer = WorkflowComposer::builtin();
        let workflow = composer.add_optional(office_workflow(), "risk_assessment");
        assert_eq!(ids(&workflow.custom), vec!["risk_assessment"]);

        let again = composer.add_optional(workflow.clone(), "risk_assessment");
        assert_eq!(again, workflow);

        let unknown = composer.add_optional(workflow.clone(), "not_a_step");
        assert_eq!(unknown, workflow);

        let not_optional = composer.add_optional(workflow.clone(), "market_research");
        assert_eq!(not_optional, workflow);
    }

    #[test]
    fn test_remove_required_is_noop() {
        let composer = WorkflowComposer::builtin();
        let before = office_workflow();
        for required in composer.catalog().required_steps() {
            let after = composer.remove(before.clone(), &required.id);
            assert_eq!(after, before);
        }
    }

    #[test]
    fn test_remove_recommended_and_custom() {
        let composer = WorkflowComposer::builtin();
        let workflow = composer.add_optional(office_workflow(), "phasing_plan");

        let workflow = composer.remove(workflow, "market_research");
        assert!(!workflow.contains("market_research"));

        let workflow = composer.remove(workflow, "phasing_plan");
        assert!(workflow.custom.is_empty());

        let unchanged = composer.remove(workflow.clone(), "unknown");
        assert_eq!(unchanged, workflow);
    }

    #[test]
    fn test_reorder_partitions_by_tier() {
        let composer = WorkflowComposer::builtin();
        let workflow = composer.add_optional(office_workflow(), "precedent_study");

        let reordered = composer.reorder(
            workflow,
            &["precedent_study", "regulation_review", "design_guideline", "project_overview"],
        );

        assert_eq!(
            ids(&reordered.active),
            vec!["regulation_review", "project_overview", "site_analysis"]
        );
        assert_eq!(
            ids(&reordered.custom),
            vec!["precedent_study", "design_guideline", "market_research", "design_concept"]
        );
        assert!(reordered.active.iter().all(|s| s.tier == Tier::Required));
    }

    #[test]
    fn test_reorder_preserves_id_set() {
        let composer = WorkflowComposer::builtin();
        let workflow = composer.add_optional(office_workflow(), "risk_assessment");

        let mut before: Vec<String> =
            composer.final_order(&workflow).into_iter().map(|s| s.id).collect();
        let reordered =
            composer.reorder(workflow, &["ghost", "risk_assessment", "risk_assessment", "site_analysis"]);
        let mut after: Vec<String> =
            composer.final_order(&reordered).into_iter().map(|s| s.id).collect();

        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_final_order_sorted_by_order() {
        let composer = WorkflowComposer::builtin();
        let workflow = composer.add_optional(office_workflow(), "stakeholder_map");
        let workflow = composer.reorder(workflow, &["stakeholder_map", "market_research"]);

        let order = composer.final_order(&workflow);
        assert!(order.windows(2).all(|w| w[0].order <= w[1].order));
        assert_eq!(order.first().map(|s| s.id.as_str()), Some("project_overview"));
        assert_eq!(order.last().map(|s| s.id.as_str()), Some("stakeholder_map"));
    }
}
