//! Workflow Composition Integration Tests
//!
//! Exercises the composer against the built-in catalog for every purpose.

use archflow::catalog::{Objective, Purpose, StepCatalog};
use archflow::workflow::{WorkflowComposer, WorkflowRecord};
use archflow::AnalysisError;

fn ids(steps: &[archflow::Step]) -> Vec<&str> {
    steps.iter().map(|s| s.id.as_str()).collect()
}

#[test]
fn test_required_steps_present_for_every_selection() {
    let composer = WorkflowComposer::builtin();
    let required = ids(StepCatalog::builtin().required_steps());

    for purpose in Purpose::all() {
        for objective in purpose.objectives() {
            let workflow = composer.suggest(*purpose, &[*objective]).unwrap();
            let order = composer.final_order(&workflow);
            assert_eq!(&ids(&order)[..3], required.as_slice(), "{purpose} / {objective}");

            let mut edited = workflow;
            for id in &required {
                edited = composer.remove(edited, id);
            }
            for id in &required {
                assert!(edited.contains(id), "{id} removed for {purpose} / {objective}");
            }
        }
    }
}

#[test]
fn test_suggest_never_duplicates() {
    let composer = WorkflowComposer::builtin();
    let workflow = composer.suggest(Purpose::MixedUse, Objective::all()).unwrap();

    let mut seen = std::collections::HashSet::new();
    for step in composer.final_order(&workflow) {
        assert!(seen.insert(step.id.clone()), "duplicate {}", step.id);
    }
}

#[test]
fn test_shared_step_keeps_first_objective_instance() {
    let composer = WorkflowComposer::builtin();

    let guideline_first = composer
        .suggest(Purpose::Office, &[Objective::DesignGuideline, Objective::MassStudy])
        .unwrap();
    let mass_first = composer
        .suggest(Purpose::Office, &[Objective::MassStudy, Objective::DesignGuideline])
        .unwrap();

    let order_of = |w: &archflow::Workflow| {
        w.active.iter().find(|s| s.id == "design_concept").map(|s| s.order).unwrap()
    };
    assert_eq!(order_of(&guideline_first), 4);
    assert_eq!(order_of(&mass_first), 5);
}

#[test]
fn test_office_scenario() {
    let composer = WorkflowComposer::builtin();
    let workflow = composer
        .suggest(Purpose::Office, &["Market Analysis".parse().unwrap(), "Design Guideline".parse().unwrap()])
        .unwrap();
    let order = composer.final_order(&workflow);

    assert_eq!(
        ids(&order),
        vec![
            "project_overview",
            "site_analysis",
            "regulation_review",
            "market_research",
            "design_concept",
            "design_guideline",
        ]
    );
    assert!(order.windows(2).all(|w| w[0].order <= w[1].order));
}

#[test]
fn test_reorder_preserves_ids_and_partitions_required() {
    let composer = WorkflowComposer::builtin();
    let workflow = composer.suggest(Purpose::Residential, &[Objective::MassStudy]).unwrap();
    let workflow = composer.add_optional(workflow, "precedent_study");

    let mut before = workflow.ids().iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
    before.sort();

    let reordered = composer.reorder(
        workflow,
        &["massing_study", "regulation_review", "unknown_step", "precedent_study"],
    );

    let mut after = reordered.ids().iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
    after.sort();
    assert_eq!(before, after);

    assert!(reordered.active.iter().all(|s| s.is_required()));
    assert_eq!(reordered.active.len(), 3);
    assert_eq!(reordered.active[0].id, "regulation_review");
    assert_eq!(reordered.custom[0].id, "massing_study");
    assert_eq!(reordered.custom[1].id, "precedent_study");
}

#[test]
fn test_record_file_round_trip() {
    let composer = WorkflowComposer::builtin();
    let workflow = composer
        .suggest(Purpose::Commercial, &[Objective::FeasibilityStudy, Objective::OperationPlanning])
        .unwrap();
    let workflow = composer.add_optional(workflow, "risk_assessment");
    let workflow = composer.remove(workflow, "cost_estimate");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflow.json");
    std::fs::write(&path, composer.export(&workflow).to_json().unwrap()).unwrap();

    let record = WorkflowRecord::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(composer.import(&record).unwrap(), workflow);
}

#[test]
fn test_import_rejects_unknown_purpose() {
    let composer = WorkflowComposer::builtin();
    let workflow = composer.suggest(Purpose::Office, &[Objective::MarketAnalysis]).unwrap();
    let mut record = composer.export(&workflow);
    record.purpose = "Spaceport".to_string();

    let err = composer.import(&record).unwrap_err();
    assert!(matches!(err, AnalysisError::UnknownCategory { kind: "purpose", .. }));
}
