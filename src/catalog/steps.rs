//! Built-in step entries.

use super::{Objective, Step, StepCatalog, Tier};

pub(super) fn builtin_catalog() -> StepCatalog {
    let required = vec![
        Step::new(
            "project_overview",
            "Project Overview",
            "Frame the owner's intent, program scope and success criteria",
            Tier::Required,
            1,
            "Foundation",
        ),
        Step::new(
            "site_analysis",
            "Site Analysis",
            "Location, access, surroundings, climate and site constraints",
            Tier::Required,
            2,
            "Foundation",
        )
        .depends_on(&["project_overview"]),
        Step::new(
            "regulation_review",
            "Regulation Review",
            "Zoning, building code, coverage and floor-area limits",
            Tier::Required,
            3,
            "Foundation",
        )
        .depends_on(&["site_analysis"]),
    ];

    let recommended = vec![
        (
            Objective::MarketAnalysis,
            vec![recommended(
                "market_research",
                "Market Research",
                "Demand, comparable supply, rent levels and target tenants",
                4,
                "Market",
                &["project_overview"],
            )],
        ),
        (
            Objective::DesignGuideline,
            vec![
                recommended(
                    "design_concept",
                    "Design Concept",
                    "Overall concept, identity and spatial narrative",
                    4,
                    "Design",
                    &["site_analysis"],
                ),
                recommended(
                    "design_guideline",
                    "Design Guideline",
                    "Facade, massing, material and public-realm guidelines",
                    5,
                    "Design",
                    &["design_concept", "regulation_review"],
                ),
            ],
        ),
        (
            Objective::FeasibilityStudy,
            vec![
                recommended(
                    "feasibility_study",
                    "Feasibility Study",
                    "Development scenarios compared on yield and risk",
                    5,
                    "Finance",
                    &["regulation_review"],
                ),
                recommended(
                    "cost_estimate",
                    "Cost Estimate",
                    "Order-of-magnitude construction and soft costs",
                    6,
                    "Finance",
                    &["feasibility_study"],
                ),
            ],
        ),
        (
            Objective::SpaceProgramming,
            vec![
                recommended(
                    "space_program",
                    "Space Program",
                    "Functional areas, adjacencies and occupancy",
                    4,
                    "Program",
                    &["project_overview"],
                ),
                recommended(
                    "area_allocation",
                    "Area Allocation",
                    "Floor-by-floor area distribution against allowable area",
                    5,
                    "Program",
                    &["space_program", "regulation_review"],
                ),
            ],
        ),
        (
            Objective::MassStudy,
            vec![
                recommended(
                    "design_concept",
                    "Design Concept",
                    "Overall concept, identity and spatial narrative",
                    5,
                    "Design",
                    &["site_analysis"],
                ),
                recommended(
                    "massing_study",
                    "Massing Study",
                    "Volumetric alternatives tested against envelope and views",
                    6,
                    "Design",
                    &["regulation_review"],
                ),
            ],
        ),
        (
            Objective::SustainabilityStrategy,
            vec![recommended(
                "sustainability_strategy",
                "Sustainability Strategy",
                "Passive design, energy, water and certification targets",
                6,
                "Environment",
                &["site_analysis"],
            )],
        ),
        (
            Objective::OperationPlanning,
            vec![recommended(
                "operation_plan",
                "Operation Plan",
                "Management model, programming and lifecycle operation",
                7,
                "Operation",
                &["project_overview"],
            )],
        ),
    ];

    let optional = vec![
        optional(
            "precedent_study",
            "Precedent Study",
            "Comparable built projects and lessons learned",
            8,
            "Research",
        ),
        optional(
            "stakeholder_map",
            "Stakeholder Mapping",
            "Actors, interests and approval path",
            8,
            "Research",
        ),
        optional(
            "risk_assessment",
            "Risk Assessment",
            "Schedule, cost, permitting and market risks",
            9,
            "Finance",
        ),
        optional(
            "landscape_strategy",
            "Landscape Strategy",
            "Open space, planting and ground-plane design",
            9,
            "Environment",
        ),
        optional(
            "phasing_plan",
            "Phasing Plan",
            "Construction and occupancy phasing",
            10,
            "Operation",
        ),
    ];

    StepCatalog::new(required, recommended, optional)
}

fn recommended(
    id: &str,
    title: &str,
    description: &str,
    order: u32,
    category: &str,
    dependencies: &[&str],
) -> Step {
    Step::new(id, title, description, Tier::Recommended, order, category).depends_on(dependencies)
}

fn optional(id: &str, title: &str, description: &str, order: u32, category: &str) -> Step {
    Step::new(id, title, description, Tier::Optional, order, category)
}
