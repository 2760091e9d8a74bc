//! Project purposes and analysis objectives.
//!
//! Both are closed enumerations. External strings are parsed into them at a
//! single boundary (`FromStr`); everything past that point matches on variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Building-use category driving which objectives are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Office,
    Residential,
    Commercial,
    Cultural,
    Educational,
    Healthcare,
    MixedUse,
}

impl Purpose {
    /// All purposes in display order.
    pub fn all() -> &'static [Self] {
        &[
            Self::Office,
            Self::Residential,
            Self::Commercial,
            Self::Cultural,
            Self::Educational,
            Self::Healthcare,
            Self::MixedUse,
        ]
    }

    /// Human-readable label, also the value used in exported records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Office => "Office",
            Self::Residential => "Residential",
            Self::Commercial => "Commercial",
            Self::Cultural => "Cultural",
            Self::Educational => "Educational",
            Self::Healthcare => "Healthcare",
            Self::MixedUse => "Mixed Use",
        }
    }

    /// Snake-case key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Residential => "residential",
            Self::Commercial => "commercial",
            Self::Cultural => "cultural",
            Self::Educational => "educational",
            Self::Healthcare => "healthcare",
            Self::MixedUse => "mixed_use",
        }
    }

    /// Objectives valid for this purpose, in display order. Never empty.
    pub fn objectives(&self) -> &'static [Objective] {
        use Objective::*;
        match self {
            Self::Office => &[
                MarketAnalysis,
                DesignGuideline,
                FeasibilityStudy,
                SpaceProgramming,
                MassStudy,
                SustainabilityStrategy,
            ],
            Self::Residential => &[MarketAnalysis, DesignGuideline, MassStudy, FeasibilityStudy],
            Self::Commercial => {
                &[MarketAnalysis, FeasibilityStudy, OperationPlanning, DesignGuideline]
            }
            Self::Cultural => &[DesignGuideline, SpaceProgramming, OperationPlanning],
            Self::Educational => &[SpaceProgramming, DesignGuideline, SustainabilityStrategy],
            Self::Healthcare => &[SpaceProgramming, OperationPlanning, FeasibilityStudy],
            Self::MixedUse => Objective::all(),
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Purpose {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| matches_name(s, p.label(), p.key()))
            .ok_or_else(|| AnalysisError::unknown("purpose", s))
    }
}

/// Analytical goal selectable under a purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MarketAnalysis,
    DesignGuideline,
    FeasibilityStudy,
    SpaceProgramming,
    MassStudy,
    SustainabilityStrategy,
    OperationPlanning,
}

impl Objective {
    /// All objectives in display order.
    pub fn all() -> &'static [Self] {
        &[
            Self::MarketAnalysis,
            Self::DesignGuideline,
            Self::FeasibilityStudy,
            Self::SpaceProgramming,
            Self::MassStudy,
            Self::SustainabilityStrategy,
            Self::OperationPlanning,
        ]
    }

    /// Human-readable label, also the value used in exported records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MarketAnalysis => "Market Analysis",
            Self::DesignGuideline => "Design Guideline",
            Self::FeasibilityStudy => "Feasibility Study",
            Self::SpaceProgramming => "Space Programming",
            Self::MassStudy => "Mass Study",
            Self::SustainabilityStrategy => "Sustainability Strategy",
            Self::OperationPlanning => "Operation Planning",
        }
    }

    /// Snake-case key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::MarketAnalysis => "market_analysis",
            Self::DesignGuideline => "design_guideline",
            Self::FeasibilityStudy => "feasibility_study",
            Self::SpaceProgramming => "space_programming",
            Self::MassStudy => "mass_study",
            Self::SustainabilityStrategy => "sustainability_strategy",
            Self::OperationPlanning => "operation_planning",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Objective {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|o| matches_name(s, o.label(), o.key()))
            .ok_or_else(|| AnalysisError::unknown("objective", s))
    }
}

/// Case-insensitive match against either the label or the key.
fn matches_name(input: &str, label: &str, key: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case(label) || input.eq_ignore_ascii_case(key)
}
