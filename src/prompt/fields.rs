//! User-supplied project fields.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Placeholder rendered for any field the user did not supply.
pub const NOT_AVAILABLE: &str = "Not available";

/// Flat project description echoed into every prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFields {
    pub project_name: Option<String>,
    pub owner: Option<String>,
    pub site_location: Option<String>,
    pub site_area: Option<String>,
    pub building_type: Option<String>,
    pub project_goal: Option<String>,
}

impl ProjectFields {
    /// Build from a flat string mapping. Unknown keys are ignored, blank values count as missing.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| map.get(*k))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            project_name: get(&["project_name", "name"]),
            owner: get(&["owner", "client"]),
            site_location: get(&["site_location", "location"]),
            site_area: get(&["site_area", "area"]),
            building_type: get(&["building_type", "type"]),
            project_goal: get(&["project_goal", "goal"]),
        }
    }

    /// Load a flat mapping from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let map: HashMap<String, String> =
            if path.extension().is_some_and(|e| e == "json") {
                serde_json::from_str(&content)?
            } else {
                toml::from_str(&content)?
            };
        Ok(Self::from_map(&map))
    }

    /// Labeled values in echo order, with the placeholder for missing ones.
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        fn show(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or(NOT_AVAILABLE)
        }

        [
            ("Project name", show(&self.project_name)),
            ("Owner", show(&self.owner)),
            ("Site location", show(&self.site_location)),
            ("Site area", show(&self.site_area)),
            ("Building type", show(&self.building_type)),
            ("Project goal", show(&self.project_goal)),
        ]
    }
}
