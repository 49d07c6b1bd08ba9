//! Curriculum definition: phases, sections and items.
//!
//! The built-in roadmap ships as JSON inside the crate. Offline progress
//! calculations walk it to know how many items exist per phase.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const BUILTIN_ROADMAP: &str = include_str!("../data/roadmap.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_duration: Option<String>,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration: Option<String>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Where an item sits inside the curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLocation<'a> {
    pub phase_id: &'a str,
    pub section_id: &'a str,
    pub item: &'a Item,
}

impl Roadmap {
    /// The curriculum bundled with the crate.
    pub fn builtin() -> Result<Self, CoreError> {
        Self::from_json(BUILTIN_ROADMAP)
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Internal(format!("Invalid roadmap definition: {e}")))
    }

    pub fn phase(&self, phase_id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == phase_id)
    }

    /// Iterate every item together with its phase and section ids.
    pub fn items(&self) -> impl Iterator<Item = ItemLocation<'_>> {
        self.phases.iter().flat_map(|phase| {
            phase.sections.iter().flat_map(move |section| {
                section.items.iter().map(move |item| ItemLocation {
                    phase_id: &phase.id,
                    section_id: &section.id,
                    item,
                })
            })
        })
    }

    pub fn locate(&self, item_id: &str) -> Option<ItemLocation<'_>> {
        self.items().find(|loc| loc.item.id == item_id)
    }

    pub fn total_items(&self) -> usize {
        self.phases.iter().map(Phase::total_items).sum()
    }
}

impl Phase {
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}
