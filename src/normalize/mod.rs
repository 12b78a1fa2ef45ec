pub mod aliases;
pub mod allocations;
pub mod gear;
pub mod skills;
pub mod text;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NormalizeError;
use crate::parser::{RawBuildRecord, RawField};
use aliases::{canonical_field, Field, Slot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedBuildRecord {
    pub class_name: String,
    pub source_url: String,
    pub skills: Vec<Skill>,
    pub gear: BTreeMap<Slot, GearPiece>,
    pub stat_priority: Vec<StatPriority>,
    pub paragon: Vec<ParagonBoard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearPiece {
    pub item_name: String,
    pub unique: bool,
    pub affixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatPriority {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_id: Option<u32>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagonBoard {
    pub board: String,
    pub glyph: Option<String>,
    pub glyph_level: Option<u32>,
}

/// Clean a raw page record into the fixed schema.
///
/// Section labels go through the alias table; when two sections map to the
/// same field the later one on the page wins. Unknown sections are dropped.
pub fn normalize(raw: RawBuildRecord) -> Result<NormalizedBuildRecord, NormalizeError> {
    let mut by_field: HashMap<Field, &RawField> = HashMap::new();
    for field in &raw.fields {
        match canonical_field(&field.label) {
            Some(canonical) => {
                by_field.insert(canonical, field);
            }
            None => debug!("Dropping unknown field '{}'", field.label),
        }
    }

    let gear = by_field
        .get(&Field::Gear)
        .ok_or(NormalizeError::MissingGear)
        .and_then(|f| gear::normalize_gear(f))?;
    let skills = match by_field.get(&Field::Skills) {
        Some(f) => skills::normalize_skills(f)?,
        None => Vec::new(),
    };
    let stat_priority = match by_field.get(&Field::StatPriority) {
        Some(f) => allocations::normalize_stat_priority(f)?,
        None => Vec::new(),
    };
    let paragon = match by_field.get(&Field::Paragon) {
        Some(f) => allocations::normalize_paragon(f)?,
        None => Vec::new(),
    };

    Ok(NormalizedBuildRecord {
        class_name: text::clean(&raw.class_name),
        source_url: raw.source_url.trim().to_string(),
        skills,
        gear,
        stat_priority,
        paragon,
    })
}

/// Ordered collection where a repeated key replaces the earlier value in place.
pub(crate) struct LastSeen<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> LastSeen<T> {
    pub(crate) fn new() -> Self {
        LastSeen {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn put(&mut self, key: String, value: T) {
        match self.index.get(&key) {
            Some(&i) => self.items[i] = value,
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(value);
            }
        }
    }

    pub(crate) fn into_vec(self) -> Vec<T> {
        self.items
    }
}

// ── Tests ──
