use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TranslateError;
use crate::normalize::aliases::Slot;
use crate::normalize::{GearPiece, NormalizedBuildRecord};
use crate::reference::{ReferenceTables, StatMap, UniqueItemCatalog};

/// Build in the shape the Diablo 4 Companion app imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslatedBuildRecord {
    pub name: String,
    pub source: String,
    pub skills: Vec<TranslatedSkill>,
    pub gear: BTreeMap<GearGroup, BTreeMap<String, TranslatedItem>>,
    pub item_affixes: Vec<ItemAffix>,
    pub uniques: Vec<UniqueRef>,
    pub stat_priority: Vec<StatRef>,
    pub paragon: Vec<TranslatedParagon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GearGroup {
    Armor,
    Weapons,
    Jewelry,
}

impl From<Slot> for GearGroup {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Helm | Slot::Chest | Slot::Gloves | Slot::Pants | Slot::Boots => GearGroup::Armor,
            Slot::Weapon | Slot::Ranged | Slot::Offhand => GearGroup::Weapons,
            Slot::Amulet | Slot::Ring1 | Slot::Ring2 => GearGroup::Jewelry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslatedSkill {
    pub name: String,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslatedItem {
    pub item: String,
    pub is_unique: bool,
    pub affixes: Vec<StatRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatRef {
    pub id: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemAffix {
    pub id: u32,
    #[serde(rename = "Type")]
    pub item_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UniqueRef {
    pub name: String,
    #[serde(rename = "Type")]
    pub item_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslatedParagon {
    pub board: String,
    pub glyph: Option<String>,
    pub glyph_level: Option<u32>,
}

/// Project a normalized build into the companion schema.
///
/// Every affix, stat and unique item must resolve through the reference
/// tables; the first miss aborts the translation so stale tables show up as
/// failures instead of quietly thinner exports.
pub fn translate(
    record: &NormalizedBuildRecord,
    tables: &ReferenceTables,
) -> Result<TranslatedBuildRecord, TranslateError> {
    let skills = record
        .skills
        .iter()
        .map(|s| TranslatedSkill {
            name: s.name.clone(),
            rank: s.rank,
        })
        .collect();

    let mut gear: BTreeMap<GearGroup, BTreeMap<String, TranslatedItem>> = BTreeMap::new();
    let mut item_affixes: Vec<ItemAffix> = Vec::new();
    let mut uniques = Vec::new();

    for (slot, piece) in &record.gear {
        let item = translate_piece(&record.class_name, *slot, piece, &tables.stats, &tables.uniques)?;

        for affix in &item.affixes {
            let entry = ItemAffix {
                id: affix.id,
                item_type: slot.companion_type().to_string(),
            };
            if !item_affixes.contains(&entry) {
                item_affixes.push(entry);
            }
        }
        if item.is_unique {
            uniques.push(UniqueRef {
                name: item.item.clone(),
                item_type: slot.companion_type().to_string(),
            });
        }

        gear.entry(GearGroup::from(*slot))
            .or_default()
            .insert(slot.display_name().to_string(), item);
    }

    let stat_priority = record
        .stat_priority
        .iter()
        .map(|s| match s.stat_id {
            Some(id) => tables
                .stats
                .name(id)
                .map(|d| StatRef {
                    id,
                    description: d.to_string(),
                })
                .ok_or(TranslateError::UnknownStat(id)),
            None => tables
                .stats
                .resolve_name(&s.name)
                .map(|(id, d)| StatRef {
                    id,
                    description: d.to_string(),
                })
                .ok_or_else(|| TranslateError::UnknownStatName(s.name.clone())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let paragon = record
        .paragon
        .iter()
        .map(|p| TranslatedParagon {
            board: p.board.clone(),
            glyph: p.glyph.clone(),
            glyph_level: p.glyph_level,
        })
        .collect();

    Ok(TranslatedBuildRecord {
        name: record.class_name.clone(),
        source: record.source_url.clone(),
        skills,
        gear,
        item_affixes,
        uniques,
        stat_priority,
        paragon,
    })
}

fn translate_piece(
    class_name: &str,
    slot: Slot,
    piece: &GearPiece,
    stats: &StatMap,
    catalog: &UniqueItemCatalog,
) -> Result<TranslatedItem, TranslateError> {
    let item = if piece.unique {
        catalog
            .find(&piece.item_name)
            .map(|u| {
                if let Some(kind) = u.slot.as_deref().filter(|k| *k != slot.companion_type()) {
                    debug!("Unique '{}' is catalogued as {} but worn as {}", u.name, kind, slot.display_name());
                }
                if !u.classes.is_empty() && !u.classes.iter().any(|c| c.eq_ignore_ascii_case(class_name)) {
                    debug!("Unique '{}' is not listed for {}", u.name, class_name);
                }
                u.name.clone()
            })
            .ok_or_else(|| TranslateError::UnknownUnique {
                slot: slot.display_name().to_string(),
                item: piece.item_name.clone(),
            })?
    } else {
        piece.item_name.clone()
    };

    let affixes = piece
        .affixes
        .iter()
        .map(|a| {
            stats
                .resolve_name(a)
                .map(|(id, d)| StatRef {
                    id,
                    description: d.to_string(),
                })
                .ok_or_else(|| TranslateError::UnknownAffix {
                    slot: slot.display_name().to_string(),
                    affix: a.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TranslatedItem {
        item,
        is_unique: piece.unique,
        affixes,
    })
}

// ── Tests ──
