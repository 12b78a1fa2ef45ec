use serde::{Deserialize, Serialize};

use super::text::fold;

/// Canonical build fields the normalizer knows how to coerce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Skills,
    Gear,
    StatPriority,
    Paragon,
}

/// Section labels the site has used for each field, compared case-folded.
pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Skills,
        &["skills", "skill build", "skill tree", "skill allocation", "active skills"],
    ),
    (
        Field::Gear,
        &["gear", "equipment", "gear & affixes", "gear and affixes", "items"],
    ),
    (
        Field::StatPriority,
        &["stat priority", "stat priorities", "affix priority", "stats"],
    ),
    (
        Field::Paragon,
        &["paragon", "paragon board", "paragon boards", "paragon glyphs"],
    ),
];

pub fn canonical_field(label: &str) -> Option<Field> {
    let label = fold(label);
    FIELD_ALIASES
        .iter()
        .find(|(_, names)| names.contains(&label.as_str()))
        .map(|(field, _)| *field)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Helm,
    Chest,
    Gloves,
    Pants,
    Boots,
    Weapon,
    Ranged,
    Offhand,
    Amulet,
    Ring1,
    Ring2,
}

// Checked in order; the first slot with a matching word wins.
const SLOT_WORDS: &[(Slot, &[&str])] = &[
    (Slot::Amulet, &["amulet", "necklace"]),
    (Slot::Ring1, &["ring", "rings", "ring1"]),
    (Slot::Helm, &["helm", "helmet", "head"]),
    (Slot::Chest, &["chest", "body", "torso"]),
    (Slot::Gloves, &["gloves", "glove", "hands", "gauntlets"]),
    (Slot::Pants, &["pants", "legs", "leggings"]),
    (Slot::Boots, &["boots", "boot", "feet"]),
    (Slot::Offhand, &["offhand", "focus", "shield", "totem"]),
    (Slot::Ranged, &["ranged", "bow", "crossbow"]),
    (
        Slot::Weapon,
        &["weapon", "weapons", "mainhand", "twohanded", "onehanded", "dual", "bludgeoning", "slashing", "staff", "wand"],
    ),
];

fn words(label: &str) -> Vec<String> {
    let folded = fold(label)
        .replace("off-hand", "offhand")
        .replace("off hand", "offhand")
        .replace("main-hand", "mainhand")
        .replace("main hand", "mainhand")
        .replace("two-handed", "twohanded")
        .replace("two handed", "twohanded")
        .replace("one-handed", "onehanded")
        .replace("one handed", "onehanded");
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Map a gear row label ("Chest Armor", "Off-Hand", "Ring 2") to its slot.
pub fn canonical_slot(label: &str) -> Option<Slot> {
    let words = words(label);
    let slot = SLOT_WORDS
        .iter()
        .find(|(_, aliases)| words.iter().any(|w| aliases.contains(&w.as_str())))
        .map(|(slot, _)| *slot)?;

    if slot == Slot::Ring1
        && words
            .iter()
            .any(|w| w == "2" || w == "ring2" || w == "second")
    {
        return Some(Slot::Ring2);
    }
    Some(slot)
}

/// Whether a ring label says which ring it is ("Ring 1", "Second Ring").
pub fn names_ring_position(label: &str) -> bool {
    words(label)
        .iter()
        .any(|w| matches!(w.as_str(), "1" | "2" | "ring1" | "ring2" | "first" | "second"))
}

/// Rows offering an alternative to the main pick rather than filling a slot.
pub fn is_alternative_row(label: &str) -> bool {
    let words = words(label);
    let joined = words.join(" ");
    joined.contains("best in slot") || words.iter().any(|w| w == "bis")
}

pub fn is_unique_label(label: &str) -> bool {
    words(label).iter().any(|w| w == "unique")
}

impl Slot {
    pub fn display_name(self) -> &'static str {
        match self {
            Slot::Helm => "Helm",
            Slot::Chest => "Chest",
            Slot::Gloves => "Gloves",
            Slot::Pants => "Pants",
            Slot::Boots => "Boots",
            Slot::Weapon => "Weapon",
            Slot::Ranged => "Ranged",
            Slot::Offhand => "Offhand",
            Slot::Amulet => "Amulet",
            Slot::Ring1 => "Ring1",
            Slot::Ring2 => "Ring2",
        }
    }

    /// Item type name used by the companion app; both rings share one.
    pub fn companion_type(self) -> &'static str {
        match self {
            Slot::Helm => "helm",
            Slot::Chest => "chest",
            Slot::Gloves => "gloves",
            Slot::Pants => "pants",
            Slot::Boots => "boots",
            Slot::Weapon => "weapon",
            Slot::Ranged => "ranged",
            Slot::Offhand => "offhand",
            Slot::Amulet => "amulet",
            Slot::Ring1 | Slot::Ring2 => "ring",
        }
    }
}
