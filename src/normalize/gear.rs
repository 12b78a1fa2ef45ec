use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::aliases::{canonical_slot, is_alternative_row, is_unique_label, names_ring_position, Slot};
use super::text::{clean, fold, split_affixes, strip_with_clause};
use super::GearPiece;
use crate::error::NormalizeError;
use crate::parser::{RawCell, RawField};

/// Rows of [slot, item, affixes] into one piece per slot; a repeated slot keeps the last row.
///
/// Unnumbered "Ring" rows fill the first ring and then the second.
pub fn normalize_gear(field: &RawField) -> Result<BTreeMap<Slot, GearPiece>, NormalizeError> {
    let mut gear = BTreeMap::new();
    let mut unnumbered_rings = 0;

    for entry in &field.entries {
        if entry.cells.len() < 2 {
            debug!("Skipping gear row with {} cell(s)", entry.cells.len());
            continue;
        }
        let label = clean(&entry.cells[0].text);
        if is_alternative_row(&label) {
            debug!("Skipping alternative gear row '{}'", label);
            continue;
        }
        let Some(mut slot) = canonical_slot(&label) else {
            debug!("Dropping unknown gear slot '{}'", label);
            continue;
        };
        if slot == Slot::Ring1 && !names_ring_position(&label) {
            if unnumbered_rings > 0 {
                slot = Slot::Ring2;
            }
            unnumbered_rings += 1;
        }

        let item_cell = &entry.cells[1];
        let item_name = clean(&strip_with_clause(&item_cell.text));
        if item_name.is_empty() {
            return Err(NormalizeError::EmptyItem { slot: label });
        }

        let piece = GearPiece {
            item_name,
            unique: item_cell.unique || is_unique_label(&label),
            affixes: entry.cells.get(2).map(affixes).unwrap_or_default(),
        };
        if let Some(previous) = gear.insert(slot, piece) {
            debug!("Slot {:?} repeated, replacing '{}'", slot, previous.item_name);
        }
    }

    Ok(gear)
}

fn affixes(cell: &RawCell) -> Vec<String> {
    let candidates = if cell.parts.is_empty() {
        split_affixes(&cell.text)
    } else {
        cell.parts.clone()
    };

    let mut seen = HashSet::new();
    candidates
        .iter()
        .map(|a| clean(&strip_with_clause(a)))
        .filter(|a| !a.is_empty())
        .filter(|a| seen.insert(fold(a)))
        .collect()
}
