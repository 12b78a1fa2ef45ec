use std::sync::LazyLock;

use regex::Regex;

use super::text::{clean, fold};
use super::{LastSeen, ParagonBoard, StatPriority};
use crate::error::NormalizeError;
use crate::parser::{RawCell, RawField};

pub const MAX_GLYPH_LEVEL: u32 = 100;

static LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:level|lvl\.?|lv\.?)?\s*(\d+)$").unwrap());

/// Stat priority in page order, deduplicated by id (or name when there is none).
pub fn normalize_stat_priority(field: &RawField) -> Result<Vec<StatPriority>, NormalizeError> {
    let mut stats = LastSeen::new();

    for entry in &field.entries {
        let Some(cell) = stat_cell(&entry.cells) else {
            continue;
        };
        let name = clean(&cell.text);
        let stat_id = match cell.stat_id.as_deref().map(str::trim) {
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| NormalizeError::InvalidStatId {
                name: name.clone(),
                raw: raw.to_string(),
            })?),
            None => None,
        };
        if name.is_empty() && stat_id.is_none() {
            continue;
        }

        let key = match stat_id {
            Some(id) => format!("#{}", id),
            None => fold(&name),
        };
        stats.put(key, StatPriority { stat_id, name });
    }

    Ok(stats.into_vec())
}

// Rows often lead with an ordinal ("1.", "2"); prefer the cell that carries the id.
fn stat_cell(cells: &[RawCell]) -> Option<&RawCell> {
    cells.iter().find(|c| c.stat_id.is_some()).or_else(|| {
        cells.iter().rev().find(|c| {
            let t = clean(&c.text);
            !t.is_empty() && !t.trim_end_matches('.').chars().all(|ch| ch.is_ascii_digit())
        })
    })
}

/// Rows of [board, glyph, level]; one entry per board, last seen wins.
pub fn normalize_paragon(field: &RawField) -> Result<Vec<ParagonBoard>, NormalizeError> {
    let mut boards = LastSeen::new();

    for entry in &field.entries {
        let cell = |i: usize| {
            entry
                .cells
                .get(i)
                .map(|c| clean(&c.text))
                .filter(|t| !t.is_empty())
        };
        let Some(board) = cell(0) else {
            continue;
        };
        let glyph_level = match cell(2) {
            Some(raw) => Some(parse_glyph_level(&board, &raw)?),
            None => None,
        };

        boards.put(
            fold(&board),
            ParagonBoard {
                glyph: cell(1),
                glyph_level,
                board,
            },
        );
    }

    Ok(boards.into_vec())
}

fn parse_glyph_level(board: &str, raw: &str) -> Result<u32, NormalizeError> {
    let invalid = || NormalizeError::InvalidGlyphLevel {
        board: board.to_string(),
        raw: raw.to_string(),
    };
    let caps = LEVEL_RE.captures(raw).ok_or_else(invalid)?;
    let level: u32 = caps[1].parse().map_err(|_| invalid())?;
    if !(1..=MAX_GLYPH_LEVEL).contains(&level) {
        return Err(invalid());
    }
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawEntry;

    fn field(entries: Vec<RawEntry>) -> RawField {
        RawField {
            label: "x".into(),
            entries,
        }
    }

    fn stat(text: &str, id: Option<&str>) -> RawEntry {
        RawEntry {
            cells: vec![RawCell {
                text: text.into(),
                stat_id: id.map(str::to_string),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn stat_ids_parsed_and_deduplicated() {
        let s = normalize_stat_priority(&field(vec![
            stat("Maximum Life", Some("1001")),
            stat("Armor", None),
            stat("Max Life", Some(" 1001 ")),
        ]))
        .unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].stat_id, Some(1001));
        assert_eq!(s[0].name, "Max Life");
        assert_eq!(s[1].stat_id, None);
    }

    #[test]
    fn non_numeric_stat_id_rejected() {
        let err = normalize_stat_priority(&field(vec![stat("Armor", Some("armor"))])).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidStatId { .. }));
    }

    #[test]
    fn ordinal_cells_skipped() {
        let s = normalize_stat_priority(&field(vec![RawEntry::row(&["1.", "Vulnerable Damage"])])).unwrap();
        assert_eq!(s[0].name, "Vulnerable Damage");
    }

    #[test]
    fn paragon_levels() {
        let p = normalize_paragon(&field(vec![
            RawEntry::row(&["Starting Board", "Exploit", "Level 15"]),
            RawEntry::row(&["Warbringer", "", ""]),
            RawEntry::row(&["Hemorrhage", "Ire", "lvl. 21"]),
        ]))
        .unwrap();
        assert_eq!(p[0].glyph_level, Some(15));
        assert_eq!(p[1].glyph, None);
        assert_eq!(p[1].glyph_level, None);
        assert_eq!(p[2].glyph_level, Some(21));
    }

    #[test]
    fn glyph_level_range_checked() {
        assert!(normalize_paragon(&field(vec![RawEntry::row(&["Board", "Glyph", "150"])])).is_err());
        assert!(normalize_paragon(&field(vec![RawEntry::row(&["Board", "Glyph", "high"])])).is_err());
    }
}
