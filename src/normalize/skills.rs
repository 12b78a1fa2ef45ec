use std::sync::LazyLock;

use regex::Regex;

use super::text::{clean, fold};
use super::{LastSeen, Skill};
use crate::error::NormalizeError;
use crate::parser::RawField;

pub const MAX_SKILL_RANK: u32 = 5;

static SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?)\s*\(([^()]*)\)$").unwrap());
static RANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:rank\s*)?(\d+)(?:\s*/\s*\d+)?$").unwrap());

/// Skills in page order, one per name (case-insensitive), last rank seen wins.
pub fn normalize_skills(field: &RawField) -> Result<Vec<Skill>, NormalizeError> {
    let mut skills = LastSeen::new();

    for entry in &field.entries {
        let Some(first) = entry.cells.first() else {
            continue;
        };
        let text = clean(&first.text);
        if text.is_empty() {
            continue;
        }

        let rank_cell = entry.cells.get(1).map(|c| clean(&c.text)).filter(|t| !t.is_empty());
        let skill = match rank_cell {
            Some(rank) => Skill {
                rank: parse_rank(&text, &rank)?,
                name: text,
            },
            None => parse_skill(&text)?,
        };
        skills.put(fold(&skill.name), skill);
    }

    Ok(skills.into_vec())
}

/// "Bash (rank 3)", "Bash (3)", "Bash (3/5)" or plain "Bash" (rank 1).
pub fn parse_skill(text: &str) -> Result<Skill, NormalizeError> {
    if let Some(caps) = SUFFIX_RE.captures(text) {
        let name = caps[1].trim();
        let inner = caps[2].trim();
        if RANK_RE.is_match(inner) || inner.to_lowercase().contains("rank") {
            return Ok(Skill {
                rank: parse_rank(name, inner)?,
                name: name.to_string(),
            });
        }
    }
    Ok(Skill {
        name: text.to_string(),
        rank: 1,
    })
}

fn parse_rank(skill: &str, raw: &str) -> Result<u32, NormalizeError> {
    let invalid = || NormalizeError::InvalidRank {
        skill: skill.to_string(),
        raw: raw.to_string(),
    };
    let caps = RANK_RE.captures(raw.trim()).ok_or_else(invalid)?;
    let rank: u32 = caps[1].parse().map_err(|_| invalid())?;
    if !(1..=MAX_SKILL_RANK).contains(&rank) {
        return Err(NormalizeError::RankOutOfRange {
            skill: skill.to_string(),
            rank,
            max: MAX_SKILL_RANK,
        });
    }
    Ok(rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawEntry;

    fn skills(rows: &[&[&str]]) -> Result<Vec<Skill>, NormalizeError> {
        normalize_skills(&RawField {
            label: "Skills".into(),
            entries: rows.iter().map(|r| RawEntry::row(r)).collect(),
        })
    }

    #[test]
    fn rank_formats() {
        assert_eq!(parse_skill("Bash (rank 3)").unwrap().rank, 3);
        assert_eq!(parse_skill("Bash (Rank 3)").unwrap().rank, 3);
        assert_eq!(parse_skill("Bash (2)").unwrap().rank, 2);
        assert_eq!(parse_skill("Bash (4/5)").unwrap().rank, 4);
        let plain = parse_skill("War Cry").unwrap();
        assert_eq!((plain.name.as_str(), plain.rank), ("War Cry", 1));
    }

    #[test]
    fn non_rank_parenthetical_stays_in_name() {
        let s = parse_skill("Bash (Enhanced)").unwrap();
        assert_eq!(s.name, "Bash (Enhanced)");
        assert_eq!(s.rank, 1);
    }

    #[test]
    fn bad_ranks_rejected() {
        assert!(matches!(
            parse_skill("Bash (rank three)"),
            Err(NormalizeError::InvalidRank { .. })
        ));
        assert!(matches!(
            parse_skill("Bash (rank 9)"),
            Err(NormalizeError::RankOutOfRange { rank: 9, .. })
        ));
        assert!(matches!(
            parse_skill("Bash (0)"),
            Err(NormalizeError::RankOutOfRange { rank: 0, .. })
        ));
    }

    #[test]
    fn two_cell_rows_and_last_seen_dedup() {
        let s = skills(&[&["Bash", "Rank 1"], &["Leap", "2"], &["bash", "3"]]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].name, "bash");
        assert_eq!(s[0].rank, 3);
        assert_eq!(s[1].name, "Leap");
    }

    #[test]
    fn two_cell_row_with_garbage_rank_fails() {
        assert!(skills(&[&["Bash", "lots"]]).is_err());
    }
}
