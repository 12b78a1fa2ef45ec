pub mod cells;
pub mod sections;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::normalize::aliases::{canonical_field, Field};
use crate::reference::BuildManifestEntry;

/// Labelled build content container.
pub static BUILD_SECTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-build-section], .build-section").unwrap());

/// Either layout's build content; its presence means the page finished rendering.
pub static RENDER_READY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-build-section], .build-section, table.wp-block-advgb-table").unwrap()
});

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());

/// Classes of the striped block-editor table the guides put their gear in.
const GEAR_TABLE_CLASSES: &[&str] = &[
    "wp-block-advgb-table",
    "advgb-table-frontend",
    "is-style-stripes",
    "aligncenter",
];

/// Label given to gear read from the guide table layout.
const GEAR_TABLE_LABEL: &str = "Gear";

/// What the extractor read off one build page, before any interpretation.
///
/// `fields` is in page order and keyed by the label exactly as the page shows
/// it. The labels the normalizer understands are the ones in
/// `normalize::aliases::FIELD_ALIASES`: skills, gear (required), stat priority
/// and paragon, each with the synonyms the site has used. Anything else is
/// carried along and dropped during normalization.
#[derive(Debug, Clone, Default)]
pub struct RawBuildRecord {
    pub class_name: String,
    pub source_url: String,
    pub fields: Vec<RawField>,
}

#[derive(Debug, Clone, Default)]
pub struct RawField {
    pub label: String,
    pub entries: Vec<RawEntry>,
}

/// A table row or a list item.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub cells: Vec<RawCell>,
}

#[derive(Debug, Clone, Default)]
pub struct RawCell {
    pub text: String,
    /// `data-stat-id` on the cell or its first descendant carrying one.
    pub stat_id: Option<String>,
    /// Texts of nested list items (affix lists).
    pub parts: Vec<String>,
    /// Marked up with unique rarity.
    pub unique: bool,
}

#[cfg(test)]
impl RawCell {
    pub fn text(text: &str) -> Self {
        RawCell {
            text: text.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl RawEntry {
    pub fn row(cells: &[&str]) -> Self {
        RawEntry {
            cells: cells.iter().map(|c| RawCell::text(c)).collect(),
        }
    }
}

/// Locate every labelled section and read its entries verbatim.
///
/// Pages without a labelled gear section fall back to the guide table
/// layout. Fails fast when neither is there: the site layout changed and
/// nothing downstream should be trusted.
pub fn extract_build(
    html: &str,
    entry: &BuildManifestEntry,
) -> Result<RawBuildRecord, ExtractError> {
    let doc = Html::parse_document(html);

    let mut fields: Vec<RawField> = sections::find_sections(&doc)
        .into_iter()
        .map(|s| RawField {
            entries: cells::read_entries(s.element),
            label: s.label,
        })
        .collect();

    if !fields
        .iter()
        .any(|f| canonical_field(&f.label) == Some(Field::Gear))
    {
        let table = gear_table(&doc).ok_or_else(|| ExtractError::MissingAnchor {
            url: entry.source_url.clone(),
            anchor: "gear",
        })?;
        // The first body row repeats the column headings.
        let entries = cells::read_rows(table).into_iter().skip(1).collect();
        debug!("Using guide gear table for {}", entry.class_name);
        fields.push(RawField {
            label: GEAR_TABLE_LABEL.to_string(),
            entries,
        });
    }

    for f in &fields {
        debug!("  section '{}': {} entries", f.label, f.entries.len());
    }
    info!(
        "Extracted {} sections for {}",
        fields.len(),
        entry.class_name
    );

    Ok(RawBuildRecord {
        class_name: entry.class_name.clone(),
        source_url: entry.source_url.clone(),
        fields,
    })
}

/// The table carrying the most gear table classes; earliest on a tie.
fn gear_table(doc: &Html) -> Option<ElementRef<'_>> {
    let mut best: Option<(usize, ElementRef<'_>)> = None;
    for table in doc.select(&TABLE) {
        let score = table
            .value()
            .classes()
            .filter(|c| GEAR_TABLE_CLASSES.contains(c))
            .count();
        if score > best.map_or(0, |(s, _)| s) {
            best = Some((score, table));
        }
    }
    best.map(|(_, table)| table)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> BuildManifestEntry {
        BuildManifestEntry {
            class_name: "Barbarian".into(),
            source_url: "https://maxroll.gg/d4/build/abc".into(),
        }
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn barbarian_sections_in_page_order() {
        let raw = extract_build(&fixture("barbarian"), &entry()).unwrap();
        let labels: Vec<&str> = raw.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Skill Build",
                "Equipment",
                "Stat Priority",
                "Paragon Boards",
                "Frequently Asked Questions"
            ]
        );
        assert_eq!(raw.class_name, "Barbarian");
    }

    #[test]
    fn skills_are_read_verbatim_including_duplicates() {
        let raw = extract_build(&fixture("barbarian"), &entry()).unwrap();
        let skills: Vec<&str> = raw.fields[0]
            .entries
            .iter()
            .map(|e| e.cells[0].text.as_str())
            .collect();
        assert_eq!(skills.iter().filter(|s| **s == "Bash (rank 3)").count(), 2);
    }

    #[test]
    fn gear_rows_skip_header_and_keep_cells() {
        let raw = extract_build(&fixture("barbarian"), &entry()).unwrap();
        let gear = &raw.fields[1];
        assert_eq!(gear.entries.len(), 8);
        let helm = &gear.entries[0];
        assert_eq!(helm.cells[0].text, "Helmet");
        assert!(helm.cells[1].unique);
        assert_eq!(helm.cells[2].parts, vec!["Maximum Life", "Cooldown Reduction"]);
    }

    #[test]
    fn stat_ids_come_from_item_or_descendant() {
        let raw = extract_build(&fixture("barbarian"), &entry()).unwrap();
        let ids: Vec<Option<&str>> = raw.fields[2]
            .entries
            .iter()
            .map(|e| e.cells[0].stat_id.as_deref())
            .collect();
        assert_eq!(ids, vec![Some("1001"), Some("1004")]);
    }

    #[test]
    fn missing_gear_section_is_extract_error() {
        let err = extract_build(&fixture("no_gear"), &entry()).unwrap_err();
        assert!(matches!(err, ExtractError::MissingAnchor { anchor: "gear", .. }));
    }

    #[test]
    fn guide_table_layout_supplies_gear() {
        let raw = extract_build(&fixture("guide_table"), &entry()).unwrap();
        let gear = raw
            .fields
            .iter()
            .find(|f| canonical_field(&f.label) == Some(Field::Gear))
            .unwrap();
        assert_eq!(gear.entries.len(), 6);
        assert_eq!(gear.entries[0].cells[0].text, "Helm");
        assert_eq!(gear.entries[0].cells[2].text, "Maximum Life, Cooldown Reduction");
    }

    #[test]
    fn guide_table_picked_by_class_overlap() {
        let html = r#"<html><body>
            <table class="wp-block-table"><tbody>
              <tr><td>Skill</td><td>Rank</td></tr><tr><td>Bash</td><td>3</td></tr>
            </tbody></table>
            <table class="wp-block-advgb-table advgb-table-frontend"><tbody>
              <tr><td>Slot</td><td>Item</td><td>Affixes</td></tr>
              <tr><td>Boots</td><td>Rare Boots</td><td>Movement Speed</td></tr>
            </tbody></table>
          </body></html>"#;
        let raw = extract_build(html, &entry()).unwrap();
        assert_eq!(raw.fields.len(), 1);
        assert_eq!(raw.fields[0].entries.len(), 1);
        assert_eq!(raw.fields[0].entries[0].cells[1].text, "Rare Boots");
    }

    #[test]
    fn unrelated_tables_are_not_gear() {
        let html = r#"<table class="wp-block-table"><tbody><tr><td>a</td></tr></tbody></table>"#;
        assert!(matches!(
            extract_build(html, &entry()),
            Err(ExtractError::MissingAnchor { anchor: "gear", .. })
        ));
    }

    #[test]
    fn empty_gear_section_is_present_but_empty() {
        let raw = extract_build(&fixture("empty_gear"), &entry()).unwrap();
        let gear = raw
            .fields
            .iter()
            .find(|f| canonical_field(&f.label) == Some(Field::Gear))
            .unwrap();
        assert!(gear.entries.is_empty());
    }
}
