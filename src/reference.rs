use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::normalize::text::fold;
use crate::output;
use crate::settings::Settings;

/// One class → build guide pairing from the manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifestEntry {
    pub class_name: String,
    pub source_url: String,
}

/// Read the manifest (`{"Barbarian": "https://..."}`), sorted by class name.
pub fn load_manifest(path: &Path) -> Result<Vec<BuildManifestEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {:?}", path))?;
    let map: BTreeMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse manifest {:?}", path))?;

    if map.is_empty() {
        warn!("Manifest {:?} has no entries", path);
    }

    Ok(map
        .into_iter()
        .map(|(class_name, source_url)| BuildManifestEntry {
            class_name,
            source_url,
        })
        .collect())
}

// ── Stat map ──

/// Numeric stat id → display name, plus a reverse index by folded name.
#[derive(Debug, Clone, Default)]
pub struct StatMap {
    by_id: BTreeMap<u32, String>,
    by_key: HashMap<String, u32>,
}

impl StatMap {
    pub fn new(by_id: BTreeMap<u32, String>) -> Self {
        let mut by_key = HashMap::new();
        // Ascending iteration: on a name collision the smallest id wins.
        for (id, name) in &by_id {
            let key = affix_key(name);
            if !key.is_empty() {
                by_key.entry(key).or_insert(*id);
            }
        }
        StatMap { by_id, by_key }
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Look up a stat by its display text, ignoring numbers, signs and case.
    pub fn resolve_name(&self, name: &str) -> Option<(u32, &str)> {
        let id = *self.by_key.get(&affix_key(name))?;
        self.name(id).map(|n| (id, n))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}

/// Letters-only lowercase form used to match page affix text against the
/// companion app's templated descriptions ("+#% Critical Strike Chance").
pub fn affix_key(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphabetic() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn load_stat_map(path: &Path) -> Result<StatMap> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read stat map {:?}", path))?;
    let map: BTreeMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse stat map {:?}", path))?;

    let mut by_id = BTreeMap::new();
    for (key, name) in map {
        let id: u32 = key
            .trim()
            .parse()
            .with_context(|| format!("Stat map {:?} has non-numeric id '{}'", path, key))?;
        by_id.insert(id, name);
    }
    Ok(StatMap::new(by_id))
}

// ── Unique catalog ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogEntry {
    Name(String),
    Item(UniqueItem),
}

#[derive(Debug, Clone, Default)]
pub struct UniqueItemCatalog {
    items: Vec<UniqueItem>,
    by_name: HashMap<String, usize>,
}

impl UniqueItemCatalog {
    pub fn new(items: Vec<UniqueItem>) -> Self {
        let by_name = items
            .iter()
            .enumerate()
            .map(|(i, item)| (fold(&item.name), i))
            .collect();
        UniqueItemCatalog { items, by_name }
    }

    pub fn find(&self, name: &str) -> Option<&UniqueItem> {
        self.by_name.get(&fold(name)).map(|&i| &self.items[i])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

pub fn load_uniques(path: &Path) -> Result<UniqueItemCatalog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read unique catalog {:?}", path))?;
    let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse unique catalog {:?}", path))?;

    let items = entries
        .into_iter()
        .map(|e| match e {
            CatalogEntry::Name(name) => UniqueItem {
                name,
                slot: None,
                classes: Vec::new(),
            },
            CatalogEntry::Item(item) => item,
        })
        .collect();
    Ok(UniqueItemCatalog::new(items))
}

/// Read-only lookup tables shared by every entry of a run.
pub struct ReferenceTables {
    pub stats: StatMap,
    pub uniques: UniqueItemCatalog,
}

impl ReferenceTables {
    pub fn load(settings: &Settings) -> Result<Self> {
        let stats = load_stat_map(&settings.stat_map_path)?;
        let uniques = load_uniques(&settings.uniques_path)?;
        info!(
            "Loaded {} stats and {} unique items",
            stats.len(),
            uniques.len()
        );
        Ok(ReferenceTables { stats, uniques })
    }
}

// ── Stat map refresh ──

#[derive(Deserialize)]
struct AffixRow {
    #[serde(rename = "IdSno")]
    id: u32,
    #[serde(rename = "Description")]
    description: String,
}

/// Rebuild the stat map from the companion app's published affix table.
pub async fn refresh_stat_map(settings: &Settings) -> Result<usize> {
    let client = reqwest::Client::builder()
        .user_agent(&settings.user_agent)
        .timeout(settings.request_timeout())
        .build()?;

    info!("Fetching affix table: {}", settings.affix_source_url);
    let response = client
        .get(&settings.affix_source_url)
        .send()
        .await
        .context("Failed to fetch affix table")?;
    if !response.status().is_success() {
        bail!(
            "Failed to get data from {}. Status code: {}",
            settings.affix_source_url,
            response.status()
        );
    }

    let rows: Vec<AffixRow> = response
        .json()
        .await
        .context("Affix table is not the expected JSON array")?;
    let map = stat_map_from_rows(rows);

    output::write_json(&settings.stat_map_path, &map)?;
    info!("Wrote {} stats to {:?}", map.len(), settings.stat_map_path);
    Ok(map.len())
}

fn stat_map_from_rows(rows: Vec<AffixRow>) -> BTreeMap<u32, String> {
    rows.into_iter()
        .filter(|r| !r.description.trim().is_empty())
        .map(|r| (r.id, r.description))
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(pairs: &[(u32, &str)]) -> StatMap {
        StatMap::new(pairs.iter().map(|(i, n)| (*i, n.to_string())).collect())
    }

    #[test]
    fn resolves_templated_affix_names() {
        let map = stats(&[(1, "+#% Critical Strike Chance"), (2, "Maximum Life")]);
        assert_eq!(map.resolve_name("Critical Strike Chance"), Some((1, "+#% Critical Strike Chance")));
        assert_eq!(map.resolve_name("maximum life"), Some((2, "Maximum Life")));
        assert!(map.resolve_name("Thorns").is_none());
    }

    #[test]
    fn smallest_id_wins_on_collision() {
        let map = stats(&[(9, "Armor"), (3, "+# Armor")]);
        assert_eq!(map.resolve_name("Armor").map(|(id, _)| id), Some(3));
    }

    #[test]
    fn manifest_is_sorted_by_class() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"{"Rogue": "https://r", "Barbarian": "https://b"}"#).unwrap();
        let entries = load_manifest(&path).unwrap();
        assert_eq!(entries[0].class_name, "Barbarian");
        assert_eq!(entries[1].source_url, "https://r");
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }

    #[test]
    fn stat_map_rejects_non_numeric_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat_map.json");
        std::fs::write(&path, r#"{"12": "Armor", "abc": "Life"}"#).unwrap();
        assert!(load_stat_map(&path).is_err());
    }

    #[test]
    fn catalog_accepts_names_and_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uniques.json");
        std::fs::write(
            &path,
            r#"["Harlequin Crest", {"name": "Ring of Starless Skies", "slot": "ring"}]"#,
        )
        .unwrap();
        let catalog = load_uniques(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find("harlequin  crest").unwrap().name, "Harlequin Crest");
        assert_eq!(
            catalog.find("Ring of Starless Skies").unwrap().slot.as_deref(),
            Some("ring")
        );
    }

    #[test]
    fn unparsable_catalog_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uniques.json");
        std::fs::write(&path, r#"{"Harlequin Crest": true"#).unwrap();
        let err = load_uniques(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse unique catalog"));
    }

    #[test]
    fn tables_need_both_stat_map_and_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let stat_map_path = dir.path().join("stat_map.json");
        std::fs::write(&stat_map_path, r#"{"1001": "+# Maximum Life"}"#).unwrap();
        let settings = Settings {
            stat_map_path,
            uniques_path: dir.path().join("uniques.json"),
            ..Settings::default()
        };
        assert!(ReferenceTables::load(&settings).is_err());

        std::fs::write(&settings.uniques_path, r#"["Harlequin Crest"]"#).unwrap();
        let tables = ReferenceTables::load(&settings).unwrap();
        assert_eq!(tables.stats.len(), 1);
        assert_eq!(tables.uniques.len(), 1);
    }

    #[test]
    fn affix_rows_sorted_and_blank_dropped() {
        let rows = vec![
            AffixRow { id: 20, description: "Vulnerable Damage".into() },
            AffixRow { id: 4, description: "Armor".into() },
            AffixRow { id: 7, description: "  ".into() },
        ];
        let map = stat_map_from_rows(rows);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![4, 20]);
    }
}
