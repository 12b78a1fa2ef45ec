use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::fetcher::{fetch_rendered, PageSource, RenderWait};
use crate::reference;

/// Playable classes with an endgame guide filter on the listing page.
pub const CLASSES: &[&str] = &["barbarian", "druid", "necromancer", "rogue", "sorcerer"];

static GUIDE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/d4/build-guides/"]"#).unwrap());

/// Visit each class's guide listing and take the top guide as that class's build.
pub async fn discover_manifest(
    source: &dyn PageSource,
    listing_url: &str,
    wait: &RenderWait,
) -> BTreeMap<String, String> {
    let mut manifest = BTreeMap::new();

    for class in CLASSES {
        let url = format!("{}{}", listing_url, class);
        info!("Retrieving build paths from {}", url);

        let html = match fetch_rendered(source, &url, wait, &GUIDE_LINK).await {
            Ok(html) => html,
            Err(e) => {
                warn!("{} generated an error: {}", class, e);
                continue;
            }
        };
        match first_guide_link(&html, &url) {
            Some(link) => {
                info!("Retrieved build path: {}", link);
                manifest.insert(display_class(class), link);
            }
            None => warn!("No usable guide link for {}", class),
        }
    }

    manifest
}

/// The manifest at `path` with discovered guides laid over it.
///
/// Classes whose listing failed this time keep their previous guide.
pub fn merge_manifest(
    path: &Path,
    discovered: &BTreeMap<String, String>,
) -> anyhow::Result<BTreeMap<String, String>> {
    let mut manifest: BTreeMap<String, String> = if path.exists() {
        reference::load_manifest(path)?
            .into_iter()
            .map(|e| (e.class_name, e.source_url))
            .collect()
    } else {
        BTreeMap::new()
    };

    for (class, url) in discovered {
        match manifest.insert(class.clone(), url.clone()) {
            Some(old) if old != *url => info!("{}: {} -> {}", class, old, url),
            None => info!("{}: added {}", class, url),
            _ => {}
        }
    }
    Ok(manifest)
}

/// First guide link on a listing page, made absolute against the listing URL.
pub fn first_guide_link(html: &str, base: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let doc = Html::parse_document(html);
    doc.select(&GUIDE_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| base.join(href.trim()).ok())
        .map(|u| u.to_string())
}

fn display_class(class: &str) -> String {
    let mut chars = class.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ── Tests ──
