use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::BUILD_SECTION;

static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2, h3, h4").unwrap());

#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub label: String,
    pub element: ElementRef<'a>,
}

/// Every top-level build section in document order, with its label.
///
/// The label is the `data-build-section` attribute when set, otherwise the
/// first heading inside the section. Nested sections belong to their parent.
pub fn find_sections(doc: &Html) -> Vec<Section<'_>> {
    let mut sections = Vec::new();

    for element in doc.select(&BUILD_SECTION) {
        if is_nested(element) {
            continue;
        }
        match section_label(element) {
            Some(label) => sections.push(Section { label, element }),
            None => debug!("Skipping unlabelled build section"),
        }
    }

    sections
}

fn section_label(element: ElementRef<'_>) -> Option<String> {
    if let Some(attr) = element.value().attr("data-build-section") {
        let attr = attr.trim();
        if !attr.is_empty() {
            return Some(attr.to_string());
        }
    }
    element
        .select(&HEADING)
        .next()
        .map(|h| h.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn is_nested(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| BUILD_SECTION.matches(&a))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        find_sections(&doc).into_iter().map(|s| s.label).collect()
    }

    #[test]
    fn attribute_label_wins_over_heading() {
        let html = r#"<section data-build-section="Gear"><h2>Equipment</h2></section>"#;
        assert_eq!(labels(html), vec!["Gear"]);
    }

    #[test]
    fn heading_label_when_attribute_blank() {
        let html = r#"<div class="build-section" data-build-section=" "><h3> Stat Priorities </h3></div>"#;
        assert_eq!(labels(html), vec!["Stat Priorities"]);
    }

    #[test]
    fn unlabelled_and_nested_sections_skipped() {
        let html = r#"
            <div class="build-section"><p>no heading</p></div>
            <div class="build-section"><h2>Skills</h2>
                <div class="build-section"><h3>Inner</h3></div>
            </div>"#;
        assert_eq!(labels(html), vec!["Skills"]);
    }
}
