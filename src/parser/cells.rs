use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::{RawCell, RawEntry};

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static STAT_ID: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[data-stat-id]").unwrap());
static UNIQUE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-rarity="unique"], .d4-unique"#).unwrap());

/// Table rows if the section holds a table, otherwise top-level list items.
pub fn read_entries(section: ElementRef<'_>) -> Vec<RawEntry> {
    if section.select(&TABLE).next().is_some() {
        return read_rows(section);
    }

    section
        .select(&ITEM)
        .filter(|li| !inside_list_item(*li))
        .map(|li| RawEntry {
            cells: vec![read_cell(li)],
        })
        .collect()
}

/// Body rows of every table under `scope`; rows without `td` cells are dropped.
pub fn read_rows(scope: ElementRef<'_>) -> Vec<RawEntry> {
    scope
        .select(&ROW)
        .map(|tr| RawEntry {
            cells: tr.select(&CELL).map(read_cell).collect(),
        })
        .filter(|e| !e.cells.is_empty())
        .collect()
}

fn read_cell(el: ElementRef<'_>) -> RawCell {
    let stat_id = el
        .value()
        .attr("data-stat-id")
        .or_else(|| {
            el.select(&STAT_ID)
                .next()
                .and_then(|d| d.value().attr("data-stat-id"))
        })
        .map(str::to_string);

    let parts = el
        .select(&ITEM)
        .map(|li| li.text().collect::<String>())
        .collect();

    RawCell {
        text: own_text(el),
        stat_id,
        parts,
        unique: UNIQUE.matches(&el) || el.select(&UNIQUE).next().is_some(),
    }
}

/// Text of `el` without the text of nested lists, which lands in `parts`.
fn own_text(el: ElementRef<'_>) -> String {
    el.descendants()
        .filter(|n| {
            !n.ancestors()
                .take_while(|a| a.id() != el.id())
                .filter_map(ElementRef::wrap)
                .any(|a| matches!(a.value().name(), "li" | "ul" | "ol"))
        })
        .filter_map(|n| n.value().as_text().map(|t| &**t))
        .collect()
}

fn inside_list_item(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "li")
}

// ── Tests ──
