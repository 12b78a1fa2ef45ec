use std::sync::LazyLock;

use regex::Regex;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static WITH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s*\(\s*with\s+[^)]*\)").unwrap());
static AFFIX_SEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;\n•|]").unwrap());

// Entities that survive when the site double-encodes.
const LEFTOVER_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&nbsp;", " "),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&quot;", "\""),
];

/// Decode leftovers, unify quotes and spaces, collapse whitespace, trim.
pub fn clean(s: &str) -> String {
    let mut out: String = s
        .chars()
        .filter(|c| !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}'))
        .map(|c| match c {
            '\u{a0}' | '\u{2009}' | '\u{202f}' => ' ',
            '\u{2018}' | '\u{2019}' | '\u{2032}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            c => c,
        })
        .collect();
    for (entity, replacement) in LEFTOVER_ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    WS_RE.replace_all(&out, " ").trim().to_string()
}

/// Case-insensitive comparison key.
pub fn fold(s: &str) -> String {
    clean(s).to_lowercase()
}

/// Drop "(with Some Unique)" hints the guides attach to aspects and affixes.
pub fn strip_with_clause(s: &str) -> String {
    WITH_RE.replace_all(s, "").to_string()
}

pub fn split_affixes(s: &str) -> Vec<String> {
    AFFIX_SEP_RE
        .split(s)
        .map(clean)
        .filter(|p| !p.is_empty())
        .collect()
}
