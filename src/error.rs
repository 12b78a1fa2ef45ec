use std::time::Duration;

use thiserror::Error;

/// Network-level failure while loading a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    #[error("render service failed for {url}: {message}")]
    Renderer { url: String, message: String },
}

/// Build content never showed up within the bounded wait.
#[derive(Debug, Error)]
#[error("{url}: build content did not render within {waited:?} ({attempts} attempts)")]
pub struct RenderError {
    pub url: String,
    pub attempts: u32,
    pub waited: Duration,
}

/// The page rendered but a structural anchor the extractor relies on is gone.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{url}: required section '{anchor}' not found")]
    MissingAnchor { url: String, anchor: &'static str },
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("skill '{skill}' has unparsable rank '{raw}'")]
    InvalidRank { skill: String, raw: String },
    #[error("skill '{skill}' rank {rank} outside 1..={max}")]
    RankOutOfRange { skill: String, rank: u32, max: u32 },
    #[error("gear slot '{slot}' has no item name")]
    EmptyItem { slot: String },
    #[error("stat '{name}' has non-numeric id '{raw}'")]
    InvalidStatId { name: String, raw: String },
    #[error("paragon board '{board}' has invalid glyph level '{raw}'")]
    InvalidGlyphLevel { board: String, raw: String },
    #[error("raw record has no gear field")]
    MissingGear,
}

/// A lookup table has no entry for something the page referenced.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("stat id {0} is not in the stat map")]
    UnknownStat(u32),
    #[error("stat '{0}' is not in the stat map")]
    UnknownStatName(String),
    #[error("affix '{affix}' on {slot} is not in the stat map")]
    UnknownAffix { slot: String, affix: String },
    #[error("unique item '{item}' on {slot} is not in the unique catalog")]
    UnknownUnique { slot: String, item: String },
}

/// Everything that can sink a single manifest entry.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl EntryError {
    pub fn stage(&self) -> &'static str {
        match self {
            EntryError::Fetch(_) => "fetch",
            EntryError::Render(_) => "render",
            EntryError::Extract(_) => "extract",
            EntryError::Normalize(_) => "normalize",
            EntryError::Translate(_) => "translate",
            EntryError::Write { .. } => "write",
        }
    }
}
