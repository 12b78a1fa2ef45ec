use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

const CONFIG_FILE: &str = "d4builds";
const ENV_PREFIX: &str = "D4B";

const AFFIXES_URL: &str =
    "https://raw.githubusercontent.com/josdemmers/Diablo4Companion/master/D4Companion/Data/Affixes.enUS.json";
const LISTING_URL: &str = "https://maxroll.gg/d4/build-guides?filter[metas][taxonomy]=taxonomies.metas&filter[metas][value]=d4-endgame&filter[classes][taxonomy]=taxonomies.classes&filter[classes][value]=d4-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    /// Plain GET; works for server-rendered pages and test fixtures.
    Http,
    /// spider.cloud, which executes client-side rendering before returning HTML.
    Spider,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub manifest_path: PathBuf,
    pub stat_map_path: PathBuf,
    pub uniques_path: PathBuf,
    pub builds_dir: PathBuf,
    pub translated_dir: PathBuf,
    pub renderer: Renderer,
    pub request_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub user_agent: String,
    pub affix_source_url: String,
    pub listing_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            manifest_path: PathBuf::from("data/manifest.json"),
            stat_map_path: PathBuf::from("data/stat_map.json"),
            uniques_path: PathBuf::from("data/uniques.json"),
            builds_dir: PathBuf::from("data/builds"),
            translated_dir: PathBuf::from("data/translated_builds"),
            renderer: Renderer::Http,
            request_timeout_secs: 10,
            render_timeout_secs: 20,
            poll_interval_ms: 1000,
            user_agent: concat!("d4_builds/", env!("CARGO_PKG_VERSION")).to_string(),
            affix_source_url: AFFIXES_URL.to_string(),
            listing_url: LISTING_URL.to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `d4builds.toml` if present, then `D4B_*` environment variables.
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn render_wait(&self) -> crate::fetcher::RenderWait {
        crate::fetcher::RenderWait {
            timeout: Duration::from_secs(self.render_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_into_data_dir() {
        let s = Settings::default();
        assert_eq!(s.manifest_path, PathBuf::from("data/manifest.json"));
        assert_eq!(s.translated_dir, PathBuf::from("data/translated_builds"));
        assert_eq!(s.renderer, Renderer::Http);
        assert_eq!(s.render_wait().timeout, Duration::from_secs(20));
    }
}
