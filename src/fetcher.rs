use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{debug, info};

use crate::error::{EntryError, FetchError, RenderError};
use crate::parser::{self, RawBuildRecord};
use crate::reference::BuildManifestEntry;
use crate::settings::{Renderer, Settings};

/// Anything that can hand back the HTML of a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Whether the source runs page scripts, so fetching again can show new content.
    fn renders_scripts(&self) -> bool {
        true
    }
}

/// Bounds on how long to keep re-polling a page whose content is rendered client-side.
#[derive(Debug, Clone, Copy)]
pub struct RenderWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

pub fn source_for(settings: &Settings) -> Result<Box<dyn PageSource>> {
    Ok(match settings.renderer {
        Renderer::Http => Box::new(HttpSource::new(settings)?),
        Renderer::Spider => Box::new(SpiderSource::new(settings)?),
    })
}

// ── Plain HTTP ──

pub struct HttpSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(settings.request_timeout())
            .build()?;
        Ok(HttpSource {
            client,
            timeout: settings.request_timeout(),
        })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let to_fetch_error = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    after: self.timeout,
                }
            } else {
                FetchError::Http {
                    url: url.to_string(),
                    source,
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(to_fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(to_fetch_error)
    }

    fn renders_scripts(&self) -> bool {
        false
    }
}

// ── spider.cloud (executes client-side rendering) ──

pub struct SpiderSource {
    spider: Spider,
    timeout: Duration,
}

impl SpiderSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = std::env::var("SPIDER_API_KEY")
            .map_err(|_| anyhow::anyhow!("SPIDER_API_KEY environment variable must be set"))?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| anyhow::anyhow!("Failed to create Spider client: {}", e))?;
        Ok(SpiderSource {
            spider,
            timeout: settings.request_timeout(),
        })
    }
}

#[async_trait]
impl PageSource for SpiderSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.spider.scrape_url(url, Some(params), "application/json"),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
            after: self.timeout,
        })?
        .map_err(|e| FetchError::Renderer {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };
        let first = parsed.as_array().and_then(|arr| arr.first());

        if let Some(status) = first
            .and_then(|obj| obj.get("status"))
            .and_then(|s| s.as_u64())
        {
            if !(200..300).contains(&status) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status as u16,
                });
            }
        }

        first
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| FetchError::Renderer {
                url: url.to_string(),
                message: "No content in spider response".to_string(),
            })
    }
}

// ── Render wait ──

/// Fetch `url` until `ready` matches something in the document or the wait runs out.
///
/// A source that serves static HTML is asked once.
pub async fn fetch_rendered(
    source: &dyn PageSource,
    url: &str,
    wait: &RenderWait,
    ready: &Selector,
) -> Result<String, EntryError> {
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let html = source.fetch(url).await?;
        if has_match(&html, ready) {
            debug!("{} rendered after {} attempt(s)", url, attempts);
            return Ok(html);
        }

        let waited = start.elapsed();
        if !source.renders_scripts() || waited + wait.poll_interval >= wait.timeout {
            return Err(RenderError {
                url: url.to_string(),
                attempts,
                waited,
            }
            .into());
        }
        debug!(
            "{} not rendered yet (attempt {}), polling again in {:?}",
            url, attempts, wait.poll_interval
        );
        tokio::time::sleep(wait.poll_interval).await;
    }
}

fn has_match(html: &str, selector: &Selector) -> bool {
    Html::parse_document(html).select(selector).next().is_some()
}

/// Load one build page and read its sections into a raw record.
pub async fn fetch_build(
    source: &dyn PageSource,
    entry: &BuildManifestEntry,
    wait: &RenderWait,
) -> Result<RawBuildRecord, EntryError> {
    let html = fetch_rendered(source, &entry.source_url, wait, &parser::RENDER_READY).await?;
    info!("Fetched {} ({} bytes)", entry.source_url, html.len());
    Ok(parser::extract_build(&html, entry)?)
}

// ── Tests ──

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;

    /// Serves canned responses per URL; the last response repeats.
    pub(crate) struct FixtureSource {
        pages: Mutex<HashMap<String, VecDeque<Result<String, u16>>>>,
        pub(crate) calls: Mutex<u32>,
        static_html: bool,
    }

    impl FixtureSource {
        pub(crate) fn new() -> Self {
            FixtureSource {
                pages: Mutex::new(HashMap::new()),
                calls: Mutex::new(0),
                static_html: false,
            }
        }

        pub(crate) fn static_html(mut self) -> Self {
            self.static_html = true;
            self
        }

        pub(crate) fn page(self, url: &str, html: &str) -> Self {
            self.sequence(url, vec![Ok(html.to_string())])
        }

        pub(crate) fn sequence(self, url: &str, responses: Vec<Result<String, u16>>) -> Self {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), responses.into());
            self
        }
    }

    #[async_trait]
    impl PageSource for FixtureSource {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            let mut pages = self.pages.lock().unwrap();
            let queue = pages.get_mut(url).ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })?;
            let next = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            };
            next.map_err(|status| FetchError::Status {
                url: url.to_string(),
                status,
            })
        }

        fn renders_scripts(&self) -> bool {
            !self.static_html
        }
    }

    pub(crate) fn quick_wait() -> RenderWait {
        RenderWait {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        }
    }

    const SHELL: &str = "<html><body><div id=\"app\">Loading...</div></body></html>";
    const RENDERED: &str =
        "<html><body><section data-build-section=\"Gear\"><table></table></section></body></html>";

    #[tokio::test]
    async fn waits_for_client_side_content() {
        let source = FixtureSource::new().sequence(
            "https://x/build",
            vec![Ok(SHELL.into()), Ok(SHELL.into()), Ok(RENDERED.into())],
        );
        let html = fetch_rendered(&source, "https://x/build", &quick_wait(), &parser::BUILD_SECTION)
            .await
            .unwrap();
        assert!(html.contains("data-build-section"));
        assert_eq!(*source.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_render_timeout() {
        let source = FixtureSource::new().page("https://x/build", SHELL);
        let err = fetch_rendered(&source, "https://x/build", &quick_wait(), &parser::BUILD_SECTION)
            .await
            .unwrap_err();
        match err {
            EntryError::Render(e) => {
                assert!(e.attempts >= 2);
                assert!(e.waited < Duration::from_millis(200));
            }
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn static_source_is_fetched_once() {
        let source = FixtureSource::new().static_html().page("https://x/build", SHELL);
        let err = fetch_rendered(&source, "https://x/build", &quick_wait(), &parser::BUILD_SECTION)
            .await
            .unwrap_err();
        assert!(matches!(err, EntryError::Render(ref e) if e.attempts == 1));
        assert_eq!(*source.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn guide_table_counts_as_rendered() {
        let html = std::fs::read_to_string("tests/fixtures/guide_table.html").unwrap();
        let source = FixtureSource::new().page("https://x/build", &html);
        let entry = BuildManifestEntry {
            class_name: "Barbarian".into(),
            source_url: "https://x/build".into(),
        };
        let raw = fetch_build(&source, &entry, &quick_wait()).await.unwrap();
        assert_eq!(raw.fields.last().map(|f| f.label.as_str()), Some("Gear"));
        assert_eq!(*source.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn http_failure_is_a_fetch_error() {
        let source = FixtureSource::new().sequence("https://x/build", vec![Err(503)]);
        let err = fetch_rendered(&source, "https://x/build", &quick_wait(), &parser::BUILD_SECTION)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "fetch");
        assert_eq!(*source.calls.lock().unwrap(), 1);
    }
}
