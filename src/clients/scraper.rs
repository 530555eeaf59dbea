//! HTTP page scraper.
//!
//! Downloads the page with reqwest and renders it to plain text with
//! `html2text`. The title is the concatenated text of the page's `<h1>`
//! elements, falling back to `<title>`.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::{info, warn};

use super::Scraper;
use crate::core::PageContents;
use crate::errors::SummaryError;

const RENDER_WIDTH: usize = 120;
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

static H1_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1>").expect("static regex compile"));
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("static regex compile"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex compile"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex compile"));

pub struct HttpScraper {
    http: Client,
    max_body_bytes: usize,
}

impl HttpScraper {
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tldr-pages/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Appends as much of `chunk` as fits under `cap`. Returns true once `buf`
/// is full, i.e. the rest of the body must not be read.
pub fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    chunk.len() >= room
}

fn inline_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    WS_RE.replace_all(stripped.trim(), " ").into_owned()
}

/// Extracts the page title from raw HTML.
pub fn extract_title(html: &str) -> String {
    let headings: Vec<String> = H1_RE
        .captures_iter(html)
        .map(|cap| inline_text(&cap[1]))
        .filter(|t| !t.is_empty())
        .collect();
    if !headings.is_empty() {
        return headings.join(" ");
    }
    TITLE_RE
        .captures(html)
        .map(|cap| inline_text(&cap[1]))
        .unwrap_or_default()
}

/// Renders raw HTML into readable text.
pub fn extract_content(html: &str) -> Result<String, SummaryError> {
    html2text::from_read(html.as_bytes(), RENDER_WIDTH)
        .map(|text| text.trim().to_string())
        .map_err(|e| SummaryError::UpstreamFailure(format!("Failed to render page: {e}")))
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch_contents(&self, url: &str) -> Result<PageContents, SummaryError> {
        let mut resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SummaryError::UpstreamFailure(format!(
                "Failed to fetch page: {url} returned {status}"
            )));
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if append_capped(&mut body, &chunk, self.max_body_bytes) {
                warn!(url = %url, limit = self.max_body_bytes, "page body truncated");
                break;
            }
        }
        let html = String::from_utf8_lossy(&body);

        let title = extract_title(&html);
        let content = extract_content(&html)?;
        info!(
            url = %url,
            title_len = title.len(),
            content_len = content.len(),
            "page scraped"
        );
        Ok(PageContents { title, content })
    }
}
