// Snippet Provider Service
// Web search clients that return candidate evidence for a sentence

use crate::models::SearchResult;
use crate::services::text_processor::{decode_entities, html_to_text};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

pub const BING_DEFAULT_URL: &str = "https://www.bing.com/search";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RESULTS: usize = 10;

static ITEM_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<li\b[^>]*\bclass="b_algo\b[^"]*"[^>]*>"#).expect("item regex")
});
static H2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2\b[^>]*>(.*?)</h2>").expect("h2 regex"));
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<a\b[^>]*?\bhref="([^"]*)""#).expect("href regex"));
static LI_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)li\b[^>]*>").expect("li regex"));
static P_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").expect("p regex"));

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Search error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Response parse error: {0}")]
    ParseError(String),
    #[error("Search timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of candidate evidence for a query sentence.
#[async_trait]
pub trait SnippetProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Results in engine order. An empty list is a valid answer.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

fn default_base_url() -> String { BING_DEFAULT_URL.to_string() }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_max_results() -> usize { DEFAULT_MAX_RESULTS }
fn default_timeout_secs() -> u64 { DEFAULT_TIMEOUT_SECS }

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            max_results: DEFAULT_MAX_RESULTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            proxy: None,
        }
    }
}

/// Scrapes the public Bing results page.
pub struct BingProvider {
    client: Client,
    base_url: String,
    user_agent: String,
    max_results: usize,
}

impl BingProvider {
    pub fn new(settings: &SearchSettings) -> Result<Self, ProviderError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(settings.timeout_secs.max(1)));
        if let Some(proxy_url) = settings.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            user_agent: settings.user_agent.clone(),
            max_results: settings.max_results,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SnippetProvider for BingProvider {
    fn name(&self) -> &str {
        "bing"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let start = Instant::now();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let mut results = parse_bing_results(&html);
        results.truncate(self.max_results);

        debug!(
            results = results.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "bing.search"
        );
        Ok(results)
    }
}

/// Extract `{title, link, snippet}` from each `li.b_algo` item of a results page.
pub fn parse_bing_results(html: &str) -> Vec<SearchResult> {
    let openings: Vec<(usize, usize)> = ITEM_OPEN_RE
        .find_iter(html)
        .map(|m| (m.start(), m.end()))
        .collect();

    openings
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let next_item = openings.get(i + 1).map(|(s, _)| *s).unwrap_or(html.len());
            let body_end = closing_li(html, body_start).unwrap_or(next_item).min(next_item);
            let item = &html[body_start..body_end];

            let title = H2_RE
                .captures(item)
                .map(|c| html_to_text(&c[1]))
                .unwrap_or_default();
            let link = HREF_RE
                .captures(item)
                .map(|c| decode_entities(&c[1]))
                .unwrap_or_default();
            let snippet = P_RE
                .captures(item)
                .map(|c| html_to_text(&c[1]))
                .unwrap_or_default();

            SearchResult { title, link, snippet }
        })
        .collect()
}

/// Offset of the `</li>` closing the item whose body starts at `from`.
fn closing_li(html: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for caps in LI_TAG_RE.captures_iter(&html[from..]) {
        let tag = caps.get(0)?;
        if caps[1].is_empty() {
            depth += 1;
        } else if depth == 0 {
            return Some(from + tag.start());
        } else {
            depth -= 1;
        }
    }
    None
}
