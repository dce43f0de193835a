use crate::config::NewsConfig;
use crate::radio_browser::read_limited;
use anyhow::{anyhow, Context, Result};
use futures_util::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/600x400";
const MAX_BODY_BYTES: usize = 2_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub source: String,
    pub url: String,
    pub published_at: String,
}

/// Loosely-shaped record as served by the news endpoints. Field names are
/// assumed, nothing is validated.
#[derive(Debug, Default, Deserialize)]
struct RawNewsItem {
    #[serde(default, deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    source: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    published_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewsClient {
    http: reqwest::Client,
    sources: Vec<String>,
}

impl NewsClient {
    pub fn new(config: &NewsConfig, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).context("Invalid user agent")?,
        );
        let http = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            sources: config.sources.clone(),
        })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Fetches every source concurrently. Any failing source empties the
    /// whole result.
    pub async fn fetch_news(&self) -> Vec<NewsItem> {
        match self.try_fetch_news().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = ?e, "news fetch failed");
                vec![]
            }
        }
    }

    async fn try_fetch_news(&self) -> Result<Vec<NewsItem>> {
        let batches = try_join_all(self.sources.iter().map(|s| self.fetch_source(s))).await?;
        let items: Vec<NewsItem> = batches.into_iter().flatten().map(normalize).collect();
        debug!(count = items.len(), "news items normalized");
        Ok(items)
    }

    async fn fetch_source(&self, source: &str) -> Result<Vec<RawNewsItem>> {
        let resp = self
            .http
            .get(source)
            .send()
            .await
            .with_context(|| format!("Failed to fetch from {source}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Failed to fetch from {source}: {status}"));
        }
        let bytes = read_limited(resp, MAX_BODY_BYTES).await?;
        parse_items(&bytes).with_context(|| format!("Invalid news payload from {source}"))
    }
}

// The payload must be an array; entries that are not objects are skipped,
// odd field types are patched over by `lenient_text`.
fn parse_items(bytes: &[u8]) -> Result<Vec<RawNewsItem>> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    Ok(values
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(error = %e, "skipping malformed news entry");
                None
            }
        })
        .collect())
}

fn normalize(raw: RawNewsItem) -> NewsItem {
    let title = raw.title.unwrap_or_default();
    let url = raw.url.unwrap_or_default();
    let source = raw.source.unwrap_or_default();
    let published_at = raw.published_at.unwrap_or_default();
    let id = raw
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| content_id(&title, &url, &source, &published_at));
    let image_url = raw
        .image_url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

    NewsItem {
        id,
        title,
        description: raw.description.unwrap_or_default(),
        image_url,
        source,
        url,
        published_at,
    }
}

/// Stable id for records that arrive without one.
fn content_id(title: &str, url: &str, source: &str, published_at: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [title, url, source, published_at] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

// Sources disagree on field types: strings and numbers are kept, anything
// else is treated as missing.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
