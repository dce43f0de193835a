use crate::config::DirectoryConfig;
use crate::models::{Station, TrendingCategory};
use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};
use url::Url;

const MAX_BODY_BYTES: usize = 1_000_000;

pub const COUNTRY_LIMIT: u32 = 100;
pub const SEARCH_LIMIT: u32 = 30;
pub const TAG_LIMIT: u32 = 30;
pub const TRENDING_LIMIT: u32 = 50;

/// Read-only client for the Radio Browser station directory.
///
/// Every public query issues exactly one request and never fails: transport,
/// status and decoding errors are logged and turned into an empty result.
#[derive(Debug, Clone)]
pub struct RadioBrowserClient {
    http: reqwest::Client,
    base: String,
}

impl RadioBrowserClient {
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        let http = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub async fn by_country(&self, country: &str) -> Vec<Station> {
        let res = self
            .endpoint(&["stations", "bycountry", country])
            .map(|url| with_limit(url, COUNTRY_LIMIT));
        self.stations_or_empty("bycountry", res).await
    }

    pub async fn search(&self, query: &str) -> Vec<Station> {
        let query = query.trim();
        if query.is_empty() {
            return vec![];
        }
        let res = self.endpoint(&["stations", "search"]).map(|mut url| {
            url.query_pairs_mut().append_pair("name", query);
            with_limit(url, SEARCH_LIMIT)
        });
        self.stations_or_empty("search", res).await
    }

    pub async fn by_tag(&self, tag: &str) -> Vec<Station> {
        let res = self
            .endpoint(&["stations", "bytag", tag])
            .map(|url| with_limit(url, TAG_LIMIT));
        self.stations_or_empty("bytag", res).await
    }

    pub async fn trending(&self, category: TrendingCategory) -> Vec<Station> {
        let count = TRENDING_LIMIT.to_string();
        let res = self
            .endpoint(&["stations", category.endpoint(), &count])
            .map(hide_broken);
        self.stations_or_empty("trending", res).await
    }

    pub async fn by_id(&self, stationuuid: &str) -> Option<Station> {
        let stationuuid = stationuuid.trim();
        if stationuuid.is_empty() {
            return None;
        }
        let res = self
            .endpoint(&["stations", "byuuid", stationuuid])
            .map(hide_broken);
        self.stations_or_empty("byuuid", res).await.into_iter().next()
    }

    async fn stations_or_empty(&self, action: &str, url: Result<Url>) -> Vec<Station> {
        let res = match url {
            Ok(url) => self.fetch_stations(action, url).await,
            Err(e) => Err(e),
        };
        match res {
            Ok(stations) => stations,
            Err(e) => {
                warn!(action, error = ?e, "station directory query failed");
                vec![]
            }
        }
    }

    async fn fetch_stations(&self, action: &str, url: Url) -> Result<Vec<Station>> {
        debug!(action, %url, "GET");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("{action} request failed"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{action}: directory responded with {status}"));
        }
        let bytes = read_limited(resp, MAX_BODY_BYTES).await?;
        let stations: Vec<Station> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Invalid {action} response"))?;
        debug!(action, count = stations.len(), "stations received");
        Ok(stations)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let path: Vec<String> = segments
            .iter()
            .map(|s| urlencoding::encode(s.trim()).into_owned())
            .collect();
        let raw = format!("{}/json/{}", self.base, path.join("/"));
        Url::parse(&raw).with_context(|| format!("Invalid directory URL: {raw}"))
    }
}

fn hide_broken(mut url: Url) -> Url {
    url.query_pairs_mut().append_pair("hidebroken", "true");
    url
}

fn with_limit(url: Url, limit: u32) -> Url {
    let mut url = hide_broken(url);
    url.query_pairs_mut().append_pair("limit", &limit.to_string());
    url
}

pub(crate) async fn read_limited(resp: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
    if let Some(len) = resp.content_length() {
        if len as usize > limit {
            return Err(anyhow!("HTTP response too large ({len} bytes)"));
        }
    }

    let mut data: Vec<u8> = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("HTTP body read error")?;
        if data.len().saturating_add(chunk.len()) > limit {
            return Err(anyhow!("HTTP response exceeded size limit"));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RadioBrowserClient {
        RadioBrowserClient::new(&DirectoryConfig {
            base_url: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn builds_encoded_endpoints() {
        let rb = client("https://de1.api.radio-browser.info/");
        let url = rb.endpoint(&["stations", "bytag", "hip hop"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://de1.api.radio-browser.info/json/stations/bytag/hip%20hop"
        );
    }

    #[test]
    fn limit_and_hidebroken_are_both_sent() {
        let rb = client("https://de1.api.radio-browser.info");
        let url = with_limit(rb.endpoint(&["stations", "search"]).unwrap(), SEARCH_LIMIT);
        assert_eq!(url.query(), Some("hidebroken=true&limit=30"));
    }

    #[test]
    fn parses_search_results() {
        let body =
            r#"[{"stationuuid":"u1","name":"Test FM","country":"US","codec":"MP3","bitrate":128,"votes":42}]"#;
        let stations: Vec<Station> = serde_json::from_str(body).unwrap();
        assert_eq!(stations[0].stationuuid, "u1");
        assert_eq!(stations[0].bitrate, 128);
    }

    #[tokio::test]
    async fn empty_search_skips_the_request() {
        // Nothing listens on this port; a request would fail, but none is made.
        let rb = client("http://127.0.0.1:9");
        assert!(rb.search("   ").await.is_empty());
        assert!(rb.by_id("").await.is_none());
    }

    #[tokio::test]
    async fn unreachable_directory_yields_empty() {
        let rb = client("http://127.0.0.1:9");
        assert!(rb.by_country("Tanzania").await.is_empty());
        assert!(rb.trending(TrendingCategory::Votes).await.is_empty());
    }
}
