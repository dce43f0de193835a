use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A station record as served by the Radio Browser directory.
///
/// Only `stationuuid` takes part in identity: equality, hashing, favorites and
/// the "currently playing" comparison all go through it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Station {
    pub stationuuid: String,
    #[serde(default)]
    pub changeuuid: String,
    #[serde(default)]
    pub serveruuid: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub url_resolved: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub favicon: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub countrycode: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub votes: i64,
    #[serde(default)]
    pub clickcount: i64,
    #[serde(default)]
    pub clicktrend: i64,
    #[serde(default)]
    pub codec: String,
    #[serde(default)]
    pub bitrate: u32,
    #[serde(default)]
    pub hls: i32,
    #[serde(default)]
    pub lastcheckok: i32,
    #[serde(default)]
    pub has_extended_info: bool,
    #[serde(default)]
    pub ssl_error: i32,
    #[serde(default)]
    pub geo_lat: Option<f64>,
    #[serde(default)]
    pub geo_long: Option<f64>,
    #[serde(default)]
    pub lastchangetime: String,
    #[serde(default)]
    pub lastchangetime_iso8601: Option<String>,
    #[serde(default)]
    pub lastchecktime: String,
    #[serde(default)]
    pub lastchecktime_iso8601: Option<String>,
    #[serde(default)]
    pub lastcheckoktime: String,
    #[serde(default)]
    pub lastcheckoktime_iso8601: Option<String>,
    #[serde(default)]
    pub lastlocalchecktime: String,
    #[serde(default)]
    pub lastlocalchecktime_iso8601: Option<String>,
    #[serde(default)]
    pub clicktimestamp: String,
    #[serde(default)]
    pub clicktimestamp_iso8601: Option<String>,
}

impl Station {
    /// Tags split out of the comma-joined `tags` field, trimmed, empties dropped.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// The URL handed to the audio output: resolved URL first, raw stream URL otherwise.
    pub fn playable_url(&self) -> &str {
        let resolved = self.url_resolved.trim();
        if resolved.is_empty() {
            self.url.trim()
        } else {
            resolved
        }
    }
}

impl PartialEq for Station {
    fn eq(&self, other: &Self) -> bool {
        self.stationuuid == other.stationuuid
    }
}

impl Eq for Station {}

impl Hash for Station {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.stationuuid.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingCategory {
    /// Ranked by total votes.
    Votes,
    /// Ranked by click count.
    Clicks,
    /// Most recently changed.
    Recent,
}

impl TrendingCategory {
    pub(crate) fn endpoint(self) -> &'static str {
        match self {
            TrendingCategory::Votes => "topvote",
            TrendingCategory::Clicks => "topclick",
            TrendingCategory::Recent => "lastchange",
        }
    }
}

impl FromStr for TrendingCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "votes" => Ok(Self::Votes),
            "clicks" => Ok(Self::Clicks),
            "recent" => Ok(Self::Recent),
            other => Err(anyhow!("Unknown trending category: {other}")),
        }
    }
}

impl fmt::Display for TrendingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendingCategory::Votes => "votes",
            TrendingCategory::Clicks => "clicks",
            TrendingCategory::Recent => "recent",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_stationuuid_only() {
        let a = Station {
            stationuuid: "u1".into(),
            name: "One".into(),
            votes: 3,
            ..Default::default()
        };
        let b = Station {
            stationuuid: "u1".into(),
            name: "Renamed".into(),
            votes: 99,
            ..Default::default()
        };
        let c = Station {
            stationuuid: "u2".into(),
            name: "One".into(),
            ..Default::default()
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn parses_full_directory_record() {
        let body = r#"{
            "changeuuid":"c1","stationuuid":"u1","serveruuid":null,"name":"Test FM",
            "url":"http://example.com/live","url_resolved":"http://cdn.example.com/live.mp3",
            "homepage":"http://example.com","favicon":"","tags":"jazz, blues,,soul ",
            "country":"Tanzania","countrycode":"TZ","state":"","language":"swahili",
            "votes":42,"lastchangetime":"2024-01-02 03:04:05",
            "lastchangetime_iso8601":"2024-01-02T03:04:05Z","codec":"MP3","bitrate":128,
            "hls":0,"lastcheckok":1,"clickcount":7,"clicktrend":-2,"ssl_error":0,
            "geo_lat":null,"geo_long":null,"has_extended_info":false
        }"#;
        let station: Station = serde_json::from_str(body).unwrap();
        assert_eq!(station.stationuuid, "u1");
        assert_eq!(station.clicktrend, -2);
        assert_eq!(station.tag_list(), vec!["jazz", "blues", "soul"]);
        assert_eq!(station.playable_url(), "http://cdn.example.com/live.mp3");
        assert!(station.geo_lat.is_none());
    }

    #[test]
    fn requires_stationuuid() {
        assert!(serde_json::from_str::<Station>(r#"{"name":"No id"}"#).is_err());
    }

    #[test]
    fn playable_url_falls_back_to_stream_url() {
        let station = Station {
            stationuuid: "u1".into(),
            url: "http://example.com/live".into(),
            ..Default::default()
        };
        assert_eq!(station.playable_url(), "http://example.com/live");
    }

    #[test]
    fn trending_category_parses() {
        assert_eq!("votes".parse::<TrendingCategory>().unwrap(), TrendingCategory::Votes);
        assert_eq!(" Clicks".parse::<TrendingCategory>().unwrap(), TrendingCategory::Clicks);
        assert_eq!("recent".parse::<TrendingCategory>().unwrap().endpoint(), "lastchange");
        assert!("newest".parse::<TrendingCategory>().is_err());
    }
}
