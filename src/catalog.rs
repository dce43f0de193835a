use crate::models::Station;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashSet;

pub const FEATURED_COUNT: usize = 5;
pub const POPULAR_COUNT: usize = 10;
pub const RECENT_COUNT: usize = 10;
pub const MAX_GENRES: usize = 15;
pub const ALL_GENRES: &str = "All";
/// Shown before any listing has produced tags.
pub const DEFAULT_GENRES: [&str; 10] = [
    ALL_GENRES,
    "Pop",
    "Rock",
    "Jazz",
    "Classical",
    "Hip Hop",
    "R&B",
    "Dance",
    "Reggae",
    "Folk",
];

/// Station rails for a landing screen, derived from one country listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeFeed {
    pub featured: Vec<Station>,
    pub popular: Vec<Station>,
    pub recent: Vec<Station>,
    pub genres: Vec<String>,
}

impl HomeFeed {
    pub fn from_stations(stations: &[Station]) -> Self {
        let mut by_votes = stations.to_vec();
        by_votes.sort_by_key(|s| Reverse(s.votes));
        by_votes.truncate(FEATURED_COUNT);

        let mut by_clicks = stations.to_vec();
        by_clicks.sort_by_key(|s| Reverse(s.clickcount));
        by_clicks.truncate(POPULAR_COUNT);

        let mut by_change = stations.to_vec();
        by_change.sort_by_key(|s| Reverse(last_change(s)));
        by_change.truncate(RECENT_COUNT);

        Self {
            featured: by_votes,
            popular: by_clicks,
            recent: by_change,
            genres: genres(stations),
        }
    }
}

/// `"All"` followed by distinct tags in first-seen order. An empty listing
/// yields [`DEFAULT_GENRES`].
pub fn genres(stations: &[Station]) -> Vec<String> {
    if stations.is_empty() {
        return DEFAULT_GENRES.iter().map(|g| g.to_string()).collect();
    }
    let mut out = vec![ALL_GENRES.to_string()];
    let mut seen = HashSet::new();
    for tag in stations.iter().flat_map(|s| s.tag_list()) {
        if out.len() >= MAX_GENRES {
            break;
        }
        if seen.insert(tag) {
            out.push(tag.to_string());
        }
    }
    out
}

// Stations whose change time cannot be parsed sort last.
fn last_change(station: &Station) -> Option<DateTime<Utc>> {
    if let Some(iso) = station.lastchangetime_iso8601.as_deref() {
        if let Ok(t) = DateTime::parse_from_rfc3339(iso) {
            return Some(t.with_timezone(&Utc));
        }
    }
    NaiveDateTime::parse_from_str(station.lastchangetime.trim(), "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}
