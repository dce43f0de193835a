//! Application root wiring: injected storage, home feed, volume preference.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use radiodeck::audio::{AudioBackend, AudioHandle, StatusSender};
use radiodeck::config::AppConfig;
use radiodeck::favorites::FAVORITES_KEY;
use radiodeck::settings::VOLUME;
use radiodeck::storage::{KeyValueStore, MemoryStore};
use radiodeck::{App, Station};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoAudio;

#[async_trait]
impl AudioBackend for NoAudio {
    async fn acquire(
        &self,
        uri: &str,
        _volume: f32,
        _autoplay: bool,
        _status: StatusSender,
    ) -> Result<Box<dyn AudioHandle>> {
        Err(anyhow!("no audio output for {uri}"))
    }
}

fn config(base_url: String, persist_favorites: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.directory.base_url = base_url;
    config.news.sources = vec![];
    config.storage.persist_favorites = persist_favorites;
    config
}

fn station(id: &str) -> Station {
    Station {
        stationuuid: id.to_string(),
        name: id.to_uppercase(),
        ..Default::default()
    }
}

#[tokio::test]
async fn favorites_stay_in_memory_unless_wired() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let app = App::new(config("http://127.0.0.1:9".into(), false), Arc::new(NoAudio), storage.clone()).unwrap();
    app.favorites.add(station("a"));
    assert!(storage.get(FAVORITES_KEY).unwrap().is_none());
    app.shutdown().await;

    let app = App::new(config("http://127.0.0.1:9".into(), true), Arc::new(NoAudio), storage.clone()).unwrap();
    app.favorites.add(station("b"));
    app.shutdown().await;

    let app = App::new(config("http://127.0.0.1:9".into(), true), Arc::new(NoAudio), storage).unwrap();
    assert!(app.favorites.is_favorite("b"));
    assert!(!app.favorites.is_favorite("a"));
    app.shutdown().await;
}

#[tokio::test]
async fn saved_volume_seeds_the_player() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    storage.set(VOLUME, "0.3").unwrap();
    let app = App::new(config("http://127.0.0.1:9".into(), false), Arc::new(NoAudio), storage.clone()).unwrap();
    assert_eq!(app.player.state().volume, 0.3);

    app.set_volume(0.8).await;
    assert_eq!(storage.get(VOLUME).unwrap().as_deref(), Some("0.8"));
    app.shutdown().await;
}

#[tokio::test]
async fn home_feed_comes_from_country_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/bycountry/Tanzania"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"stationuuid": "a", "name": "A", "votes": 1, "clickcount": 50, "tags": "bongo"},
            {"stationuuid": "b", "name": "B", "votes": 9, "clickcount": 5, "tags": "gospel,bongo"}
        ])))
        .mount(&server)
        .await;

    let app = App::new(config(server.uri(), false), Arc::new(NoAudio), Arc::new(MemoryStore::new())).unwrap();
    let feed = app.home_feed("Tanzania").await;
    assert_eq!(feed.featured[0].stationuuid, "b");
    assert_eq!(feed.popular[0].stationuuid, "a");
    assert_eq!(feed.genres, vec!["All", "bongo", "gospel"]);
    app.shutdown().await;
}
