use crate::audio::AudioBackend;
use crate::catalog::HomeFeed;
use crate::config::AppConfig;
use crate::controller::PlayerService;
use crate::favorites::FavoritesStore;
use crate::news::NewsClient;
use crate::radio_browser::RadioBrowserClient;
use crate::settings::{self, SettingsStore};
use crate::storage::KeyValueStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Owns every service. Consumers borrow what they need from here; nothing is
/// reachable through globals.
pub struct App {
    pub config: AppConfig,
    pub directory: RadioBrowserClient,
    pub news: NewsClient,
    pub favorites: FavoritesStore,
    pub settings: SettingsStore,
    pub player: PlayerService,
}

impl App {
    /// Must be called inside a tokio runtime; the player controller is spawned here.
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn AudioBackend>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let directory = RadioBrowserClient::new(&config.directory)?;
        let news = NewsClient::new(&config.news, &config.directory.user_agent)?;
        let favorites = if config.storage.persist_favorites {
            FavoritesStore::with_storage(Arc::clone(&storage))
        } else {
            FavoritesStore::new()
        };
        let volume_saved = matches!(storage.get(settings::VOLUME), Ok(Some(_)));
        let settings = SettingsStore::load(storage);

        // A saved volume preference beats the configured default.
        let mut player_config = config.player.clone();
        if volume_saved {
            player_config.default_volume = settings.settings().volume;
        }
        let player = PlayerService::start(backend, &player_config);

        info!(
            directory = %directory.base_url(),
            news_sources = news.sources().len(),
            persist_favorites = config.storage.persist_favorites,
            "services ready"
        );

        Ok(Self {
            config,
            directory,
            news,
            favorites,
            settings,
            player,
        })
    }

    pub async fn home_feed(&self, country: &str) -> HomeFeed {
        let stations = self.directory.by_country(country).await;
        HomeFeed::from_stations(&stations)
    }

    /// Sets the live volume and remembers it as a preference.
    pub async fn set_volume(&self, volume: f32) {
        self.player.set_volume(volume).await;
        self.settings.set_volume(self.player.state().volume);
    }

    pub async fn shutdown(self) {
        self.player.shutdown().await;
    }
}
