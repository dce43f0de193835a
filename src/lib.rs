pub mod app;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod favorites;
pub mod models;
pub mod mpv;
pub mod news;
pub mod radio_browser;
pub mod settings;
pub mod storage;
pub mod visualizer;

pub use app::App;
pub use controller::{PlaybackPhase, PlaybackState, PlayerService};
pub use favorites::FavoritesStore;
pub use models::{Station, TrendingCategory};
pub use news::{NewsClient, NewsItem};
pub use radio_browser::RadioBrowserClient;
