use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_DIR: &str = "radiodeck";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_mpv_binary")]
    pub mpv_binary: String,
    /// Where mpv IPC sockets live. Falls back to `$XDG_RUNTIME_DIR/radiodeck`.
    #[serde(default)]
    pub socket_dir: Option<PathBuf>,
    #[serde(default = "default_envelope_bands")]
    pub envelope_bands: usize,
    #[serde(default = "default_tick_ms")]
    pub envelope_tick_ms: u64,
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides the key-value store location.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Wire favorites to the key-value store. Off by default: favorites live
    /// in memory only unless this is set.
    #[serde(default)]
    pub persist_favorites: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl DirectoryConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            sources: default_news_sources(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl NewsConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mpv_binary: default_mpv_binary(),
            socket_dir: None,
            envelope_bands: default_envelope_bands(),
            envelope_tick_ms: default_tick_ms(),
            default_volume: default_volume(),
        }
    }
}

impl PlayerConfig {
    pub fn envelope_tick(&self) -> Duration {
        Duration::from_millis(self.envelope_tick_ms.max(1))
    }
}

fn default_base_url() -> String {
    "https://de1.api.radio-browser.info".to_string()
}

fn default_user_agent() -> String {
    "radiodeck/0.1 (+https://github.com/radiodeck/radiodeck)".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    15
}

fn default_news_sources() -> Vec<String> {
    vec![
        "https://api.example.com/news/millardayo".to_string(),
        "https://api.example.com/news/tanzanianews".to_string(),
    ]
}

fn default_mpv_binary() -> String {
    "mpv".to_string()
}

fn default_envelope_bands() -> usize {
    50
}

fn default_tick_ms() -> u64 {
    100
}

fn default_volume() -> f32 {
    1.0
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read config: {path:?}")),
        };
        let text = String::from_utf8_lossy(&bytes);
        toml::from_str(&text).with_context(|| format!("Invalid config TOML: {path:?}"))
    }

    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(p) => Ok(p.clone()),
            None => Ok(config_dir()?.join("store.toml")),
        }
    }

    pub fn socket_dir(&self) -> PathBuf {
        if let Some(dir) = &self.player.socket_dir {
            return dir.clone();
        }
        std::env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR)
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .context("Could not determine XDG config directory")?;
    Ok(base.join(APP_DIR))
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
