use crate::storage::KeyValueStore;
use anyhow::{anyhow, Error};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

pub const DARK_MODE: &str = "settings_darkMode";
pub const STREAM_QUALITY: &str = "settings_streamQuality";
pub const NOTIFICATIONS: &str = "settings_notifications";
pub const SLEEP_TIMER: &str = "settings_sleepTimer";
pub const AUTO_DOWNLOAD: &str = "settings_autoDownload";
pub const DATA_SAVER: &str = "settings_dataSaver";
pub const VOLUME: &str = "settings_volume";
pub const BUFFER_SIZE: &str = "settings_bufferSize";
pub const OFFLINE_MODE: &str = "settings_offlineMode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamQuality {
    Low,
    Medium,
    High,
}

impl StreamQuality {
    pub fn kbps(self) -> u32 {
        match self {
            StreamQuality::Low => 64,
            StreamQuality::Medium => 128,
            StreamQuality::High => 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSize {
    Small,
    Normal,
    Large,
}

macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(anyhow!("Unknown {}: {other}", stringify!($ty))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($ty::$variant => $text,)+
                })
            }
        }
    };
}

string_enum!(StreamQuality { Low => "Low", Medium => "Medium", High => "High" });
string_enum!(BufferSize { Small => "Small", Normal => "Normal", Large => "Large" });

/// User preferences, each persisted as a string under its own key.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dark_mode: bool,
    pub stream_quality: StreamQuality,
    pub notifications: bool,
    pub sleep_timer: bool,
    pub auto_download: bool,
    pub data_saver: bool,
    pub volume: f32,
    pub buffer_size: BufferSize,
    pub offline_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: true,
            stream_quality: StreamQuality::High,
            notifications: true,
            sleep_timer: false,
            auto_download: false,
            data_saver: false,
            volume: 1.0,
            buffer_size: BufferSize::Normal,
            offline_mode: false,
        }
    }
}

pub struct SettingsStore {
    storage: Arc<dyn KeyValueStore>,
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Reads every key once. Booleans load as `value == "true"`; enum and
    /// volume keys keep their default when missing or unparsable.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = ?e, "failed to read setting");
                None
            }
        };
        let flag = |key: &str| read(key).as_deref() == Some("true");

        let defaults = Settings::default();
        let settings = Settings {
            dark_mode: flag(DARK_MODE),
            stream_quality: read(STREAM_QUALITY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.stream_quality),
            notifications: flag(NOTIFICATIONS),
            sleep_timer: flag(SLEEP_TIMER),
            auto_download: flag(AUTO_DOWNLOAD),
            data_saver: flag(DATA_SAVER),
            volume: read(VOLUME)
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(defaults.volume),
            buffer_size: read(BUFFER_SIZE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.buffer_size),
            offline_mode: flag(OFFLINE_MODE),
        };

        let (tx, _rx) = watch::channel(settings);
        Self { storage, tx }
    }

    pub fn settings(&self) -> Settings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    pub fn set_dark_mode(&self, on: bool) {
        self.tx.send_modify(|s| s.dark_mode = on);
        self.save_setting(DARK_MODE, on);
    }

    pub fn set_stream_quality(&self, quality: StreamQuality) {
        self.tx.send_modify(|s| s.stream_quality = quality);
        self.save_setting(STREAM_QUALITY, quality);
    }

    pub fn set_notifications(&self, on: bool) {
        self.tx.send_modify(|s| s.notifications = on);
        self.save_setting(NOTIFICATIONS, on);
    }

    pub fn set_sleep_timer(&self, on: bool) {
        self.tx.send_modify(|s| s.sleep_timer = on);
        self.save_setting(SLEEP_TIMER, on);
    }

    pub fn set_auto_download(&self, on: bool) {
        self.tx.send_modify(|s| s.auto_download = on);
        self.save_setting(AUTO_DOWNLOAD, on);
    }

    pub fn set_data_saver(&self, on: bool) {
        self.tx.send_modify(|s| s.data_saver = on);
        self.save_setting(DATA_SAVER, on);
    }

    pub fn set_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.tx.send_modify(|s| s.volume = volume);
        self.save_setting(VOLUME, volume);
    }

    pub fn set_buffer_size(&self, size: BufferSize) {
        self.tx.send_modify(|s| s.buffer_size = size);
        self.save_setting(BUFFER_SIZE, size);
    }

    pub fn set_offline_mode(&self, on: bool) {
        self.tx.send_modify(|s| s.offline_mode = on);
        self.save_setting(OFFLINE_MODE, on);
    }

    fn save_setting(&self, key: &str, value: impl ToString) {
        if let Err(e) = self.storage.set(key, &value.to_string()) {
            warn!(key, error = ?e, "error saving setting");
        }
    }
}
