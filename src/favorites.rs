use crate::models::Station;
use crate::storage::KeyValueStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

pub const FAVORITES_KEY: &str = "favorites";

/// Insertion-ordered favorite stations, unique by `stationuuid`.
///
/// Mutations are synchronous and published to every subscriber before the
/// call returns. Without a store attached the set lives in memory only.
pub struct FavoritesStore {
    tx: watch::Sender<Vec<Station>>,
    storage: Option<Arc<dyn KeyValueStore>>,
}

impl Default for FavoritesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FavoritesStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self { tx, storage: None }
    }

    /// Loads favorites from `storage` and writes them back after every change.
    pub fn with_storage(storage: Arc<dyn KeyValueStore>) -> Self {
        let initial = match load_favorites(storage.as_ref()) {
            Ok(list) => list,
            Err(e) => {
                warn!(error = ?e, "failed to load favorites, starting empty");
                Vec::new()
            }
        };
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            storage: Some(storage),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Station>> {
        self.tx.subscribe()
    }

    pub fn list(&self) -> Vec<Station> {
        self.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    pub fn is_favorite(&self, stationuuid: &str) -> bool {
        self.tx.borrow().iter().any(|s| s.stationuuid == stationuuid)
    }

    pub fn add(&self, station: Station) {
        if station.stationuuid.trim().is_empty() {
            warn!(name = %station.name, "refusing favorite without stationuuid");
            return;
        }
        let changed = self.tx.send_if_modified(|list| {
            if list.iter().any(|s| s.stationuuid == station.stationuuid) {
                return false;
            }
            list.push(station);
            true
        });
        if changed {
            self.persist();
        }
    }

    pub fn remove(&self, stationuuid: &str) {
        let changed = self.tx.send_if_modified(|list| {
            let before = list.len();
            list.retain(|s| s.stationuuid != stationuuid);
            list.len() != before
        });
        if changed {
            self.persist();
        }
    }

    /// Returns whether the station is a favorite afterwards.
    pub fn toggle(&self, station: Station) -> bool {
        if self.is_favorite(&station.stationuuid) {
            self.remove(&station.stationuuid);
            false
        } else {
            let id = station.stationuuid.clone();
            self.add(station);
            self.is_favorite(&id)
        }
    }

    fn persist(&self) {
        let snapshot = self.list();
        let Some(storage) = &self.storage else {
            debug!(count = snapshot.len(), "favorites changed (not persisted)");
            return;
        };
        if let Err(e) = save_favorites(storage.as_ref(), &snapshot) {
            warn!(error = ?e, "failed to save favorites");
        }
    }
}

fn load_favorites(storage: &dyn KeyValueStore) -> Result<Vec<Station>> {
    let Some(raw) = storage.get(FAVORITES_KEY)? else {
        return Ok(Vec::new());
    };
    let mut list: Vec<Station> = serde_json::from_str(&raw).context("Invalid stored favorites")?;
    let mut seen = std::collections::HashSet::new();
    list.retain(|s| seen.insert(s.stationuuid.clone()));
    Ok(list)
}

fn save_favorites(storage: &dyn KeyValueStore, list: &[Station]) -> Result<()> {
    let raw = serde_json::to_string(list).context("Failed to serialize favorites")?;
    storage.set(FAVORITES_KEY, &raw)
}
