use anyhow::{anyhow, Context, Result};
use rand::{distributions::Alphanumeric, Rng};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// String key/value persistence for preferences and, when wired, favorites.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// A flat TOML table of string values, rewritten atomically on every change.
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl TomlFileStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = match fs::read(&path) {
            Ok(b) => {
                let text = String::from_utf8_lossy(&b);
                toml::from_str(&text).with_context(|| format!("Invalid store TOML: {path:?}"))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e).with_context(|| format!("Failed to read store: {path:?}")),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        // Memory only changes once the file holds the new map.
        let mut next = entries.clone();
        f(&mut next);
        let data = toml::to_string_pretty(&next).context("Failed to serialize store")?;
        write_atomic(&self.path, data.as_bytes())?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStore for TomlFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().context("Store path has no parent")?;
    ensure_private_dir(parent)?;

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    let tmp = parent.join(format!(
        ".{}.tmp.{suffix}",
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("store.toml")
    ));

    let written = write_and_rename(&tmp, path, data);
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written?;

    let dir_file = fs::File::open(parent).with_context(|| format!("Open store dir: {parent:?}"))?;
    let _ = dir_file.sync_all();

    Ok(())
}

fn write_and_rename(tmp: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(tmp).with_context(|| format!("Create temp file: {tmp:?}"))?;
    file.write_all(data)
        .with_context(|| format!("Write temp file: {tmp:?}"))?;
    file.sync_all()
        .with_context(|| format!("Sync temp file: {tmp:?}"))?;
    drop(file);
    fs::rename(tmp, path).with_context(|| format!("Atomic rename to: {path:?}"))
}

pub(crate) fn ensure_private_dir(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::create_dir_all(path).with_context(|| format!("Create dir: {path:?}"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Set permissions on dir: {path:?}"))?;
    }
    Ok(())
}
