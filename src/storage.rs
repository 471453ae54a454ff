//! Persistent key-value storage for session flags.
//!
//! The authenticated flag and the pending post-login redirect are the only
//! session state that survives a restart. Both live here, behind the
//! `KeyValueStore` trait; the in-memory token data does not.
//!
//! `FileStore` persists entries as a single JSON object under the platform
//! config directory. `MemoryStore` backs tests and ephemeral runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;

/// Store file name in the data directory
const STORE_FILE: &str = "session_state.json";

/// String key-value storage: get/set/remove, no error channel on
/// mutation. Failed writes are logged and the in-memory view stays
/// authoritative for the rest of the run.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// JSON-file-backed store. Every mutation rewrites the file; a corrupt or
/// missing file degrades to an empty store rather than failing startup.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        let path = dir.join(STORE_FILE);

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Corrupt session state file, starting empty");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Write entries to disk via a temp file and rename, so a crash
    /// mid-write cannot leave a truncated store behind.
    fn persist(&self, entries: &HashMap<String, String>) {
        let write = || -> Result<()> {
            let contents = serde_json::to_string_pretty(entries)?;
            let tmp = self.path.with_extension("json.tmp");
            std::fs::write(&tmp, contents)?;
            std::fs::rename(&tmp, &self.path)?;
            Ok(())
        };
        if let Err(e) = write() {
            warn!(error = %e, path = %self.path.display(), "Failed to persist session state");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
            self.persist(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(key).is_some() {
                self.persist(&entries);
            }
        }
    }
}

/// In-memory store with the same contract. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
