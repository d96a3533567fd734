//! Durable token persistence: two independent key-value entries with
//! distinct lifetimes, surviving process restarts. The access token entry is
//! short-lived (15 minutes), the refresh token entry long-lived (7 days);
//! expired entries read as absent. Values are stored in the clear; this store
//! does not encrypt credentials.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const ACCESS_TOKEN_KEY: &str = "auth-access-token";
pub const REFRESH_TOKEN_KEY: &str = "auth-refresh-token";

pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Key-value store for tokens with per-entry expiry.
pub trait TokenStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error>;

    /// Read a live entry. Expired or missing entries return `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Drop an entry; removing an absent key is a no-op.
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

#[derive(Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    /// Absolute expiry, unix milliseconds.
    expires_at: u64,
}

impl StoredEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        let expires_at = now_millis().saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        Self {
            value: value.to_string(),
            expires_at,
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at > now_millis()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// In-process store, used in tests and for callers that do not want
/// persistence across restarts.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), StoredEntry::new(value, ttl));
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON document mapping keys to entries, rewritten on
/// every mutation. An unreadable or corrupt file reads as empty rather than
/// failing, so a damaged cache only costs a re-login.
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> HashMap<String, StoredEntry> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                debug!("ignoring corrupt token store {}: {err}", self.path.display());
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn save(&self, entries: &HashMap<String, StoredEntry>) -> Result<(), Error> {
        let bytes = serde_json::to_vec(entries)?;
        std::fs::write(&self.path, bytes).map_err(|err| {
            Error::Storage(format!(
                "failed to write token store {}: {err}",
                self.path.display()
            ))
        })
    }
}

impl TokenStore for FileTokenStore {
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load();
        entries.insert(key.to_string(), StoredEntry::new(value, ttl));
        self.save(&entries)
    }

    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load()
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(&entries)
    }
}
