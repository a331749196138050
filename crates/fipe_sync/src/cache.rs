//! Two-tier response cache.
//!
//! Lookups check an in-process map first, then one JSON file per key under
//! the cache directory. A disk hit is promoted into memory. Entries carry
//! their write time and are treated as absent once older than the TTL; they
//! are not evicted eagerly.
//!
//! The cache cannot tell an empty upstream answer from a missing entry, so
//! callers must not store empty responses.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Default time-to-live for cached responses: 7 days.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be created or read.
    #[error("cache directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cache file could not be written.
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cache payload could not be serialized.
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// A cached value with its write time (epoch milliseconds).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub timestamp: i64,
}

/// On-disk payload. `key` guards against hash collisions and stale layouts.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    timestamp: i64,
    #[serde(default)]
    key: Option<String>,
    value: Value,
}

/// Disk usage summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub files: usize,
    pub bytes: u64,
    pub expired: usize,
}

/// Two-tier TTL cache keyed by request signature.
#[derive(Debug)]
pub struct CacheStore {
    dir: Option<PathBuf>,
    ttl: Duration,
    memory: Mutex<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    /// Open a disk-backed cache, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Directory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir: Some(dir),
            ttl,
            memory: Mutex::new(HashMap::new()),
        })
    }

    /// A cache without a durable tier.
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            dir: None,
            ttl,
            memory: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, now_ms())
    }

    /// Store a value in both tiers.
    ///
    /// The memory tier is always updated; a failed disk write is reported
    /// but leaves the in-memory entry in place.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_at(key, value, now_ms())
    }

    pub(crate) fn get_at(&self, key: &str, now: i64) -> Option<Value> {
        {
            let memory = self.memory.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = memory.get(key)
                && !self.is_expired(entry.timestamp, now)
            {
                return Some(entry.value.clone());
            }
        }

        let dir = self.dir.as_ref()?;
        let path = dir.join(file_name(key));
        let file = read_cache_file(&path)?;
        if file.key.as_deref().is_some_and(|k| k != key) {
            tracing::debug!(key, path = %path.display(), "Cache file key mismatch");
            return None;
        }
        if self.is_expired(file.timestamp, now) {
            return None;
        }

        let mut memory = self.memory.lock().unwrap_or_else(|e| e.into_inner());
        memory.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                value: file.value.clone(),
                timestamp: file.timestamp,
            },
        );
        Some(file.value)
    }

    pub(crate) fn set_at(&self, key: &str, value: Value, now: i64) -> Result<()> {
        {
            let mut memory = self.memory.lock().unwrap_or_else(|e| e.into_inner());
            memory.insert(
                key.to_string(),
                CacheEntry {
                    key: key.to_string(),
                    value: value.clone(),
                    timestamp: now,
                },
            );
        }

        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path = dir.join(file_name(key));
        let payload = serde_json::to_vec(&CacheFile {
            timestamp: now,
            key: Some(key.to_string()),
            value,
        })?;
        write_atomic(&path, &payload).map_err(|source| CacheError::Write { path, source })
    }

    /// Drop every entry from both tiers. Returns the number of files removed.
    pub fn clear(&self) -> Result<usize> {
        self.memory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        let mut removed = 0;
        for path in self.cache_files()? {
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete expired cache files. Returns the number removed.
    pub fn prune_expired(&self) -> Result<usize> {
        let now = now_ms();
        let mut removed = 0;
        for path in self.cache_files()? {
            let expired = match read_cache_file(&path) {
                Some(file) => self.is_expired(file.timestamp, now),
                None => true,
            };
            if expired && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        self.memory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|_, entry| !self.is_expired(entry.timestamp, now));
        Ok(removed)
    }

    /// Summarize the durable tier.
    pub fn stats(&self) -> Result<CacheStats> {
        let now = now_ms();
        let mut stats = CacheStats::default();
        for path in self.cache_files()? {
            stats.files += 1;
            stats.bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            match read_cache_file(&path) {
                Some(file) if !self.is_expired(file.timestamp, now) => {}
                _ => stats.expired += 1,
            }
        }
        Ok(stats)
    }

    fn is_expired(&self, timestamp: i64, now: i64) -> bool {
        let age = now.saturating_sub(timestamp);
        age < 0 || age as u128 > self.ttl.as_millis()
    }

    fn cache_files(&self) -> Result<Vec<PathBuf>> {
        let Some(dir) = &self.dir else {
            return Ok(Vec::new());
        };
        let entries = fs::read_dir(dir).map_err(|source| CacheError::Directory {
            path: dir.clone(),
            source,
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// File name for a cache key: readable namespace prefix plus a digest.
fn file_name(key: &str) -> String {
    let namespace: String = key
        .split(':')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(32)
        .collect();
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    if namespace.is_empty() {
        format!("{digest}.json")
    } else {
        format!("{namespace}-{digest}.json")
    }
}

fn read_cache_file(path: &Path) -> Option<CacheFile> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice::<CacheFile>(&bytes) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable cache file");
            None
        }
    }
}

/// Write to a sibling temp file, then rename over the target.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
