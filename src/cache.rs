//! Response cache storage
//!
//! Stores the accumulated item list of a query under a `(source, name)` key
//! together with its write time. Expiry policy lives in the query client; a
//! store only reports how old an entry is.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use url::form_urlencoded::byte_serialize;

/// Identifies one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: String,
    name: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }

    /// File name for this key. Both parts are form-urlencoded, so distinct
    /// names never share a file and no path separator survives.
    pub fn file_name(&self) -> String {
        let source: String = byte_serialize(self.source.as_bytes()).collect();
        let name: String = byte_serialize(self.name.as_bytes()).collect();
        format!("{}-{}.json", source, name)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.name)
    }
}

/// A cached item list and how long ago it was written
#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub items: Vec<Value>,
    pub age: Duration,
}

/// Key-value storage for query results
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read an entry; `Ok(None)` when absent
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedPayload>>;

    /// Replace an entry with a complete payload
    async fn put(&self, key: &CacheKey, items: &[Value]) -> Result<()>;
}

/// One JSON file per entry; age is taken from the file's modification time
pub struct FileCache {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedPayload>> {
        let path = self.path_for(key);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let age = SystemTime::now()
            .duration_since(metadata.modified()?)
            .unwrap_or_default();
        let content = tokio::fs::read_to_string(&path).await?;
        let items: Vec<Value> = serde_json::from_str(&content)?;

        Ok(Some(CachedPayload { items, age }))
    }

    async fn put(&self, key: &CacheKey, items: &[Value]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write to a unique temp file, then rename over the entry
        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.dir.join(format!(
            ".{}.{}-{}.tmp",
            key.file_name(),
            std::process::id(),
            seq
        ));
        let content = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&tmp_path, content).await?;

        if let Err(e) = tokio::fs::rename(&tmp_path, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

struct MemoryEntry {
    items: Vec<Value>,
    written_at: SystemTime,
}

/// In-process cache, mainly for tests and short-lived runs
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry with an explicit write time
    pub async fn insert_written_at(&self, key: CacheKey, items: Vec<Value>, written_at: SystemTime) {
        let mut entries = self.entries.write().await;
        entries.insert(key, MemoryEntry { items, written_at });
    }

}

#[cfg(test)]
impl MemoryCache {
    pub(crate) async fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub(crate) async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedPayload>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|entry| CachedPayload {
            items: entry.items.clone(),
            age: SystemTime::now()
                .duration_since(entry.written_at)
                .unwrap_or_default(),
        }))
    }

    async fn put(&self, key: &CacheKey, items: &[Value]) -> Result<()> {
        self.insert_written_at(key.clone(), items.to_vec(), SystemTime::now())
            .await;
        Ok(())
    }
}
