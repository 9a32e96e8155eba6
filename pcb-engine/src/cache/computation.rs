//! Content-addressed computation cache
//!
//! Values are stored type-erased behind `Arc<dyn Any>`; a `get` with the
//! wrong type is a miss. Keys carry a namespace prefix (`aggregate:<hash>`)
//! so one namespace can be cleared without touching the others.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// One cached value
pub struct CacheEntry {
    pub key: String,
    pub value: Arc<dyn Any + Send + Sync>,
    pub created_at: DateTime<Utc>,
    /// Write sequence number, strictly increasing per cache instance
    pub version: u64,
}

/// Metadata of an entry, without its value
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

#[derive(Default)]
pub struct ComputationCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    writes: AtomicU64,
}

impl ComputationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, cloned out of the cache
    ///
    /// Store `Arc<T>` for large values so the clone is cheap.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(_) => {
                warn!(key, "Computation cache lock poisoned; treating as miss");
                return None;
            }
        };
        let value = entries.get(key)?.value.downcast_ref::<T>().cloned();
        if value.is_none() {
            debug!(key, "Cached value has a different type; treating as miss");
        }
        value
    }

    /// Store `value` under `key`, replacing any previous entry
    ///
    /// Returns the entry's version, or `None` when the cache is unusable.
    pub fn set<T>(&self, key: impl Into<String>, value: T) -> Option<u64>
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(_) => {
                warn!(key = %key, "Computation cache lock poisoned; value not cached");
                return None;
            }
        };
        let version = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value: Arc::new(value),
                created_at: pcb_common::time::now(),
                version,
            },
        );
        Some(version)
    }

    pub fn info(&self, key: &str) -> Option<EntryInfo> {
        let entries = self.entries.read().ok()?;
        entries.get(key).map(|entry| EntryInfo {
            created_at: entry.created_at,
            version: entry.version,
        })
    }

    /// Remove every entry, or only those in `namespace`
    ///
    /// Returns the number of entries removed. A poisoned lock is recovered
    /// here, since emptying the map cannot observe a half-written entry.
    pub fn clear(&self, namespace: Option<&str>) -> usize {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = entries.len();
        match namespace {
            None => entries.clear(),
            Some(ns) => {
                let prefix = format!("{}:", ns);
                entries.retain(|key, _| !key.starts_with(&prefix));
            }
        }
        let removed = before - entries.len();
        debug!(namespace = ?namespace, removed, "Computation cache cleared");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
