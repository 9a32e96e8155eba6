//! Freshness cache for the top-level aggregation snapshot
//!
//! Age windows, measured on the Tokio clock:
//! - younger than `stale_after`: fresh, served as is
//! - from `stale_after` up to `max_age`: served as is, and one detached
//!   background refresh is started
//! - older than `max_age`, or no snapshot: recomputed inline
//!
//! A background refresh runs under the cache's cancellation token and a
//! timeout. When it fails, times out or is cancelled, the previous snapshot
//! stays in place.

use crate::error::EngineError;
use futures::future::BoxFuture;
use pcb_common::config::CacheConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Snapshot age classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    Expired,
    Missing,
}

/// A stored value with its write time and version token
pub struct Snapshot<T> {
    pub value: Arc<T>,
    pub stored_at: Instant,
    /// New random token on every write
    pub version: Uuid,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            stored_at: self.stored_at,
            version: self.version,
        }
    }
}

struct Shared<T> {
    snapshot: RwLock<Option<Snapshot<T>>>,
    refreshing: AtomicBool,
    /// Bumped by `clear`; a refresh started under an older generation is discarded
    generation: AtomicU64,
    stale_after: Duration,
    max_age: Duration,
    refresh_timeout: Duration,
    cancel: CancellationToken,
}

impl<T> Shared<T> {
    fn read(&self) -> Option<Snapshot<T>> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(_) => {
                warn!("Freshness cache lock poisoned; treating as miss");
                None
            }
        }
    }

    /// Store `value` unless the cache was cleared since `generation`
    fn store(&self, value: T, generation: u64) -> Snapshot<T> {
        let snapshot = Snapshot {
            value: Arc::new(value),
            stored_at: Instant::now(),
            version: Uuid::new_v4(),
        };
        match self.snapshot.write() {
            Ok(mut guard) => {
                if self.generation.load(Ordering::Acquire) == generation {
                    *guard = Some(snapshot.clone());
                } else {
                    debug!("Cache cleared during computation; result not stored");
                }
            }
            Err(_) => warn!("Freshness cache lock poisoned; snapshot not stored"),
        }
        snapshot
    }
}

/// Clears the in-flight flag when the refresh task ends, even by panic
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Stale-while-revalidate holder for one value
pub struct FreshnessCache<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for FreshnessCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> FreshnessCache<T> {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_windows(config.stale_after(), config.max_age(), config.refresh_timeout())
    }

    pub fn with_windows(stale_after: Duration, max_age: Duration, refresh_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                snapshot: RwLock::new(None),
                refreshing: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                stale_after,
                max_age: max_age.max(stale_after),
                refresh_timeout,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> Option<Snapshot<T>> {
        self.shared.read()
    }

    pub fn version(&self) -> Option<Uuid> {
        self.snapshot().map(|s| s.version)
    }

    pub fn state(&self) -> Freshness {
        match self.snapshot() {
            Some(snapshot) => self.classify(&snapshot),
            None => Freshness::Missing,
        }
    }

    fn classify(&self, snapshot: &Snapshot<T>) -> Freshness {
        let age = snapshot.stored_at.elapsed();
        if age < self.shared.stale_after {
            Freshness::Fresh
        } else if age <= self.shared.max_age {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    /// Replace the snapshot
    pub fn store(&self, value: T) -> Snapshot<T> {
        let generation = self.shared.generation.load(Ordering::Acquire);
        self.shared.store(value, generation)
    }

    pub fn is_refreshing(&self) -> bool {
        self.shared.refreshing.load(Ordering::Acquire)
    }

    /// Serve the snapshot according to its age, computing with `loader`
    /// when needed
    ///
    /// Errors come only from an inline computation.
    pub async fn get_or_refresh<F>(&self, loader: F) -> Result<Arc<T>, EngineError>
    where
        F: Fn() -> BoxFuture<'static, Result<T, EngineError>>,
    {
        if let Some(snapshot) = self.snapshot() {
            match self.classify(&snapshot) {
                Freshness::Fresh => return Ok(snapshot.value),
                Freshness::Stale => {
                    self.spawn_refresh(&loader);
                    return Ok(snapshot.value);
                }
                Freshness::Expired | Freshness::Missing => {
                    debug!("Snapshot expired; recomputing inline");
                }
            }
        }

        let generation = self.shared.generation.load(Ordering::Acquire);
        let value = loader().await?;
        Ok(self.shared.store(value, generation).value)
    }

    /// Start a detached refresh unless one is already running
    fn spawn_refresh<F>(&self, loader: &F)
    where
        F: Fn() -> BoxFuture<'static, Result<T, EngineError>>,
    {
        if self
            .shared
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Background refresh already in flight");
            return;
        }

        let shared = Arc::clone(&self.shared);
        let generation = shared.generation.load(Ordering::Acquire);
        let refresh = loader();
        info!("Snapshot stale; starting background refresh");

        tokio::spawn(async move {
            let _guard = RefreshGuard(&shared.refreshing);
            let outcome = tokio::select! {
                _ = shared.cancel.cancelled() => Err(EngineError::Cancelled),
                result = tokio::time::timeout(shared.refresh_timeout, refresh) => match result {
                    Ok(inner) => inner,
                    Err(_) => Err(EngineError::Internal(format!(
                        "refresh exceeded {:?}",
                        shared.refresh_timeout
                    ))),
                },
            };

            match outcome {
                Ok(value) => {
                    let snapshot = shared.store(value, generation);
                    info!(version = %snapshot.version, "Background refresh complete");
                }
                Err(EngineError::Cancelled) => {
                    debug!("Background refresh cancelled; keeping previous snapshot");
                }
                Err(e) => {
                    error!(error = %e, "Background refresh failed; keeping previous snapshot");
                }
            }
        });
    }

    /// Drop the snapshot; refreshes already in flight will not store
    pub fn clear(&self) {
        match self.shared.snapshot.write() {
            Ok(mut guard) => {
                self.shared.generation.fetch_add(1, Ordering::AcqRel);
                *guard = None;
            }
            Err(poisoned) => {
                self.shared.generation.fetch_add(1, Ordering::AcqRel);
                *poisoned.into_inner() = None;
            }
        }
    }

    /// Cancel any in-flight background refresh
    pub fn shutdown(&self) {
        self.shared.cancel.cancel();
    }
}
