//! Caching layers
//!
//! - [`ComputationCache`]: content-addressed memoization of intermediate
//!   results (normalized rows, aggregations, filters, summaries)
//! - [`FreshnessCache`]: the top-level aggregation snapshot with
//!   stale-while-revalidate windows
//!
//! Neither layer ever returns an error. Internal faults degrade to a miss.

pub mod computation;
pub mod freshness;
pub mod keys;

pub use computation::{CacheEntry, ComputationCache, EntryInfo};
pub use freshness::{Freshness, FreshnessCache, Snapshot};
pub use keys::{cache_key, content_hash, records_digest, upstream_hash, Namespace};
