//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Elapsed wall-clock time since `earlier`, clamped at zero for future timestamps
pub fn age_of(earlier: DateTime<Utc>) -> std::time::Duration {
    (now() - earlier).to_std().unwrap_or_default()
}
