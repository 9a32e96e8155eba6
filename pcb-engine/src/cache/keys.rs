//! Deterministic cache keys
//!
//! Keys hash a projection of the inputs that matter. Survey listings are
//! reduced to identity and size; derived views key on the full records they
//! were computed from, since a recompute can change values without changing
//! any dimension.

use crate::models::{AggregatedRecord, SurveyMeta};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Cache key namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Normalized,
    Aggregate,
    Filter,
    Summary,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Normalized => "normalized",
            Namespace::Aggregate => "aggregate",
            Namespace::Filter => "filter",
            Namespace::Summary => "summary",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 hex digest of the JSON encoding of `value`
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

/// `<namespace>:<hash>`
pub fn cache_key(namespace: Namespace, hash: &str) -> String {
    format!("{}:{}", namespace, hash)
}

/// Hash of every record, values included, in order
pub fn records_digest(records: &[AggregatedRecord]) -> String {
    content_hash(records)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SurveyProjection<'a> {
    id: &'a str,
    upload_date: DateTime<Utc>,
    row_count: u64,
    specialty_count: u64,
}

/// Hash identifying the current upstream survey set
///
/// Covers id, upload date, row count and specialty count of every survey.
/// Listing order does not matter.
pub fn upstream_hash(surveys: &[SurveyMeta]) -> String {
    let mut projection: Vec<SurveyProjection<'_>> = surveys
        .iter()
        .map(|survey| SurveyProjection {
            id: &survey.id,
            upload_date: survey.upload_date,
            row_count: survey.row_count,
            specialty_count: survey.specialty_count,
        })
        .collect();
    projection.sort_by(|a, b| a.id.cmp(b.id));
    content_hash(&projection)
}
