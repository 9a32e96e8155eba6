//! Survey metadata as supplied by the data store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw survey row: an ordered, untyped string-keyed map
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// One uploaded survey (a source/year combination)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyMeta {
    pub id: String,
    /// Survey source label, e.g. "MGMA" or "SullivanCotter"
    #[serde(alias = "type")]
    pub name: String,
    pub year: i32,
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub specialty_count: u64,
    pub upload_date: DateTime<Utc>,
    /// Provider type applied when a row does not name one
    #[serde(default)]
    pub provider_type: Option<String>,
}
