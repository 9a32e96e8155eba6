//! Record filtering and dataset summaries
//!
//! Plain functions over aggregated records; the service caches their results
//! under the `filter` and `summary` namespaces.

use crate::models::{AggregatedRecord, NormalizedRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dimension filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub survey_source: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self == &RecordFilter::default()
    }

    /// Case-insensitive match on every set dimension
    pub fn matches(&self, record: &AggregatedRecord) -> bool {
        fn text_matches(wanted: &Option<String>, actual: &str) -> bool {
            wanted
                .as_deref()
                .map_or(true, |w| w.trim().eq_ignore_ascii_case(actual.trim()))
        }

        text_matches(&self.specialty, &record.specialty)
            && text_matches(&self.survey_source, &record.survey_source)
            && text_matches(&self.region, &record.region)
            && text_matches(&self.provider_type, &record.provider_type)
            && self.year.map_or(true, |y| record.survey_year == Some(y))
    }
}

pub fn filter_records(records: &[AggregatedRecord], filter: &RecordFilter) -> Vec<AggregatedRecord> {
    records.iter().filter(|r| filter.matches(r)).cloned().collect()
}

/// Distinct dimension values and counts of the loaded dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub specialties: Vec<String>,
    pub regions: Vec<String>,
    pub provider_types: Vec<String>,
    pub survey_sources: Vec<String>,
    pub years: Vec<i32>,
    pub row_count: usize,
    pub record_count: usize,
}

/// Summarize normalized rows and the records aggregated from them
///
/// Value lists are sorted and de-duplicated.
pub fn summarize(rows: &[NormalizedRow], records: &[AggregatedRecord]) -> DatasetSummary {
    let distinct = |f: fn(&NormalizedRow) -> &str| -> Vec<String> {
        rows.iter()
            .map(f)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    DatasetSummary {
        specialties: distinct(|r| r.specialty.as_str()),
        regions: distinct(|r| r.region.as_str()),
        provider_types: distinct(|r| r.provider_type.as_str()),
        survey_sources: distinct(|r| r.survey_source.as_str()),
        years: rows
            .iter()
            .map(|r| r.survey_year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        row_count: rows.len(),
        record_count: records.len(),
    }
}
