//! Data model for the benchmark engine
//!
//! - Survey metadata and raw rows as delivered by the data store
//! - Canonical metric families shared by rows and aggregated records
//! - Flat-field adapter for export and legacy inputs

pub mod flat;
pub mod metrics;
pub mod records;
pub mod survey;

pub use flat::{flatten_record, lift_flat_record};
pub use metrics::{Families, FamilyMetrics, MetricFamily, Percentile, Percentiles};
pub use records::{AggregatedRecord, GroupKey, NormalizedRow};
pub use survey::{RawRow, SurveyMeta};
