//! Normalized rows and aggregated records

use super::metrics::{Families, FamilyMetrics, MetricFamily, Percentiles};
use super::survey::RawRow;
use serde::{Deserialize, Serialize};

/// One raw survey row in canonical shape
///
/// Created once by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRow {
    pub specialty: String,
    pub provider_type: String,
    pub region: String,
    pub survey_source: String,
    pub survey_year: i32,
    pub n_orgs: f64,
    pub n_incumbents: f64,
    pub metrics: Families<Percentiles>,
    pub raw_data: RawRow,
}

impl NormalizedRow {
    /// Family percentiles combined with the row's sample sizes
    pub fn family_metrics(&self, family: MetricFamily) -> FamilyMetrics {
        FamilyMetrics::from_parts(self.n_orgs, self.n_incumbents, self.metrics.get(family))
    }
}

/// Composite grouping key of an aggregated record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey {
    pub specialty: String,
    pub provider_type: String,
    pub region: String,
    pub survey_source: String,
    pub survey_year: Option<i32>,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.specialty, self.provider_type, self.region, self.survey_source
        )?;
        if let Some(year) = self.survey_year {
            write!(f, "|{}", year)?;
        }
        Ok(())
    }
}

/// One aggregated group with three independent metric families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRecord {
    pub specialty: String,
    pub provider_type: String,
    pub region: String,
    pub survey_source: String,
    #[serde(default)]
    pub survey_year: Option<i32>,
    pub metrics: Families<FamilyMetrics>,
}

impl AggregatedRecord {
    /// Record for `key` with every family zeroed ("no data")
    pub fn empty(key: &GroupKey) -> Self {
        Self {
            specialty: key.specialty.clone(),
            provider_type: key.provider_type.clone(),
            region: key.region.clone(),
            survey_source: key.survey_source.clone(),
            survey_year: key.survey_year,
            metrics: Families::default(),
        }
    }

    pub fn key(&self) -> GroupKey {
        GroupKey {
            specialty: self.specialty.clone(),
            provider_type: self.provider_type.clone(),
            region: self.region.clone(),
            survey_source: self.survey_source.clone(),
            survey_year: self.survey_year,
        }
    }

    pub fn family(&self, family: MetricFamily) -> &FamilyMetrics {
        self.metrics.get(family)
    }

    /// Incumbents behind this record
    ///
    /// Families describe the same population, so the largest family count is
    /// used rather than their sum.
    pub fn sample_size(&self) -> f64 {
        self.metrics
            .iter()
            .map(|(_, m)| m.n_incumbents)
            .fold(0.0, f64::max)
    }

    /// Families whose reported percentiles are not non-decreasing
    pub fn ordering_violations(&self) -> Vec<MetricFamily> {
        self.metrics
            .iter()
            .filter(|(_, m)| !m.percentiles().is_ordered())
            .map(|(f, _)| f)
            .collect()
    }
}
