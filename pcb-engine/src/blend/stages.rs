//! Blend arithmetic
//!
//! Stage 1 collapses each year's records to one record per specialty with an
//! incumbent-weighted average. Stage 2 combines those year-level records
//! across years with one weight per year.

use super::types::{BlendConfig, BlendMethod};
use crate::models::{AggregatedRecord, FamilyMetrics, MetricFamily, Percentile};
use std::collections::HashMap;
use tracing::debug;

/// Dimension label used when the combined records disagree
pub const MIXED_DIMENSION: &str = "All";

/// Survey source label of cross-year records
pub const BLENDED_SOURCE: &str = "Blended";

/// Shared value of a dimension, or [`MIXED_DIMENSION`]
fn common_value<'a>(mut values: impl Iterator<Item = &'a str>) -> String {
    let Some(first) = values.next() else {
        return MIXED_DIMENSION.to_string();
    };
    if values.all(|v| v == first) {
        first.to_string()
    } else {
        MIXED_DIMENSION.to_string()
    }
}

/// Records grouped by specialty in first-seen order
fn group_by_specialty<'a, I>(records: I) -> Vec<(String, Vec<&'a AggregatedRecord>)>
where
    I: IntoIterator<Item = &'a AggregatedRecord>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&AggregatedRecord>)> = Vec::new();
    for record in records {
        match index.get(record.specialty.as_str()) {
            Some(slot) => groups[*slot].1.push(record),
            None => {
                index.insert(record.specialty.as_str(), groups.len());
                groups.push((record.specialty.clone(), vec![record]));
            }
        }
    }
    groups
}

/// Incumbent-weighted combination of one family across records
///
/// Only records whose family has data take part. Counts are summed. When the
/// participants report no incumbents at all, they are averaged equally.
fn weighted_family(members: &[&AggregatedRecord], family: MetricFamily) -> FamilyMetrics {
    let contributing: Vec<&FamilyMetrics> = members
        .iter()
        .map(|record| record.family(family))
        .filter(|metrics| metrics.has_data())
        .collect();
    if contributing.is_empty() {
        return FamilyMetrics::default();
    }

    let total_incumbents: f64 = contributing.iter().map(|m| m.n_incumbents).sum();
    let equal_share = 1.0 / contributing.len() as f64;

    let mut combined = FamilyMetrics {
        n_orgs: contributing.iter().map(|m| m.n_orgs).sum(),
        n_incumbents: total_incumbents,
        ..Default::default()
    };
    let mut percentiles = combined.percentiles();
    for metrics in &contributing {
        let weight = if total_incumbents > 0.0 {
            metrics.n_incumbents / total_incumbents
        } else {
            equal_share
        };
        let source = metrics.percentiles();
        for p in Percentile::ALL {
            percentiles.set(p, percentiles.get(p) + weight * source.get(p));
        }
    }
    combined.set_percentiles(&percentiles);
    combined
}

/// Stage 1: one record per specialty for `year`
///
/// Records without a survey year never match.
pub fn within_year(records: &[AggregatedRecord], year: i32) -> Vec<AggregatedRecord> {
    let in_year = records.iter().filter(|r| r.survey_year == Some(year));

    group_by_specialty(in_year)
        .into_iter()
        .map(|(specialty, members)| {
            let mut record = AggregatedRecord {
                provider_type: common_value(members.iter().map(|r| r.provider_type.as_str())),
                region: common_value(members.iter().map(|r| r.region.as_str())),
                survey_source: common_value(members.iter().map(|r| r.survey_source.as_str())),
                specialty,
                survey_year: Some(year),
                metrics: Default::default(),
            };
            for family in MetricFamily::ALL {
                *record.metrics.get_mut(family) = weighted_family(&members, family);
            }
            record
        })
        .collect()
}

/// Incumbents of one year: sum of each specialty record's sample size
pub fn year_sample_size(year_records: &[AggregatedRecord]) -> f64 {
    year_records.iter().map(AggregatedRecord::sample_size).sum()
}

/// Stage 2 weight of every configured year, in configuration order
pub fn year_weights(config: &BlendConfig, sample_sizes: &[f64]) -> Vec<f64> {
    let equal = vec![1.0 / config.years.len().max(1) as f64; config.years.len()];
    match config.method {
        BlendMethod::Percentage => config.years.iter().map(|y| y.percentage / 100.0).collect(),
        BlendMethod::Equal => equal,
        BlendMethod::Weighted => {
            let total: f64 = sample_sizes.iter().sum();
            if total > 0.0 {
                sample_sizes.iter().map(|s| s / total).collect()
            } else {
                debug!("No incumbents in any selected year; weighting years equally");
                equal
            }
        }
    }
}

/// Output of the cross-year stage
pub struct CrossYear {
    pub records: Vec<AggregatedRecord>,
    /// Specialties absent from at least one selected year
    pub partially_covered: Vec<String>,
}

/// Stage 2: blend year-level records per specialty
///
/// `per_year[i]` is weighted by `weights[i]`. A specialty missing from a
/// year contributes zero for that year; its weight is not redistributed.
pub fn cross_year(per_year: &[Vec<AggregatedRecord>], weights: &[f64]) -> CrossYear {
    let groups = group_by_specialty(per_year.iter().flatten());
    let mut partially_covered = Vec::new();

    let records = groups
        .into_iter()
        .map(|(specialty, members)| {
            let mut record = AggregatedRecord {
                provider_type: common_value(members.iter().map(|r| r.provider_type.as_str())),
                region: common_value(members.iter().map(|r| r.region.as_str())),
                survey_source: BLENDED_SOURCE.to_string(),
                specialty,
                survey_year: None,
                metrics: Default::default(),
            };

            let mut missing_years = 0;
            for (year_records, weight) in per_year.iter().zip(weights) {
                let Some(year_record) = year_records.iter().find(|r| r.specialty == record.specialty)
                else {
                    missing_years += 1;
                    continue;
                };
                for family in MetricFamily::ALL {
                    let source = year_record.family(family);
                    let target = record.metrics.get_mut(family);
                    target.n_orgs += weight * source.n_orgs;
                    target.n_incumbents += weight * source.n_incumbents;
                    let mut percentiles = target.percentiles();
                    for p in Percentile::ALL {
                        percentiles.set(p, percentiles.get(p) + weight * source.percentiles().get(p));
                    }
                    target.set_percentiles(&percentiles);
                }
            }

            for family in MetricFamily::ALL {
                let target = record.metrics.get_mut(family);
                target.n_orgs = target.n_orgs.round();
                target.n_incumbents = target.n_incumbents.round();
            }

            if missing_years > 0 {
                debug!(
                    specialty = %record.specialty,
                    missing_years,
                    "Specialty absent from selected years; blended with zero contribution"
                );
                partially_covered.push(record.specialty.clone());
            }
            record
        })
        .collect();

    CrossYear {
        records,
        partially_covered,
    }
}
