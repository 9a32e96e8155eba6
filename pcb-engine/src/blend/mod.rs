//! Multi-year blending engine
//!
//! Pipeline: validate config → within-year (per specialty, incumbent
//! weighted) → cross-year (per configured weights) → confidence and
//! warnings. Pure over its inputs; results are never cached.

pub mod quality;
pub mod stages;
pub mod types;

pub use types::{BlendConfig, BlendMethod, BlendResult, YearBreakdown, YearConfig};

use crate::error::BlendError;
use crate::models::AggregatedRecord;
use std::collections::HashSet;
use tracing::info;

/// Blend year-tagged records across the configured years
pub fn blend(records: &[AggregatedRecord], config: &BlendConfig) -> Result<BlendResult, BlendError> {
    config.validate()?;

    let per_year: Vec<Vec<AggregatedRecord>> = config
        .years
        .iter()
        .map(|y| stages::within_year(records, y.year))
        .collect();
    let sample_sizes: Vec<f64> = per_year.iter().map(|r| stages::year_sample_size(r)).collect();
    let weights = stages::year_weights(config, &sample_sizes);

    let year_breakdown: Vec<YearBreakdown> = config
        .years
        .iter()
        .zip(&per_year)
        .zip(sample_sizes.iter().zip(&weights))
        .map(|((year, year_records), (sample_size, weight))| YearBreakdown {
            year: year.year,
            weight: *weight,
            configured_percentage: year.percentage,
            record_count: records
                .iter()
                .filter(|r| r.survey_year == Some(year.year))
                .count(),
            specialty_count: year_records.len(),
            sample_size: *sample_size,
        })
        .collect();

    let surveys: HashSet<(&str, i32)> = records
        .iter()
        .filter_map(|r| r.survey_year.map(|y| (r.survey_source.as_str(), y)))
        .filter(|(_, y)| config.years.iter().any(|c| c.year == *y))
        .collect();

    let cross = stages::cross_year(&per_year, &weights);
    let total_sample_size: f64 = sample_sizes.iter().sum();
    let confidence = quality::confidence(total_sample_size, config.years.len());
    let quality_warnings =
        quality::quality_warnings(confidence, &year_breakdown, &cross.partially_covered);

    info!(
        method = %config.method,
        years = config.years.len(),
        specialties = cross.records.len(),
        confidence,
        warnings = quality_warnings.len(),
        "Blend complete"
    );

    Ok(BlendResult {
        blended_data: cross.records,
        year_breakdown,
        confidence,
        quality_warnings,
        total_sample_size,
        total_survey_count: surveys.len(),
        years_included: config.years.iter().map(|y| y.year).collect(),
        blending_method: config.method,
    })
}
