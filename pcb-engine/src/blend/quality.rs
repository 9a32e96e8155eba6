//! Blend confidence and advisory warnings

use super::types::YearBreakdown;

/// Incumbent count at which sample size stops raising confidence
pub const FULL_CONFIDENCE_SAMPLE: f64 = 1000.0;

/// Confidence lost per additional blended year
pub const YEAR_PENALTY: f64 = 0.05;

pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Smallest-to-largest year sample ratio below which years are imbalanced
///
/// Only years with records take part; a year with records but no
/// incumbents counts as ratio 0.
pub const SAMPLE_RATIO_THRESHOLD: f64 = 0.3;

/// Confidence in `[0, 1]`: grows with sample size, shrinks with year count
pub fn confidence(total_incumbents: f64, year_count: usize) -> f64 {
    let sample_factor = (total_incumbents / FULL_CONFIDENCE_SAMPLE).min(1.0);
    let year_factor = 1.0 - YEAR_PENALTY * (year_count.max(1) - 1) as f64;
    let score = sample_factor * year_factor;
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Advisory warnings; none of them stop the blend
pub fn quality_warnings(
    confidence: f64,
    breakdown: &[YearBreakdown],
    partially_covered: &[String],
) -> Vec<String> {
    let mut warnings = Vec::new();

    if confidence < LOW_CONFIDENCE_THRESHOLD {
        warnings.push(format!(
            "Low confidence ({:.2}): blended sample is small or spread across many years",
            confidence
        ));
    }

    for year in breakdown.iter().filter(|y| y.record_count == 0) {
        warnings.push(format!(
            "Year {} has no matching records and contributes zero to every blended value",
            year.year
        ));
    }

    let samples: Vec<f64> = breakdown
        .iter()
        .filter(|y| y.record_count > 0)
        .map(|y| y.sample_size.max(0.0))
        .collect();
    if samples.len() >= 2 {
        let smallest = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let largest = samples.iter().copied().fold(0.0, f64::max);
        if largest > 0.0 && smallest / largest < SAMPLE_RATIO_THRESHOLD {
            let ratio = smallest / largest;
            warnings.push(format!(
                "Year sample sizes are imbalanced (smallest is {:.0}% of largest); the weighted method is recommended",
                ratio * 100.0
            ));
        }
    }

    if !partially_covered.is_empty() {
        warnings.push(format!(
            "{} specialties are missing from at least one selected year; their blended values include zero contributions",
            partially_covered.len()
        ));
    }

    warnings
}
