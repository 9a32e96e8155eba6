//! Blend configuration and result types

use crate::error::BlendError;
use crate::models::AggregatedRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Allowed deviation of the percentage total from 100
pub const PERCENTAGE_TOLERANCE: f64 = 0.1;

/// Cross-year weighting strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMethod {
    /// User-specified year percentages
    Percentage,
    /// Proportional to each year's incumbent count
    Weighted,
    /// Uniform across configured years
    Equal,
}

impl fmt::Display for BlendMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlendMethod::Percentage => "percentage",
            BlendMethod::Weighted => "weighted",
            BlendMethod::Equal => "equal",
        })
    }
}

impl FromStr for BlendMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percentage" => Ok(BlendMethod::Percentage),
            "weighted" => Ok(BlendMethod::Weighted),
            "equal" => Ok(BlendMethod::Equal),
            other => Err(format!(
                "unknown blend method '{}' (expected percentage, weighted or equal)",
                other
            )),
        }
    }
}

/// One selected survey year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearConfig {
    pub year: i32,
    /// Share of the blend under the `percentage` method
    #[serde(default)]
    pub percentage: f64,
    /// Display weight carried through from the caller; not used in arithmetic
    #[serde(default)]
    pub weight: f64,
}

impl YearConfig {
    pub fn new(year: i32, percentage: f64) -> Self {
        Self {
            year,
            percentage,
            weight: percentage / 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendConfig {
    pub method: BlendMethod,
    pub years: Vec<YearConfig>,
    /// Caller's running total, informational; validation sums `years`
    #[serde(default)]
    pub total_percentage: f64,
}

impl BlendConfig {
    pub fn new(method: BlendMethod, years: Vec<YearConfig>) -> Self {
        let total_percentage = years.iter().map(|y| y.percentage).sum();
        Self {
            method,
            years,
            total_percentage,
        }
    }

    /// Reject configurations that would produce a wrong benchmark
    pub fn validate(&self) -> Result<(), BlendError> {
        if self.years.is_empty() {
            return Err(BlendError::NoYears);
        }

        let mut seen = HashSet::new();
        for year in &self.years {
            if !seen.insert(year.year) {
                return Err(BlendError::DuplicateYear(year.year));
            }
            if !year.percentage.is_finite() {
                return Err(BlendError::NonFinitePercentage {
                    year: year.year,
                    percentage: year.percentage,
                });
            }
            if year.percentage < 0.0 {
                return Err(BlendError::NegativePercentage {
                    year: year.year,
                    percentage: year.percentage,
                });
            }
        }

        if self.method == BlendMethod::Percentage {
            let total: f64 = self.years.iter().map(|y| y.percentage).sum();
            if (total - 100.0).abs() > PERCENTAGE_TOLERANCE {
                return Err(BlendError::PercentageTotal { total });
            }
        }
        Ok(())
    }
}

/// Per-year contribution to a blend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBreakdown {
    pub year: i32,
    /// Effective weight applied in the cross-year stage
    pub weight: f64,
    pub configured_percentage: f64,
    /// Input records tagged with this year
    pub record_count: usize,
    pub specialty_count: usize,
    /// Incumbents summed over the year's specialty records
    pub sample_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendResult {
    pub blended_data: Vec<AggregatedRecord>,
    pub year_breakdown: Vec<YearBreakdown>,
    pub confidence: f64,
    pub quality_warnings: Vec<String>,
    pub total_sample_size: f64,
    pub total_survey_count: usize,
    pub years_included: Vec<i32>,
    pub blending_method: BlendMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_must_total_100() {
        let config = BlendConfig::new(
            BlendMethod::Percentage,
            vec![YearConfig::new(2023, 60.0), YearConfig::new(2024, 30.0)],
        );
        let err = config.validate().unwrap_err();
        assert_eq!(err, BlendError::PercentageTotal { total: 90.0 });
        assert!(err.to_string().contains("90"));
    }

    #[test]
    fn test_percentage_tolerance() {
        let config = BlendConfig::new(
            BlendMethod::Percentage,
            vec![YearConfig::new(2023, 66.7), YearConfig::new(2024, 33.33)],
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_other_methods_ignore_percentages() {
        let config = BlendConfig::new(
            BlendMethod::Equal,
            vec![YearConfig::new(2023, 0.0), YearConfig::new(2024, 0.0)],
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_and_duplicate_years_rejected() {
        let empty = BlendConfig::new(BlendMethod::Equal, vec![]);
        assert_eq!(empty.validate(), Err(BlendError::NoYears));

        let duplicate = BlendConfig::new(
            BlendMethod::Weighted,
            vec![YearConfig::new(2024, 50.0), YearConfig::new(2024, 50.0)],
        );
        assert_eq!(duplicate.validate(), Err(BlendError::DuplicateYear(2024)));
    }

    #[test]
    fn test_negative_percentage_rejected() {
        let config = BlendConfig::new(
            BlendMethod::Percentage,
            vec![YearConfig::new(2023, 120.0), YearConfig::new(2024, -20.0)],
        );
        assert!(matches!(
            config.validate(),
            Err(BlendError::NegativePercentage { year: 2024, .. })
        ));
    }

    #[test]
    fn test_non_finite_percentage_rejected() {
        let nan = BlendConfig::new(
            BlendMethod::Percentage,
            vec![YearConfig::new(2023, f64::NAN), YearConfig::new(2024, 30.0)],
        );
        let err = nan.validate().unwrap_err();
        assert!(matches!(err, BlendError::NonFinitePercentage { year: 2023, .. }));
        assert!(err.to_string().contains("2023"));

        let infinite = BlendConfig::new(
            BlendMethod::Equal,
            vec![YearConfig::new(2023, 0.0), YearConfig::new(2024, f64::INFINITY)],
        );
        assert!(matches!(
            infinite.validate(),
            Err(BlendError::NonFinitePercentage { year: 2024, .. })
        ));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("Weighted".parse::<BlendMethod>(), Ok(BlendMethod::Weighted));
        assert!("median".parse::<BlendMethod>().is_err());
        assert_eq!(
            serde_json::to_string(&BlendMethod::Percentage).unwrap(),
            "\"percentage\""
        );
    }
}
