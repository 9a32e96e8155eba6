//! Row normalizer
//!
//! Converts one raw survey row, in either layout, into a [`NormalizedRow`]:
//! - **Long format**: the row has a `variable` column naming one metric
//!   family and generic `p25..p90` columns.
//! - **Wide format**: every family has its own percentile columns.
//!
//! Normalization is a pure function of the row, the survey metadata and the
//! mapping tables. It never fails; absent or malformed values become zero,
//! which downstream stages read as "no data".

pub mod aliases;
pub mod classifier;
pub mod numeric;
pub mod wide;

use crate::mapping::{CategoricalResolver, MappingKind, MappingTables, ResolveContext};
use crate::models::{Families, NormalizedRow, Percentiles, RawRow, SurveyMeta};
use aliases::{
    first_present, first_text, LONG_PERCENTILE_KEYS, N_INCUMBENTS_KEYS, N_ORGS_KEYS,
    PROVIDER_TYPE_KEYS, REGION_KEYS, SPECIALTY_KEYS, VARIABLE_KEYS,
};
use classifier::classify_variable;
use numeric::to_number;
use tracing::trace;

/// Normalizer bound to one set of mapping tables
pub struct RowNormalizer<'a> {
    tables: &'a MappingTables,
    resolver: CategoricalResolver<'a>,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(tables: &'a MappingTables) -> Self {
        Self {
            tables,
            resolver: CategoricalResolver::new(tables),
        }
    }

    /// Normalize one raw row of `survey`
    pub fn normalize(&self, raw: &RawRow, survey: &SurveyMeta) -> NormalizedRow {
        let ctx = ResolveContext {
            survey_source: &survey.name,
            default_provider_type: survey.provider_type.as_deref(),
        };

        let specialty = self.resolver.resolve(
            MappingKind::Specialty,
            &first_text(raw, SPECIALTY_KEYS).unwrap_or_default(),
            &ctx,
        );
        let provider_type = self.resolver.resolve(
            MappingKind::ProviderType,
            &first_text(raw, PROVIDER_TYPE_KEYS).unwrap_or_default(),
            &ctx,
        );
        let region = self.resolver.resolve(
            MappingKind::Region,
            &first_text(raw, REGION_KEYS).unwrap_or_default(),
            &ctx,
        );

        let n_orgs = first_present(raw, N_ORGS_KEYS).map(to_number).unwrap_or(0.0);
        let n_incumbents = first_present(raw, N_INCUMBENTS_KEYS)
            .map(to_number)
            .unwrap_or(0.0);

        let metrics = if is_long_format(raw) {
            self.extract_long(raw)
        } else {
            wide::extract_wide(raw, &survey.name, self.tables)
        };

        NormalizedRow {
            specialty,
            provider_type,
            region,
            survey_source: survey.name.clone(),
            survey_year: survey.year,
            n_orgs,
            n_incumbents,
            metrics,
            raw_data: raw.clone(),
        }
    }

    fn extract_long(&self, raw: &RawRow) -> Families<Percentiles> {
        let variable = first_text(raw, VARIABLE_KEYS).unwrap_or_default();
        let variable = self
            .tables
            .learned
            .lookup(MappingKind::Variable, &variable)
            .map(str::to_string)
            .unwrap_or(variable);

        let mut percentiles = Percentiles::default();
        for (percentile, keys) in LONG_PERCENTILE_KEYS {
            let value = first_present(raw, keys).map(to_number).unwrap_or(0.0);
            percentiles.set(*percentile, value);
        }

        let mut families: Families<Percentiles> = Families::default();
        match classify_variable(&variable, percentiles.p50) {
            Some(family) => *families.get_mut(family) = percentiles,
            None => trace!(variable = %variable, "Variable matched no metric family"),
        }
        families
    }
}

/// Normalize a single row with freshly built lookup indexes
///
/// Prefer [`RowNormalizer`] when normalizing many rows against the same
/// tables.
pub fn normalize_row(raw: &RawRow, survey: &SurveyMeta, tables: &MappingTables) -> NormalizedRow {
    RowNormalizer::new(tables).normalize(raw, survey)
}

/// A row is long format when it carries a `variable` column
pub fn is_long_format(raw: &RawRow) -> bool {
    VARIABLE_KEYS.iter().any(|key| raw.contains_key(*key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingKind;
    use crate::models::MetricFamily;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashMap;

    fn survey() -> SurveyMeta {
        SurveyMeta {
            id: "s1".to_string(),
            name: "MGMA".to_string(),
            year: 2024,
            row_count: 2,
            specialty_count: 1,
            upload_date: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            provider_type: None,
        }
    }

    fn row(value: serde_json::Value) -> RawRow {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_long_format_tcc_row() {
        let raw = row(json!({
            "specialty": "Cardiology",
            "variable": "Total Cash Compensation",
            "region": "National",
            "n_orgs": 40,
            "n_incumbents": "1,050",
            "p25": "400,000", "p50": 500000, "p75": 600000, "p90": "$700,000"
        }));
        let normalized = normalize_row(&raw, &survey(), &MappingTables::default());

        assert_eq!(normalized.specialty, "cardiology");
        assert_eq!(normalized.provider_type, "Physician");
        assert_eq!(normalized.survey_source, "MGMA");
        assert_eq!(normalized.survey_year, 2024);
        assert_eq!(normalized.n_incumbents, 1050.0);
        assert_eq!(normalized.metrics.tcc.p90, 700000.0);
        assert_eq!(normalized.metrics.wrvu, Percentiles::default());
        assert_eq!(normalized.metrics.cf, Percentiles::default());
    }

    #[test]
    fn test_long_format_unknown_variable_is_all_zero() {
        let raw = row(json!({"specialty": "X", "variable": "Call Pay", "p50": 1200}));
        let normalized = normalize_row(&raw, &survey(), &MappingTables::default());
        assert_eq!(normalized.metrics, Families::default());
    }

    #[test]
    fn test_learned_variable_mapping_applies_before_classification() {
        let mut tables = MappingTables::default();
        tables.learned.set_table(
            MappingKind::Variable,
            HashMap::from([("prod".to_string(), "Work RVUs".to_string())]),
        );
        let raw = row(json!({"specialty": "X", "Variable": "PROD", "Median": 6100}));
        let normalized = normalize_row(&raw, &survey(), &tables);
        assert_eq!(normalized.metrics.wrvu.p50, 6100.0);
        assert_eq!(normalized.family_metrics(MetricFamily::Wrvu).p50, 6100.0);
    }

    #[test]
    fn test_wide_format_row() {
        let raw = row(json!({
            "Specialty": "Dermatology",
            "Provider Type": "MD",
            "Geographic Region": "Western",
            "N Incumbents": 90,
            "tcc_p50": 450000,
            "wrvu_p50": 7000,
            "cf_p50": 64.3
        }));
        let normalized = normalize_row(&raw, &survey(), &MappingTables::default());
        assert_eq!(normalized.provider_type, "Physician");
        assert_eq!(normalized.region, "West");
        assert_eq!(normalized.n_incumbents, 90.0);
        assert_eq!(normalized.metrics.tcc.p50, 450000.0);
        assert_eq!(normalized.metrics.wrvu.p50, 7000.0);
        assert_eq!(normalized.metrics.cf.p50, 64.3);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = row(json!({
            "specialty": "Pediatrics & Adolescent Medicine",
            "variable": "Work RVUs",
            "p50": "800",
            "n_incumbents": "***"
        }));
        let tables = MappingTables::default();
        let first = normalize_row(&raw, &survey(), &tables);
        let second = normalize_row(&raw, &survey(), &tables);
        assert_eq!(first, second);
        assert_eq!(first.metrics.cf.p50, 800.0);
        assert_eq!(first.n_incumbents, 0.0);
    }

    #[test]
    fn test_survey_default_provider_type() {
        let mut meta = survey();
        meta.provider_type = Some("Nurse Practitioner".to_string());
        let raw = row(json!({"specialty": "Family Medicine", "tcc_p50": 120000}));
        let normalized = normalize_row(&raw, &meta, &MappingTables::default());
        assert_eq!(normalized.provider_type, "Nurse Practitioner");
    }
}
