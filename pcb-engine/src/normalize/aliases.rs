//! Raw column alias tables and the lookup helper that walks them
//!
//! Survey vendors spell the same column many ways. Each logical field has a
//! candidate list evaluated in order; the first key present in the row wins.

use crate::models::{MetricFamily, Percentile, RawRow};
use serde_json::Value;

pub const SPECIALTY_KEYS: &[&str] = &[
    "specialty",
    "Specialty",
    "SPECIALTY",
    "normalizedSpecialty",
    "provider_specialty",
    "Provider Specialty",
];

pub const PROVIDER_TYPE_KEYS: &[&str] = &[
    "providerType",
    "provider_type",
    "Provider Type",
    "ProviderType",
    "provider type",
    "PROVIDER_TYPE",
];

pub const REGION_KEYS: &[&str] = &[
    "region",
    "Region",
    "REGION",
    "geographicRegion",
    "geographic_region",
    "Geographic Region",
];

pub const N_ORGS_KEYS: &[&str] = &[
    "n_orgs",
    "nOrgs",
    "N Orgs",
    "n orgs",
    "# Orgs",
    "num_orgs",
    "Number of Organizations",
];

pub const N_INCUMBENTS_KEYS: &[&str] = &[
    "n_incumbents",
    "nIncumbents",
    "N Incumbents",
    "n incumbents",
    "# Incumbents",
    "num_incumbents",
    "Number of Incumbents",
    "incumbents",
];

/// Presence of any of these keys marks a long-format row
pub const VARIABLE_KEYS: &[&str] = &["variable", "Variable", "VARIABLE"];

/// Percentile columns of a long-format row
pub const LONG_PERCENTILE_KEYS: &[(Percentile, &[&str])] = &[
    (Percentile::P25, &["p25", "P25", "25th", "25th Percentile", "percentile_25"]),
    (
        Percentile::P50,
        &["p50", "P50", "median", "Median", "50th", "50th Percentile", "percentile_50"],
    ),
    (Percentile::P75, &["p75", "P75", "75th", "75th Percentile", "percentile_75"]),
    (Percentile::P90, &["p90", "P90", "90th", "90th Percentile", "percentile_90"]),
];

/// Wide-format column spellings per family and percentile
pub struct WideAlias {
    pub family: MetricFamily,
    pub percentile: Percentile,
    pub columns: &'static [&'static str],
}

pub const WIDE_COLUMN_ALIASES: &[WideAlias] = &[
    WideAlias {
        family: MetricFamily::Tcc,
        percentile: Percentile::P25,
        columns: &["tcc_p25", "TCC P25", "TCC_p25", "TCC_P25", "tcc p25", "TCC 25th"],
    },
    WideAlias {
        family: MetricFamily::Tcc,
        percentile: Percentile::P50,
        columns: &["tcc_p50", "TCC P50", "TCC_p50", "TCC_P50", "tcc p50", "TCC Median", "TCC 50th"],
    },
    WideAlias {
        family: MetricFamily::Tcc,
        percentile: Percentile::P75,
        columns: &["tcc_p75", "TCC P75", "TCC_p75", "TCC_P75", "tcc p75", "TCC 75th"],
    },
    WideAlias {
        family: MetricFamily::Tcc,
        percentile: Percentile::P90,
        columns: &["tcc_p90", "TCC P90", "TCC_p90", "TCC_P90", "tcc p90", "TCC 90th"],
    },
    WideAlias {
        family: MetricFamily::Wrvu,
        percentile: Percentile::P25,
        columns: &["wrvu_p25", "wRVU P25", "WRVU P25", "wRVU_p25", "WRVU_p25", "wRVU 25th"],
    },
    WideAlias {
        family: MetricFamily::Wrvu,
        percentile: Percentile::P50,
        columns: &[
            "wrvu_p50",
            "wRVU P50",
            "WRVU P50",
            "wRVU_p50",
            "WRVU_p50",
            "wRVU Median",
            "wRVU 50th",
        ],
    },
    WideAlias {
        family: MetricFamily::Wrvu,
        percentile: Percentile::P75,
        columns: &["wrvu_p75", "wRVU P75", "WRVU P75", "wRVU_p75", "WRVU_p75", "wRVU 75th"],
    },
    WideAlias {
        family: MetricFamily::Wrvu,
        percentile: Percentile::P90,
        columns: &["wrvu_p90", "wRVU P90", "WRVU P90", "wRVU_p90", "WRVU_p90", "wRVU 90th"],
    },
    WideAlias {
        family: MetricFamily::Cf,
        percentile: Percentile::P25,
        columns: &["cf_p25", "CF P25", "CF_p25", "CF_P25", "cf p25", "CF 25th"],
    },
    WideAlias {
        family: MetricFamily::Cf,
        percentile: Percentile::P50,
        columns: &["cf_p50", "CF P50", "CF_p50", "CF_P50", "cf p50", "CF Median", "CF 50th"],
    },
    WideAlias {
        family: MetricFamily::Cf,
        percentile: Percentile::P75,
        columns: &["cf_p75", "CF P75", "CF_p75", "CF_P75", "cf p75", "CF 75th"],
    },
    WideAlias {
        family: MetricFamily::Cf,
        percentile: Percentile::P90,
        columns: &["cf_p90", "CF P90", "CF_p90", "CF_P90", "cf p90", "CF 90th"],
    },
];

/// First candidate key present in `row` with a non-null value
pub fn first_present<'a>(row: &'a RawRow, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|key| row.get(*key))
        .find(|value| !value.is_null())
}

/// First candidate key holding non-blank text (numbers are rendered as text)
pub fn first_text(row: &RawRow, candidates: &[&str]) -> Option<String> {
    candidates.iter().filter_map(|key| row.get(*key)).find_map(|value| {
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}
