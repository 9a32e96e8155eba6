//! Wide-format metric extraction
//!
//! Each family has its own column per percentile. Fields are filled in
//! passes, and a field set by an earlier pass is never overwritten:
//! 1. Learned and static column mappings for the survey source
//! 2. Declarative alias lists
//! 3. Cue scan over every column name

use super::aliases::{first_present, WIDE_COLUMN_ALIASES};
use super::classifier::classify_column;
use super::numeric::to_number;
use crate::mapping::MappingTables;
use crate::models::{Families, MetricFamily, Percentile, Percentiles, RawRow};
use std::collections::HashMap;
use tracing::debug;

type FieldValues = HashMap<(MetricFamily, Percentile), f64>;

/// Extract all twelve percentile fields from a wide-format row
pub fn extract_wide(row: &RawRow, survey_source: &str, tables: &MappingTables) -> Families<Percentiles> {
    let mut found = FieldValues::new();

    for (column, value) in row {
        if let Some(field) = tables
            .column_target(survey_source, column)
            .and_then(parse_flat_field)
        {
            found.entry(field).or_insert_with(|| to_number(value));
        }
    }

    for alias in WIDE_COLUMN_ALIASES {
        let field = (alias.family, alias.percentile);
        if found.contains_key(&field) {
            continue;
        }
        if let Some(value) = first_present(row, alias.columns) {
            found.insert(field, to_number(value));
        }
    }

    if found.len() < MetricFamily::ALL.len() * Percentile::ALL.len() {
        for (column, value) in row {
            if let Some(field) = classify_column(column) {
                if !found.contains_key(&field) {
                    debug!(column = %column, family = %field.0, "Recovered metric from column scan");
                    found.insert(field, to_number(value));
                }
            }
        }
    }

    let mut families: Families<Percentiles> = Families::default();
    for ((family, percentile), value) in found {
        families.get_mut(family).set(percentile, value);
    }
    families
}

/// Parse a canonical flat field name such as `wrvu_p75`
pub fn parse_flat_field(name: &str) -> Option<(MetricFamily, Percentile)> {
    let (prefix, suffix) = name.trim().split_once('_')?;
    let family = MetricFamily::from_prefix(&prefix.to_lowercase())?;
    let percentile = Percentile::from_suffix(&suffix.to_lowercase())?;
    Some((family, percentile))
}
