//! Adapter between flat-field records and the canonical family shape
//!
//! Exporters and older data store snapshots carry records as flat maps
//! (`tcc_p50`, `wrvu_n_incumbents`, ...). These two functions are the only
//! place that layout is understood.

use super::metrics::{Families, FamilyMetrics, MetricFamily, Percentile};
use super::records::AggregatedRecord;
use super::survey::RawRow;
use crate::normalize::aliases::{first_present, first_text};
use crate::normalize::numeric::to_number;
use serde_json::Value;

const COUNT_FIELDS: [&str; 2] = ["n_orgs", "n_incumbents"];

/// Lift a flat-field record into an [`AggregatedRecord`]
///
/// Missing fields become zero; dimension fields accept camelCase and
/// snake_case spellings.
pub fn lift_flat_record(row: &RawRow) -> AggregatedRecord {
    let mut metrics: Families<FamilyMetrics> = Families::default();

    for family in MetricFamily::ALL {
        let target = metrics.get_mut(family);
        for count in COUNT_FIELDS {
            let value = row
                .get(&format!("{}_{}", family.prefix(), count))
                .map(to_number)
                .unwrap_or(0.0);
            if count == "n_orgs" {
                target.n_orgs = value;
            } else {
                target.n_incumbents = value;
            }
        }
        let mut percentiles = target.percentiles();
        for p in Percentile::ALL {
            let value = row
                .get(&format!("{}_{}", family.prefix(), p.suffix()))
                .map(to_number)
                .unwrap_or(0.0);
            percentiles.set(p, value);
        }
        target.set_percentiles(&percentiles);
    }

    let survey_year = first_present(row, &["surveyYear", "survey_year", "year"])
        .map(to_number)
        .filter(|y| *y > 0.0)
        .map(|y| y as i32);

    AggregatedRecord {
        specialty: first_text(row, &["specialty", "Specialty"]).unwrap_or_default(),
        provider_type: first_text(row, &["providerType", "provider_type"]).unwrap_or_default(),
        region: first_text(row, &["region", "Region", "geographicRegion"]).unwrap_or_default(),
        survey_source: first_text(row, &["surveySource", "survey_source"]).unwrap_or_default(),
        survey_year,
        metrics,
    }
}

/// Flatten a record to the export layout
pub fn flatten_record(record: &AggregatedRecord) -> RawRow {
    let mut row = RawRow::new();
    row.insert("specialty".into(), Value::from(record.specialty.clone()));
    row.insert("providerType".into(), Value::from(record.provider_type.clone()));
    row.insert("region".into(), Value::from(record.region.clone()));
    row.insert("surveySource".into(), Value::from(record.survey_source.clone()));
    if let Some(year) = record.survey_year {
        row.insert("surveyYear".into(), Value::from(year));
    }

    for (family, m) in record.metrics.iter() {
        let prefix = family.prefix();
        row.insert(format!("{}_n_orgs", prefix), Value::from(m.n_orgs));
        row.insert(format!("{}_n_incumbents", prefix), Value::from(m.n_incumbents));
        let percentiles = m.percentiles();
        for p in Percentile::ALL {
            row.insert(format!("{}_{}", prefix, p.suffix()), Value::from(percentiles.get(p)));
        }
    }
    row
}
