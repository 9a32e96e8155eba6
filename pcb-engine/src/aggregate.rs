//! Aggregator
//!
//! Groups normalized rows by composite key. For each metric family the first
//! row of the group with a positive median is the representative; its sample
//! sizes and percentiles are copied verbatim. Families are chosen
//! independently, so one record can carry TCC from one row and wRVU from
//! another. Counts are never summed or averaged here.

use crate::models::{AggregatedRecord, GroupKey, MetricFamily, NormalizedRow};
use pcb_common::config::Grouping;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default number of rows processed between scheduler yields
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;

/// Grouping key of `row` under `grouping`
pub fn group_key(row: &NormalizedRow, grouping: Grouping) -> GroupKey {
    GroupKey {
        specialty: row.specialty.clone(),
        provider_type: row.provider_type.clone(),
        region: row.region.clone(),
        survey_source: row.survey_source.clone(),
        survey_year: match grouping {
            Grouping::BySource => None,
            Grouping::BySourceAndYear => Some(row.survey_year),
        },
    }
}

/// Incremental group builder shared by the sync and async entry points
#[derive(Default)]
struct GroupAccumulator {
    index: HashMap<GroupKey, usize>,
    records: Vec<AggregatedRecord>,
}

impl GroupAccumulator {
    fn push(&mut self, row: &NormalizedRow, grouping: Grouping) {
        let key = group_key(row, grouping);
        let slot = match self.index.get(&key) {
            Some(slot) => *slot,
            None => {
                self.records.push(AggregatedRecord::empty(&key));
                self.index.insert(key, self.records.len() - 1);
                self.records.len() - 1
            }
        };

        let record = &mut self.records[slot];
        for family in MetricFamily::ALL {
            let current = record.metrics.get_mut(family);
            if current.has_data() || !row.metrics.get(family).has_data() {
                continue;
            }
            *current = row.family_metrics(family);
        }
    }

    fn finish(self) -> Vec<AggregatedRecord> {
        let violations: usize = self
            .records
            .iter()
            .map(|record| record.ordering_violations().len())
            .sum();
        if violations > 0 {
            warn!(
                violations,
                records = self.records.len(),
                "Aggregated percentiles out of order; values kept as reported"
            );
        }
        debug!(records = self.records.len(), "Aggregation complete");
        self.records
    }
}

/// Aggregate rows into one record per group, in first-seen group order
pub fn aggregate(rows: &[NormalizedRow], grouping: Grouping) -> Vec<AggregatedRecord> {
    let mut acc = GroupAccumulator::default();
    for row in rows {
        acc.push(row, grouping);
    }
    acc.finish()
}

/// Chunked aggregation that yields to the runtime between chunks
///
/// Produces exactly what [`aggregate`] produces for the same input.
pub async fn aggregate_chunked(
    rows: &[NormalizedRow],
    grouping: Grouping,
    chunk_size: usize,
) -> Vec<AggregatedRecord> {
    let mut acc = GroupAccumulator::default();
    for (i, chunk) in rows.chunks(chunk_size.max(1)).enumerate() {
        if i > 0 {
            tokio::task::yield_now().await;
        }
        for row in chunk {
            acc.push(row, grouping);
        }
    }
    acc.finish()
}
