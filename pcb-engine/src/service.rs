//! Benchmark service
//!
//! Orchestrates the pipeline against a [`DataStore`]:
//!
//! ```text
//! list surveys ─▶ upstream hash check ─▶ fetch + normalize (bounded parallel)
//!             ─▶ aggregate ─▶ caches ─▶ filter / summary / blend
//! ```
//!
//! Each service owns one [`ComputationCache`] and one [`FreshnessCache`].
//! Clones share both, so a clone can be handed to every request handler.

use crate::aggregate::aggregate_chunked;
use crate::blend::{self, BlendConfig, BlendResult};
use crate::cache::{
    cache_key, content_hash, records_digest, upstream_hash, ComputationCache, FreshnessCache,
    Namespace,
};
use crate::error::{EngineError, Result, StoreError};
use crate::mapping::{MappingKind, MappingTables};
use crate::models::{AggregatedRecord, NormalizedRow, SurveyMeta};
use crate::normalize::RowNormalizer;
use crate::query::{filter_records, summarize, DatasetSummary, RecordFilter};
use crate::store::{DataStore, PageRequest, SurveyDataFilter};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use pcb_common::config::{Grouping, PcbConfig};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type Records = Arc<Vec<AggregatedRecord>>;

struct ServiceInner<S> {
    store: S,
    config: PcbConfig,
    cache: ComputationCache,
    snapshot: FreshnessCache<Vec<AggregatedRecord>>,
    /// Upstream hash the caches were built from; its lock is the
    /// invalidation critical section
    upstream: Mutex<Option<String>>,
}

pub struct BenchmarkService<S> {
    inner: Arc<ServiceInner<S>>,
}

impl<S> Clone for BenchmarkService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DataStore + 'static> BenchmarkService<S> {
    pub fn new(store: S, config: PcbConfig) -> Self {
        let snapshot = FreshnessCache::new(&config.cache);
        Self {
            inner: Arc::new(ServiceInner {
                store,
                config,
                cache: ComputationCache::new(),
                snapshot,
                upstream: Mutex::new(None),
            }),
        }
    }

    /// Like [`BenchmarkService::new`], rejecting an invalid configuration
    pub fn try_new(store: S, config: PcbConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(store, config))
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn config(&self) -> &PcbConfig {
        &self.inner.config
    }

    pub fn computation_cache(&self) -> &ComputationCache {
        &self.inner.cache
    }

    /// Version token of the current top-level snapshot
    pub fn snapshot_version(&self) -> Option<Uuid> {
        self.inner.snapshot.version()
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Aggregated records under the configured grouping
    ///
    /// Served from the freshness snapshot.
    pub async fn aggregated(&self) -> Result<Records> {
        let surveys = self.sync_upstream().await?;
        let grouping = self.inner.config.ingest.grouping;
        let service = self.clone();

        self.inner
            .snapshot
            .get_or_refresh(move || {
                let service = service.clone();
                let surveys = Arc::clone(&surveys);
                async move {
                    let (rows, _) = service.normalized_rows(&surveys).await?;
                    let chunk_size = service.inner.config.ingest.chunk_size;
                    Ok::<_, EngineError>(aggregate_chunked(&rows, grouping, chunk_size).await)
                }
                .boxed()
            })
            .await
    }

    /// Aggregated records partitioned by survey year, as blending needs them
    pub async fn aggregated_by_year(&self) -> Result<Records> {
        let surveys = self.sync_upstream().await?;
        self.aggregate_cached(&surveys, Grouping::BySourceAndYear).await
    }

    /// Records matching `filter`
    ///
    /// A year filter reads the year-partitioned records.
    pub async fn filter(&self, filter: &RecordFilter) -> Result<Records> {
        let records = if filter.year.is_some() {
            self.aggregated_by_year().await?
        } else {
            self.aggregated().await?
        };

        let key = cache_key(
            Namespace::Filter,
            &content_hash(&(records_digest(&records), filter)),
        );
        if let Some(hit) = self.inner.cache.get::<Records>(&key) {
            debug!("Filter cache hit");
            return Ok(hit);
        }

        let filtered = Arc::new(filter_records(&records, filter));
        self.inner.cache.set(key, Arc::clone(&filtered));
        Ok(filtered)
    }

    pub async fn summary(&self) -> Result<Arc<DatasetSummary>> {
        let surveys = self.sync_upstream().await?;
        let (rows, _) = self.normalized_rows(&surveys).await?;
        let records = self.aggregated().await?;

        let key = cache_key(
            Namespace::Summary,
            &content_hash(&(records_digest(&records), rows.len())),
        );
        if let Some(hit) = self.inner.cache.get::<Arc<DatasetSummary>>(&key) {
            return Ok(hit);
        }

        let summary = Arc::new(summarize(&rows, &records));
        self.inner.cache.set(key, Arc::clone(&summary));
        Ok(summary)
    }

    /// Blend the year-partitioned records; never cached
    pub async fn blend(&self, config: &BlendConfig) -> Result<BlendResult> {
        config.validate()?;
        let records = self.aggregated_by_year().await?;
        Ok(blend::blend(&records, config)?)
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    fn upstream_guard(&self) -> MutexGuard<'_, Option<String>> {
        self.inner
            .upstream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn invalidate(&self, upstream: &mut Option<String>) {
        self.inner.snapshot.clear();
        let removed = self.inner.cache.clear(None);
        *upstream = None;
        debug!(removed, "Caches invalidated");
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        let mut upstream = self.upstream_guard();
        self.invalidate(&mut upstream);
        info!("Cache cleared");
    }

    /// Stop background work
    pub fn shutdown(&self) {
        self.inner.snapshot.shutdown();
    }

    /// List surveys and invalidate everything if the upstream set changed
    async fn sync_upstream(&self) -> Result<Arc<Vec<SurveyMeta>>> {
        let surveys = self.inner.store.get_all_surveys().await?;
        let hash = upstream_hash(&surveys);

        let mut upstream = self.upstream_guard();
        match upstream.as_deref() {
            Some(previous) if previous == hash => {}
            Some(_) => {
                let newest_upload_age_secs = surveys
                    .iter()
                    .map(|s| pcb_common::time::age_of(s.upload_date).as_secs())
                    .min();
                info!(
                    surveys = surveys.len(),
                    ?newest_upload_age_secs,
                    "Upstream survey data changed; invalidating caches"
                );
                self.invalidate(&mut upstream);
                *upstream = Some(hash);
            }
            None => *upstream = Some(hash),
        }
        Ok(Arc::new(surveys))
    }

    // ========================================================================
    // Pipeline stages
    // ========================================================================

    async fn aggregate_cached(&self, surveys: &[SurveyMeta], grouping: Grouping) -> Result<Records> {
        let key = cache_key(
            Namespace::Aggregate,
            &content_hash(&(upstream_hash(surveys), grouping)),
        );
        if let Some(hit) = self.inner.cache.get::<Records>(&key) {
            return Ok(hit);
        }

        let (rows, complete) = self.normalized_rows(surveys).await?;
        let records = Arc::new(
            aggregate_chunked(&rows, grouping, self.inner.config.ingest.chunk_size).await,
        );
        if complete {
            self.inner.cache.set(key, Arc::clone(&records));
        }
        Ok(records)
    }

    /// Normalized rows of every survey, in survey order, and whether every
    /// survey loaded
    ///
    /// A survey that fails contributes no rows; the result is then not
    /// cached so the next request retries it.
    async fn normalized_rows(&self, surveys: &[SurveyMeta]) -> Result<(Arc<Vec<NormalizedRow>>, bool)> {
        let key = cache_key(Namespace::Normalized, &upstream_hash(surveys));
        if let Some(hit) = self.inner.cache.get::<Arc<Vec<NormalizedRow>>>(&key) {
            return Ok((hit, true));
        }

        let started = Instant::now();
        let tables = self.load_mapping_tables().await?;
        let tables = &tables;
        let concurrency = self.inner.config.ingest.max_concurrent_surveys.max(1);

        let mut results: Vec<(usize, Option<Vec<NormalizedRow>>)> =
            stream::iter(surveys.iter().cloned().enumerate())
                .map(|(index, survey)| async move {
                    match self.load_survey(&survey, tables).await {
                        Ok(rows) => (index, Some(rows)),
                        Err(e) => {
                            error!(
                                survey_id = %survey.id,
                                source = %survey.name,
                                error = %e,
                                "Survey fetch failed; survey contributes no rows"
                            );
                            (index, None)
                        }
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);

        let failed = results.iter().filter(|(_, rows)| rows.is_none()).count();
        let rows: Vec<NormalizedRow> = results
            .into_iter()
            .flat_map(|(_, rows)| rows.unwrap_or_default())
            .collect();
        let rows = Arc::new(rows);

        info!(
            surveys = surveys.len(),
            failed,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Survey ingest complete"
        );

        if failed == 0 {
            self.inner.cache.set(key, Arc::clone(&rows));
        } else {
            warn!(failed, "Partial ingest; results not cached");
        }
        Ok((rows, failed == 0))
    }

    /// Fetch every page of one survey and normalize it
    async fn load_survey(
        &self,
        survey: &SurveyMeta,
        tables: &MappingTables,
    ) -> std::result::Result<Vec<NormalizedRow>, StoreError> {
        let filter = SurveyDataFilter::default();
        let mut page = PageRequest::first(self.inner.config.ingest.page_size.max(1));
        let mut raw = Vec::new();
        loop {
            let batch = self
                .inner
                .store
                .get_survey_data(&survey.id, &filter, page)
                .await?;
            let fetched = batch.rows.len();
            raw.extend(batch.rows);
            if fetched < page.limit {
                break;
            }
            page = page.next();
        }

        let normalizer = RowNormalizer::new(tables);
        let rows: Vec<NormalizedRow> = raw.iter().map(|row| normalizer.normalize(row, survey)).collect();
        debug!(
            survey_id = %survey.id,
            source = %survey.name,
            year = survey.year,
            row_count = rows.len(),
            "Survey normalized"
        );
        Ok(rows)
    }

    /// Load mapping tables; individual failures degrade to empty tables
    ///
    /// Fails only when the store cannot serve any table.
    async fn load_mapping_tables(&self) -> Result<MappingTables> {
        let store = &self.inner.store;
        let (specialties, columns, regions) = tokio::join!(
            store.get_all_specialty_mappings(),
            store.get_all_column_mappings(),
            store.get_region_mappings(),
        );

        let mut errors = Vec::new();
        let mut tables = MappingTables {
            specialties: degrade("specialty", specialties, &mut errors).unwrap_or_default(),
            columns: degrade("column", columns, &mut errors).unwrap_or_default(),
            regions: degrade("region", regions, &mut errors).unwrap_or_default(),
            ..Default::default()
        };

        for kind in MappingKind::ALL {
            let learned = store.get_learned_mappings(kind, None).await;
            if let Some(table) = degrade(&format!("learned {:?}", kind), learned, &mut errors) {
                tables.learned.set_table(kind, table);
            }
        }

        if errors.len() == MAPPING_REQUESTS {
            if let Some(e) = errors.pop() {
                return Err(e.into());
            }
        }
        Ok(tables)
    }
}

/// Static tables plus one learned table per kind
const MAPPING_REQUESTS: usize = 3 + MappingKind::ALL.len();

/// Table contents, or `None` with a warning when the store failed
fn degrade<T>(
    table: &str,
    result: std::result::Result<T, StoreError>,
    errors: &mut Vec<StoreError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(table, error = %e, "Mapping table unavailable; using empty table");
            errors.push(e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDataStore, StoreFixture};
    use chrono::TimeZone;
    use serde_json::json;

    fn survey(id: &str, name: &str, year: i32) -> SurveyMeta {
        SurveyMeta {
            id: id.to_string(),
            name: name.to_string(),
            year,
            row_count: 1,
            specialty_count: 1,
            upload_date: chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            provider_type: None,
        }
    }

    fn service() -> BenchmarkService<InMemoryDataStore> {
        let mut fixture = StoreFixture {
            surveys: vec![survey("a", "MGMA", 2023), survey("b", "MGMA", 2024)],
            ..Default::default()
        };
        for (id, p50) in [("a", 100000), ("b", 140000)] {
            fixture.rows.insert(
                id.to_string(),
                vec![json!({"specialty": "Cardiology", "n_incumbents": 10, "tcc_p50": p50})
                    .as_object()
                    .unwrap()
                    .clone()],
            );
        }
        let mut config = PcbConfig::default();
        config.ingest.page_size = 1;
        BenchmarkService::new(InMemoryDataStore::from_fixture(fixture), config)
    }

    #[tokio::test]
    async fn test_aggregated_served_from_snapshot() {
        let service = service();
        let first = service.aggregated().await.unwrap();
        let requests = service.store().data_requests();
        let second = service.aggregated().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.store().data_requests(), requests);
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_pagination_reads_until_short_page() {
        let service = service();
        service.aggregated_by_year().await.unwrap();
        // page size 1: one full page and one empty page per survey
        assert_eq!(service.store().data_requests(), 4);
    }

    #[tokio::test]
    async fn test_blend_validates_before_loading() {
        let service = service();
        let config = BlendConfig::new(
            crate::blend::BlendMethod::Percentage,
            vec![crate::blend::YearConfig::new(2023, 50.0)],
        );
        assert!(service.blend(&config).await.is_err());
        assert_eq!(service.store().data_requests(), 0);
    }

    #[test]
    fn test_try_new_rejects_invalid_config() {
        let mut config = PcbConfig::default();
        config.ingest.page_size = 0;
        let result = BenchmarkService::try_new(InMemoryDataStore::default(), config);
        assert!(matches!(result, Err(EngineError::Common(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_after_recovered_survey_returns_full_values() {
        let service = service();
        service.store().fail_survey("a").await;

        // only the 2024 upload loads
        let partial = service.filter(&RecordFilter::default()).await.unwrap();
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].metrics.tcc.p50, 140000.0);

        service.store().recover_survey("a").await;
        let max_age = service.config().cache.max_age_secs;
        tokio::time::advance(std::time::Duration::from_secs(max_age + 60)).await;

        let aggregated = service.aggregated().await.unwrap();
        assert_eq!(aggregated[0].metrics.tcc.p50, 100000.0);
        let filtered = service.filter(&RecordFilter::default()).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].metrics.tcc.p50, 100000.0);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_recompute() {
        let service = service();
        service.aggregated().await.unwrap();
        assert!(service.snapshot_version().is_some());
        service.clear_cache();
        assert!(service.snapshot_version().is_none());
        assert!(service.computation_cache().is_empty());
    }
}
