//! In-memory data store backed by a JSON fixture
//!
//! Fixture layout (camelCase):
//! ```json
//! {
//!   "surveys": [{"id": "mgma-2024", "name": "MGMA", "year": 2024, ...}],
//!   "rows": {"mgma-2024": [{"specialty": "Cardiology", "tcc_p50": 500000}]},
//!   "specialtyMappings": [], "columnMappings": [], "regionMappings": [],
//!   "learnedMappings": {"specialty": {"cardiology - general": "Cardiology"}},
//!   "learnedByProviderType": {"Nurse Practitioner": {"specialty": {}}}
//! }
//! ```

use super::{DataStore, PageRequest, SurveyDataFilter, SurveyDataPage};
use crate::error::StoreError;
use crate::mapping::{
    ColumnMapping, LearnedMappings, LearnedTable, MappingKind, RegionMapping, SpecialtyMapping,
};
use crate::models::{RawRow, SurveyMeta};
use crate::normalize::aliases::{first_text, PROVIDER_TYPE_KEYS, SPECIALTY_KEYS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Serialized store contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFixture {
    #[serde(default)]
    pub surveys: Vec<SurveyMeta>,
    #[serde(default)]
    pub rows: HashMap<String, Vec<RawRow>>,
    #[serde(default)]
    pub specialty_mappings: Vec<SpecialtyMapping>,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
    #[serde(default)]
    pub region_mappings: Vec<RegionMapping>,
    #[serde(default)]
    pub learned_mappings: LearnedMappings,
    #[serde(default)]
    pub learned_by_provider_type: HashMap<String, LearnedMappings>,
}

/// [`DataStore`] over an in-memory [`StoreFixture`]
///
/// Test hooks can make individual surveys or the mapping tables fail, and
/// count row requests.
#[derive(Default)]
pub struct InMemoryDataStore {
    fixture: RwLock<StoreFixture>,
    failing_surveys: RwLock<HashSet<String>>,
    fail_mappings: AtomicBool,
    data_requests: AtomicUsize,
}

impl InMemoryDataStore {
    pub fn from_fixture(fixture: StoreFixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        Ok(Self::from_fixture(serde_json::from_str(json)?))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_json_str(&content)?;
        info!(path = %path.display(), "Loaded data store fixture");
        Ok(store)
    }

    /// Replace a survey's rows, updating its metadata as a re-upload would
    pub async fn set_survey_rows(&self, survey_id: &str, rows: Vec<RawRow>) -> Result<(), StoreError> {
        let mut fixture = self.fixture.write().await;
        let specialty_count = rows
            .iter()
            .filter_map(|row| first_text(row, SPECIALTY_KEYS))
            .collect::<HashSet<_>>()
            .len() as u64;
        let survey = fixture
            .surveys
            .iter_mut()
            .find(|s| s.id == survey_id)
            .ok_or_else(|| StoreError::SurveyNotFound(survey_id.to_string()))?;
        survey.row_count = rows.len() as u64;
        survey.specialty_count = specialty_count;
        survey.upload_date = pcb_common::time::now();
        fixture.rows.insert(survey_id.to_string(), rows);
        debug!(survey_id, "Survey rows replaced");
        Ok(())
    }

    pub async fn fail_survey(&self, survey_id: &str) {
        self.failing_surveys.write().await.insert(survey_id.to_string());
    }

    pub async fn recover_survey(&self, survey_id: &str) {
        self.failing_surveys.write().await.remove(survey_id);
    }

    pub fn fail_mappings(&self, fail: bool) {
        self.fail_mappings.store(fail, Ordering::SeqCst);
    }

    /// Number of `get_survey_data` calls served so far
    pub fn data_requests(&self) -> usize {
        self.data_requests.load(Ordering::SeqCst)
    }

    fn check_mappings(&self) -> Result<(), StoreError> {
        if self.fail_mappings.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("mapping tables unavailable".to_string()));
        }
        Ok(())
    }
}

fn matches_filter(row: &RawRow, filter: &SurveyDataFilter) -> bool {
    let field_matches = |wanted: &Option<String>, keys: &[&str]| match wanted {
        None => true,
        Some(wanted) => first_text(row, keys)
            .map(|value| value.eq_ignore_ascii_case(wanted.trim()))
            .unwrap_or(false),
    };
    field_matches(&filter.specialty, SPECIALTY_KEYS)
        && field_matches(&filter.provider_type, PROVIDER_TYPE_KEYS)
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn get_all_surveys(&self) -> Result<Vec<SurveyMeta>, StoreError> {
        Ok(self.fixture.read().await.surveys.clone())
    }

    async fn get_survey_data(
        &self,
        survey_id: &str,
        filter: &SurveyDataFilter,
        page: PageRequest,
    ) -> Result<SurveyDataPage, StoreError> {
        self.data_requests.fetch_add(1, Ordering::SeqCst);
        if self.failing_surveys.read().await.contains(survey_id) {
            return Err(StoreError::Backend(format!("survey {} unavailable", survey_id)));
        }

        let fixture = self.fixture.read().await;
        if !fixture.surveys.iter().any(|s| s.id == survey_id) {
            return Err(StoreError::SurveyNotFound(survey_id.to_string()));
        }
        let rows = fixture
            .rows
            .get(survey_id)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_filter(row, filter))
                    .skip(page.offset)
                    .take(page.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(SurveyDataPage { rows })
    }

    async fn get_all_specialty_mappings(&self) -> Result<Vec<SpecialtyMapping>, StoreError> {
        self.check_mappings()?;
        Ok(self.fixture.read().await.specialty_mappings.clone())
    }

    async fn get_all_column_mappings(&self) -> Result<Vec<ColumnMapping>, StoreError> {
        self.check_mappings()?;
        Ok(self.fixture.read().await.column_mappings.clone())
    }

    async fn get_region_mappings(&self) -> Result<Vec<RegionMapping>, StoreError> {
        self.check_mappings()?;
        Ok(self.fixture.read().await.region_mappings.clone())
    }

    async fn get_learned_mappings(
        &self,
        kind: MappingKind,
        provider_type: Option<&str>,
    ) -> Result<LearnedTable, StoreError> {
        self.check_mappings()?;
        let fixture = self.fixture.read().await;
        let mut table = fixture.learned_mappings.table(kind).clone();
        if let Some(overrides) = provider_type.and_then(|pt| fixture.learned_by_provider_type.get(pt)) {
            table.extend(
                overrides
                    .table(kind)
                    .iter()
                    .map(|(raw, canonical)| (raw.clone(), canonical.clone())),
            );
        }
        Ok(table)
    }
}
