//! Data store interface
//!
//! The engine reads surveys, raw rows and mapping tables through the
//! [`DataStore`] trait and never writes back. [`memory::InMemoryDataStore`]
//! implements it over a JSON fixture.

pub mod memory;

pub use memory::{InMemoryDataStore, StoreFixture};

use crate::error::StoreError;
use crate::mapping::{ColumnMapping, LearnedTable, MappingKind, RegionMapping, SpecialtyMapping};
use crate::models::{RawRow, SurveyMeta};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Row-level restriction applied by the store before paging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDataFilter {
    /// Raw specialty text, compared case-insensitively
    #[serde(default)]
    pub specialty: Option<String>,
    /// Raw provider type text, compared case-insensitively
    #[serde(default)]
    pub provider_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyDataPage {
    pub rows: Vec<RawRow>,
}

/// Read-only access to surveys, rows and mapping tables
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn get_all_surveys(&self) -> Result<Vec<SurveyMeta>, StoreError>;

    /// One page of raw rows; a page shorter than `page.limit` is the last
    async fn get_survey_data(
        &self,
        survey_id: &str,
        filter: &SurveyDataFilter,
        page: PageRequest,
    ) -> Result<SurveyDataPage, StoreError>;

    async fn get_all_specialty_mappings(&self) -> Result<Vec<SpecialtyMapping>, StoreError>;

    async fn get_all_column_mappings(&self) -> Result<Vec<ColumnMapping>, StoreError>;

    async fn get_region_mappings(&self) -> Result<Vec<RegionMapping>, StoreError>;

    /// Learned `{raw_lower: canonical}` table for `kind`
    ///
    /// `provider_type` narrows the table to corrections recorded for that
    /// provider type, when the store keeps them separately.
    async fn get_learned_mappings(
        &self,
        kind: MappingKind,
        provider_type: Option<&str>,
    ) -> Result<LearnedTable, StoreError>;
}
