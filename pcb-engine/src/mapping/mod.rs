//! Mapping tables and categorical resolution
//!
//! Mapping tables come from the data store: static source-to-canonical
//! tables maintained with the survey catalogue, plus "learned" overrides
//! curated by people reviewing imports. The resolver applies them in a fixed
//! priority order.

pub mod keyword_rules;
pub mod resolver;

pub use resolver::{CategoricalResolver, ResolveContext};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kinds of learned mapping tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappingKind {
    Specialty,
    Column,
    Region,
    Variable,
    ProviderType,
}

impl MappingKind {
    pub const ALL: [MappingKind; 5] = [
        MappingKind::Specialty,
        MappingKind::Column,
        MappingKind::Region,
        MappingKind::Variable,
        MappingKind::ProviderType,
    ];
}

/// `{raw_lower: canonical}` override table
pub type LearnedTable = HashMap<String, String>;

/// Learned overrides for every mapping kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedMappings {
    #[serde(default)]
    pub specialty: LearnedTable,
    #[serde(default)]
    pub column: LearnedTable,
    #[serde(default)]
    pub region: LearnedTable,
    #[serde(default)]
    pub variable: LearnedTable,
    #[serde(default)]
    pub provider_type: LearnedTable,
}

impl LearnedMappings {
    pub fn table(&self, kind: MappingKind) -> &LearnedTable {
        match kind {
            MappingKind::Specialty => &self.specialty,
            MappingKind::Column => &self.column,
            MappingKind::Region => &self.region,
            MappingKind::Variable => &self.variable,
            MappingKind::ProviderType => &self.provider_type,
        }
    }

    pub fn set_table(&mut self, kind: MappingKind, table: LearnedTable) {
        let normalized = table
            .into_iter()
            .map(|(raw, canonical)| (raw.trim().to_lowercase(), canonical))
            .collect();
        match kind {
            MappingKind::Specialty => self.specialty = normalized,
            MappingKind::Column => self.column = normalized,
            MappingKind::Region => self.region = normalized,
            MappingKind::Variable => self.variable = normalized,
            MappingKind::ProviderType => self.provider_type = normalized,
        }
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, kind: MappingKind, raw: &str) -> Option<&str> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.table(kind).get(&key).map(String::as_str)
    }
}

/// A specialty name as one survey source spells it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpecialty {
    pub survey_source: String,
    pub specialty: String,
}

/// Canonical specialty and every source spelling mapped to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyMapping {
    pub standardized_name: String,
    #[serde(default)]
    pub source_specialties: Vec<SourceSpecialty>,
}

/// A raw column as one survey source names it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceColumn {
    pub survey_source: String,
    pub column: String,
}

/// Canonical flat field (e.g. `tcc_p50`) and the raw columns mapped to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub standardized_name: String,
    #[serde(default)]
    pub source_columns: Vec<SourceColumn>,
}

/// Canonical region and its known spellings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionMapping {
    pub standardized_name: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

/// Everything the normalizer needs besides the row itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingTables {
    #[serde(default)]
    pub learned: LearnedMappings,
    #[serde(default)]
    pub specialties: Vec<SpecialtyMapping>,
    #[serde(default)]
    pub columns: Vec<ColumnMapping>,
    #[serde(default)]
    pub regions: Vec<RegionMapping>,
}

impl MappingTables {
    /// Canonical field for a raw column of `survey_source`, learned first
    pub fn column_target(&self, survey_source: &str, column: &str) -> Option<&str> {
        if let Some(target) = self.learned.lookup(MappingKind::Column, column) {
            return Some(target);
        }
        self.columns
            .iter()
            .find(|mapping| {
                mapping.source_columns.iter().any(|source| {
                    source.survey_source.eq_ignore_ascii_case(survey_source)
                        && source.column.trim().eq_ignore_ascii_case(column.trim())
                })
            })
            .map(|mapping| mapping.standardized_name.as_str())
    }
}
