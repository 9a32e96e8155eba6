//! Categorical resolver for specialty, provider type and region values
//!
//! Resolution order:
//! 1. Learned mapping (case-insensitive), for every kind
//! 2. Specialty: exact `(survey source, raw specialty)` match in the static table
//! 3. Specialty: fuzzy match on normalized spellings
//! 4. Region: static variant table, then keyword rules; provider type: keyword rules
//! 5. Fallback: the normalized input
//!
//! Resolution never fails.

use super::keyword_rules::{match_rules, PROVIDER_TYPE_RULES, REGION_RULES};
use super::{MappingKind, MappingTables};
use std::collections::HashMap;
use tracing::debug;

/// Provider type used when neither the row nor the survey names one
pub const DEFAULT_PROVIDER_TYPE: &str = "Physician";

/// Region used when a row carries no region at all
pub const DEFAULT_REGION: &str = "National";

/// Per-survey context for resolution
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub survey_source: &'a str,
    pub default_provider_type: Option<&'a str>,
}

/// Resolver over one set of mapping tables
///
/// Build once per ingest pass; lookups are then hash-map hits.
pub struct CategoricalResolver<'a> {
    tables: &'a MappingTables,
    /// (source lower, raw specialty trimmed) -> canonical
    exact_specialties: HashMap<(String, String), &'a str>,
    /// fuzzy key -> canonical; first mapping wins on collisions
    fuzzy_specialties: HashMap<String, &'a str>,
}

impl<'a> CategoricalResolver<'a> {
    pub fn new(tables: &'a MappingTables) -> Self {
        let mut exact_specialties = HashMap::new();
        let mut fuzzy_specialties = HashMap::new();

        for mapping in &tables.specialties {
            let canonical = mapping.standardized_name.as_str();
            fuzzy_specialties
                .entry(fuzzy_key(canonical))
                .or_insert(canonical);
            for source in &mapping.source_specialties {
                exact_specialties
                    .entry((
                        source.survey_source.trim().to_lowercase(),
                        source.specialty.trim().to_string(),
                    ))
                    .or_insert(canonical);
                fuzzy_specialties
                    .entry(fuzzy_key(&source.specialty))
                    .or_insert(canonical);
            }
        }

        Self {
            tables,
            exact_specialties,
            fuzzy_specialties,
        }
    }

    /// Resolve a raw value of `kind` to its canonical name
    pub fn resolve(&self, kind: MappingKind, raw: &str, ctx: &ResolveContext<'_>) -> String {
        match kind {
            MappingKind::Specialty => self.resolve_specialty(raw, ctx),
            MappingKind::ProviderType => self.resolve_provider_type(raw, ctx),
            MappingKind::Region => self.resolve_region(raw),
            MappingKind::Column | MappingKind::Variable => self
                .tables
                .learned
                .lookup(kind, raw)
                .map(str::to_string)
                .unwrap_or_else(|| fallback(raw)),
        }
    }

    pub fn resolve_specialty(&self, raw: &str, ctx: &ResolveContext<'_>) -> String {
        if let Some(learned) = self.tables.learned.lookup(MappingKind::Specialty, raw) {
            return learned.to_string();
        }

        let exact_key = (ctx.survey_source.trim().to_lowercase(), raw.trim().to_string());
        if let Some(canonical) = self.exact_specialties.get(&exact_key) {
            return canonical.to_string();
        }

        if let Some(canonical) = self.fuzzy_specialties.get(&fuzzy_key(raw)) {
            debug!(raw = %raw, canonical = %canonical, "Specialty resolved by fuzzy match");
            return canonical.to_string();
        }

        fallback(raw)
    }

    pub fn resolve_provider_type(&self, raw: &str, ctx: &ResolveContext<'_>) -> String {
        let raw = if raw.trim().is_empty() {
            ctx.default_provider_type.unwrap_or(DEFAULT_PROVIDER_TYPE)
        } else {
            raw
        };

        if let Some(learned) = self.tables.learned.lookup(MappingKind::ProviderType, raw) {
            return learned.to_string();
        }

        let normalized = normalize_label(raw);
        match match_rules(PROVIDER_TYPE_RULES, &normalized) {
            Some(canonical) => canonical.to_string(),
            None => fallback(raw),
        }
    }

    pub fn resolve_region(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return DEFAULT_REGION.to_string();
        }

        if let Some(learned) = self.tables.learned.lookup(MappingKind::Region, raw) {
            return learned.to_string();
        }

        let normalized = normalize_label(raw);
        let from_table = self.tables.regions.iter().find(|mapping| {
            normalize_label(&mapping.standardized_name) == normalized
                || mapping
                    .variants
                    .iter()
                    .any(|variant| normalize_label(variant) == normalized)
        });
        if let Some(mapping) = from_table {
            return mapping.standardized_name.clone();
        }

        match match_rules(REGION_RULES, &normalized) {
            Some(canonical) => canonical.to_string(),
            None => fallback(raw),
        }
    }
}

/// Lower-case and collapse runs of whitespace
pub fn normalize_label(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Specialty comparison key: normalized label with the token "and" dropped
///
/// "Obstetrics and Gynecology" and "Obstetrics  Gynecology" share a key.
pub fn fuzzy_key(value: &str) -> String {
    value
        .to_lowercase()
        .replace('&', " ")
        .split_whitespace()
        .filter(|token| *token != "and")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-effort value when nothing matched
fn fallback(raw: &str) -> String {
    let normalized = normalize_label(raw);
    if normalized.is_empty() {
        raw.to_string()
    } else {
        normalized
    }
}
