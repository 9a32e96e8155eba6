//! Shared fixtures for engine integration tests

#![allow(dead_code)]

pub mod log_capture;

use chrono::{TimeZone, Utc};
use pcb_common::config::PcbConfig;
use pcb_engine::models::{RawRow, SurveyMeta};
use pcb_engine::store::{InMemoryDataStore, StoreFixture};
use pcb_engine::BenchmarkService;
use serde_json::Value;
use std::path::PathBuf;

pub const SAMPLE_STORE: &str = include_str!("../fixtures/sample_store.json");

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn sample_store() -> InMemoryDataStore {
    InMemoryDataStore::from_json_str(SAMPLE_STORE).unwrap()
}

pub fn sample_service() -> BenchmarkService<InMemoryDataStore> {
    BenchmarkService::new(sample_store(), PcbConfig::default())
}

pub fn service_with(store: InMemoryDataStore, configure: impl FnOnce(&mut PcbConfig)) -> BenchmarkService<InMemoryDataStore> {
    let mut config = PcbConfig::default();
    configure(&mut config);
    BenchmarkService::new(store, config)
}

/// Raw row from a `serde_json::json!` object literal
pub fn raw(value: Value) -> RawRow {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn survey(id: &str, source: &str, year: i32) -> SurveyMeta {
    SurveyMeta {
        id: id.to_string(),
        name: source.to_string(),
        year,
        row_count: 0,
        specialty_count: 0,
        upload_date: Utc.with_ymd_and_hms(year, 3, 1, 0, 0, 0).unwrap(),
        provider_type: None,
    }
}

/// Store with one survey per `(id, source, year, rows)` entry
pub fn store_of(surveys: Vec<(&str, &str, i32, Vec<RawRow>)>) -> InMemoryDataStore {
    let mut fixture = StoreFixture::default();
    for (id, source, year, rows) in surveys {
        let mut meta = survey(id, source, year);
        meta.row_count = rows.len() as u64;
        fixture.surveys.push(meta);
        fixture.rows.insert(id.to_string(), rows);
    }
    InMemoryDataStore::from_fixture(fixture)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}
