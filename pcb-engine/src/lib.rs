//! Physician compensation benchmark engine
//!
//! Turns heterogeneous survey uploads into canonical benchmark records:
//!
//! - [`mapping`]: categorical resolution of specialty, provider type and region
//! - [`normalize`]: wide and long raw rows to one canonical row shape
//! - [`aggregate`]: per-group merge of metric families with independent provenance
//! - [`cache`]: content-addressed computation cache and the freshness snapshot
//! - [`blend`]: multi-year blending with confidence scoring
//! - [`service`]: the pipeline wired against a [`store::DataStore`]

pub mod aggregate;
pub mod blend;
pub mod cache;
pub mod error;
pub mod mapping;
pub mod models;
pub mod normalize;
pub mod query;
pub mod service;
pub mod store;

pub use crate::error::{BlendError, EngineError, Result, StoreError};
pub use crate::service::BenchmarkService;
