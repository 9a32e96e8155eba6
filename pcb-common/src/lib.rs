//! # PCB Common Library
//!
//! Shared code for the physician compensation benchmark workspace:
//! - Error and result types
//! - TOML configuration loading and resolution
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use config::PcbConfig;
pub use error::{Error, Result};
