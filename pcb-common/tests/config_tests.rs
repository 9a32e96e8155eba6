//! Integration tests for configuration resolution and graceful degradation
//!
//! Covers:
//! - Missing config files fall back to compiled defaults
//! - Priority order: command line, then PCB_CONFIG, then platform default
//! - Malformed files are reported as configuration errors
//!
//! Tests that manipulate PCB_CONFIG are marked with #[serial] so they do not
//! race each other.

use pcb_common::config::{ConfigResolver, Grouping, PcbConfig, CONFIG_ENV_VAR};
use pcb_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_cli_path_wins_over_env_var() {
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", "[ingest]\nmax_concurrent_surveys = 7\n");
    let env_file = write_config(&dir, "env.toml", "[ingest]\nmax_concurrent_surveys = 2\n");
    env::set_var(CONFIG_ENV_VAR, &env_file);

    let config = ConfigResolver::new(Some(cli)).resolve().unwrap();
    assert_eq!(config.ingest.max_concurrent_surveys, 7);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_path() {
    let dir = TempDir::new().unwrap();
    let env_file = write_config(
        &dir,
        "env.toml",
        "[ingest]\ngrouping = \"by_source_and_year\"\n[logging]\nlevel = \"debug\"\n",
    );
    env::set_var(CONFIG_ENV_VAR, &env_file);

    let resolver = ConfigResolver::new(None);
    assert_eq!(resolver.config_path(), Some(env_file));
    let config = resolver.resolve().unwrap();
    assert_eq!(config.ingest.grouping, Grouping::BySourceAndYear);
    assert_eq!(config.logging.level, "debug");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let config = ConfigResolver::new(Some(missing)).resolve().unwrap();
    assert_eq!(config, PcbConfig::default());
}

#[test]
#[serial]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let bad = write_config(&dir, "bad.toml", "[cache\nmax_age_secs = ");

    let err = ConfigResolver::new(Some(bad)).resolve().unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {:?}", err);
}

#[test]
#[serial]
fn test_invalid_values_are_rejected_at_load() {
    let dir = TempDir::new().unwrap();
    let bad = write_config(&dir, "bad.toml", "[ingest]\npage_size = 0\n");

    let err = PcbConfig::load(&bad).unwrap_err();
    assert!(err.to_string().contains("page_size"));
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "   ");
    let resolver = ConfigResolver::new(None);
    let path = resolver.config_path();
    assert_ne!(path, Some(PathBuf::from("   ")));
    env::remove_var(CONFIG_ENV_VAR);
}
