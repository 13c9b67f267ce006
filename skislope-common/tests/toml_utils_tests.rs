//! Tests for TOML atomic write utilities
//!
//! Atomic file operations (temp + rename), round trip through
//! `load_toml_config`, parent directory creation and 0600 permissions.

use serde::{Deserialize, Serialize};
use skislope_common::config::{load_toml_config, write_toml_config, LoggingConfig};
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SampleConfig {
    server_url: String,
    cache_capacity: usize,
    #[serde(default)]
    logging: LoggingConfig,
}

fn sample() -> SampleConfig {
    SampleConfig {
        server_url: "http://localhost:8081".to_string(),
        cache_capacity: 10,
        logging: LoggingConfig {
            level: "debug".to_string(),
            file: Some(PathBuf::from("/tmp/skislope.log")),
        },
    }
}

#[test]
fn test_atomic_write_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("elevation.toml");

    write_toml_config(&sample(), &target).unwrap();

    assert!(target.exists());
    assert!(!temp_dir.path().join("elevation.toml.tmp").exists());
}

#[test]
fn test_written_config_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("elevation.toml");

    write_toml_config(&sample(), &target).unwrap();
    let loaded: SampleConfig = load_toml_config(&target).unwrap();

    assert_eq!(loaded, sample());
}

#[test]
fn test_write_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("dir").join("elevation.toml");

    write_toml_config(&sample(), &target).unwrap();

    assert!(target.exists());
}

#[test]
fn test_overwrite_replaces_previous_content() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("elevation.toml");

    write_toml_config(&sample(), &target).unwrap();

    let mut updated = sample();
    updated.cache_capacity = 25;
    write_toml_config(&updated, &target).unwrap();

    let loaded: SampleConfig = load_toml_config(&target).unwrap();
    assert_eq!(loaded.cache_capacity, 25);
}

#[cfg(unix)]
#[test]
fn test_written_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("elevation.toml");

    write_toml_config(&sample(), &target).unwrap();

    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
