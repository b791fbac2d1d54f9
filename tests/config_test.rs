//! Integration tests for Settings loading with layered precedence.
//!
//! These tests pass an explicit local config file; environment overrides
//! live in `config_env_test.rs` so they cannot leak into parallel tests.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use orgtree::application::services::UnitKeyMatch;
use orgtree::application::ApplicationError;
use orgtree::config::{Settings, DEFAULT_TTL_SECS};
use orgtree::domain::DEFAULT_MAX_DEPTH;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("orgtree.toml");
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn given_local_config_when_load_then_overrides_defaults_per_key() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[cache]
default_ttl_secs = 120
unit_match = "substring"
"#,
    );

    // Act
    let settings = Settings::load(Some(&path)).expect("load settings");

    // Assert
    assert_eq!(settings.cache.default_ttl_secs, 120);
    assert_eq!(settings.cache.unit_match, UnitKeyMatch::Substring);
    assert_eq!(settings.tree.max_depth, DEFAULT_MAX_DEPTH);
    assert!(settings.tree.reject_duplicate_ids);
}

#[test]
fn given_units_file_with_tilde_when_load_then_path_is_expanded() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"units_file = "~/data/units.json""#);

    let settings = Settings::load(Some(&path)).expect("load settings");

    let units_file = settings.units_file.expect("units_file set");
    assert!(!units_file.to_string_lossy().starts_with('~'));
    assert!(units_file.ends_with("data/units.json"));
}

#[test]
fn given_tree_limits_when_load_then_build_options_follow() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[tree]
max_depth = 8
reject_duplicate_ids = false
"#,
    );

    let options = Settings::load(Some(&path))
        .expect("load settings")
        .tree
        .build_options();

    assert_eq!(options.max_depth, 8);
    assert!(!options.reject_duplicate_ids);
}

#[test]
fn given_missing_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = Settings::load(Some(&missing));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_unknown_match_mode_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[cache]\nunit_match = \"fuzzy\"\n");

    assert!(matches!(
        Settings::load(Some(&path)),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_loaded_settings_when_rendering_toml_then_reloads_identically() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[cache]\ndefault_ttl_secs = 30\n");
    let settings = Settings::load(Some(&path)).expect("load settings");

    let rendered = settings.to_toml().expect("render");
    let reparsed = write_config(&dir, &rendered);

    assert_eq!(Settings::load(Some(&reparsed)).expect("reload"), settings);
    assert_ne!(settings.cache.default_ttl_secs, DEFAULT_TTL_SECS);
}
