//! Environment variable overrides for Settings.
//!
//! Kept in its own test binary: the process environment is shared by all
//! tests of a binary.

use std::env;
use std::fs;

use tempfile::TempDir;

use orgtree::config::Settings;

#[test]
fn given_env_override_when_load_then_env_wins_over_local_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orgtree.toml");
    fs::write(&path, "[cache]\ndefault_ttl_secs = 120\n").unwrap();

    env::set_var("ORGTREE_CACHE__DEFAULT_TTL_SECS", "42");
    let settings = Settings::load(Some(&path));
    env::remove_var("ORGTREE_CACHE__DEFAULT_TTL_SECS");

    assert_eq!(settings.expect("load settings").cache.default_ttl_secs, 42);
}
