//! Settings resolution tests
//!
//! Covers the priority order (overrides > environment > TOML > defaults) and
//! graceful handling of missing or invalid inputs.
//!
//! Tests that manipulate `REEL_*` environment variables are marked #[serial]
//! so they never run in parallel with each other.

use reel_common::config::{
    resolve_settings, EngineSettings, ProfileTier, SettingsOverrides, ENV_AUTO_PAUSE_WINDOW_MS,
    ENV_MEMORY_THRESHOLD, ENV_PREFETCH_THRESHOLD, ENV_PROFILE_TIER,
};
use serial_test::serial;
use std::env;
use std::io::Write;

fn clear_env() {
    env::remove_var(ENV_PROFILE_TIER);
    env::remove_var(ENV_MEMORY_THRESHOLD);
    env::remove_var(ENV_PREFETCH_THRESHOLD);
    env::remove_var(ENV_AUTO_PAUSE_WINDOW_MS);
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_explicit_file_is_loaded() {
    clear_env();
    let file = write_config(
        r#"
        profile_tier = "balanced"
        prefetch_threshold = 5
        auto_pause_window_ms = 10000
        "#,
    );

    let settings = resolve_settings(Some(file.path()), &SettingsOverrides::default()).unwrap();

    assert_eq!(settings.profile_tier, Some(ProfileTier::Balanced));
    assert_eq!(settings.prefetch_threshold, 5);
    assert_eq!(settings.auto_pause_window_ms, 10_000);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = resolve_settings(Some(&missing), &SettingsOverrides::default());
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_env_beats_file() {
    clear_env();
    let file = write_config(
        r#"
        profile_tier = "quality"
        memory_threshold = 10
        "#,
    );
    env::set_var(ENV_PROFILE_TIER, "performance");
    env::set_var(ENV_MEMORY_THRESHOLD, "2");

    let settings = resolve_settings(Some(file.path()), &SettingsOverrides::default()).unwrap();
    clear_env();

    assert_eq!(settings.profile_tier, Some(ProfileTier::Performance));
    assert_eq!(settings.memory_threshold, Some(2));
}

#[test]
#[serial]
fn test_overrides_beat_env() {
    clear_env();
    let file = write_config("");
    env::set_var(ENV_PREFETCH_THRESHOLD, "12");
    env::set_var(ENV_AUTO_PAUSE_WINDOW_MS, "9000");

    let overrides = SettingsOverrides {
        prefetch_threshold: Some(4),
        ..SettingsOverrides::default()
    };
    let settings = resolve_settings(Some(file.path()), &overrides).unwrap();
    clear_env();

    assert_eq!(settings.prefetch_threshold, 4);
    assert_eq!(settings.auto_pause_window_ms, 9_000);
}

#[test]
#[serial]
fn test_invalid_env_values_are_ignored() {
    clear_env();
    let file = write_config("prefetch_threshold = 6");
    env::set_var(ENV_PROFILE_TIER, "warp-speed");
    env::set_var(ENV_PREFETCH_THRESHOLD, "lots");

    let settings = resolve_settings(Some(file.path()), &SettingsOverrides::default()).unwrap();
    clear_env();

    assert_eq!(settings.profile_tier, None);
    assert_eq!(settings.prefetch_threshold, 6);
}

#[test]
#[serial]
fn test_invalid_values_fail_validation() {
    clear_env();
    let file = write_config("fade_steps = 0");

    let result = resolve_settings(Some(file.path()), &SettingsOverrides::default());
    assert!(result.is_err());
}

#[test]
fn test_malformed_toml_is_error() {
    let file = write_config("prefetch_threshold = [");
    assert!(EngineSettings::load_file(file.path()).is_err());
}
