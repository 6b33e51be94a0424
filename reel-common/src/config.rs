//! Engine settings loading
//!
//! Settings sources, highest priority first:
//! 1. Caller overrides (command-line arguments)
//! 2. Environment variables (`REEL_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing configuration file is not an error: the engine starts on
//! defaults. A file that exists but does not parse is reported.

use crate::fade_curves::FadeCurve;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ENV_PROFILE_TIER: &str = "REEL_PROFILE_TIER";
pub const ENV_MEMORY_THRESHOLD: &str = "REEL_MEMORY_THRESHOLD";
pub const ENV_PREFETCH_THRESHOLD: &str = "REEL_PREFETCH_THRESHOLD";
pub const ENV_AUTO_PAUSE_WINDOW_MS: &str = "REEL_AUTO_PAUSE_WINDOW_MS";

/// Performance tier driving pool size and autoplay aggressiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileTier {
    /// Constrained device or network: smallest pool, autoplay only when focused
    Performance,
    Balanced,
    /// Capable device: largest pool, eager autoplay
    Quality,
}

impl ProfileTier {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "performance" => Some(ProfileTier::Performance),
            "balanced" => Some(ProfileTier::Balanced),
            "quality" => Some(ProfileTier::Quality),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileTier::Performance => "performance",
            ProfileTier::Balanced => "balanced",
            ProfileTier::Quality => "quality",
        }
    }
}

impl std::fmt::Display for ProfileTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter (trace, debug, info, warn, error or a full EnvFilter directive)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Coordinator settings
///
/// Every field has a built-in default, so an empty TOML document is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Forced tier; detected from device capabilities when unset
    pub profile_tier: Option<ProfileTier>,

    /// Resource pool bound; tier default when unset
    pub memory_threshold: Option<usize>,

    /// Remaining-item count below which the loader is asked for more
    pub prefetch_threshold: usize,

    /// Non-looping audio fades out and pauses after this window
    pub auto_pause_window_ms: u64,

    /// Session volume when the caller does not pass one
    pub default_volume: f32,

    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
    pub fade_steps: u32,
    pub fade_curve: FadeCurve,

    /// Upper bound on a single element start
    pub start_timeout_ms: u64,

    /// Delay before switching audio after navigation
    pub settle_delay_ms: u64,

    /// Re-entrant navigation rejection window
    pub debounce_ms: u64,

    /// Items on each side of the active one treated as visible
    pub visibility_window: usize,

    pub sweep_interval_ms: u64,
    pub idle_eviction_ms: u64,

    pub event_capacity: usize,

    pub logging: LoggingConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            profile_tier: None,
            memory_threshold: None,
            prefetch_threshold: 8,
            auto_pause_window_ms: 30_000,
            default_volume: 0.8,
            fade_in_ms: 500,
            fade_out_ms: 300,
            fade_steps: 20,
            fade_curve: FadeCurve::Linear,
            start_timeout_ms: 8_000,
            settle_delay_ms: 150,
            debounce_ms: 100,
            visibility_window: 2,
            sweep_interval_ms: 30_000,
            idle_eviction_ms: 120_000,
            event_capacity: 256,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineSettings {
    /// Parse settings from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: EngineSettings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml_str(&content)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `REEL_*` environment variables
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(ENV_PROFILE_TIER) {
            match ProfileTier::parse(&value) {
                Some(tier) => {
                    debug!("{}={} overrides profile tier", ENV_PROFILE_TIER, tier);
                    self.profile_tier = Some(tier);
                }
                None => warn!("Ignoring invalid {}='{}'", ENV_PROFILE_TIER, value),
            }
        }

        if let Some(threshold) = env_number::<usize>(ENV_MEMORY_THRESHOLD) {
            self.memory_threshold = Some(threshold);
        }
        if let Some(threshold) = env_number::<usize>(ENV_PREFETCH_THRESHOLD) {
            self.prefetch_threshold = threshold;
        }
        if let Some(window) = env_number::<u64>(ENV_AUTO_PAUSE_WINDOW_MS) {
            self.auto_pause_window_ms = window;
        }
    }

    /// Apply caller overrides (highest priority)
    pub fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(tier) = overrides.profile_tier {
            self.profile_tier = Some(tier);
        }
        if let Some(threshold) = overrides.memory_threshold {
            self.memory_threshold = Some(threshold);
        }
        if let Some(threshold) = overrides.prefetch_threshold {
            self.prefetch_threshold = threshold;
        }
        if let Some(window) = overrides.auto_pause_window_ms {
            self.auto_pause_window_ms = window;
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.fade_steps == 0 {
            return Err(Error::Config("fade_steps must be at least 1".to_string()));
        }
        if self.memory_threshold == Some(0) {
            return Err(Error::Config("memory_threshold must be at least 1".to_string()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(Error::Config("sweep_interval_ms must be greater than 0".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(Error::Config(format!(
                "default_volume must be within 0.0..=1.0, got {}",
                self.default_volume
            )));
        }
        Ok(())
    }

    pub fn auto_pause_window(&self) -> Duration {
        Duration::from_millis(self.auto_pause_window_ms)
    }

    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn idle_eviction(&self) -> Duration {
        Duration::from_millis(self.idle_eviction_ms)
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse::<T>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring invalid {}='{}'", name, value);
            None
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub profile_tier: Option<ProfileTier>,
    pub memory_threshold: Option<usize>,
    pub prefetch_threshold: Option<usize>,
    pub auto_pause_window_ms: Option<u64>,
}

/// Default per-user configuration file: `<config_dir>/reel/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reel").join("config.toml"))
}

/// Resolve settings from all sources
///
/// An explicit `config_path` must exist. Without one, the default per-user
/// file is used when present and built-in defaults otherwise.
pub fn resolve_settings(
    config_path: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<EngineSettings> {
    let mut settings = match config_path {
        Some(path) => EngineSettings::load_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => EngineSettings::load_file(&path)?,
            _ => {
                info!("No configuration file found, using built-in defaults");
                EngineSettings::default()
            }
        },
    };

    settings.apply_env();
    settings.apply_overrides(overrides);
    settings.validate()?;
    Ok(settings)
}
