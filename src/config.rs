//! Application-level configuration: the JSON settings file plus the environment knobs read at
//! startup.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SQUAD_CHOICE_CONFIG_PATH";
/// Color handed out once every palette entry is taken.
pub const FALLBACK_COLOR: &str = "linear-gradient(135deg, #9E9E9E 0%, #616161 100%)";

const DEFAULT_POLL_INTERVAL_MS: u64 = 4_000;
const DEFAULT_RECONNECTING_AFTER: u32 = 3;
const DEFAULT_RETENTION_DAYS: u64 = 7;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3_600;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    colors: Vec<String>,
    poll_interval: Duration,
    reconnecting_after: u32,
    retention: Duration,
    sweep_interval: Option<Duration>,
    cron_secret: Option<String>,
}

impl AppConfig {
    /// Load the configuration file, falling back to built-in defaults, then read `CRON_SECRET`.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        colors = app_config.colors.len(),
                        poll_interval_ms = app_config.poll_interval.as_millis(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_cron_secret(
            env::var("CRON_SECRET")
                .ok()
                .filter(|secret| !secret.trim().is_empty()),
        )
    }

    /// Replace the secret required by the cleanup endpoint.
    pub fn with_cron_secret(mut self, secret: Option<String>) -> Self {
        self.cron_secret = secret;
        self
    }

    /// Palette offered to new profiles.
    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    /// Period of the client sync loop.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Consecutive failed pulls before a client reports itself as reconnecting.
    pub fn reconnecting_after(&self) -> u32 {
        self.reconnecting_after
    }

    /// Inactivity after which a session is purged.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Period of the background retention sweep, if enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval
    }

    /// Bearer secret expected by the cleanup endpoint.
    pub fn cron_secret(&self) -> Option<&str> {
        self.cron_secret.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    colors: Vec<String>,
    poll_interval_ms: u64,
    reconnecting_after: u32,
    retention_days: u64,
    sweep_interval_secs: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reconnecting_after: DEFAULT_RECONNECTING_AFTER,
            retention_days: DEFAULT_RETENTION_DAYS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let colors = if value.colors.is_empty() {
            default_colors()
        } else {
            value.colors
        };

        Self {
            colors,
            poll_interval: Duration::from_millis(value.poll_interval_ms.max(1)),
            reconnecting_after: value.reconnecting_after.max(1),
            retention: Duration::from_secs(value.retention_days.saturating_mul(SECONDS_PER_DAY)),
            sweep_interval: (value.sweep_interval_secs > 0)
                .then(|| Duration::from_secs(value.sweep_interval_secs)),
            cron_secret: None,
        }
    }
}

/// Persistence backend selected through `STORE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map; sessions do not survive a restart.
    Memory,
    /// CouchDB over HTTP.
    Couch,
    /// MongoDB.
    Mongo,
}

impl StoreBackend {
    /// Read `STORE_BACKEND`, defaulting to [`StoreBackend::Memory`].
    pub fn from_env() -> Self {
        match env::var("STORE_BACKEND") {
            Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "unknown STORE_BACKEND; using in-memory store");
                StoreBackend::Memory
            }),
            Err(_) => StoreBackend::Memory,
        }
    }

    /// Parse a backend name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Some(StoreBackend::Memory),
            "couch" | "couchdb" => Some(StoreBackend::Couch),
            "mongo" | "mongodb" => Some(StoreBackend::Mongo),
            _ => None,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in avatar gradients shipped with the binary.
fn default_colors() -> Vec<String> {
    [
        "linear-gradient(135deg, #FF6B6B 0%, #EA4335 100%)",
        "linear-gradient(135deg, #FBBC05 0%, #FFD600 100%)",
        "linear-gradient(135deg, #34A853 0%, #00C853 100%)",
        "linear-gradient(135deg, #4285F4 0%, #2962FF 100%)",
        "linear-gradient(135deg, #A142F4 0%, #6200EA 100%)",
        "linear-gradient(135deg, #FF4081 0%, #F50057 100%)",
        "linear-gradient(135deg, #00BCD4 0%, #0097A7 100%)",
        "linear-gradient(135deg, #FF9800 0%, #EF6C00 100%)",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}
