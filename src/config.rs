//! Configuration loading.
//!
//! Loads `config.toml` from `$CARDSYNC_CONFIG` or `~/.cardsync/config.toml`.
//! Environment variables override file values; file values override defaults.
//! Secrets never live here; see [`crate::credentials`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::destinations::notion::{NOTION_API_BASE, NOTION_API_VERSION};
use crate::extraction::review::DEFAULT_LOW_CONFIDENCE_THRESHOLD;
use crate::verification::openai::{DEFAULT_PROBE_MODEL, OPENAI_API_BASE};
use crate::verification::{
    RetryPolicy, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF_MS,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CARDSYNC_CONFIG";

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model API used for credential checks (`[openai]`).
    pub openai: OpenAiConfig,
    /// Destination database (`[notion]`).
    pub notion: NotionConfig,
    /// Credential retry schedule (`[verification]`).
    pub verification: VerificationConfig,
    /// Data-quality review (`[review]`).
    pub review: ReviewConfig,
    /// Log output (`[logging]`).
    pub logging: LoggingConfig,
}

impl Config {
    /// Load with precedence: env vars > TOML file > defaults.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// the home directory cannot be determined.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`Config::load`] with a custom env resolver.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = match env(CONFIG_PATH_ENV) {
            Some(p) => PathBuf::from(p),
            None => config_dir()?.join("config.toml"),
        };
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from one TOML file without env overrides. Missing file → defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("failed to read config at {}", path.display()))
            }
        }
    }

    /// Parse a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrongly-typed values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests never touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CARDSYNC_OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = env("CARDSYNC_OPENAI_PROBE_MODEL") {
            self.openai.probe_model = v;
        }
        if let Some(v) = env("CARDSYNC_NOTION_BASE_URL") {
            self.notion.base_url = v;
        }
        if let Some(v) = env("CARDSYNC_NOTION_DATABASE_ID") {
            self.notion.database_id = v;
        }
        if let Some(v) = env("CARDSYNC_VERIFY_ATTEMPTS") {
            match v.parse() {
                Ok(n) => self.verification.max_attempts = n,
                Err(_) => tracing::warn!(
                    var = "CARDSYNC_VERIFY_ATTEMPTS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("CARDSYNC_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("CARDSYNC_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
    }
}

/// Resolve the default config directory (`~/.cardsync/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".cardsync"))
}

// ── Sections ────────────────────────────────────────────────────

/// Model API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL.
    pub base_url: String,
    /// Model retrieved by the fallback credential probe.
    pub probe_model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_API_BASE.to_owned(),
            probe_model: DEFAULT_PROBE_MODEL.to_owned(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OpenAiConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Destination database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    /// API base URL.
    pub base_url: String,
    /// Target database identifier.
    pub database_id: String,
    /// `Notion-Version` header value.
    pub api_version: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            base_url: NOTION_API_BASE.to_owned(),
            database_id: String::new(),
            api_version: NOTION_API_VERSION.to_owned(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NotionConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Credential retry schedule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Attempts per probe method.
    pub max_attempts: u32,
    /// First retry delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl VerificationConfig {
    /// Retry policy for the credential validator.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff_ms: self.initial_backoff_ms,
            max_backoff_ms: self.max_backoff_ms.max(self.initial_backoff_ms),
        }
    }
}

/// Review thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Confidence below which records are flagged.
    pub low_confidence_threshold: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs; console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
