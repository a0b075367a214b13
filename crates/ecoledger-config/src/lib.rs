//! Configuration management for ecoledger
//!
//! This module handles loading, validation, and management of
//! ecoledger configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::ConfigError;

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Where records live
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Records are kept in the local key-value file, changes apply immediately
    Local,
    /// Records are kept in a remote collection, changes arrive as live events
    Remote,
}

impl Default for StorageMode {
    fn default() -> Self {
        StorageMode::Local
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageMode::Local),
            "remote" => Ok(StorageMode::Remote),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::Local => write!(f, "local"),
            StorageMode::Remote => write!(f, "remote"),
        }
    }
}

/// Remote backend flavour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// REST class endpoint, polled for changes
    Rest,
    /// In-process hosted collection (demos and tests)
    Memory,
}

impl Default for RemoteKind {
    fn default() -> Self {
        RemoteKind::Rest
    }
}

impl std::fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteKind::Rest => write!(f, "rest"),
            RemoteKind::Memory => write!(f, "memory"),
        }
    }
}

/// Remote collection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Backend flavour
    #[serde(default)]
    pub kind: RemoteKind,
    /// Base URL of the REST service (e.g., "https://api.example.com")
    #[serde(default)]
    pub base_url: String,
    /// Application id header value
    #[serde(default)]
    pub app_id: String,
    /// Application key header value
    #[serde(default)]
    pub app_key: String,
    /// Collection (class) holding the records
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Interval between change polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            kind: RemoteKind::Rest,
            base_url: String::new(),
            app_id: String::new(),
            app_key: String::new(),
            collection: default_collection(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_collection() -> String {
    "Transaction".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Record storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Local or remote records
    #[serde(default)]
    pub mode: StorageMode,
    /// Maximum number of records fetched when the store is mounted
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    /// Key-value file used in local mode (also holds preferences)
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    /// Remote collection settings (required in remote mode)
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Local,
            fetch_limit: default_fetch_limit(),
            local_path: default_local_path(),
            remote: None,
        }
    }
}

fn default_fetch_limit() -> usize {
    100
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./data/ecoledger.json")
}

/// Preference settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Accent color used when nothing valid is stored
    #[serde(default = "default_accent")]
    pub default_accent: String,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            default_accent: default_accent(),
        }
    }
}

fn default_accent() -> String {
    "#7C3AED".to_string()
}

/// UI language
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Default for Language {
    fn default() -> Self {
        Language::Zh
    }
}

impl std::str::FromStr for Language {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "zh" | "chinese" | "中文" => Ok(Language::Zh),
            _ => Err(format!("Invalid language: {}", s)),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Zh => write!(f, "zh"),
        }
    }
}

/// Display and number formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Default language
    #[serde(default)]
    pub language: Language,
    /// Currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Currency symbol shown before amounts
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// Number of decimal places
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Offset from UTC used for time labels, in minutes
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            language: Language::Zh,
            currency: default_currency(),
            currency_symbol: default_currency_symbol(),
            decimal_places: default_decimal_places(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

fn default_currency() -> String {
    "CNY".to_string()
}

fn default_currency_symbol() -> String {
    "¥".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

fn default_utc_offset_minutes() -> i32 {
    480
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Record storage settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Preference settings
    #[serde(default)]
    pub preferences: PreferencesConfig,
    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::IoError)?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|_| ConfigError::InvalidYaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if self.storage.fetch_limit == 0 || self.storage.fetch_limit > 1000 {
            return Err(ConfigError::InvalidValue {
                field: "storage.fetch_limit".to_string(),
                reason: "Fetch limit must be between 1 and 1000".to_string(),
            });
        }

        if self.storage.mode == StorageMode::Remote {
            let remote = self.storage.remote.as_ref().ok_or_else(|| ConfigError::MissingField {
                field: "storage.remote".to_string(),
            })?;

            if remote.kind == RemoteKind::Rest {
                if remote.base_url.trim().is_empty() {
                    return Err(ConfigError::MissingField {
                        field: "storage.remote.base_url".to_string(),
                    });
                }
                if remote.collection.trim().is_empty() {
                    return Err(ConfigError::MissingField {
                        field: "storage.remote.collection".to_string(),
                    });
                }
            }

            if remote.poll_interval_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "storage.remote.poll_interval_ms".to_string(),
                    reason: "Poll interval must be greater than 0".to_string(),
                });
            }
        }

        if self.display.decimal_places > 10 {
            return Err(ConfigError::InvalidValue {
                field: "display.decimal_places".to_string(),
                reason: "Decimal places must be between 0 and 10".to_string(),
            });
        }

        if self.display.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue {
                field: "display.utc_offset_minutes".to_string(),
                reason: "Offset must be within one day of UTC".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Log level must be one of: {}", LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Path of the local key-value file
    pub fn local_path(&self) -> &Path {
        &self.storage.local_path
    }

    /// Check if records are kept remotely
    pub fn is_remote(&self) -> bool {
        self.storage.mode == StorageMode::Remote
    }
}

// ==================== Tests ====================
