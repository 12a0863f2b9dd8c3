//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Event engagement configuration.
    #[serde(default)]
    pub engagement: EngagementConfig,
    /// Notification delivery configuration.
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Event engagement configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngagementConfig {
    /// Attending count at which an event is considered popular and nearby
    /// users are alerted.
    #[serde(default = "default_attendance_threshold")]
    pub attendance_threshold: u64,
    /// Radius in kilometres used for popular-event proximity alerts.
    #[serde(default = "default_proximity_radius_km")]
    pub proximity_radius_km: f64,
    /// Smallest radius accepted for any geo-radius resolution.
    #[serde(default = "default_min_radius_km")]
    pub min_radius_km: f64,
    /// Largest radius accepted for any geo-radius resolution.
    #[serde(default = "default_max_radius_km")]
    pub max_radius_km: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            attendance_threshold: default_attendance_threshold(),
            proximity_radius_km: default_proximity_radius_km(),
            min_radius_km: default_min_radius_km(),
            max_radius_km: default_max_radius_km(),
        }
    }
}

/// Notification delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// TTL in seconds for cached per-user notification preferences.
    #[serde(default = "default_preference_ttl_secs")]
    pub preference_ttl_secs: u64,
    /// Push provider endpoint URL. Push delivery is disabled when unset.
    #[serde(default)]
    pub push_endpoint: Option<String>,
    /// Bounded timeout in seconds for a single push provider call.
    #[serde(default = "default_push_timeout_secs")]
    pub push_timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            preference_ttl_secs: default_preference_ttl_secs(),
            push_endpoint: None,
            push_timeout_secs: default_push_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_attendance_threshold() -> u64 {
    20
}

const fn default_proximity_radius_km() -> f64 {
    10.0
}

const fn default_min_radius_km() -> f64 {
    1.0
}

const fn default_max_radius_km() -> f64 {
    100.0
}

const fn default_preference_ttl_secs() -> u64 {
    300
}

const fn default_push_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `KOINONIA_ENV`)
    /// 3. Environment variables with `KOINONIA` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("KOINONIA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("KOINONIA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("KOINONIA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
