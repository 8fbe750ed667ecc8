//! Application configuration structures.
//!
//! All engine parameters are carried in an explicit [`Config`] value that
//! is constructed once and passed into the components that need it. There
//! is no process-global mutable configuration state.

use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// SQLite database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path (`:memory:` supported for tests)
    pub path: String,
    /// Connection pool size
    #[serde(default = "defaults::pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "marquee.db".to_string(), pool_size: defaults::pool_size() }
    }
}

/// Upstream events provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider's events endpoint
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout_seconds")]
    pub timeout_seconds: u64,
    /// Total attempts per fetch (initial try + retries)
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
    /// Base backoff between retries, in milliseconds (grows exponentially)
    #[serde(default = "defaults::backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://events.example.com/api/events/".to_string(),
            timeout_seconds: defaults::timeout_seconds(),
            max_retries: defaults::max_retries(),
            backoff_ms: defaults::backoff_ms(),
        }
    }
}

/// Sync engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Entities persisted per atomic write chunk
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { batch_size: defaults::batch_size() }
    }
}

/// Retention housekeeping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Events with `event_time` older than this many days are purged
    #[serde(default = "defaults::retention_days")]
    pub retention_days: u32,
    /// Interval between periodic cleanup passes, in seconds
    #[serde(default = "defaults::cleanup_interval_seconds")]
    pub interval_seconds: u64,
    /// Max rows deleted per statement (bounds transaction size)
    #[serde(default = "defaults::max_delete_batch")]
    pub max_delete_batch: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: defaults::retention_days(),
            interval_seconds: defaults::cleanup_interval_seconds(),
            max_delete_batch: defaults::max_delete_batch(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8080`
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8080".to_string() }
    }
}

mod defaults {
    pub(super) fn pool_size() -> u32 {
        4
    }

    pub(super) fn timeout_seconds() -> u64 {
        10
    }

    pub(super) fn max_retries() -> u32 {
        3
    }

    pub(super) fn backoff_ms() -> u64 {
        2000
    }

    pub(super) fn batch_size() -> usize {
        500
    }

    pub(super) fn retention_days() -> u32 {
        7
    }

    pub(super) fn cleanup_interval_seconds() -> u64 {
        3600
    }

    pub(super) fn max_delete_batch() -> usize {
        1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_contract() {
        let config = Config::default();
        assert_eq!(config.provider.timeout_seconds, 10);
        assert_eq!(config.provider.max_retries, 3);
        assert_eq!(config.sync.batch_size, 500);
        assert_eq!(config.retention.retention_days, 7);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [provider]
            base_url = "https://events.k3scluster.tech/api/events/"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.base_url, "https://events.k3scluster.tech/api/events/");
        assert_eq!(config.provider.max_retries, 3);
        assert_eq!(config.database.pool_size, 4);
    }
}
