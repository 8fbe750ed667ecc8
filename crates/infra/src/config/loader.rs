//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to a config file
//! 3. Probes multiple paths for config files
//! 4. If no file is found either, built-in defaults apply
//!
//! ## Environment Variables
//! - `MARQUEE_DB_PATH`: Database file path (required for env loading)
//! - `MARQUEE_DB_POOL_SIZE`: Connection pool size
//! - `MARQUEE_PROVIDER_URL`: Provider events endpoint (required for env
//!   loading)
//! - `MARQUEE_PROVIDER_TIMEOUT`: Per-request timeout in seconds
//! - `MARQUEE_PROVIDER_RETRIES`: Total fetch attempts
//! - `MARQUEE_PROVIDER_BACKOFF_MS`: Base retry backoff in milliseconds
//! - `MARQUEE_SYNC_BATCH_SIZE`: Entities per atomic write chunk
//! - `MARQUEE_RETENTION_DAYS`: Event retention window in days
//! - `MARQUEE_CLEANUP_INTERVAL`: Seconds between cleanup passes
//! - `MARQUEE_RETENTION_DELETE_BATCH`: Max rows deleted per statement
//! - `MARQUEE_BIND_ADDR`: HTTP server bind address

use std::path::{Path, PathBuf};

use marquee_domain::{Config, MarqueeError, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to a config file; if no file is
/// found in the standard locations, the built-in defaults are used.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "environment configuration incomplete, trying file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path)),
                None => {
                    tracing::info!("no config file found, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }
}

/// Load configuration from environment variables
///
/// `MARQUEE_DB_PATH` and `MARQUEE_PROVIDER_URL` must be present; the
/// remaining variables override the built-in defaults when set.
///
/// # Errors
/// Returns `MarqueeError::Config` if a required variable is missing or a
/// numeric variable fails to parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("MARQUEE_DB_PATH")?;
    config.provider.base_url = env_var("MARQUEE_PROVIDER_URL")?;

    if let Some(pool_size) = env_parse::<u32>("MARQUEE_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    if let Some(timeout) = env_parse::<u64>("MARQUEE_PROVIDER_TIMEOUT")? {
        config.provider.timeout_seconds = timeout;
    }
    if let Some(retries) = env_parse::<u32>("MARQUEE_PROVIDER_RETRIES")? {
        config.provider.max_retries = retries;
    }
    if let Some(backoff) = env_parse::<u64>("MARQUEE_PROVIDER_BACKOFF_MS")? {
        config.provider.backoff_ms = backoff;
    }
    if let Some(batch_size) = env_parse::<usize>("MARQUEE_SYNC_BATCH_SIZE")? {
        config.sync.batch_size = batch_size;
    }
    if let Some(days) = env_parse::<u32>("MARQUEE_RETENTION_DAYS")? {
        config.retention.retention_days = days;
    }
    if let Some(interval) = env_parse::<u64>("MARQUEE_CLEANUP_INTERVAL")? {
        config.retention.interval_seconds = interval;
    }
    if let Some(delete_batch) = env_parse::<usize>("MARQUEE_RETENTION_DELETE_BATCH")? {
        config.retention.max_delete_batch = delete_batch;
    }
    if let Ok(bind_addr) = std::env::var("MARQUEE_BIND_ADDR") {
        config.server.bind_addr = bind_addr;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `MarqueeError::Config` if the file is missing, no file is
/// found while probing, or the contents fail to parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MarqueeError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MarqueeError::Config("no config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MarqueeError::Config(format!("failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MarqueeError::Config(format!("invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MarqueeError::Config(format!("invalid JSON format: {}", e))),
        _ => Err(MarqueeError::Config(format!("unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory and its two parents, then the
/// executable's directory, for `config.{json,toml}` and
/// `marquee.{json,toml}`. Returns the first file that exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("marquee.json"),
            cwd.join("marquee.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("marquee.json"),
                exe_dir.join("marquee.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| MarqueeError::Config(format!("missing required environment variable: {}", key)))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| MarqueeError::Config(format!("invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}
