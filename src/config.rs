//! Configuration loader for the `fleetdash` dashboard backend.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::telemetry::FetchPolicy;

/// Parse an optional unsigned integer environment variable with a default value.
macro_rules! parse_env_u64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

const DEFAULT_BYPASS_HEADER: &str = "ngrok-skip-browser-warning: true";

/// Upper bound for the cache and metadata age settings (one year).
const MAX_AGE_SECS: u64 = 365 * 24 * 3600;

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Flight-log CSV location: `http(s)` URL or local path.
    pub flight_log_url: String,
    pub flight_log_timeout_ms: u64,

    /// Telemetry backend base URL.
    pub telemetry_api_url: String,

    pub telemetry_path: String,
    pub roster_path: String,
    pub alarms_path: String,

    /// Tunnel bypass header sent with every telemetry request.
    pub bypass_header: Option<(String, String)>,

    /// Bearer credential for the telemetry backend.
    pub bearer_token: Option<String>,

    pub telemetry_timeout_ms: u64,
    pub telemetry_retries: u64,
    pub telemetry_backoff_ms: u64,
    pub cache_max_age_secs: u64,
    pub metadata_ttl_secs: u64,

    pub flight_poll_secs: u64,
    pub telemetry_poll_secs: u64,

    pub listen_port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `FLIGHT_LOG_URL` – flight-log CSV URL or file path
/// - `TELEMETRY_API_URL` – telemetry backend base URL
///
/// Optional:
/// - `FLIGHT_LOG_TIMEOUT_MS` (15000)
/// - `TELEMETRY_PATH` / `ROSTER_PATH` / `ALARMS_PATH` – endpoint paths
/// - `TELEMETRY_BYPASS_HEADER` – `name: value`, empty to disable
/// - `TELEMETRY_BEARER_TOKEN` – bearer credential
/// - `TELEMETRY_TIMEOUT_MS` (8000), `TELEMETRY_RETRIES` (2), `TELEMETRY_BACKOFF_MS` (250)
/// - `CACHE_MAX_AGE_SECS` (300), `METADATA_TTL_SECS` (120), each at most one year
/// - `FLIGHT_POLL_SECS` (30), `TELEMETRY_POLL_SECS` (5)
/// - `LISTEN_PORT` (8080)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let flight_log_url = require_env!("FLIGHT_LOG_URL");
    let telemetry_api_url = require_env!("TELEMETRY_API_URL");

    let bypass_header = parse_header(&env_or!("TELEMETRY_BYPASS_HEADER", DEFAULT_BYPASS_HEADER))?;
    let bearer_token = env::var("TELEMETRY_BEARER_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    let listen_port = parse_env_u64!("LISTEN_PORT", 8080);
    let listen_port =
        u16::try_from(listen_port).map_err(|_| anyhow!("Invalid LISTEN_PORT: {}", listen_port))?;

    let flight_poll_secs = parse_env_u64!("FLIGHT_POLL_SECS", 30);
    let telemetry_poll_secs = parse_env_u64!("TELEMETRY_POLL_SECS", 5);
    if flight_poll_secs == 0 || telemetry_poll_secs == 0 {
        return Err(anyhow!("Poll intervals must be at least 1 second"));
    }

    let cache_max_age_secs = parse_env_u64!("CACHE_MAX_AGE_SECS", 300);
    let cache_max_age_secs = bounded_age("CACHE_MAX_AGE_SECS", cache_max_age_secs)?;
    let metadata_ttl_secs = parse_env_u64!("METADATA_TTL_SECS", 120);
    let metadata_ttl_secs = bounded_age("METADATA_TTL_SECS", metadata_ttl_secs)?;

    Ok(Config {
        flight_log_url,
        flight_log_timeout_ms: parse_env_u64!("FLIGHT_LOG_TIMEOUT_MS", 15000),
        telemetry_api_url,
        telemetry_path: env_or!("TELEMETRY_PATH", "/get_supabase_data"),
        roster_path: env_or!("ROSTER_PATH", "/aircraft"),
        alarms_path: env_or!("ALARMS_PATH", "/alarms"),
        bypass_header,
        bearer_token,
        telemetry_timeout_ms: parse_env_u64!("TELEMETRY_TIMEOUT_MS", 8000),
        telemetry_retries: parse_env_u64!("TELEMETRY_RETRIES", 2),
        telemetry_backoff_ms: parse_env_u64!("TELEMETRY_BACKOFF_MS", 250),
        cache_max_age_secs,
        metadata_ttl_secs,
        flight_poll_secs,
        telemetry_poll_secs,
        listen_port,
    })
}

fn bounded_age(var_name: &str, secs: u64) -> Result<u64> {
    // ---
    if secs > MAX_AGE_SECS {
        return Err(anyhow!(
            "Invalid {}: {} exceeds the maximum of {} seconds",
            var_name,
            secs,
            MAX_AGE_SECS
        ));
    }
    Ok(secs)
}

/// Split `name: value`; an empty string disables the header.
fn parse_header(raw: &str) -> Result<Option<(String, String)>> {
    // ---
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid TELEMETRY_BYPASS_HEADER '{}': expected 'name: value'", raw))?;
    Ok(Some((name.trim().to_string(), value.trim().to_string())))
}

impl Config {
    // ---
    pub fn fetch_policy(&self) -> FetchPolicy {
        // ---
        FetchPolicy {
            timeout: Duration::from_millis(self.telemetry_timeout_ms),
            retries: u32::try_from(self.telemetry_retries).unwrap_or(u32::MAX),
            backoff: Duration::from_millis(self.telemetry_backoff_ms),
            max_cache_age: age_duration(self.cache_max_age_secs),
            metadata_ttl: age_duration(self.metadata_ttl_secs),
        }
    }

    pub fn flight_log_timeout(&self) -> Duration {
        Duration::from_millis(self.flight_log_timeout_ms)
    }

    pub fn flight_poll_interval(&self) -> Duration {
        Duration::from_secs(self.flight_poll_secs)
    }

    pub fn telemetry_poll_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_poll_secs)
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the bearer credential while showing all other values.
    pub fn log_config(&self) {
        // ---
        let masked_token = match &self.bearer_token {
            Some(t) if t.len() > 8 => format!("{}****", t.chars().take(4).collect::<String>()),
            Some(_) => "****".to_string(),
            None => "(none)".to_string(),
        };
        let bypass = self
            .bypass_header
            .as_ref()
            .map(|(n, v)| format!("{n}: {v}"))
            .unwrap_or_else(|| "(none)".to_string());

        tracing::info!("Configuration loaded:");
        tracing::info!("  FLIGHT_LOG_URL          : {}", self.flight_log_url);
        tracing::info!("  FLIGHT_LOG_TIMEOUT_MS   : {}", self.flight_log_timeout_ms);
        tracing::info!("  TELEMETRY_API_URL       : {}", self.telemetry_api_url);
        tracing::info!("  TELEMETRY_PATH          : {}", self.telemetry_path);
        tracing::info!("  ROSTER_PATH             : {}", self.roster_path);
        tracing::info!("  ALARMS_PATH             : {}", self.alarms_path);
        tracing::info!("  TELEMETRY_BYPASS_HEADER : {}", bypass);
        tracing::info!("  TELEMETRY_BEARER_TOKEN  : {}", masked_token);
        tracing::info!("  TELEMETRY_TIMEOUT_MS    : {}", self.telemetry_timeout_ms);
        tracing::info!("  TELEMETRY_RETRIES       : {}", self.telemetry_retries);
        tracing::info!("  TELEMETRY_BACKOFF_MS    : {}", self.telemetry_backoff_ms);
        tracing::info!("  CACHE_MAX_AGE_SECS      : {}", self.cache_max_age_secs);
        tracing::info!("  METADATA_TTL_SECS       : {}", self.metadata_ttl_secs);
        tracing::info!("  FLIGHT_POLL_SECS        : {}", self.flight_poll_secs);
        tracing::info!("  TELEMETRY_POLL_SECS     : {}", self.telemetry_poll_secs);
        tracing::info!("  LISTEN_PORT             : {}", self.listen_port);
    }
}

/// Seconds as a chrono span, clamped to [`MAX_AGE_SECS`].
fn age_duration(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_AGE_SECS) as i64)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_header() {
        // ---
        assert_eq!(
            parse_header(DEFAULT_BYPASS_HEADER).unwrap(),
            Some(("ngrok-skip-browser-warning".to_string(), "true".to_string()))
        );
        assert_eq!(parse_header("  ").unwrap(), None);
        assert!(parse_header("no-colon").is_err());
    }

    #[test]
    fn test_fetch_policy_from_config() {
        // ---
        let cfg = Config {
            flight_log_url: "flights.csv".into(),
            flight_log_timeout_ms: 15000,
            telemetry_api_url: "http://localhost:8061".into(),
            telemetry_path: "/get_supabase_data".into(),
            roster_path: "/aircraft".into(),
            alarms_path: "/alarms".into(),
            bypass_header: None,
            bearer_token: None,
            telemetry_timeout_ms: 8000,
            telemetry_retries: 2,
            telemetry_backoff_ms: 250,
            cache_max_age_secs: 300,
            metadata_ttl_secs: 120,
            flight_poll_secs: 30,
            telemetry_poll_secs: 5,
            listen_port: 8080,
        };
        let policy = cfg.fetch_policy();

        assert_eq!(policy.timeout, Duration::from_secs(8));
        assert_eq!(policy.retries, 2);
        assert_eq!(policy.backoff, Duration::from_millis(250));
        assert_eq!(policy.max_cache_age, chrono::Duration::minutes(5));
        assert_eq!(policy.metadata_ttl, chrono::Duration::minutes(2));
    }

    #[test]
    fn test_age_settings_are_bounded() {
        // ---
        assert_eq!(bounded_age("CACHE_MAX_AGE_SECS", 300).unwrap(), 300);
        assert_eq!(bounded_age("CACHE_MAX_AGE_SECS", MAX_AGE_SECS).unwrap(), MAX_AGE_SECS);

        let err = bounded_age("CACHE_MAX_AGE_SECS", 10_000_000_000_000_000).unwrap_err();
        assert!(err.to_string().contains("CACHE_MAX_AGE_SECS"));
        assert!(bounded_age("METADATA_TTL_SECS", u64::MAX).is_err());

        // A hand-built config past the bound still yields a valid span
        assert_eq!(age_duration(u64::MAX), chrono::Duration::seconds(MAX_AGE_SECS as i64));
    }
}
