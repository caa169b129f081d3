use std::fmt::Display;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_GEOCODER_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn parse_var<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let api_base_url = require("NEARHAND_API_BASE_URL")?;
    let api_token = lookup("NEARHAND_API_TOKEN")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let env = parse_environment(&or_default("NEARHAND_ENV", "development"))?;
    let log_level = or_default("NEARHAND_LOG_LEVEL", "info");

    let geocoder_raw = or_default("NEARHAND_GEOCODER_BASE_URL", DEFAULT_GEOCODER_BASE_URL);
    let geocoder_base_url = match geocoder_raw.trim() {
        "" | "off" | "none" => None,
        url => Some(url.to_string()),
    };

    let http_timeout_secs: u64 = parse_var(&lookup, "NEARHAND_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("NEARHAND_USER_AGENT", "nearhand/0.1 (provider-search)");
    let geolocation_timeout_secs: u64 =
        parse_var(&lookup, "NEARHAND_GEOLOCATION_TIMEOUT_SECS", "10")?;

    let proximity_threshold_degrees: f64 =
        parse_var(&lookup, "NEARHAND_PROXIMITY_THRESHOLD_DEGREES", "0.5")?;
    if !proximity_threshold_degrees.is_finite() || proximity_threshold_degrees <= 0.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "NEARHAND_PROXIMITY_THRESHOLD_DEGREES".to_string(),
            reason: format!("must be a positive number, got {proximity_threshold_degrees}"),
        });
    }

    let search_radius: f64 = parse_var(&lookup, "NEARHAND_SEARCH_RADIUS", "10")?;
    if !search_radius.is_finite() || search_radius <= 0.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "NEARHAND_SEARCH_RADIUS".to_string(),
            reason: format!("must be a positive number, got {search_radius}"),
        });
    }
    let search_limit: u32 = parse_var(&lookup, "NEARHAND_SEARCH_LIMIT", "20")?;

    let max_retries: u32 = parse_var(&lookup, "NEARHAND_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms: u64 = parse_var(&lookup, "NEARHAND_RETRY_BACKOFF_BASE_MS", "500")?;

    Ok(AppConfig {
        env,
        log_level,
        api_base_url,
        api_token,
        geocoder_base_url,
        http_timeout_secs,
        user_agent,
        geolocation_timeout_secs,
        proximity_threshold_degrees,
        search_radius,
        search_limit,
        max_retries,
        retry_backoff_base_ms,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "NEARHAND_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
