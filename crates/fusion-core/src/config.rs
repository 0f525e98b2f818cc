use crate::app_config::{AppConfig, DistanceUnit};
use crate::ConfigError;

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
/// Unlike [`load_app_config`], this does NOT load `.env` files, which is useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup with no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let api_key = require("FUSION_API_KEY")?;

    let bind_addr = parse("FUSION_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("FUSION_LOG_LEVEL", "info");
    let api_base_url = or_default("FUSION_API_BASE_URL", "https://api.yelp.com");

    let request_timeout_secs = parse_u64("FUSION_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("FUSION_USER_AGENT", "fusion-search/0.1");
    let max_retries = parse_u32("FUSION_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("FUSION_RETRY_BACKOFF_BASE_MS", "500")?;

    let cache_ttl_secs = parse_u64("FUSION_CACHE_TTL_SECS", "36000")?;
    let hydration_concurrency = parse_usize("FUSION_HYDRATION_CONCURRENCY", "4")?;
    let distance_unit = parse_distance_unit(&or_default("FUSION_DISTANCE_UNIT", "miles"))?;

    let default_city = or_default("FUSION_DEFAULT_CITY", "Wichita");
    let default_state = or_default("FUSION_DEFAULT_STATE", "Kansas");

    Ok(AppConfig {
        api_key,
        bind_addr,
        log_level,
        api_base_url,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        cache_ttl_secs,
        hydration_concurrency,
        distance_unit,
        default_city,
        default_state,
    })
}

fn parse_distance_unit(s: &str) -> Result<DistanceUnit, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "miles" | "mi" | "imperial" => Ok(DistanceUnit::Miles),
        "km" | "kilometers" | "metric" => Ok(DistanceUnit::Kilometers),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FUSION_DISTANCE_UNIT".to_string(),
            reason: format!("expected `miles` or `km`, got `{other}`"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
