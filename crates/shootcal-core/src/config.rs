use crate::app_config::{AppConfig, Environment};
use crate::booking::DEFAULT_MESSAGING_BASE_URL;
use crate::ConfigError;

const MAX_PAGE_SIZE: u32 = 500;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
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

    let env = parse_environment(&or_default("SHOOTCAL_ENV", "development"))?;
    let preview = parse_bool("SHOOTCAL_PREVIEW", &or_default("SHOOTCAL_PREVIEW", "false"))?;

    let records_url = lookup("SHOOTCAL_RECORDS_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    let log_level = or_default("SHOOTCAL_LOG_LEVEL", "info");
    let request_timeout_secs = parse_u64("SHOOTCAL_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("SHOOTCAL_USER_AGENT", "shootcal/0.1 (availability)");

    let page_size = parse_u32("SHOOTCAL_PAGE_SIZE", "100")?;
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::InvalidEnvVar {
            var: "SHOOTCAL_PAGE_SIZE".to_string(),
            reason: format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
        });
    }

    let messaging_base_url = or_default("SHOOTCAL_MESSAGING_BASE_URL", DEFAULT_MESSAGING_BASE_URL);
    let booking_phone = lookup("SHOOTCAL_BOOKING_PHONE")
        .ok()
        .filter(|phone| !phone.trim().is_empty());

    Ok(AppConfig {
        records_url,
        env,
        log_level,
        request_timeout_secs,
        user_agent,
        page_size,
        messaging_base_url,
        booking_phone,
        preview,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for values other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SHOOTCAL_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

fn parse_bool(var: &str, s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
