//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration. Every field has a default; unset or malformed
/// environment values fall back to it.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for weatherapi.com (`WEATHER_API_KEY`).
    pub weather_api_key: String,
    /// API key for weatherstack.com (`WEATHER_STACK_KEY`).
    pub weather_stack_key: String,
    /// SQLite database path (`DATABASE_PATH`).
    pub database_path: PathBuf,
    /// HTTP listen port (`SERVER_PORT`).
    pub server_port: u16,
    /// Mounts the `/queries` inspection route (`DEBUG_MODE`).
    pub debug_mode: bool,
    /// Batch-size trigger (`MAX_REQUESTS`).
    pub max_requests: usize,
    /// Batch wait timer (`WAIT_TIME`, e.g. "5s").
    pub wait_time: Duration,
    /// Per-upstream-call timeout (`API_TIMEOUT`, e.g. "10s").
    pub api_timeout: Duration,
}

impl Config {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            weather_api_key: env_string("WEATHER_API_KEY", ""),
            weather_stack_key: env_string("WEATHER_STACK_KEY", ""),
            database_path: PathBuf::from(env_string("DATABASE_PATH", "weather.sqlite")),
            server_port: env_parsed("SERVER_PORT", 8000),
            debug_mode: env_parsed("DEBUG_MODE", false),
            max_requests: env_parsed("MAX_REQUESTS", 10),
            wait_time: env_duration("WAIT_TIME", Duration::from_secs(5)),
            api_timeout: env_duration("API_TIMEOUT", Duration::from_secs(10)),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_duration(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| parse_duration(&value))
        .unwrap_or(default)
}

/// Accepts the duration forms the environment uses: "500ms", "10s",
/// "2m", or a bare number of seconds.
fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        return value.parse().ok().map(Duration::from_millis);
    }
    if let Some(value) = raw.strip_suffix('s') {
        return value.parse().ok().map(Duration::from_secs);
    }
    if let Some(value) = raw.strip_suffix('m') {
        return value
            .parse::<u64>()
            .ok()
            .map(|minutes| Duration::from_secs(minutes * 60));
    }
    raw.parse().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn parse_duration_milliseconds() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn parse_duration_minutes() {
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn parse_duration_plain_number_as_seconds() {
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
    }

    #[test]
    fn parse_duration_garbage_is_none() {
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
    }
}
