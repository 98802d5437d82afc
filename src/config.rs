use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Process configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Required when running against Postgres; unused by the in-memory
    /// backend.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    /// Unmatched routes answer 400 by default (the historically observed
    /// behavior); set ROUTE_MISS_404=1 to get the conventional 404.
    pub route_miss_not_found: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("PORT", 8080),
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5),
            db_acquire_timeout: Duration::from_secs(parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5)),
            route_miss_not_found: flag("ROUTE_MISS_404"),
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match std::env::var(key) {
        Err(_) => default,
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("invalid {key}={raw}: {e}; using default {default}");
            default
        }),
    }
}

fn flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_values_fall_back_to_defaults() {
        std::env::set_var("NEWSDESK_TEST_PORT", "not-a-port");
        assert_eq!(parse_or::<u16>("NEWSDESK_TEST_PORT", 8080), 8080);
        std::env::set_var("NEWSDESK_TEST_PORT", "9090");
        assert_eq!(parse_or::<u16>("NEWSDESK_TEST_PORT", 8080), 9090);
    }

    #[test]
    fn flags_accept_1_and_true() {
        std::env::set_var("NEWSDESK_TEST_FLAG", "true");
        assert!(flag("NEWSDESK_TEST_FLAG"));
        std::env::set_var("NEWSDESK_TEST_FLAG", "0");
        assert!(!flag("NEWSDESK_TEST_FLAG"));
        assert!(!flag("NEWSDESK_TEST_FLAG_UNSET"));
    }
}
