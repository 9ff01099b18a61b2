//! Client configuration and its environment overrides.

use std::env;
use std::time::Duration;

/// Production endpoint of the WebP Converter API.
pub const DEFAULT_BASE_URL: &str = "https://api.apiverve.com/v1/webpconverter";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const API_KEY_ENV: &str = "APIVERVE_API_KEY";
pub const BASE_URL_ENV: &str = "WEBPCONVERTER_BASE_URL";
pub const TIMEOUT_ENV: &str = "WEBPCONVERTER_TIMEOUT_SECONDS";

/// Endpoint and timeout used by a `WebPConverterClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Also check the API key's shape before every call.
    pub strict_api_key: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            strict_api_key: false,
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by `WEBPCONVERTER_BASE_URL` and
    /// `WEBPCONVERTER_TIMEOUT_SECONDS` when set. Empty, unparsable and zero
    /// values fall back to the default.
    pub fn from_env() -> Self {
        Self {
            base_url: get_base_url(),
            timeout: get_timeout(),
            strict_api_key: false,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_strict_api_key(mut self, strict: bool) -> Self {
        self.strict_api_key = strict;
        self
    }
}

/// API key from `APIVERVE_API_KEY`, empty when unset.
pub fn api_key_from_env() -> String {
    env::var(API_KEY_ENV).unwrap_or_default()
}

fn get_base_url() -> String {
    parse_base_url(env::var(BASE_URL_ENV).ok().as_deref())
}

fn get_timeout() -> Duration {
    parse_timeout(env::var(TIMEOUT_ENV).ok().as_deref())
}

fn parse_base_url(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => DEFAULT_BASE_URL.to_string(),
    }
}

/// Whole seconds; zero would time out every call, so it falls back too.
fn parse_timeout(raw: Option<&str>) -> Duration {
    match raw.map(|secs| secs.trim().parse::<u64>()) {
        Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
        _ => DEFAULT_TIMEOUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_production() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.apiverve.com/v1/webpconverter");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::default().with_base_url("http://localhost:3000/v1/webpconverter/");
        assert_eq!(config.base_url, "http://localhost:3000/v1/webpconverter");
    }

    #[test]
    fn base_url_override_falls_back_when_blank() {
        assert_eq!(parse_base_url(None), DEFAULT_BASE_URL);
        assert_eq!(parse_base_url(Some("  ")), DEFAULT_BASE_URL);
        assert_eq!(
            parse_base_url(Some("http://127.0.0.1:3000/v1/webpconverter/")),
            "http://127.0.0.1:3000/v1/webpconverter"
        );
    }

    #[test]
    fn timeout_override_accepts_positive_seconds_only() {
        assert_eq!(parse_timeout(None), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("5")), Duration::from_secs(5));
        assert_eq!(parse_timeout(Some(" 12 ")), Duration::from_secs(12));
        assert_eq!(parse_timeout(Some("0")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("soon")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("-3")), DEFAULT_TIMEOUT);
    }
}
