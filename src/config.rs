//! Configuration parsing and validation for the relay server
//!
//! Command-line arguments and environment variables are parsed with clap. The API key is only
//! ever taken from the environment (or a `.env.local` file loaded before parsing).
use anyhow::anyhow;
use axum::http::HeaderValue;
use clap::Parser;
use gemini_relay::client::PoolSettings;
use gemini_relay::credential::ApiKey;
use gemini_relay::upstream::{
    DEFAULT_BASE_URL, DEFAULT_MAX_BODY_BYTES, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, Upstream,
};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the relay will listen.
    #[arg(short = 'p', long, env = "GEMINI_RELAY_PORT", default_value_t = 3001)]
    pub port: u16,

    /// The single browser origin allowed to call the relay.
    #[arg(long, env = "GEMINI_RELAY_ALLOWED_ORIGIN", default_value = "http://localhost:5173")]
    pub allowed_origin: String,

    /// The Gemini API key attached to every upstream request.
    #[arg(skip = api_key_from_env())]
    pub api_key: Option<ApiKey>,

    /// Base URL of the Gemini REST API.
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub upstream_url: Url,

    /// The model whose generateContent endpoint requests are relayed to.
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// How long (in seconds) to wait for the upstream before giving up with 504.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub upstream_timeout_secs: u64,

    /// Largest accepted request body, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Whether to serve Prometheus metrics.
    #[arg(short = 'm', long)]
    pub metrics: bool,

    /// The port on which the metrics server will listen.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "gemini_relay")]
    pub metrics_prefix: String,

    /// Maximum number of idle HTTP connections to keep alive to the upstream host.
    #[arg(long, default_value_t = 32)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

pub const API_KEY_ENV: &str = "VITE_GEMINI_API_KEY";

/// Loads a dotenv file into the process environment. A missing file is not an error; a file that
/// exists but cannot be read or parsed is.
pub fn load_env_file(file: &str) -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::from_filename(file) {
        Ok(path) => Ok(Some(path)),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn api_key_from_env() -> Option<ApiKey> {
    std::env::var(API_KEY_ENV).ok().and_then(ApiKey::new)
}

/// Reduces a configured origin to the `scheme://host[:port]` form browsers send in `Origin`. A
/// trailing slash is dropped; any other path, a query or a fragment is an error.
fn normalize_origin(raw: &str) -> Result<String, anyhow::Error> {
    let url =
        Url::parse(raw).map_err(|e| anyhow!("Allowed origin '{}' is not a URL: {}", raw, e))?;
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(anyhow!(
            "Allowed origin '{}' must not contain a path, query or fragment",
            raw
        ));
    }
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(anyhow!("Allowed origin '{}' has no host", raw));
    }
    Ok(origin.ascii_serialization())
}

impl Config {
    pub fn validate(mut self) -> Result<Self, anyhow::Error> {
        self.allowed_origin = normalize_origin(&self.allowed_origin)?;
        HeaderValue::from_str(&self.allowed_origin).map_err(|_| {
            anyhow!(
                "Allowed origin '{}' is not a valid header value",
                self.allowed_origin
            )
        })?;

        if let Some(key) = &self.api_key {
            key.header_value().map_err(|_| {
                anyhow!("{} contains characters that are not allowed in a header", API_KEY_ENV)
            })?;
        }

        if self.upstream_url.cannot_be_a_base() {
            return Err(anyhow!(
                "Upstream URL '{}' cannot be used as a base URL",
                self.upstream_url
            ));
        }
        if self.model.is_empty() || self.model.contains('/') {
            return Err(anyhow!("Model name '{}' is not valid", self.model));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(anyhow!("Upstream timeout must be at least one second"));
        }
        Ok(self)
    }

    pub fn allowed_origin(&self) -> Result<HeaderValue, anyhow::Error> {
        Ok(HeaderValue::from_str(&normalize_origin(&self.allowed_origin)?)?)
    }

    pub fn upstream(&self) -> Upstream {
        Upstream::builder()
            .base_url(self.upstream_url.clone())
            .model(self.model.clone())
            .maybe_key(self.api_key.clone())
            .timeout(Duration::from_secs(self.upstream_timeout_secs))
            .max_body_bytes(self.max_body_bytes)
            .build()
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            idle_timeout: Duration::from_secs(self.pool_idle_timeout_secs),
            max_idle_per_host: self.pool_max_idle_per_host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::parse_from(std::iter::once("gemini-relay").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_match_local_development_setup() {
        let config = parse(&[]).validate().unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.allowed_origin, "http://localhost:5173");
        assert!(!config.metrics);

        let upstream = config.upstream();
        assert_eq!(upstream.model, DEFAULT_MODEL);
        assert_eq!(upstream.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        assert!(parse(&["--allowed-origin", "http://bad origin"]).validate().is_err());
    }

    #[test]
    fn test_trailing_slash_on_origin_is_dropped() {
        let config = parse(&["--allowed-origin", "http://localhost:5173/"])
            .validate()
            .unwrap();
        assert_eq!(config.allowed_origin, "http://localhost:5173");
        assert_eq!(config.allowed_origin().unwrap(), "http://localhost:5173");
    }

    #[test]
    fn test_origin_with_path_is_rejected() {
        assert!(
            parse(&["--allowed-origin", "http://localhost:5173/app"])
                .validate()
                .is_err()
        );
        assert!(
            parse(&["--allowed-origin", "http://localhost:5173/?x=1"])
                .validate()
                .is_err()
        );
        assert!(parse(&["--allowed-origin", "localhost:5173"]).validate().is_err());
    }

    #[test]
    fn test_key_that_cannot_be_a_header_is_fatal() {
        let mut config = parse(&[]);
        config.api_key = ApiKey::new("AIza-bad\u{7f}key");
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains(API_KEY_ENV));
        assert!(!err.contains("AIza-bad"));
    }

    #[test]
    fn test_missing_env_file_is_skipped() {
        let result = load_env_file("definitely-not-here/.env.local").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_env_file_is_reported() {
        let path = std::env::temp_dir().join(format!(
            "gemini-relay-malformed-{}.env",
            std::process::id()
        ));
        std::fs::write(&path, "this line has no equals sign\n").unwrap();

        let result = load_env_file(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn test_model_with_slash_is_rejected() {
        assert!(parse(&["--model", "../files"]).validate().is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(parse(&["--upstream-timeout-secs", "0"]).validate().is_err());
    }

    #[test]
    fn test_debug_output_never_contains_key() {
        let mut config = parse(&[]);
        config.api_key = ApiKey::new("AIza-do-not-print");
        assert!(!format!("{config:?}").contains("AIza-do-not-print"));
        assert!(config.upstream().key.is_some());
    }
}
