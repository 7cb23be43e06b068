use crate::errors::ConfigError;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVICE_NAME: &str = "ServiceRust";
pub const DEFAULT_COLLECTOR_URL: &str = "http://localhost:4318/v1/traces";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub service_name: String,
    /// Downstream relay target. `None` means this node answers `pong`.
    pub next_service_url: Option<String>,
    pub bind_address: SocketAddr,
    pub relay_timeout: Duration,
    pub tracing: Tracing,
}

/// Export pipeline settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracing {
    pub enabled: bool,
    pub collector_url: String,
    pub flush_interval: Duration,
    pub max_queue_size: usize,
    pub max_export_batch_size: usize,
    pub export_timeout: Duration,
}

impl Default for Tracing {
    fn default() -> Self {
        Self {
            enabled: true,
            collector_url: DEFAULT_COLLECTOR_URL.to_string(),
            flush_interval: Duration::from_millis(1000),
            max_queue_size: 2048,
            max_export_batch_size: 512,
            export_timeout: Duration::from_millis(5000),
        }
    }
}

impl Configuration {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Unset and empty
    /// values take their defaults; anything else must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let service_name = get("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());

        let next_service_url = get("NEXT_SERVICE_URL")
            .map(|value| parse_http_url("NEXT_SERVICE_URL", value))
            .transpose()?;

        let bind_address = {
            let value = get("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
            value
                .parse::<SocketAddr>()
                .map_err(|e| invalid("BIND_ADDRESS", &value, e.to_string()))?
        };

        let relay_timeout = parse_millis(get("RELAY_TIMEOUT_MS"), "RELAY_TIMEOUT_MS", 5000)?;

        let defaults = Tracing::default();
        let max_queue_size = parse_positive(
            get("TRACE_MAX_QUEUE_SIZE"),
            "TRACE_MAX_QUEUE_SIZE",
            defaults.max_queue_size,
        )?;
        let tracing = Tracing {
            enabled: match get("OTEL_TRACING_ENABLED") {
                Some(value) => parse_bool("OTEL_TRACING_ENABLED", &value)?,
                None => defaults.enabled,
            },
            collector_url: match get("TRACE_COLLECTOR_URL") {
                Some(value) => parse_http_url("TRACE_COLLECTOR_URL", value)?,
                None => defaults.collector_url,
            },
            flush_interval: parse_millis(
                get("TRACE_FLUSH_INTERVAL_MS"),
                "TRACE_FLUSH_INTERVAL_MS",
                1000,
            )?,
            max_queue_size,
            max_export_batch_size: parse_positive(
                get("TRACE_MAX_EXPORT_BATCH_SIZE"),
                "TRACE_MAX_EXPORT_BATCH_SIZE",
                defaults.max_export_batch_size,
            )?
            .min(max_queue_size),
            export_timeout: parse_millis(
                get("TRACE_EXPORT_TIMEOUT_MS"),
                "TRACE_EXPORT_TIMEOUT_MS",
                5000,
            )?,
        };

        Ok(Self {
            service_name,
            next_service_url,
            bind_address,
            relay_timeout,
            tracing,
        })
    }
}

fn invalid(key: &str, value: &str, why: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        why: why.into(),
    }
}

fn parse_http_url(key: &str, value: String) -> Result<String, ConfigError> {
    let url = Url::parse(&value).map_err(|source| ConfigError::InvalidUrl {
        key: key.to_string(),
        value: value.clone(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(value),
        other => Err(invalid(key, &value, format!("unsupported scheme '{other}'"))),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

fn parse_positive(value: Option<String>, key: &str, default: usize) -> Result<usize, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<usize>() {
        Ok(0) => Err(invalid(key, &value, "must be greater than zero")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(key, &value, e.to_string())),
    }
}

fn parse_millis(value: Option<String>, key: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms = parse_positive(value, key, default_ms as usize)?;
    Ok(Duration::from_millis(ms as u64))
}
