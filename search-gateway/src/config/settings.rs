//! Process settings read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use search_gateway_lifecycle::TransferConfig;
use search_gateway_repository::config::DEFAULT_ENGINE_URL;
use search_gateway_repository::EngineConfig;

use crate::StartupError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BASE_PATH: &str = "/v1";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CORS_ORIGINS: &str = "*";
const DEFAULT_CORS_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";
const DEFAULT_CORS_HEADERS: &str = "*";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = StartupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(StartupError::config(format!("unknown LOG_FORMAT: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsSettings {
    pub enabled: bool,
    pub origins: Vec<String>,
    pub methods: Vec<String>,
    pub headers: Vec<String>,
    pub credentials: bool,
}

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Route prefix, normalised to a leading `/` and no trailing `/`. Empty means root.
    pub base_path: String,
    /// HMAC secret for bearer tokens. Authentication is off when unset.
    pub api_secret: Option<String>,
    pub cors: CorsSettings,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Include engine details in error responses.
    pub detail_error: bool,
    pub engine: EngineConfig,
    pub transfer: TransferConfig,
    pub shutdown_timeout: Duration,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `SERVER_HOST`, `SERVER_PORT`, `BASE_PATH`
    /// - `API_SECRET`: enables bearer-token authentication
    /// - `CORS_ENABLED`, `CORS_ORIGINS`, `CORS_METHODS`, `CORS_HEADERS`, `CORS_CREDENTIALS`
    /// - `LOG_LEVEL`, `LOG_FORMAT` (`json` or `pretty`)
    /// - `DETAIL_ERROR`
    /// - `OPENSEARCH_URL`, `OPENSEARCH_USERNAME`, `OPENSEARCH_PASSWORD`
    /// - `EXPORT_PAGE_SIZE`, `EXPORT_MAX_PAGES`, `EXPORT_DEADLINE_SECS`
    /// - `SHUTDOWN_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `lookup`, which returns the raw value of a variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let list = |key: &str, default: &str| -> Vec<String> {
            text(key, default)
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let mut engine = EngineConfig::new(text("OPENSEARCH_URL", DEFAULT_ENGINE_URL));
        if let Some(username) = get("OPENSEARCH_USERNAME") {
            engine = engine.with_credentials(username, get("OPENSEARCH_PASSWORD").unwrap_or_default());
        }

        let defaults = TransferConfig::default();
        let transfer = TransferConfig {
            page_size: parse_positive("EXPORT_PAGE_SIZE", get("EXPORT_PAGE_SIZE"), defaults.page_size)?,
            max_pages: parse_positive("EXPORT_MAX_PAGES", get("EXPORT_MAX_PAGES"), defaults.max_pages)?,
            deadline: get("EXPORT_DEADLINE_SECS")
                .map(|v| parse_number::<u64>("EXPORT_DEADLINE_SECS", &v))
                .transpose()?
                .map(Duration::from_secs),
            ..defaults
        };

        Ok(Self {
            host: text("SERVER_HOST", DEFAULT_HOST),
            port: get("SERVER_PORT")
                .map(|v| parse_number::<u16>("SERVER_PORT", &v))
                .transpose()?
                .unwrap_or(DEFAULT_PORT),
            base_path: normalize_base_path(&text("BASE_PATH", DEFAULT_BASE_PATH)),
            api_secret: get("API_SECRET"),
            cors: CorsSettings {
                enabled: parse_flag("CORS_ENABLED", get("CORS_ENABLED"), false)?,
                origins: list("CORS_ORIGINS", DEFAULT_CORS_ORIGINS),
                methods: list("CORS_METHODS", DEFAULT_CORS_METHODS),
                headers: list("CORS_HEADERS", DEFAULT_CORS_HEADERS),
                credentials: parse_flag("CORS_CREDENTIALS", get("CORS_CREDENTIALS"), false)?,
            },
            log_level: text("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            log_format: get("LOG_FORMAT")
                .map(|v| v.parse::<LogFormat>())
                .transpose()?
                .unwrap_or(LogFormat::Json),
            detail_error: parse_flag("DETAIL_ERROR", get("DETAIL_ERROR"), false)?,
            engine,
            transfer,
            shutdown_timeout: Duration::from_secs(
                get("SHUTDOWN_TIMEOUT_SECS")
                    .map(|v| parse_number::<u64>("SHUTDOWN_TIMEOUT_SECS", &v))
                    .transpose()?
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            ),
        })
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, StartupError> {
    value
        .trim()
        .parse()
        .map_err(|_| StartupError::config(format!("{} must be a number, got {:?}", key, value)))
}

fn parse_positive(key: &str, value: Option<String>, default: usize) -> Result<usize, StartupError> {
    match value {
        None => Ok(default),
        Some(v) => match parse_number::<usize>(key, &v)? {
            0 => Err(StartupError::config(format!("{} must be positive", key))),
            n => Ok(n),
        },
    }
}

/// Parse a boolean flag (`true`/`false`, `1`/`0`, `yes`/`no`).
pub fn parse_flag(key: &str, value: Option<String>, default: bool) -> Result<bool, StartupError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "t" => Ok(true),
        "false" | "0" | "no" | "f" => Ok(false),
        _ => Err(StartupError::config(format!(
            "{} must be a boolean, got {:?}",
            key, value
        ))),
    }
}

fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
