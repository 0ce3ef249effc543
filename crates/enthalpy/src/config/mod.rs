use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub mail: MailConfig,
    pub cors: CorsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            mail: MailConfig::from_env()?,
            cors: CorsConfig::from_env(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const DEFAULT_RESEND_API_BASE: &str = "https://api.resend.com";

/// Transactional email provider settings and pilot-access delivery policy.
///
/// The provider credential and both addresses are optional here: a missing
/// value leaves the service running but unable to deliver, which surfaces to
/// callers as a configuration fault instead of a startup failure.
#[derive(Clone)]
pub struct MailConfig {
    pub api_key: Option<String>,
    pub operator_address: Option<String>,
    pub sender_address: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
    pub send_confirmation: bool,
    pub notify_max_attempts: usize,
    pub notify_backoff_ms: u64,
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = parse_var("MAIL_TIMEOUT_SECS", 10u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "MAIL_TIMEOUT_SECS",
            });
        }
        let notify_max_attempts = parse_var("PILOT_NOTIFY_MAX_ATTEMPTS", 1usize)?;
        if notify_max_attempts == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "PILOT_NOTIFY_MAX_ATTEMPTS",
            });
        }

        Ok(Self {
            api_key: non_blank_var("RESEND_API_KEY"),
            operator_address: non_blank_var("PILOT_TO_EMAIL"),
            sender_address: non_blank_var("PILOT_FROM_EMAIL"),
            api_base: non_blank_var("RESEND_API_BASE")
                .unwrap_or_else(|| DEFAULT_RESEND_API_BASE.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            send_confirmation: parse_flag("PILOT_SEND_CONFIRMATION", true)?,
            notify_max_attempts,
            notify_backoff_ms: parse_var("PILOT_NOTIFY_BACKOFF_MS", 250u64)?,
        })
    }

    /// Names of the environment variables that still need a value before mail
    /// can be delivered.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("RESEND_API_KEY");
        }
        if self.operator_address.is_none() {
            missing.push("PILOT_TO_EMAIL");
        }
        if self.sender_address.is_none() {
            missing.push("PILOT_FROM_EMAIL");
        }
        missing
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("operator_address", &self.operator_address)
            .field("sender_address", &self.sender_address)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("send_confirmation", &self.send_confirmation)
            .field("notify_max_attempts", &self.notify_max_attempts)
            .field("notify_backoff_ms", &self.notify_backoff_ms)
            .finish()
    }
}

/// Cross-origin settings for the form endpoint.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    fn from_env() -> Self {
        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
        Self { allowed_origins }
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_blank_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        None => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match non_blank_var(name) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name }),
        },
        None => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    InvalidFlag { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a positive integer")
            }
            ConfigError::InvalidFlag { name } => {
                write!(f, "{name} must be one of true/false/1/0/yes/no/on/off")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}
