use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::fields::ResolutionThresholds;
use crate::workflows::report::ReportPolicy;

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
    pub resolution: ResolutionConfig,
    pub report: ReportConfig,
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

        let defaults = ResolutionThresholds::default();
        let confidence_threshold =
            parse_numeric_var("APP_CONFIDENCE_THRESHOLD", defaults.confidence)?;
        let separation_threshold =
            parse_numeric_var("APP_SEPARATION_THRESHOLD", defaults.separation)?;
        if confidence_threshold <= 0 || separation_threshold < 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "APP_CONFIDENCE_THRESHOLD/APP_SEPARATION_THRESHOLD",
            });
        }

        let unmapped_ceiling =
            parse_numeric_var("APP_UNMAPPED_CEILING", ReportPolicy::default().unmapped_ceiling)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            resolution: ResolutionConfig {
                confidence_threshold,
                separation_threshold,
            },
            report: ReportConfig { unmapped_ceiling },
        })
    }
}

fn parse_numeric_var<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidThreshold { name }),
        _ => Ok(default),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Score thresholds for the intent resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionConfig {
    pub confidence_threshold: i32,
    pub separation_threshold: i32,
}

impl From<ResolutionConfig> for ResolutionThresholds {
    fn from(config: ResolutionConfig) -> Self {
        ResolutionThresholds {
            confidence: config.confidence_threshold,
            separation: config.separation_threshold,
        }
    }
}

/// Confidence-tier controls for import reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    pub unmapped_ceiling: usize,
}

impl From<ReportConfig> for ReportPolicy {
    fn from(config: ReportConfig) -> Self {
        ReportPolicy {
            unmapped_ceiling: config.unmapped_ceiling,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidThreshold { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidThreshold { name } => {
                write!(f, "{name} must be a non-negative whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidThreshold { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
