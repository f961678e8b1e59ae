use std::env;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

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
    pub alerts: AlertConfig,
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

        let low_stock_threshold = env::var("NCF_LOW_STOCK_THRESHOLD")
            .unwrap_or_else(|_| AlertConfig::DEFAULT_LOW_STOCK.to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidThreshold {
                var: "NCF_LOW_STOCK_THRESHOLD",
            })?;
        let expiry_alert_days = env::var("NCF_EXPIRY_ALERT_DAYS")
            .unwrap_or_else(|_| AlertConfig::DEFAULT_EXPIRY_DAYS.to_string())
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidThreshold {
                var: "NCF_EXPIRY_ALERT_DAYS",
            })?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            alerts: AlertConfig {
                low_stock_threshold,
                expiry_alert_days,
            },
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Default thresholds applied to newly registered NCF sequence ranges.
#[derive(Debug, Clone, Copy)]
pub struct AlertConfig {
    pub low_stock_threshold: u32,
    pub expiry_alert_days: i64,
}

impl AlertConfig {
    pub const DEFAULT_LOW_STOCK: u32 = 10;
    pub const DEFAULT_EXPIRY_DAYS: i64 = 30;
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: Self::DEFAULT_LOW_STOCK,
            expiry_alert_days: Self::DEFAULT_EXPIRY_DAYS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("{var} must be a non-negative integer")]
    InvalidThreshold { var: &'static str },
}
