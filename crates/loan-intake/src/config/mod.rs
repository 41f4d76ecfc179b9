use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Settings for the service and the CLI, read from the environment after
/// loading an optional `.env` file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: env::var("APP_ENV")
                .map(|raw| AppEnvironment::parse(&raw))
                .unwrap_or(AppEnvironment::Development),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig::from_env(),
            intake: IntakeConfig::from_env()?,
        })
    }
}

/// HTTP listener binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let port = match env::var("APP_PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort)?,
            Err(_) => defaults.port,
        };

        Ok(Self {
            host: non_empty_var("APP_HOST").unwrap_or(defaults.host),
            port,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host.parse()?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `tracing_subscriber` filter directive. `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl TelemetryConfig {
    fn from_env() -> Self {
        Self {
            log_level: non_empty_var("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Document intake pipeline settings.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Concurrent document workers. Kept small because the bottleneck is the
    /// external extraction service.
    pub worker_limit: usize,
    pub storage_dir: PathBuf,
    pub cache_ttl: Duration,
    pub extraction_url: Option<String>,
    pub narrative_url: Option<String>,
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            worker_limit: 3,
            storage_dir: PathBuf::from("uploads"),
            cache_ttl: Duration::from_secs(300),
            extraction_url: None,
            narrative_url: None,
            tessdata_dir: None,
        }
    }
}

impl IntakeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let worker_limit = match env::var("INTAKE_WORKERS") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(count) if count > 0 => count,
                _ => return Err(ConfigError::InvalidWorkerCount),
            },
            Err(_) => defaults.worker_limit,
        };

        let cache_ttl = match env::var("INTAKE_CACHE_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidCacheTtl)?,
            Err(_) => defaults.cache_ttl,
        };

        let storage_dir = env::var("INTAKE_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);

        Ok(Self {
            worker_limit,
            storage_dir,
            cache_ttl,
            extraction_url: non_empty_var("INTAKE_EXTRACTION_URL"),
            narrative_url: non_empty_var("INTAKE_NARRATIVE_URL"),
            tessdata_dir: non_empty_var("INTAKE_TESSDATA_DIR").map(PathBuf::from),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost(#[from] std::net::AddrParseError),
    #[error("INTAKE_WORKERS must be a positive integer")]
    InvalidWorkerCount,
    #[error("INTAKE_CACHE_TTL_SECS must be a whole number of seconds")]
    InvalidCacheTtl,
}
