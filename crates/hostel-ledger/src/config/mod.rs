use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::ledger::fees::LateFeePolicy;
use crate::ledger::pricing::{PricingTable, RoomType};
use crate::ledger::service::LedgerSettings;
use crate::ledger::store::DEFAULT_COMMIT_ATTEMPTS;

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
    pub ledger: LedgerSettings,
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
            ledger: load_ledger_settings()?,
        })
    }
}

fn load_ledger_settings() -> Result<LedgerSettings, ConfigError> {
    let mut pricing = PricingTable::default();
    for room_type in RoomType::ordered() {
        let key = match room_type {
            RoomType::Single => "HOSTEL_PRICE_SINGLE",
            RoomType::Double => "HOSTEL_PRICE_DOUBLE",
            RoomType::Triple => "HOSTEL_PRICE_TRIPLE",
            RoomType::Quad => "HOSTEL_PRICE_QUAD",
        };
        if let Some(price) = number_var::<u64>(key)? {
            pricing.base_prices.insert(room_type, price);
        }
    }

    let amenities = &mut pricing.amenities;
    for (key, slot) in [
        ("HOSTEL_PRICE_AC", &mut amenities.ac),
        ("HOSTEL_PRICE_ATTACHED_BATHROOM", &mut amenities.attached_bathroom),
        ("HOSTEL_PRICE_GEYSER", &mut amenities.geyser),
        ("HOSTEL_PRICE_WIFI", &mut amenities.wifi),
        ("HOSTEL_PRICE_EXTRA_FURNITURE", &mut amenities.extra_furniture),
        ("HOSTEL_PRICE_FAN", &mut amenities.fan_unit),
    ] {
        if let Some(price) = number_var::<u64>(key)? {
            *slot = price;
        }
    }

    let defaults = LateFeePolicy::default();
    let late_fees = LateFeePolicy {
        grace_days: number_var("HOSTEL_LATE_FEE_GRACE_DAYS")?.unwrap_or(defaults.grace_days),
        daily_penalty: number_var("HOSTEL_LATE_FEE_DAILY")?.unwrap_or(defaults.daily_penalty),
    };

    let commit_attempts = match number_var::<u32>("HOSTEL_COMMIT_ATTEMPTS")? {
        Some(0) => {
            return Err(ConfigError::InvalidNumber {
                key: "HOSTEL_COMMIT_ATTEMPTS",
            })
        }
        Some(attempts) => attempts,
        None => DEFAULT_COMMIT_ATTEMPTS,
    };

    Ok(LedgerSettings {
        pricing,
        late_fees,
        commit_attempts,
    })
}

fn number_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(None),
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

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
