//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Event bus configuration
    pub event_bus: EventBusConfig,

    /// Routing rule configuration
    pub routing: RoutingConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// Event bus configuration.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Events buffered before slow receivers start lagging
    pub capacity: usize,
}

/// Routing rule configuration.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Margin added to the last price to form `NewPrice`
    pub default_margin: Decimal,
    /// Skip route requests already sent for the same order and broker
    pub suppress_duplicate_routes: bool,
    /// Order amount at or above which a large-order signal is raised
    pub large_order_amount: Decimal,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let event_bus = Self::load_event_bus_config()?;
        let routing = Self::load_routing_config()?;

        Ok(Self {
            event_bus,
            routing,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            event_bus: EventBusConfig { capacity: 64 },
            routing: RoutingConfig {
                default_margin: Decimal::new(20, 1), // 2.0
                suppress_duplicate_routes: true,
                large_order_amount: Decimal::new(10_000, 0),
            },
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("RULEMSX_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid RULEMSX_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_event_bus_config() -> DaemonResult<EventBusConfig> {
        let capacity_str =
            env::var("RULEMSX_EVENT_BUS_CAPACITY").unwrap_or_else(|_| "1000".to_string());

        let capacity = capacity_str
            .parse::<usize>()
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| {
                DaemonError::Config(format!("Invalid RULEMSX_EVENT_BUS_CAPACITY: {}", capacity_str))
            })?;

        Ok(EventBusConfig { capacity })
    }

    fn load_routing_config() -> DaemonResult<RoutingConfig> {
        let default_margin = Self::load_decimal_env(
            "RULEMSX_DEFAULT_MARGIN",
            Decimal::new(20, 1), // 2.0
        )?;

        let suppress_duplicate_routes =
            Self::load_bool_env("RULEMSX_SUPPRESS_DUPLICATE_ROUTES", true)?;

        let large_order_amount =
            Self::load_decimal_env("RULEMSX_LARGE_ORDER_AMOUNT", Decimal::new(10_000, 0))?;

        Ok(RoutingConfig {
            default_margin,
            suppress_duplicate_routes,
            large_order_amount,
        })
    }

    fn load_decimal_env(key: &str, default: Decimal) -> DaemonResult<Decimal> {
        match env::var(key) {
            Ok(val) => Decimal::from_str(&val)
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_bool_env(key: &str, default: bool) -> DaemonResult<bool> {
        match env::var(key) {
            Ok(val) => parse_bool(&val)
                .ok_or_else(|| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_bus: EventBusConfig { capacity: 1000 },
            routing: RoutingConfig {
                default_margin: Decimal::new(20, 1), // 2.0
                suppress_duplicate_routes: true,
                large_order_amount: Decimal::new(10_000, 0),
            },
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
