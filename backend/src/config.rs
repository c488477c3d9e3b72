//! Configuration management for the AgriMarket order service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with AGM_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::FeePolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Product catalog service configuration
    pub catalog: CatalogConfig,

    /// Fee and commission configuration
    pub fees: FeesConfig,

    /// Inventory reservation configuration
    pub inventory: InventoryConfig,

    /// Recurring schedule runner configuration
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Base URL of the external product catalog service
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeesConfig {
    /// Flat delivery fee charged on consumer orders
    pub b2c_delivery_fee: Decimal,

    /// Tax as a fraction of the order subtotal
    pub tax_rate: Decimal,

    /// Platform commission rate on consumer orders
    pub b2c_commission_rate: Decimal,

    /// Platform commission rate on business orders
    pub b2b_commission_rate: Decimal,
}

impl FeesConfig {
    pub fn to_policy(&self) -> FeePolicy {
        FeePolicy {
            b2c_delivery_fee: self.b2c_delivery_fee,
            tax_rate: self.tax_rate,
            b2c_commission_rate: self.b2c_commission_rate,
            b2b_commission_rate: self.b2b_commission_rate,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// How long an unconfirmed reservation holds stock
    pub reservation_ttl_minutes: i64,

    /// Interval of the global expiry sweep
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Interval of the due-schedule scan
    pub tick_interval_seconds: u64,

    /// Maximum number of schedules processed per tick
    pub batch_size: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("AGM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("catalog.timeout_seconds", 10)?
            .set_default("fees.b2c_delivery_fee", "50")?
            .set_default("fees.tax_rate", "0.07")?
            .set_default("fees.b2c_commission_rate", "0.10")?
            .set_default("fees.b2b_commission_rate", "0.05")?
            .set_default("inventory.reservation_ttl_minutes", 30)?
            .set_default("inventory.sweep_interval_seconds", 300)?
            .set_default("scheduler.tick_interval_seconds", 600)?
            .set_default("scheduler.batch_size", 50)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (AGM_ prefix)
            .add_source(
                Environment::with_prefix("AGM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
