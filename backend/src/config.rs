//! Configuration management for the Clinic Stock Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with CSM_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Bearer token verification
    pub auth: AuthConfig,

    /// Inventory and reporting knobs
    pub inventory: InventoryConfig,
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
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,

    /// Expected `iss` claim; not checked when unset
    pub issuer: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Default look-back window for movement reports and dashboard counters
    pub report_window_days: i64,

    pub default_page_size: u32,

    /// Balance listing shows more rows per page than the other lists
    pub balance_page_size: u32,

    pub max_page_size: u32,

    /// Multiplier applied to a shortage when suggesting a reorder quantity
    pub low_stock_reorder_factor: Decimal,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("CSM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("inventory.report_window_days", 30)?
            .set_default("inventory.default_page_size", 10)?
            .set_default("inventory.balance_page_size", 50)?
            .set_default("inventory.max_page_size", 200)?
            .set_default("inventory.low_stock_reorder_factor", "1.5")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CSM_ prefix)
            .add_source(
                Environment::with_prefix("CSM")
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

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            report_window_days: 30,
            default_page_size: 10,
            balance_page_size: 50,
            max_page_size: 200,
            low_stock_reorder_factor: Decimal::new(15, 1),
        }
    }
}
