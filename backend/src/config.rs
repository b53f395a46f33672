//! Configuration management for the Stock Ledger Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LEDGER_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::ShortfallPolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Outbox dispatcher configuration
    pub outbox: OutboxConfig,

    /// Sales-system push configuration
    pub sales: SalesConfig,

    /// Consumption engine configuration
    pub consumption: ConsumptionConfig,
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
pub struct OutboxConfig {
    /// Seconds between dispatcher cycles
    pub poll_interval_secs: u64,

    /// Maximum events claimed per cycle
    pub batch_size: i64,

    /// First retry delay after a failed delivery
    pub retry_base_secs: u64,

    /// Cap on the escalating retry delay
    pub retry_max_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SalesConfig {
    /// Push endpoint of the external sales system
    pub endpoint: String,

    /// Shared key used to sign push requests
    pub shared_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConsumptionConfig {
    /// What to do when a sale requests more than the eligible supply
    pub shortfall_policy: ShortfallPolicy,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("LEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("outbox.poll_interval_secs", 15)?
            .set_default("outbox.batch_size", 50)?
            .set_default("outbox.retry_base_secs", 30)?
            .set_default("outbox.retry_max_secs", 3600)?
            .set_default("consumption.shortfall_policy", "queue")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LEDGER_ prefix)
            .add_source(
                Environment::with_prefix("LEDGER")
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
