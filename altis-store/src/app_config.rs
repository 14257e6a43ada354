use altis_core::retry::RetryPolicy;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

/// Switches for behavior that deployments disagree on.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BusinessRules {
    /// Reject pay and cancel on reservations the session user does not own.
    pub enforce_reservation_owner: bool,
    /// Credit the reservation cost back on cancel even when it was never paid.
    pub refund_unpaid_on_cancel: bool,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            enforce_reservation_owner: false,
            refund_unpaid_on_cancel: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides, e.g. config/test.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // ALTIS__DATABASE__URL=... overrides database.url
            .add_source(config::Environment::with_prefix("ALTIS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Parses a single TOML document without consulting files or the
    /// environment.
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
