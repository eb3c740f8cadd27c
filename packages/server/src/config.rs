use chrono::TimeDelta;
use common::StorageConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Longest accepted download verification lifetime (30 days).
pub const MAX_VERIFICATION_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Longest accepted retention of expired verifications (365 days).
pub const MAX_EXPIRED_RETENTION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec![],
            max_age: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider that issues bearer tokens.
    pub jwt_secret: String,
    /// Role claim value that grants admin access. Default: "admin".
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
}

fn default_admin_role() -> String {
    "admin".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StripeConfig {
    /// Endpoint signing secret (`whsec_...`).
    pub webhook_secret: String,
    /// Maximum accepted age of a signed webhook timestamp. Default: 300.
    #[serde(default = "default_signature_tolerance_secs")]
    pub signature_tolerance_secs: i64,
}

fn default_signature_tolerance_secs() -> i64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct FulfillmentConfig {
    /// Lifetime of a download verification. Default: 86400 (24 hours).
    #[serde(default = "default_verification_ttl_secs")]
    pub verification_ttl_secs: u64,
    /// Consume a verification on first successful resolution. Default: false.
    #[serde(default)]
    pub single_use_links: bool,
    /// Interval between sweeps of expired verifications. Default: 3600.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// How long an expired verification is kept so it keeps answering
    /// `LINK_EXPIRED` rather than `INVALID_LINK`. Default: 604800 (7 days).
    #[serde(default = "default_expired_retention_secs")]
    pub expired_retention_secs: u64,
}

fn default_verification_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_sweep_interval_secs() -> u64 {
    3600
}
fn default_expired_retention_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            verification_ttl_secs: default_verification_ttl_secs(),
            single_use_links: false,
            sweep_interval_secs: default_sweep_interval_secs(),
            expired_retention_secs: default_expired_retention_secs(),
        }
    }
}

impl FulfillmentConfig {
    /// Verification lifetime, or `None` when zero or out of range.
    pub fn verification_ttl(&self) -> Option<TimeDelta> {
        bounded_seconds(self.verification_ttl_secs, 1, MAX_VERIFICATION_TTL_SECS)
    }

    /// Retention of expired verifications, or `None` when out of range.
    pub fn expired_retention(&self) -> Option<TimeDelta> {
        bounded_seconds(self.expired_retention_secs, 0, MAX_EXPIRED_RETENTION_SECS)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.verification_ttl().is_none() {
            return Err(ConfigError::Message(format!(
                "fulfillment.verification_ttl_secs must be between 1 and {MAX_VERIFICATION_TTL_SECS}"
            )));
        }
        if self.expired_retention().is_none() {
            return Err(ConfigError::Message(format!(
                "fulfillment.expired_retention_secs must be at most {MAX_EXPIRED_RETENTION_SECS}"
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Message(
                "fulfillment.sweep_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn bounded_seconds(secs: u64, min: u64, max: u64) -> Option<TimeDelta> {
    if secs < min || secs > max {
        return None;
    }
    TimeDelta::try_seconds(i64::try_from(secs).ok()?)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub stripe: StripeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fulfillment: FulfillmentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://./data/storefront.db?mode=rwc")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., STOREFRONT__STRIPE__WEBHOOK_SECRET)
            .add_source(Environment::with_prefix("STOREFRONT").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would mint unusable download verifications.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fulfillment.validate()
    }
}
