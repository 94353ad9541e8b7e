use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

use crate::models::ShippingMethod;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_ORDER_NUMBER_PREFIX: &str = "ORD";

/// Flat-rate shipping table, one rate per shipping method.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ShippingConfig {
    #[serde(default = "default_standard_rate")]
    #[validate(custom = "validate_non_negative")]
    pub standard_rate: Decimal,

    #[serde(default = "default_express_rate")]
    #[validate(custom = "validate_non_negative")]
    pub express_rate: Decimal,

    #[serde(default = "default_overnight_rate")]
    #[validate(custom = "validate_non_negative")]
    pub overnight_rate: Decimal,

    /// Subtotal at or above which standard shipping is free
    #[serde(default)]
    pub free_shipping_threshold: Option<Decimal>,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            standard_rate: default_standard_rate(),
            express_rate: default_express_rate(),
            overnight_rate: default_overnight_rate(),
            free_shipping_threshold: None,
        }
    }
}

impl ShippingConfig {
    pub fn rate_for(&self, method: ShippingMethod) -> Decimal {
        match method {
            ShippingMethod::Standard => self.standard_rate,
            ShippingMethod::Express => self.express_rate,
            ShippingMethod::Overnight => self.overnight_rate,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Default currency code for commerce operations
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub default_currency: String,

    /// Prefix of generated order numbers, e.g. `ORD-20261019-7QK2ZD`
    #[serde(default = "default_order_number_prefix")]
    #[validate(length(min = 1, max = 12))]
    pub order_number_prefix: String,

    /// Largest quantity accepted on a single cart line
    #[serde(default = "default_max_line_quantity")]
    #[validate(range(min = 1))]
    pub max_line_quantity: i32,

    /// Shipping rate table
    #[serde(default)]
    #[validate]
    pub shipping: ShippingConfig,
}

impl AppConfig {
    /// Builds a configuration from defaults, suitable for tests and embedded use.
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            default_currency: default_currency(),
            order_number_prefix: default_order_number_prefix(),
            max_line_quantity: default_max_line_quantity(),
            shipping: ShippingConfig::default(),
        }
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    300
}
fn default_db_acquire_timeout_secs() -> u64 {
    30
}
fn default_event_channel_capacity() -> usize {
    1024
}
fn default_currency() -> String {
    "USD".to_string()
}
fn default_order_number_prefix() -> String {
    DEFAULT_ORDER_NUMBER_PREFIX.to_string()
}
fn default_max_line_quantity() -> i32 {
    100
}
fn default_standard_rate() -> Decimal {
    dec!(5.00)
}
fn default_express_rate() -> Decimal {
    dec!(15.00)
}
fn default_overnight_rate() -> Decimal {
    dec!(25.00)
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() {
        let mut err = ValidationError::new("shipping_rate");
        err.message = Some("shipping rates cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_orders={},sea_orm=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = base_builder()?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    from_config(builder.build()?)
}

fn base_builder() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)
}

/// Deserializes and validates an already-layered configuration.
fn from_config(config: Config) -> Result<AppConfig, AppConfigError> {
    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn load_from_toml(content: &str) -> Result<AppConfig, AppConfigError> {
        let config = base_builder()
            .unwrap()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap();
        from_config(config)
    }

    #[test]
    fn defaults_fill_missing_values() {
        let config = load_from_toml("").unwrap();
        assert_eq!(config.order_number_prefix, "ORD");
        assert_eq!(config.shipping.rate_for(ShippingMethod::Standard), dec!(5.00));
        assert_eq!(config.shipping.free_shipping_threshold, None);
        assert!(config.is_development());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = load_from_toml(
            r#"
            database_url = "postgres://localhost/orders"
            environment = "production"
            order_number_prefix = "SHOP"

            [shipping]
            standard_rate = "4.50"
            express_rate = "12"
            overnight_rate = "30"
            free_shipping_threshold = "75"
            "#,
        )
        .unwrap();

        assert!(config.is_production());
        assert_eq!(config.database_url(), "postgres://localhost/orders");
        assert_eq!(config.order_number_prefix, "SHOP");
        assert_eq!(config.shipping.rate_for(ShippingMethod::Standard), dec!(4.50));
        assert_eq!(config.shipping.rate_for(ShippingMethod::Overnight), dec!(30));
        assert_eq!(config.shipping.free_shipping_threshold, Some(dec!(75)));
    }

    #[test]
    fn test_validation_failure() {
        let result = load_from_toml(
            r#"
            log_level = "loud"
            event_channel_capacity = 0
            "#,
        );

        match result {
            Err(AppConfigError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("log_level"));
                assert!(errors.field_errors().contains_key("event_channel_capacity"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn negative_shipping_rate_is_rejected() {
        let result = load_from_toml(
            r#"
            [shipping]
            express_rate = "-1"
            "#,
        );
        assert!(matches!(result, Err(AppConfigError::Validation(_))));
    }
}
