//! Service configuration, read from the environment (and `.env` via dotenvy).

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::value_objects::Money;
use crate::services::checkout::{CheckoutSettings, DEFAULT_NUMBER_ATTEMPTS};
use crate::services::notifications::ConfirmationTemplate;
use crate::services::pricing::{DeliveryFeePolicy, FlatDeliveryFee, PostcodeAreaFee};

/// Environment variable for the Postgres URL. Unset means in-memory stores.
pub const DATABASE_URL_ENV_VAR: &str = "DATABASE_URL";
/// Environment variable for the HTTP port.
pub const PORT_ENV_VAR: &str = "PORT";
/// Environment variable for the NATS server.
pub const NATS_URL_ENV_VAR: &str = "NATS_URL";
/// Environment variable for the flat delivery fee, e.g. `3.99`.
pub const DELIVERY_FEE_ENV_VAR: &str = "DELIVERY_FEE";
/// Environment variable for per-area fees, e.g. `LS=2.50,YO=6.00`.
pub const DELIVERY_POSTCODE_FEES_ENV_VAR: &str = "DELIVERY_POSTCODE_FEES";
pub const ALLOW_GUEST_CHECKOUT_ENV_VAR: &str = "ALLOW_GUEST_CHECKOUT";
pub const SITE_URL_ENV_VAR: &str = "SITE_URL";
pub const SHOP_NAME_ENV_VAR: &str = "SHOP_NAME";
pub const COLLECTION_LOCATION_ENV_VAR: &str = "COLLECTION_LOCATION";
pub const ORDER_NUMBER_PREFIX_ENV_VAR: &str = "ORDER_NUMBER_PREFIX";
/// Environment variable for the token guarding admin routes. Unset disables them.
pub const ADMIN_TOKEN_ENV_VAR: &str = "ADMIN_TOKEN";
/// Environment variable for a JSON product file seeding the in-memory catalog.
pub const CATALOG_FILE_ENV_VAR: &str = "CATALOG_FILE";

pub const DEFAULT_PORT: u16 = 8083;

pub fn default_delivery_fee() -> Money {
    Money::new(Decimal::new(399, 2))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key} ('{value}'): {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub port: u16,
    pub nats_url: Option<String>,
    pub delivery_fee: Money,
    pub postcode_fees: Vec<(String, Money)>,
    pub allow_guest_checkout: bool,
    pub site_url: String,
    pub shop_name: String,
    pub collection_location: String,
    pub order_number_prefix: String,
    pub admin_token: Option<String>,
    pub catalog_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: DEFAULT_PORT,
            nats_url: None,
            delivery_fee: default_delivery_fee(),
            postcode_fees: vec![],
            allow_guest_checkout: false,
            site_url: format!("http://localhost:{DEFAULT_PORT}"),
            shop_name: "The Cake Shop".to_string(),
            collection_location: "our shop".to_string(),
            order_number_prefix: "ORD".to_string(),
            admin_token: None,
            catalog_file: None,
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason: reason.into() }
}

fn parse_fee(key: &'static str, raw: &str) -> Result<Money, ConfigError> {
    let amount = Decimal::from_str(raw.trim()).map_err(|e| invalid(key, raw, e.to_string()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(invalid(key, raw, "fee cannot be negative"));
    }
    Ok(Money::new(amount))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "expected true or false")),
    }
}

fn parse_area_fees(raw: &str) -> Result<Vec<(String, Money)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (area, fee) = entry
                .split_once('=')
                .ok_or_else(|| invalid(DELIVERY_POSTCODE_FEES_ENV_VAR, raw, format!("'{entry}' is not AREA=fee")))?;
            let area = area.trim().to_uppercase();
            if area.is_empty() || !area.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(invalid(DELIVERY_POSTCODE_FEES_ENV_VAR, raw, format!("'{area}' is not a postcode area")));
            }
            Ok((area, parse_fee(DELIVERY_POSTCODE_FEES_ENV_VAR, fee)?))
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.database_url = get(DATABASE_URL_ENV_VAR);
        config.nats_url = get(NATS_URL_ENV_VAR);
        config.admin_token = get(ADMIN_TOKEN_ENV_VAR);
        config.catalog_file = get(CATALOG_FILE_ENV_VAR).map(PathBuf::from);

        if let Some(raw) = get(PORT_ENV_VAR) {
            config.port = raw.parse().map_err(|_| invalid(PORT_ENV_VAR, &raw, "expected a port number"))?;
        }
        if let Some(raw) = get(DELIVERY_FEE_ENV_VAR) {
            config.delivery_fee = parse_fee(DELIVERY_FEE_ENV_VAR, &raw)?;
        }
        if let Some(raw) = get(DELIVERY_POSTCODE_FEES_ENV_VAR) {
            config.postcode_fees = parse_area_fees(&raw)?;
        }
        if let Some(raw) = get(ALLOW_GUEST_CHECKOUT_ENV_VAR) {
            config.allow_guest_checkout = parse_bool(ALLOW_GUEST_CHECKOUT_ENV_VAR, &raw)?;
        }
        config.site_url = get(SITE_URL_ENV_VAR).unwrap_or_else(|| format!("http://localhost:{}", config.port));
        if let Some(v) = get(SHOP_NAME_ENV_VAR) { config.shop_name = v; }
        if let Some(v) = get(COLLECTION_LOCATION_ENV_VAR) { config.collection_location = v; }
        if let Some(raw) = get(ORDER_NUMBER_PREFIX_ENV_VAR) {
            if raw.len() > 10 || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid(ORDER_NUMBER_PREFIX_ENV_VAR, &raw, "expected up to 10 letters or digits"));
            }
            config.order_number_prefix = raw.to_uppercase();
        }

        Ok(config)
    }

    /// Per-area fees when configured, with the flat fee as fallback.
    pub fn delivery_fee_policy(&self) -> Arc<dyn DeliveryFeePolicy> {
        if self.postcode_fees.is_empty() {
            Arc::new(FlatDeliveryFee(self.delivery_fee))
        } else {
            Arc::new(PostcodeAreaFee::new(self.postcode_fees.clone(), self.delivery_fee))
        }
    }

    pub fn confirmation_template(&self) -> ConfirmationTemplate {
        ConfirmationTemplate {
            shop_name: self.shop_name.clone(),
            collection_location: self.collection_location.clone(),
            site_url: self.site_url.clone(),
        }
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings { allow_guest_checkout: self.allow_guest_checkout, max_number_attempts: DEFAULT_NUMBER_ATTEMPTS }
    }
}
