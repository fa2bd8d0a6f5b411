//! Engine configuration, read from `COMPTOIR_*` environment variables.

use anyhow::Context;
use thiserror::Error;

pub const INVOICE_PREFIX_VAR: &str = "COMPTOIR_INVOICE_PREFIX";
pub const REAPPRO_PREFIX_VAR: &str = "COMPTOIR_REAPPRO_PREFIX";
pub const PRO_ORDER_PREFIX_VAR: &str = "COMPTOIR_PRO_ORDER_PREFIX";
pub const PAYMENT_TERMS_DAYS_VAR: &str = "COMPTOIR_PAYMENT_TERMS_DAYS";
pub const REAPPRO_SHIPPING_COST_VAR: &str = "COMPTOIR_REAPPRO_SHIPPING_COST";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("{key} must be alphanumeric (got '{value}')")]
    InvalidPrefix { key: &'static str, value: String },

    #[error("{key} must be a non-negative integer (got '{value}')")]
    InvalidNumber { key: &'static str, value: String },
}

/// Tunables of the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Prefix of invoice numbers assigned to Pro orders.
    pub invoice_prefix: String,
    pub reappro_prefix: String,
    pub pro_order_prefix: String,
    /// Days between placing a Pro order and its payment due date.
    pub payment_terms_days: u32,
    /// Shipping cost (minor units) charged on orders generated from reappro requests.
    pub reappro_shipping_cost: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            invoice_prefix: "FAC".to_string(),
            reappro_prefix: "REA".to_string(),
            pro_order_prefix: "CMD".to_string(),
            payment_terms_days: 30,
            reappro_shipping_cost: 0,
        }
    }
}

impl EngineConfig {
    /// Read the process environment; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            invoice_prefix: prefix(&lookup, INVOICE_PREFIX_VAR, defaults.invoice_prefix)?,
            reappro_prefix: prefix(&lookup, REAPPRO_PREFIX_VAR, defaults.reappro_prefix)?,
            pro_order_prefix: prefix(&lookup, PRO_ORDER_PREFIX_VAR, defaults.pro_order_prefix)?,
            payment_terms_days: number(&lookup, PAYMENT_TERMS_DAYS_VAR, defaults.payment_terms_days)?,
            reappro_shipping_cost: number(
                &lookup,
                REAPPRO_SHIPPING_COST_VAR,
                defaults.reappro_shipping_cost,
            )?,
        })
    }
}

/// Load the configuration at process start-up.
pub fn load() -> anyhow::Result<EngineConfig> {
    let config = EngineConfig::from_env().context("invalid COMPTOIR_* engine configuration")?;
    tracing::info!(
        invoice_prefix = %config.invoice_prefix,
        reappro_prefix = %config.reappro_prefix,
        pro_order_prefix = %config.pro_order_prefix,
        payment_terms_days = config.payment_terms_days,
        "engine configuration loaded"
    );
    Ok(config)
}

fn prefix(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: String,
) -> Result<String, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty { key });
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidPrefix {
            key,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

fn number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.invoice_prefix, "FAC");
        assert_eq!(config.payment_terms_days, 30);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (INVOICE_PREFIX_VAR, " INV "),
            (PAYMENT_TERMS_DAYS_VAR, "45"),
            (REAPPRO_SHIPPING_COST_VAR, "1500"),
        ]))
        .unwrap();

        assert_eq!(config.invoice_prefix, "INV");
        assert_eq!(config.reappro_prefix, "REA");
        assert_eq!(config.payment_terms_days, 45);
        assert_eq!(config.reappro_shipping_cost, 1500);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[(PAYMENT_TERMS_DAYS_VAR, "-3")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: PAYMENT_TERMS_DAYS_VAR,
                value: "-3".to_string()
            }
        );

        let err = EngineConfig::from_lookup(lookup_from(&[(REAPPRO_PREFIX_VAR, "RE-A")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrefix { .. }));

        let err = EngineConfig::from_lookup(lookup_from(&[(PRO_ORDER_PREFIX_VAR, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty { key: PRO_ORDER_PREFIX_VAR });
    }

    #[test]
    fn load_reads_the_process_environment() {
        // No COMPTOIR_* variable is set in the test environment.
        if std::env::vars().any(|(k, _)| k.starts_with("COMPTOIR_")) {
            return;
        }
        assert_eq!(load().unwrap(), EngineConfig::default());
    }
}
