//! Economy configuration: base rates, storage sizes, cooldowns and policies.
//!
//! Defaults reproduce the live game values. A server can load an
//! `EconomyConfig` from JSON and check it with [`validate_config`] before
//! building a claim.
//!
//! ```
//! use warclaim_logic::config::{validate_config, EconomyConfig};
//!
//! let config = EconomyConfig::default();
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::economy::{
    BASE_EMERALD_PRODUCTION, BASE_EMERALD_STORAGE, BASE_RESOURCE_PRODUCTION,
    BASE_RESOURCE_STORAGE, HQ_EMERALD_STORAGE_BOOST, HQ_RESOURCE_STORAGE_BOOST,
};

/// What happens to a parcel when no route to its goal exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnroutablePolicy {
    /// Keep it in the sending territory's relay queue and retry next cycle.
    #[default]
    Park,
    /// Discard it.
    Drop,
}

/// Tunable economy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub base_resource_production: f64,
    pub base_emerald_production: f64,
    pub base_resource_storage: f64,
    pub base_emerald_storage: f64,
    pub hq_resource_storage_boost: f64,
    pub hq_emerald_storage_boost: f64,
    /// Cooldown between consumption cycles.
    pub consumption_interval_ms: u64,
    /// Cooldown between transfer cycles.
    pub transfer_interval_ms: u64,
    /// Production interval used when the bonus catalog has no rate entry.
    pub default_production_interval_secs: f64,
    pub unroutable: UnroutablePolicy,
    /// Refuse relays into territories whose borders are closed.
    pub closed_borders_block_relays: bool,
    /// Maximum number of buffered economy events before the oldest is lost.
    pub event_log_capacity: usize,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            base_resource_production: BASE_RESOURCE_PRODUCTION,
            base_emerald_production: BASE_EMERALD_PRODUCTION,
            base_resource_storage: BASE_RESOURCE_STORAGE,
            base_emerald_storage: BASE_EMERALD_STORAGE,
            hq_resource_storage_boost: HQ_RESOURCE_STORAGE_BOOST,
            hq_emerald_storage_boost: HQ_EMERALD_STORAGE_BOOST,
            consumption_interval_ms: 1_000,
            transfer_interval_ms: 60_000,
            default_production_interval_secs: 4.0,
            unroutable: UnroutablePolicy::Park,
            closed_borders_block_relays: false,
            event_log_capacity: 1024,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A base production rate or storage size is zero, negative or NaN.
    NonPositiveBase(&'static str),
    /// A headquarters boost would shrink storage.
    HqBoostBelowOne(&'static str),
    /// A cooldown of zero would fire on every tick.
    ZeroInterval(&'static str),
    /// Fallback production interval is not a positive number of seconds.
    InvalidDefaultInterval,
    /// Event log cannot hold anything.
    ZeroEventCapacity,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NonPositiveBase(field) => write!(f, "{} must be positive", field),
            ConfigError::HqBoostBelowOne(field) => write!(f, "{} must be at least 1.0", field),
            ConfigError::ZeroInterval(field) => write!(f, "{} must be non-zero", field),
            ConfigError::InvalidDefaultInterval => {
                write!(f, "default_production_interval_secs must be positive")
            }
            ConfigError::ZeroEventCapacity => write!(f, "event_log_capacity must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate an economy configuration, returning all errors found.
pub fn validate_config(config: &EconomyConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    let bases = [
        ("base_resource_production", config.base_resource_production),
        ("base_emerald_production", config.base_emerald_production),
        ("base_resource_storage", config.base_resource_storage),
        ("base_emerald_storage", config.base_emerald_storage),
    ];
    for (field, value) in bases {
        if value.is_nan() || value <= 0.0 {
            errors.push(ConfigError::NonPositiveBase(field));
        }
    }

    let boosts = [
        ("hq_resource_storage_boost", config.hq_resource_storage_boost),
        ("hq_emerald_storage_boost", config.hq_emerald_storage_boost),
    ];
    for (field, value) in boosts {
        if value.is_nan() || value < 1.0 {
            errors.push(ConfigError::HqBoostBelowOne(field));
        }
    }

    if config.consumption_interval_ms == 0 {
        errors.push(ConfigError::ZeroInterval("consumption_interval_ms"));
    }
    if config.transfer_interval_ms == 0 {
        errors.push(ConfigError::ZeroInterval("transfer_interval_ms"));
    }
    let default_secs = config.default_production_interval_secs;
    if !default_secs.is_finite() || default_secs <= 0.0 {
        errors.push(ConfigError::InvalidDefaultInterval);
    }
    if config.event_log_capacity == 0 {
        errors.push(ConfigError::ZeroEventCapacity);
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let errors = validate_config(&EconomyConfig::default());
        assert!(
            errors.is_empty(),
            "default config should be valid: {errors:?}"
        );
    }

    #[test]
    fn non_positive_base() {
        let mut config = EconomyConfig::default();
        config.base_emerald_storage = 0.0;
        config.base_resource_production = f64::NAN;
        let errors = validate_config(&config);
        assert!(errors.contains(&ConfigError::NonPositiveBase("base_emerald_storage")));
        assert!(errors.contains(&ConfigError::NonPositiveBase("base_resource_production")));
    }

    #[test]
    fn hq_boost_below_one() {
        let mut config = EconomyConfig::default();
        config.hq_resource_storage_boost = 0.5;
        assert!(validate_config(&config)
            .contains(&ConfigError::HqBoostBelowOne("hq_resource_storage_boost")));
    }

    #[test]
    fn zero_intervals() {
        let mut config = EconomyConfig::default();
        config.consumption_interval_ms = 0;
        config.transfer_interval_ms = 0;
        let errors = validate_config(&config);
        assert!(errors.contains(&ConfigError::ZeroInterval("consumption_interval_ms")));
        assert!(errors.contains(&ConfigError::ZeroInterval("transfer_interval_ms")));
    }

    #[test]
    fn invalid_default_interval() {
        let mut config = EconomyConfig::default();
        config.default_production_interval_secs = -1.0;
        assert!(validate_config(&config).contains(&ConfigError::InvalidDefaultInterval));
    }

    #[test]
    fn zero_event_capacity() {
        let mut config = EconomyConfig::default();
        config.event_log_capacity = 0;
        assert!(validate_config(&config).contains(&ConfigError::ZeroEventCapacity));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: EconomyConfig =
            serde_json::from_str(r#"{ "transfer_interval_ms": 5000, "unroutable": "drop" }"#)
                .unwrap();
        assert_eq!(config.transfer_interval_ms, 5000);
        assert_eq!(config.unroutable, UnroutablePolicy::Drop);
        assert_eq!(config.consumption_interval_ms, 1000);
    }
}
