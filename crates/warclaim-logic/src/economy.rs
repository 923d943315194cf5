//! Pure economy formulas: production amounts, storage sizes and intervals.
//!
//! Bonus percentages come from the bonus catalog and are passed in as plain
//! numbers, so everything here is a function of its arguments.

use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::resources::ResourceKind;

/// Raw resources produced per production cycle before multipliers.
pub const BASE_RESOURCE_PRODUCTION: f64 = 1.0;
/// Emeralds produced per production cycle before multipliers.
pub const BASE_EMERALD_PRODUCTION: f64 = 2.5;
/// Raw resource storage per kind before bonuses.
pub const BASE_RESOURCE_STORAGE: f64 = 300.0;
/// Emerald storage before bonuses.
pub const BASE_EMERALD_STORAGE: f64 = 3000.0;
/// Headquarters boost for raw resource storage (300 → 500).
pub const HQ_RESOURCE_STORAGE_BOOST: f64 = 5.0 / 3.0;
/// Headquarters boost for emerald storage (3000 → 15000).
pub const HQ_EMERALD_STORAGE_BOOST: f64 = 5.0;

/// Capacity per kind for a territory at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCapacity {
    /// Capacity of each raw resource kind.
    pub resource: i64,
    /// Capacity of the premium currency.
    pub emerald: i64,
}

impl StorageCapacity {
    /// Derive capacities from storage bonus percentages.
    ///
    /// `(1 + pct / 100) × base`, boosted when the territory is the
    /// headquarters, truncated to whole units.
    pub fn compute(
        config: &EconomyConfig,
        resource_bonus_pct: f64,
        emerald_bonus_pct: f64,
        is_hq: bool,
    ) -> Self {
        let resource_boost = if is_hq {
            config.hq_resource_storage_boost
        } else {
            1.0
        };
        let emerald_boost = if is_hq {
            config.hq_emerald_storage_boost
        } else {
            1.0
        };
        Self {
            resource: truncate(
                (1.0 + resource_bonus_pct / 100.0) * config.base_resource_storage * resource_boost,
            ),
            emerald: truncate(
                (1.0 + emerald_bonus_pct / 100.0) * config.base_emerald_storage * emerald_boost,
            ),
        }
    }

    pub fn for_kind(&self, kind: ResourceKind) -> i64 {
        if kind.is_currency() {
            self.emerald
        } else {
            self.resource
        }
    }
}

/// Emeralds credited by one currency production cycle.
pub fn produced_emeralds(config: &EconomyConfig, efficiency_pct: f64, multiplier: f64) -> i64 {
    truncate((1.0 + efficiency_pct / 100.0) * config.base_emerald_production * multiplier)
}

/// Units of one raw kind credited by one resource production cycle.
pub fn produced_resource(config: &EconomyConfig, efficiency_pct: f64, multiplier: f64) -> i64 {
    truncate((1.0 + efficiency_pct / 100.0) * config.base_resource_production * multiplier)
}

/// Convert a bonus interval in seconds to milliseconds.
///
/// Non-positive or non-finite values fall back to the configured default.
pub fn interval_ms(config: &EconomyConfig, seconds: Option<f64>) -> u64 {
    let secs = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => config.default_production_interval_secs,
    };
    (secs * 1000.0).round() as u64
}

/// Credit truncation rule: toward zero, never negative.
fn truncate(value: f64) -> i64 {
    if value.is_finite() && value > 0.0 {
        value.trunc() as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_capacities() {
        let cap = StorageCapacity::compute(&EconomyConfig::default(), 0.0, 0.0, false);
        assert_eq!(cap.resource, 300);
        assert_eq!(cap.emerald, 3000);
    }

    #[test]
    fn test_hq_capacities() {
        let cap = StorageCapacity::compute(&EconomyConfig::default(), 0.0, 0.0, true);
        assert_eq!(cap.resource, 500);
        assert_eq!(cap.emerald, 15000);
    }

    #[test]
    fn test_hq_boost_is_larger_for_currency() {
        let config = EconomyConfig::default();
        assert!(config.hq_emerald_storage_boost > config.hq_resource_storage_boost);
    }

    #[test]
    fn test_storage_bonus_scales_capacity() {
        let cap = StorageCapacity::compute(&EconomyConfig::default(), 100.0, 50.0, false);
        assert_eq!(cap.resource, 600);
        assert_eq!(cap.emerald, 4500);
    }

    #[test]
    fn test_for_kind() {
        let cap = StorageCapacity {
            resource: 1,
            emerald: 2,
        };
        assert_eq!(cap.for_kind(ResourceKind::Emerald), 2);
        assert_eq!(cap.for_kind(ResourceKind::Ore), 1);
    }

    #[test]
    fn test_emerald_production_with_multiplier() {
        let config = EconomyConfig::default();
        assert_eq!(produced_emeralds(&config, 0.0, 2.0), 5);
        assert_eq!(produced_emeralds(&config, 0.0, 1.0), 2); // 2.5 truncated
        assert_eq!(produced_emeralds(&config, 100.0, 1.0), 5);
    }

    #[test]
    fn test_resource_production() {
        let config = EconomyConfig::default();
        assert_eq!(produced_resource(&config, 0.0, 3.0), 3);
        assert_eq!(produced_resource(&config, 50.0, 3.0), 4); // 4.5 truncated
        assert_eq!(produced_resource(&config, 0.0, 0.0), 0);
    }

    #[test]
    fn test_interval_fallback() {
        let config = EconomyConfig::default();
        assert_eq!(interval_ms(&config, Some(2.0)), 2000);
        assert_eq!(interval_ms(&config, Some(0.0)), 4000);
        assert_eq!(interval_ms(&config, None), 4000);
        assert_eq!(interval_ms(&config, Some(f64::NAN)), 4000);
    }
}
