//! Territory bonuses: keys, per-level effects and the catalog lookup.
//!
//! Every bonus has a level per territory. The catalog maps `(key, level)` to
//! a [`BonusLevel`]: the level's value and what it costs to keep active each
//! consumption cycle. The meaning of `value` depends on the key:
//!
//! | Keys | `value` |
//! |------|---------|
//! | `resource_rate`, `emerald_rate` | production interval in seconds |
//! | `efficient_*`, `larger_*_storage` | percentage bonus |
//! | everything else | combat/xp effect, not read by the economy |
//!
//! The catalog is a trait so tests and servers can inject their own tables.
//! [`BonusTable::standard`] is the built-in table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::resources::ResourceKind;

/// Identifies one bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKey {
    StrongerMinions,
    Multihit,
    TowerAura,
    TowerVolley,
    GatherXp,
    MobXp,
    MobDamage,
    PvpDamage,
    XpSeeking,
    TomeSeeking,
    EmeraldSeeking,
    LargerResourceStorage,
    LargerEmeraldStorage,
    EfficientResource,
    EfficientEmerald,
    ResourceRate,
    EmeraldRate,
}

impl BonusKey {
    pub const ALL: [BonusKey; 17] = [
        BonusKey::StrongerMinions,
        BonusKey::Multihit,
        BonusKey::TowerAura,
        BonusKey::TowerVolley,
        BonusKey::GatherXp,
        BonusKey::MobXp,
        BonusKey::MobDamage,
        BonusKey::PvpDamage,
        BonusKey::XpSeeking,
        BonusKey::TomeSeeking,
        BonusKey::EmeraldSeeking,
        BonusKey::LargerResourceStorage,
        BonusKey::LargerEmeraldStorage,
        BonusKey::EfficientResource,
        BonusKey::EfficientEmerald,
        BonusKey::ResourceRate,
        BonusKey::EmeraldRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BonusKey::StrongerMinions => "stronger_minions",
            BonusKey::Multihit => "multihit",
            BonusKey::TowerAura => "tower_aura",
            BonusKey::TowerVolley => "tower_volley",
            BonusKey::GatherXp => "gather_xp",
            BonusKey::MobXp => "mob_xp",
            BonusKey::MobDamage => "mob_damage",
            BonusKey::PvpDamage => "pvp_damage",
            BonusKey::XpSeeking => "xp_seeking",
            BonusKey::TomeSeeking => "tome_seeking",
            BonusKey::EmeraldSeeking => "emerald_seeking",
            BonusKey::LargerResourceStorage => "larger_resource_storage",
            BonusKey::LargerEmeraldStorage => "larger_emerald_storage",
            BonusKey::EfficientResource => "efficient_resource",
            BonusKey::EfficientEmerald => "efficient_emerald",
            BonusKey::ResourceRate => "resource_rate",
            BonusKey::EmeraldRate => "emerald_rate",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

/// Effect of one bonus at one level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusLevel {
    /// Rate (seconds) or value multiplier (percent), see module docs.
    pub value: f64,
    /// Units consumed per consumption cycle while this level is active.
    pub cost: i64,
    /// Which resource the cost is paid in.
    pub resource: ResourceKind,
}

/// Lookup service for bonus effects.
pub trait BonusCatalog {
    /// Effect of `key` at `level`, or `None` when the catalog has no entry.
    fn lookup(&self, key: BonusKey, level: u8) -> Option<BonusLevel>;
}

/// One row of a bonus table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEntry {
    pub value: f64,
    pub cost: i64,
}

/// All levels of one bonus, sharing a cost resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusDefinition {
    pub resource: ResourceKind,
    pub levels: Vec<LevelEntry>,
}

/// Table-backed catalog. Deserializes from a JSON object keyed by bonus name.
///
/// Levels above the highest defined level read as the highest level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BonusTable {
    definitions: BTreeMap<BonusKey, BonusDefinition>,
}

impl BonusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one bonus from `(value, cost)` rows.
    pub fn define(&mut self, key: BonusKey, resource: ResourceKind, levels: &[(f64, i64)]) {
        self.definitions.insert(
            key,
            BonusDefinition {
                resource,
                levels: levels
                    .iter()
                    .map(|&(value, cost)| LevelEntry { value, cost })
                    .collect(),
            },
        );
    }

    pub fn with(mut self, key: BonusKey, resource: ResourceKind, levels: &[(f64, i64)]) -> Self {
        self.define(key, resource, levels);
        self
    }

    pub fn definition(&self, key: BonusKey) -> Option<&BonusDefinition> {
        self.definitions.get(&key)
    }

    /// Highest level defined for `key`.
    pub fn max_level(&self, key: BonusKey) -> Option<u8> {
        self.definitions
            .get(&key)
            .and_then(|d| d.levels.len().checked_sub(1))
            .map(|n| n.min(u8::MAX as usize) as u8)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The built-in table used by live claims.
    pub fn standard() -> Self {
        use BonusKey::*;
        use ResourceKind::*;

        let rate: &[(f64, i64)] = &[(4.0, 0), (3.0, 2), (2.0, 4), (1.0, 6)];
        let storage: &[(f64, i64)] = &[
            (0.0, 0),
            (100.0, 1),
            (300.0, 2),
            (700.0, 4),
            (1400.0, 6),
            (3300.0, 10),
            (7900.0, 14),
        ];
        let xp: &[(f64, i64)] = &[
            (0.0, 0),
            (10.0, 1),
            (20.0, 2),
            (30.0, 3),
            (40.0, 4),
            (50.0, 5),
            (60.0, 6),
            (80.0, 7),
            (100.0, 8),
        ];

        Self::new()
            .with(ResourceRate, Emerald, rate)
            .with(EmeraldRate, Crop, rate)
            .with(
                EfficientResource,
                Emerald,
                &[
                    (0.0, 0),
                    (50.0, 1),
                    (100.0, 2),
                    (150.0, 4),
                    (200.0, 6),
                    (250.0, 8),
                    (300.0, 10),
                ],
            )
            .with(
                EfficientEmerald,
                Ore,
                &[(0.0, 0), (35.0, 1), (100.0, 2), (300.0, 4)],
            )
            .with(LargerResourceStorage, Emerald, storage)
            .with(LargerEmeraldStorage, Wood, storage)
            .with(
                StrongerMinions,
                Wood,
                &[(0.0, 0), (150.0, 1), (200.0, 2), (250.0, 3), (300.0, 4)],
            )
            .with(Multihit, Fish, &[(1.0, 0), (2.0, 3)])
            .with(
                TowerAura,
                Crop,
                &[(0.0, 0), (24.0, 2), (18.0, 3), (12.0, 4)],
            )
            .with(
                TowerVolley,
                Ore,
                &[(0.0, 0), (20.0, 2), (15.0, 3), (10.0, 4)],
            )
            .with(GatherXp, Fish, xp)
            .with(MobXp, Emerald, xp)
            .with(MobDamage, Crop, xp)
            .with(PvpDamage, Wood, xp)
            .with(
                XpSeeking,
                Emerald,
                &[(0.0, 0), (36_000.0, 1), (66_000.0, 2), (120_000.0, 3)],
            )
            .with(
                TomeSeeking,
                Fish,
                &[(0.0, 0), (0.15, 4), (1.2, 8), (2.4, 12)],
            )
            .with(
                EmeraldSeeking,
                Wood,
                &[
                    (0.0, 0),
                    (0.3, 2),
                    (3.0, 4),
                    (6.0, 6),
                    (12.0, 8),
                    (24.0, 10),
                ],
            )
    }
}

impl BonusCatalog for BonusTable {
    fn lookup(&self, key: BonusKey, level: u8) -> Option<BonusLevel> {
        let def = self.definitions.get(&key)?;
        let last = def.levels.len().checked_sub(1)?;
        let entry = &def.levels[(level as usize).min(last)];
        Some(BonusLevel {
            value: entry.value,
            cost: entry.cost,
            resource: def.resource,
        })
    }
}

/// Per-territory bonus levels.
pub type BonusLevels = BTreeMap<BonusKey, u8>;

/// Every bonus at level 0.
pub fn default_bonus_levels() -> BonusLevels {
    BonusKey::ALL.iter().map(|k| (*k, 0)).collect()
}

/// Value of the configured level of `key`, if the catalog knows it.
pub fn bonus_value(catalog: &dyn BonusCatalog, levels: &BonusLevels, key: BonusKey) -> Option<f64> {
    let level = levels.get(&key).copied().unwrap_or(0);
    catalog.lookup(key, level).map(|l| l.value)
}

/// Sum the per-cycle cost of every configured bonus, keyed by cost resource.
pub fn aggregate_costs(catalog: &dyn BonusCatalog, levels: &BonusLevels) -> Ledger {
    let mut costs = Ledger::zeroed();
    for (&key, &level) in levels {
        if let Some(effect) = catalog.lookup(key, level) {
            costs.add(effect.resource, effect.cost);
        }
    }
    costs
}
