//! Territory state and the per-territory tick state machine.
//!
//! A territory owns its ledger, timers, health flags and relay queue. Only
//! its own tick and deliveries into it mutate that state; the claim keeps
//! each territory behind its own lock.
//!
//! `tick` runs four independent cooldowns in order: currency production,
//! resource production, consumption, and the transfer cycle. The transfer
//! cycle does not deliver anything itself. It returns the parcels to send in
//! [`TickOutcome::outbox`] so the claim can dispatch them after releasing
//! this territory's lock.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use warclaim_logic::bonuses::{
    aggregate_costs, bonus_value, default_bonus_levels, BonusCatalog, BonusKey, BonusLevels,
};
use warclaim_logic::config::EconomyConfig;
use warclaim_logic::economy::{interval_ms, produced_emeralds, produced_resource, StorageCapacity};
use warclaim_logic::ledger::{self, DebitReport, Ledger, ResourceFlags, StoreReport};
use warclaim_logic::resources::ResourceKind;
use warclaim_logic::routing::{RouteStyle, TerritoryId};
use warclaim_logic::transference::{TransferDirection, Transference};

use crate::transfer::TransferOutcome;

/// Static map definition of a territory, as found in map data files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapTerritory {
    #[serde(rename = "territory")]
    pub name: String,
    #[serde(default)]
    pub ore: f64,
    #[serde(default)]
    pub crop: f64,
    #[serde(default)]
    pub wood: f64,
    #[serde(default)]
    pub fish: f64,
    #[serde(default)]
    pub emerald: f64,
    #[serde(default)]
    pub conns: Vec<String>,
}

impl MapTerritory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ore: 0.0,
            crop: 0.0,
            wood: 0.0,
            fish: 0.0,
            emerald: 0.0,
            conns: Vec::new(),
        }
    }

    pub fn with_multiplier(mut self, kind: ResourceKind, value: f64) -> Self {
        match kind {
            ResourceKind::Ore => self.ore = value,
            ResourceKind::Crop => self.crop = value,
            ResourceKind::Wood => self.wood = value,
            ResourceKind::Fish => self.fish = value,
            ResourceKind::Emerald => self.emerald = value,
        }
        self
    }

    pub fn with_connections(mut self, conns: &[&str]) -> Self {
        self.conns = conns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn multiplier(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Ore => self.ore,
            ResourceKind::Crop => self.crop,
            ResourceKind::Wood => self.wood,
            ResourceKind::Fish => self.fish,
            ResourceKind::Emerald => self.emerald,
        }
    }

    /// Create a live territory from this definition.
    pub fn instantiate(&self, id: TerritoryId) -> Territory {
        Territory::new(id, self)
    }
}

/// Treasury tier. Feeds the routing toll of the territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Treasury {
    #[default]
    VeryLow = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    VeryHigh = 4,
}

impl Treasury {
    /// Cost of routing through a territory with this treasury.
    pub fn toll(self) -> u32 {
        self as u32 + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BorderStyle {
    #[default]
    Closed = 0,
    Open = 1,
}

/// Last firing time of each gated activity, in simulation milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTimers {
    pub last_currency: u64,
    pub last_resource: u64,
    pub last_consumption: u64,
    pub last_transfer: u64,
}

/// Read-only collaborators a tick needs.
pub struct TickContext<'a> {
    pub config: &'a EconomyConfig,
    pub catalog: &'a dyn BonusCatalog,
    /// Current claim headquarters, if one is designated.
    pub headquarters: Option<TerritoryId>,
}

/// What a single tick did.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// Amounts credited by production, before capacity clamping.
    pub produced: Ledger,
    /// Kinds that overflowed during production, with the discarded amount.
    pub overflowed: Vec<(ResourceKind, i64)>,
    /// Cost table charged this tick, if consumption fired.
    pub consumed: Option<Ledger>,
    /// Amounts borrowed from in-transit parcels to cover consumption.
    pub drawn_from_relays: Ledger,
    /// Kinds consumption could not cover.
    pub short: Vec<(ResourceKind, i64)>,
    /// True if the transfer cycle fired.
    pub transfer_cycle: bool,
    /// Parcels to dispatch once the territory lock is released.
    pub outbox: Vec<Transference>,
    /// Parcel ids and how their dispatch went. Filled in by the claim.
    pub dispatched: Vec<(String, TransferOutcome)>,
}

impl TickOutcome {
    fn record_production(&mut self, batch: &Ledger, report: StoreReport) {
        for (kind, amount) in batch.iter() {
            self.produced.add(kind, amount);
        }
        self.overflowed.extend(report.overflowed);
    }

    fn record_consumption(&mut self, costs: Ledger, report: DebitReport) {
        self.consumed = Some(costs);
        self.drawn_from_relays = report.drawn_from_relays;
        self.short = report.short;
    }

    /// True if any gated activity fired.
    pub fn fired(&self) -> bool {
        self.produced.kinds().next().is_some() || self.consumed.is_some() || self.transfer_cycle
    }
}

/// A live, owned map region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Territory {
    id: TerritoryId,
    name: String,
    pub is_hq: bool,
    pub treasury: Treasury,
    pub route_style: RouteStyle,
    pub borders: BorderStyle,
    pub ledger: Ledger,
    production_multipliers: BTreeMap<ResourceKind, f64>,
    pub relay_queue: Vec<Transference>,
    /// Goal used when a route has to be computed.
    pub target_territory: Option<String>,
    pub bonuses: BonusLevels,
    /// Defence/attack upgrades. Carried, not used by the economy.
    pub upgrades: BTreeMap<String, u8>,
    pub connections: Vec<String>,
    timers: ActivityTimers,
    flags: ResourceFlags,
}

impl Territory {
    pub fn new(id: TerritoryId, def: &MapTerritory) -> Self {
        let upgrades = ["attack_speed", "defence", "damage", "health"]
            .iter()
            .map(|k| (k.to_string(), 1))
            .collect();
        Self {
            id,
            name: def.name.clone(),
            is_hq: false,
            treasury: Treasury::VeryLow,
            route_style: RouteStyle::default(),
            borders: BorderStyle::Closed,
            ledger: Ledger::zeroed(),
            production_multipliers: ResourceKind::ALL
                .iter()
                .map(|k| (*k, def.multiplier(*k)))
                .collect(),
            relay_queue: Vec::new(),
            target_territory: None,
            bonuses: default_bonus_levels(),
            upgrades,
            connections: def.conns.clone(),
            timers: ActivityTimers::default(),
            flags: ResourceFlags::default(),
        }
    }

    pub fn id(&self) -> TerritoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> &ResourceFlags {
        &self.flags
    }

    pub fn timers(&self) -> ActivityTimers {
        self.timers
    }

    pub fn multiplier(&self, kind: ResourceKind) -> f64 {
        self.production_multipliers.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn bonus_level(&self, key: BonusKey) -> u8 {
        self.bonuses.get(&key).copied().unwrap_or(0)
    }

    pub fn set_bonus_level(&mut self, key: BonusKey, level: u8) {
        self.bonuses.insert(key, level);
    }

    /// Case-insensitive check against the connection list.
    ///
    /// Folds case the same way the territory graph keys names.
    pub fn is_connected_to(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.connections.iter().any(|c| c.to_lowercase() == name)
    }

    /// Whether a relay passing through may be queued here.
    pub fn accepts_relays(&self, config: &EconomyConfig) -> bool {
        !(config.closed_borders_block_relays && self.borders == BorderStyle::Closed)
    }

    // Tower stats are not simulated.

    pub fn tower_damage_low(&self) -> i32 {
        0
    }

    pub fn tower_damage_high(&self) -> i32 {
        0
    }

    pub fn tower_defence(&self) -> f32 {
        0.0
    }

    pub fn tower_attack_speed(&self) -> f32 {
        0.0
    }

    pub fn tower_hp(&self) -> i32 {
        0
    }

    /// Current storage capacity per kind.
    pub fn capacity(&self, config: &EconomyConfig, catalog: &dyn BonusCatalog) -> StorageCapacity {
        let resource_pct =
            bonus_value(catalog, &self.bonuses, BonusKey::LargerResourceStorage).unwrap_or(0.0);
        let emerald_pct =
            bonus_value(catalog, &self.bonuses, BonusKey::LargerEmeraldStorage).unwrap_or(0.0);
        StorageCapacity::compute(config, resource_pct, emerald_pct, self.is_hq)
    }

    pub fn currency_interval_ms(&self, config: &EconomyConfig, catalog: &dyn BonusCatalog) -> u64 {
        interval_ms(
            config,
            bonus_value(catalog, &self.bonuses, BonusKey::EmeraldRate),
        )
    }

    pub fn resource_interval_ms(&self, config: &EconomyConfig, catalog: &dyn BonusCatalog) -> u64 {
        interval_ms(
            config,
            bonus_value(catalog, &self.bonuses, BonusKey::ResourceRate),
        )
    }

    /// Per-cycle cost of every configured bonus.
    pub fn resource_costs(&self, catalog: &dyn BonusCatalog) -> Ledger {
        aggregate_costs(catalog, &self.bonuses)
    }

    /// Credit a batch through the capacity-enforcing store algorithm.
    pub fn store(
        &mut self,
        incoming: &Ledger,
        config: &EconomyConfig,
        catalog: &dyn BonusCatalog,
    ) -> StoreReport {
        let capacity = self.capacity(config, catalog);
        ledger::store(&mut self.ledger, &mut self.flags, incoming, &capacity)
    }

    /// Debit a cost table, borrowing from queued relays when short.
    pub fn consume(&mut self, costs: &Ledger) -> DebitReport {
        ledger::debit(&mut self.ledger, &mut self.flags, &mut self.relay_queue, costs)
    }

    /// One currency production cycle. Returns the batch and its store report.
    pub fn produce_emeralds(
        &mut self,
        config: &EconomyConfig,
        catalog: &dyn BonusCatalog,
    ) -> (Ledger, StoreReport) {
        let efficiency =
            bonus_value(catalog, &self.bonuses, BonusKey::EfficientEmerald).unwrap_or(0.0);
        let amount = produced_emeralds(config, efficiency, self.multiplier(ResourceKind::Emerald));
        let batch = Ledger::from_pairs(&[(ResourceKind::Emerald, amount)]);
        let report = self.store(&batch, config, catalog);
        (batch, report)
    }

    /// One raw resource production cycle over every non-currency kind.
    pub fn produce_resources(
        &mut self,
        config: &EconomyConfig,
        catalog: &dyn BonusCatalog,
    ) -> (Ledger, StoreReport) {
        let efficiency =
            bonus_value(catalog, &self.bonuses, BonusKey::EfficientResource).unwrap_or(0.0);
        let mut batch = Ledger::new();
        for kind in ResourceKind::RAW {
            batch.add(kind, produced_resource(config, efficiency, self.multiplier(kind)));
        }
        let report = self.store(&batch, config, catalog);
        (batch, report)
    }

    /// Package the ledger and queued relays for sending.
    ///
    /// The own ledger goes out as a territory-to-HQ parcel and is then
    /// emptied, whether or not it will arrive. The headquarters keeps its own
    /// ledger, and without a headquarters nothing is packaged. Relays are
    /// always taken; fully drawn-down relays are discarded.
    pub fn begin_transfer_cycle(&mut self, headquarters: Option<TerritoryId>) -> Vec<Transference> {
        let mut outbox = Vec::new();
        if let Some(hq) = headquarters {
            if hq != self.id && !self.ledger.is_empty() {
                outbox.push(Transference::new(
                    new_token(),
                    TransferDirection::TerritoryToHq,
                    self.id,
                    hq,
                    self.ledger.clone(),
                ));
                self.ledger.clear();
            }
        }
        outbox.extend(self.relay_queue.drain(..).filter(|t| !t.is_spent()));
        outbox
    }

    /// Run every gated activity whose cooldown has elapsed at `now_ms`.
    pub fn tick(&mut self, now_ms: u64, ctx: &TickContext<'_>) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if now_ms.saturating_sub(self.timers.last_currency)
            >= self.currency_interval_ms(ctx.config, ctx.catalog)
        {
            self.timers.last_currency = now_ms;
            let (batch, report) = self.produce_emeralds(ctx.config, ctx.catalog);
            outcome.record_production(&batch, report);
        }

        if now_ms.saturating_sub(self.timers.last_resource)
            >= self.resource_interval_ms(ctx.config, ctx.catalog)
        {
            self.timers.last_resource = now_ms;
            let (batch, report) = self.produce_resources(ctx.config, ctx.catalog);
            outcome.record_production(&batch, report);
        }

        if now_ms.saturating_sub(self.timers.last_consumption) >= ctx.config.consumption_interval_ms
        {
            self.timers.last_consumption = now_ms;
            let costs = self.resource_costs(ctx.catalog);
            let report = self.consume(&costs);
            outcome.record_consumption(costs, report);
        }

        if now_ms.saturating_sub(self.timers.last_transfer) >= ctx.config.transfer_interval_ms {
            self.timers.last_transfer = now_ms;
            outcome.transfer_cycle = true;
            outcome.outbox = self.begin_transfer_cycle(ctx.headquarters);
        }

        outcome
    }
}

/// Generate a unique parcel token.
pub fn new_token() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}
