//! Claim registry - the territories held by one guild.
//!
//! Each territory sits behind its own `Mutex`. Ticks and deliveries lock one
//! territory at a time and never hold a territory lock while acquiring
//! another, so territories can be ticked concurrently from worker threads.
//! The headquarters designation, the routing graph, the accounting totals
//! and the event log have their own locks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use warclaim_logic::bonuses::{BonusCatalog, BonusTable};
use warclaim_logic::config::EconomyConfig;
use warclaim_logic::ledger::Ledger;
use warclaim_logic::routing::{GraphRouter, RouteFinder, RouteStyle, TerritoryGraph, TerritoryId};

use crate::events::{EconomyEvent, EventLog};
use crate::territory::{MapTerritory, Territory, TickContext, TickOutcome, Treasury};

/// Receives the per-cycle bonus upkeep every territory requests.
pub trait ResourceAccounting {
    fn resources_requested(&self, territory: TerritoryId, costs: &Ledger);
}

/// Injected collaborators shared by every territory of a claim.
#[derive(Clone)]
pub struct ClaimServices {
    pub catalog: Arc<dyn BonusCatalog + Send + Sync>,
    pub router: Arc<dyn RouteFinder + Send + Sync>,
    /// Extra accounting sink, called after the claim's own totals update.
    pub accounting: Option<Arc<dyn ResourceAccounting + Send + Sync>>,
}

impl Default for ClaimServices {
    fn default() -> Self {
        Self {
            catalog: Arc::new(BonusTable::standard()),
            router: Arc::new(GraphRouter),
            accounting: None,
        }
    }
}

impl std::fmt::Debug for ClaimServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimServices")
            .field("accounting", &self.accounting.is_some())
            .finish_non_exhaustive()
    }
}

/// Errors building or reconfiguring a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    /// Two territories share a name (compared case-insensitively).
    DuplicateTerritory(String),
    /// A name or id does not belong to the claim.
    UnknownTerritory(String),
    /// A territory definition has a blank name.
    EmptyName,
}

impl std::fmt::Display for ClaimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimError::DuplicateTerritory(name) => write!(f, "duplicate territory: {}", name),
            ClaimError::UnknownTerritory(name) => write!(f, "unknown territory: {}", name),
            ClaimError::EmptyName => write!(f, "territory name is empty"),
        }
    }
}

impl std::error::Error for ClaimError {}

pub struct Claim {
    name: String,
    config: EconomyConfig,
    territories: Vec<Mutex<Territory>>,
    graph: RwLock<TerritoryGraph>,
    headquarters: RwLock<Option<TerritoryId>>,
    services: ClaimServices,
    requested: Mutex<Ledger>,
    events: EventLog,
    /// Latest tick time seen, used to stamp events.
    clock_ms: AtomicU64,
}

impl Claim {
    /// Build a claim from map definitions. Ids follow definition order.
    pub fn from_map(
        name: impl Into<String>,
        map: &[MapTerritory],
        config: EconomyConfig,
    ) -> Result<Self, ClaimError> {
        let territories = map
            .iter()
            .enumerate()
            .map(|(i, def)| def.instantiate(TerritoryId(i as u32)))
            .collect();
        Self::from_territories(name, config, territories, None)
    }

    /// Build a claim from live territories, e.g. restored from a save.
    ///
    /// Territories are ordered by id; ids must be contiguous from zero.
    pub fn from_territories(
        name: impl Into<String>,
        config: EconomyConfig,
        mut territories: Vec<Territory>,
        headquarters: Option<TerritoryId>,
    ) -> Result<Self, ClaimError> {
        territories.sort_by_key(|t| t.id());

        let mut graph = TerritoryGraph::new();
        for (i, territory) in territories.iter().enumerate() {
            if territory.name().trim().is_empty() {
                return Err(ClaimError::EmptyName);
            }
            if graph.id_of(territory.name()).is_some() {
                return Err(ClaimError::DuplicateTerritory(territory.name().to_string()));
            }
            if territory.id() != TerritoryId(i as u32) {
                return Err(ClaimError::UnknownTerritory(territory.id().to_string()));
            }
            graph.add_territory(territory.name());
        }
        for territory in &territories {
            for conn in &territory.connections {
                if let Some(to) = graph.id_of(conn) {
                    graph.connect(territory.id(), to);
                }
            }
            graph.set_toll(territory.id(), territory.treasury.toll());
        }

        if let Some(hq) = headquarters {
            if !graph.contains(hq) {
                return Err(ClaimError::UnknownTerritory(hq.to_string()));
            }
        }
        for territory in territories.iter_mut() {
            territory.is_hq = Some(territory.id()) == headquarters;
        }

        let name = name.into();
        log::info!(
            "Claim '{}' built with {} territories",
            name,
            territories.len()
        );

        Ok(Self {
            name,
            events: EventLog::new(config.event_log_capacity),
            config,
            territories: territories.into_iter().map(Mutex::new).collect(),
            graph: RwLock::new(graph),
            headquarters: RwLock::new(headquarters),
            services: ClaimServices::default(),
            requested: Mutex::new(Ledger::zeroed()),
            clock_ms: AtomicU64::new(0),
        })
    }

    pub fn with_services(mut self, services: ClaimServices) -> Self {
        self.services = services;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn BonusCatalog + Send + Sync>) -> Self {
        self.services.catalog = catalog;
        self
    }

    pub fn with_router(mut self, router: Arc<dyn RouteFinder + Send + Sync>) -> Self {
        self.services.router = router;
        self
    }

    pub fn with_accounting(mut self, accounting: Arc<dyn ResourceAccounting + Send + Sync>) -> Self {
        self.services.accounting = Some(accounting);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn services(&self) -> &ClaimServices {
        &self.services
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn territory_count(&self) -> usize {
        self.territories.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = TerritoryId> {
        (0..self.territories.len() as u32).map(TerritoryId)
    }

    /// Case-insensitive name lookup.
    pub fn territory_id(&self, name: &str) -> Option<TerritoryId> {
        self.read_graph().id_of(name)
    }

    pub fn territory_name(&self, id: TerritoryId) -> Option<String> {
        self.read_graph().name_of(id).map(str::to_string)
    }

    /// Latest simulation time any tick has reported.
    pub fn now_ms(&self) -> u64 {
        self.clock_ms.load(Ordering::Relaxed)
    }

    // ── Headquarters ──

    pub fn headquarters(&self) -> Option<TerritoryId> {
        *self
            .headquarters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Designate the headquarters by name.
    ///
    /// Holds the designation lock while the `is_hq` flags change. Territory
    /// locks are taken after it, never before.
    pub fn set_headquarters(&self, name: &str) -> Result<TerritoryId, ClaimError> {
        let id = self
            .territory_id(name)
            .ok_or_else(|| ClaimError::UnknownTerritory(name.to_string()))?;
        let previous = {
            let mut hq = self
                .headquarters
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let previous = hq.replace(id);
            if previous == Some(id) {
                return Ok(id);
            }
            if let Some(mut old) = previous.and_then(|prev| self.lock(prev)) {
                old.is_hq = false;
            }
            if let Some(mut new) = self.lock(id) {
                new.is_hq = true;
            }
            previous
        };

        log::info!("Claim '{}': headquarters is now {}", self.name, name);
        self.record(EconomyEvent::HeadquartersChanged {
            previous,
            current: id,
        });
        Ok(id)
    }

    /// Remove the headquarters designation.
    pub fn clear_headquarters(&self) -> Option<TerritoryId> {
        let previous = {
            let mut hq = self
                .headquarters
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let previous = hq.take();
            if let Some(mut old) = previous.and_then(|prev| self.lock(prev)) {
                old.is_hq = false;
            }
            previous
        };
        if previous.is_some() {
            log::info!("Claim '{}': headquarters cleared", self.name);
        }
        previous
    }

    // ── Territory access ──

    /// Lock one territory. A poisoned lock is recovered.
    pub(crate) fn lock(&self, id: TerritoryId) -> Option<MutexGuard<'_, Territory>> {
        self.territories
            .get(id.index())
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn with_territory<R>(&self, id: TerritoryId, f: impl FnOnce(&Territory) -> R) -> Option<R> {
        self.lock(id).map(|t| f(&t))
    }

    /// Mutate one territory under its lock.
    ///
    /// `f` must not call back into the claim for another territory.
    pub fn with_territory_mut<R>(
        &self,
        id: TerritoryId,
        f: impl FnOnce(&mut Territory) -> R,
    ) -> Option<R> {
        self.lock(id).map(|mut t| f(&mut t))
    }

    /// Clone of one territory's current state.
    pub fn snapshot(&self, id: TerritoryId) -> Option<Territory> {
        self.with_territory(id, Territory::clone)
    }

    /// Clones of every territory, in id order.
    pub fn snapshot_all(&self) -> Vec<Territory> {
        self.ids().filter_map(|id| self.snapshot(id)).collect()
    }

    /// Set or clear the funnel goal used for computed routes.
    pub fn set_target(&self, id: TerritoryId, target: Option<&str>) -> Result<(), ClaimError> {
        let target = match target {
            Some(name) => {
                let goal = self
                    .territory_id(name)
                    .ok_or_else(|| ClaimError::UnknownTerritory(name.to_string()))?;
                Some(self.territory_name(goal).unwrap_or_else(|| name.to_string()))
            }
            None => None,
        };
        self.with_territory_mut(id, |t| t.target_territory = target)
            .ok_or_else(|| ClaimError::UnknownTerritory(id.to_string()))
    }

    /// Change the treasury tier and the routing toll derived from it.
    pub fn set_treasury(&self, id: TerritoryId, treasury: Treasury) -> Result<(), ClaimError> {
        self.with_territory_mut(id, |t| t.treasury = treasury)
            .ok_or_else(|| ClaimError::UnknownTerritory(id.to_string()))?;
        self.graph
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_toll(id, treasury.toll());
        Ok(())
    }

    // ── Routing ──

    fn read_graph(&self) -> std::sync::RwLockReadGuard<'_, TerritoryGraph> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn route(&self, from: TerritoryId, to: TerritoryId, style: RouteStyle) -> Vec<TerritoryId> {
        let graph = self.read_graph();
        self.services.router.route(&graph, from, to, style)
    }

    // ── Ticking ──

    /// Tick one territory at `now_ms` and dispatch whatever it sends.
    ///
    /// Returns `None` for an unknown id.
    pub fn tick_territory(&self, id: TerritoryId, now_ms: u64) -> Option<TickOutcome> {
        self.clock_ms.fetch_max(now_ms, Ordering::Relaxed);
        let ctx = TickContext {
            config: &self.config,
            catalog: self.services.catalog.as_ref(),
            headquarters: self.headquarters(),
        };

        let (name, before, mut outcome) = {
            let mut territory = self.lock(id)?;
            let before = territory.flags().clone();
            let outcome = territory.tick(now_ms, &ctx);
            (territory.name().to_string(), before, outcome)
        };

        for &(kind, discarded) in &outcome.overflowed {
            if !before.overflow(kind) {
                log::warn!("{}: {} storage full", name, kind);
            }
            self.record(EconomyEvent::Overflow {
                territory: id,
                kind,
                discarded,
            });
        }
        for &(kind, missing) in &outcome.short {
            if !before.gap(kind) {
                log::warn!("{}: cannot cover {} upkeep ({} short)", name, kind, missing);
            }
            self.record(EconomyEvent::Shortfall {
                territory: id,
                kind,
                missing,
            });
        }
        if let Some(costs) = &outcome.consumed {
            self.notify_resources_requested(id, costs);
        }

        if outcome.transfer_cycle && ctx.headquarters.is_none() {
            log::warn!("{}: no headquarters designated, keeping stock", name);
        }
        for parcel in std::mem::take(&mut outcome.outbox) {
            let parcel_id = parcel.id.clone();
            let result = self.transfer(id, parcel);
            outcome.dispatched.push((parcel_id, result));
        }

        Some(outcome)
    }

    /// Tick every territory in id order.
    pub fn tick_all(&self, now_ms: u64) {
        for id in self.ids() {
            self.tick_territory(id, now_ms);
        }
    }

    // ── Accounting ──

    /// Record one territory's upkeep request.
    pub fn notify_resources_requested(&self, territory: TerritoryId, costs: &Ledger) {
        {
            let mut totals = self.requested.lock().unwrap_or_else(PoisonError::into_inner);
            for (kind, amount) in costs.iter() {
                totals.add(kind, amount);
            }
        }
        if !costs.is_empty() {
            self.record(EconomyEvent::ResourcesRequested {
                territory,
                costs: costs.clone(),
            });
        }
        if let Some(accounting) = &self.services.accounting {
            accounting.resources_requested(territory, costs);
        }
    }

    /// Sum of every upkeep request since the claim was built.
    pub fn requested_totals(&self) -> Ledger {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn restore_counters(&self, totals: Ledger, now_ms: u64) {
        *self.requested.lock().unwrap_or_else(PoisonError::into_inner) = totals;
        self.clock_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Sum of every territory's stock, locking one territory at a time.
    pub fn total_stock(&self) -> Ledger {
        let mut total = Ledger::zeroed();
        for id in self.ids() {
            if let Some(t) = self.lock(id) {
                for (kind, amount) in t.ledger.iter() {
                    total.add(kind, amount);
                }
            }
        }
        total
    }

    pub(crate) fn record(&self, event: EconomyEvent) {
        self.events.push(self.now_ms(), event);
    }
}

impl std::fmt::Debug for Claim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Claim")
            .field("name", &self.name)
            .field("territories", &self.territories.len())
            .field("headquarters", &self.headquarters())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warclaim_logic::bonuses::BonusKey;
    use warclaim_logic::resources::ResourceKind;

    fn map() -> Vec<MapTerritory> {
        vec![
            MapTerritory::new("Ragni").with_connections(&["Detlas"]),
            MapTerritory::new("Detlas").with_connections(&["Ragni", "Almuj"]),
            MapTerritory::new("Almuj").with_connections(&["Detlas"]),
        ]
    }

    fn claim() -> Claim {
        Claim::from_map("Test Guild", &map(), EconomyConfig::default()).unwrap()
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(TerritoryId, Ledger)>>);

    impl ResourceAccounting for Recorder {
        fn resources_requested(&self, territory: TerritoryId, costs: &Ledger) {
            self.0.lock().unwrap().push((territory, costs.clone()));
        }
    }

    #[test]
    fn test_ids_follow_map_order() {
        let claim = claim();
        assert_eq!(claim.territory_count(), 3);
        assert_eq!(claim.territory_id("almuj"), Some(TerritoryId(2)));
        assert_eq!(claim.territory_name(TerritoryId(1)).as_deref(), Some("Detlas"));
        assert_eq!(claim.headquarters(), None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut defs = map();
        defs.push(MapTerritory::new("RAGNI"));
        let err = Claim::from_map("x", &defs, EconomyConfig::default()).unwrap_err();
        assert_eq!(err, ClaimError::DuplicateTerritory("RAGNI".into()));
    }

    #[test]
    fn test_empty_name_rejected() {
        let defs = vec![MapTerritory::new("  ")];
        let err = Claim::from_map("x", &defs, EconomyConfig::default()).unwrap_err();
        assert_eq!(err, ClaimError::EmptyName);
    }

    #[test]
    fn test_set_headquarters_moves_flag() {
        let claim = claim();
        let ragni = claim.set_headquarters("ragni").unwrap();
        assert!(claim.with_territory(ragni, |t| t.is_hq).unwrap());

        let almuj = claim.set_headquarters("Almuj").unwrap();
        assert_eq!(claim.headquarters(), Some(almuj));
        assert!(!claim.with_territory(ragni, |t| t.is_hq).unwrap());
        assert!(claim.with_territory(almuj, |t| t.is_hq).unwrap());

        let events = claim.events().drain();
        assert!(events.iter().any(|e| e.event
            == EconomyEvent::HeadquartersChanged {
                previous: Some(ragni),
                current: almuj
            }));
    }

    #[test]
    fn test_racing_designations_flag_one_territory() {
        let claim = claim();
        let names = ["Ragni", "Detlas", "Almuj"];
        for round in 0..200 {
            std::thread::scope(|s| {
                for offset in 0..4 {
                    let claim = &claim;
                    s.spawn(move || {
                        let name = names[(round + offset) % names.len()];
                        claim.set_headquarters(name).unwrap();
                    });
                }
            });
            let flagged: Vec<_> = claim
                .snapshot_all()
                .into_iter()
                .filter(|t| t.is_hq)
                .map(|t| t.id())
                .collect();
            assert_eq!(flagged, claim.headquarters().into_iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_unknown_headquarters_is_error() {
        let claim = claim();
        assert_eq!(
            claim.set_headquarters("Nowhere"),
            Err(ClaimError::UnknownTerritory("Nowhere".into()))
        );
        assert_eq!(claim.headquarters(), None);
    }

    #[test]
    fn test_clear_headquarters() {
        let claim = claim();
        let hq = claim.set_headquarters("Detlas").unwrap();
        assert_eq!(claim.clear_headquarters(), Some(hq));
        assert!(!claim.with_territory(hq, |t| t.is_hq).unwrap());
        assert_eq!(claim.clear_headquarters(), None);
    }

    #[test]
    fn test_set_target_uses_canonical_name() {
        let claim = claim();
        claim.set_target(TerritoryId(0), Some("ALMUJ")).unwrap();
        let target = claim.with_territory(TerritoryId(0), |t| t.target_territory.clone());
        assert_eq!(target, Some(Some("Almuj".to_string())));
        assert!(claim.set_target(TerritoryId(0), Some("Nowhere")).is_err());
        claim.set_target(TerritoryId(0), None).unwrap();
    }

    #[test]
    fn test_treasury_changes_toll() {
        let claim = claim();
        claim.set_treasury(TerritoryId(1), Treasury::High).unwrap();
        assert_eq!(claim.read_graph().toll(TerritoryId(1)), 4);
        assert!(claim.set_treasury(TerritoryId(9), Treasury::Low).is_err());
    }

    #[test]
    fn test_accounting_accumulates_and_forwards() {
        let recorder = Arc::new(Recorder::default());
        let claim = claim().with_accounting(recorder.clone());
        claim.with_territory_mut(TerritoryId(0), |t| {
            t.set_bonus_level(BonusKey::TowerAura, 1);
        });

        claim.tick_all(1_000);
        claim.tick_all(2_000);

        assert_eq!(claim.requested_totals().get(ResourceKind::Crop), 4);
        let calls = recorder.0.lock().unwrap();
        assert_eq!(calls.len(), 6, "every territory reports every cycle");
        assert!(calls
            .iter()
            .any(|(id, costs)| *id == TerritoryId(0) && costs.get(ResourceKind::Crop) == 2));
    }

    #[test]
    fn test_tick_unknown_territory() {
        let claim = claim();
        assert!(claim.tick_territory(TerritoryId(42), 1_000).is_none());
    }

    #[test]
    fn test_shortfall_event_recorded() {
        let claim = claim();
        claim.with_territory_mut(TerritoryId(2), |t| {
            t.set_bonus_level(BonusKey::TowerVolley, 1);
        });
        claim.tick_territory(TerritoryId(2), 1_000);
        let events = claim.events().drain();
        assert!(events.iter().any(|e| matches!(
            e.event,
            EconomyEvent::Shortfall {
                territory: TerritoryId(2),
                kind: ResourceKind::Ore,
                missing: 2
            }
        )));
        assert_eq!(events[0].at_ms, 1_000);
    }
}
