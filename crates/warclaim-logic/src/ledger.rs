//! Per-territory resource ledger plus the store (credit) and debit algorithms.
//!
//! The ledger is a plain keyed quantity table. Capacity is not a property of
//! the ledger itself: it is passed in to [`store`] as a [`StorageCapacity`]
//! so the same table can describe a territory's stock or a parcel payload.
//!
//! Both algorithms report through latched [`ResourceFlags`] instead of
//! returning errors. A credit that does not fit sets the overflow flag for
//! that kind; a debit that cannot be covered sets the gap flag.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::economy::StorageCapacity;
use crate::resources::ResourceKind;
use crate::transference::Transference;

/// Mapping from resource kind to stored quantity.
///
/// Missing kinds read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger(BTreeMap<ResourceKind, i64>);

impl Ledger {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// A ledger with every kind present at zero.
    pub fn zeroed() -> Self {
        Self(ResourceKind::ALL.iter().map(|k| (*k, 0)).collect())
    }

    pub fn from_pairs(pairs: &[(ResourceKind, i64)]) -> Self {
        let mut ledger = Self::new();
        for &(kind, amount) in pairs {
            ledger.add(kind, amount);
        }
        ledger
    }

    pub fn get(&self, kind: ResourceKind) -> i64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: ResourceKind, amount: i64) {
        self.0.insert(kind, amount);
    }

    pub fn add(&mut self, kind: ResourceKind, amount: i64) {
        *self.0.entry(kind).or_insert(0) += amount;
    }

    /// Iterate `(kind, amount)` pairs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, i64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.0.keys().copied()
    }

    /// True when every quantity is zero.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    /// Set every present kind to zero.
    pub fn clear(&mut self) {
        for v in self.0.values_mut() {
            *v = 0;
        }
    }
}

/// Latched health flags for a territory, tracked per resource kind.
///
/// An overflow flag is rewritten by every credit of its kind and a gap flag
/// by every debit of its kind; neither is a history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFlags {
    overflow: BTreeSet<ResourceKind>,
    gap: BTreeSet<ResourceKind>,
}

impl ResourceFlags {
    pub fn overflow(&self, kind: ResourceKind) -> bool {
        self.overflow.contains(&kind)
    }

    pub fn gap(&self, kind: ResourceKind) -> bool {
        self.gap.contains(&kind)
    }

    pub fn any_overflow(&self) -> bool {
        !self.overflow.is_empty()
    }

    pub fn any_gap(&self) -> bool {
        !self.gap.is_empty()
    }

    pub fn set_overflow(&mut self, kind: ResourceKind, on: bool) {
        if on {
            self.overflow.insert(kind);
        } else {
            self.overflow.remove(&kind);
        }
    }

    pub fn set_gap(&mut self, kind: ResourceKind, on: bool) {
        if on {
            self.gap.insert(kind);
        } else {
            self.gap.remove(&kind);
        }
    }
}

/// Outcome of a [`store`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreReport {
    /// Kinds that hit capacity, with the amount that did not fit.
    pub overflowed: Vec<(ResourceKind, i64)>,
}

/// Outcome of a [`debit`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebitReport {
    /// Amounts covered by drawing down relay payloads.
    pub drawn_from_relays: Ledger,
    /// Kinds that could not be covered, with the uncovered remainder.
    pub short: Vec<(ResourceKind, i64)>,
}

/// Credit `incoming` into `ledger`, clamping each kind to its capacity.
///
/// Every kind present in `incoming` rewrites its overflow flag, including
/// zero-amount entries. Results are floored at zero.
pub fn store(
    ledger: &mut Ledger,
    flags: &mut ResourceFlags,
    incoming: &Ledger,
    capacity: &StorageCapacity,
) -> StoreReport {
    let mut report = StoreReport::default();
    for (kind, amount) in incoming.iter() {
        let cap = capacity.for_kind(kind);
        let stored = ledger.get(kind);
        let total = stored.saturating_add(amount);
        if total > cap {
            ledger.set(kind, cap);
            flags.set_overflow(kind, true);
            report.overflowed.push((kind, total - cap));
        } else {
            ledger.set(kind, total.max(0));
            flags.set_overflow(kind, false);
        }
    }
    report
}

/// Debit `costs` from `ledger`, falling back to in-transit relay payloads.
///
/// Kinds are processed in ledger order and only for positive costs. When the
/// own stock is short, relay entries are drawn down in queue order with a
/// running remaining-deficit counter. The draw is all-or-nothing per kind:
/// if own stock plus every relay payload cannot cover the cost, nothing is
/// taken and the gap flag for that kind is set.
pub fn debit(
    ledger: &mut Ledger,
    flags: &mut ResourceFlags,
    relays: &mut [Transference],
    costs: &Ledger,
) -> DebitReport {
    let mut report = DebitReport::default();
    for (kind, cost) in costs.iter() {
        if cost <= 0 {
            continue;
        }
        let stored = ledger.get(kind).max(0);
        if stored >= cost {
            ledger.set(kind, stored - cost);
            flags.set_gap(kind, false);
            continue;
        }

        let deficit = cost - stored;
        let in_transit: i64 = relays.iter().map(|t| t.payload.get(kind).max(0)).sum();
        if in_transit < deficit {
            flags.set_gap(kind, true);
            report.short.push((kind, deficit - in_transit));
            continue;
        }

        let mut remaining = deficit;
        for relay in relays.iter_mut() {
            if remaining == 0 {
                break;
            }
            let available = relay.payload.get(kind).max(0);
            let drawn = available.min(remaining);
            if drawn > 0 {
                relay.payload.set(kind, available - drawn);
                remaining -= drawn;
            }
        }
        ledger.set(kind, 0);
        flags.set_gap(kind, false);
        report.drawn_from_relays.add(kind, deficit);
    }
    report
}
