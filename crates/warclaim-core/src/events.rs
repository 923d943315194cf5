//! Economy events - observable record of what the claim did.
//!
//! Every notable state change (overflow, shortfall, delivery, stall, refusal,
//! headquarters change) is pushed to a bounded [`EventLog`]. When the log is
//! full the oldest entry is discarded. Consumers drain it between ticks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use warclaim_logic::ledger::Ledger;
use warclaim_logic::resources::ResourceKind;
use warclaim_logic::routing::TerritoryId;

/// Why a parcel could not be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallReason {
    /// Territory-to-HQ parcel while no headquarters is designated.
    NoHeadquarters,
    /// Destination is not part of the claim.
    UnknownDestination,
    /// No path from the holder to the routing goal.
    NoRoute,
    /// The holder is not part of the claim.
    UnknownSender,
}

impl std::fmt::Display for StallReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StallReason::NoHeadquarters => write!(f, "no headquarters"),
            StallReason::UnknownDestination => write!(f, "unknown destination"),
            StallReason::NoRoute => write!(f, "no route"),
            StallReason::UnknownSender => write!(f, "unknown sender"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EconomyEvent {
    /// Stock hit capacity; `discarded` units were lost.
    Overflow {
        territory: TerritoryId,
        kind: ResourceKind,
        discarded: i64,
    },
    /// Consumption could not be covered.
    Shortfall {
        territory: TerritoryId,
        kind: ResourceKind,
        missing: i64,
    },
    /// A territory reported its bonus upkeep to the claim.
    ResourcesRequested {
        territory: TerritoryId,
        costs: Ledger,
    },
    /// Parcel stored at its destination.
    Delivered {
        parcel: String,
        territory: TerritoryId,
    },
    /// Parcel queued at an intermediate territory.
    Relayed {
        parcel: String,
        via: TerritoryId,
    },
    /// Parcel parked in the holder's relay queue for a later cycle.
    TransferStalled {
        parcel: String,
        at: TerritoryId,
        reason: StallReason,
    },
    /// Parcel discarded.
    TransferDropped {
        parcel: String,
        at: TerritoryId,
        reason: StallReason,
    },
    /// A closed border refused to queue a relay; the sender kept it.
    RelayRefused {
        parcel: String,
        by: TerritoryId,
        sender: TerritoryId,
    },
    HeadquartersChanged {
        previous: Option<TerritoryId>,
        current: TerritoryId,
    },
}

/// An event stamped with the simulation time it was recorded at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub at_ms: u64,
    pub event: EconomyEvent,
}

/// Bounded, thread-safe event buffer.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    entries: Mutex<VecDeque<LoggedEvent>>,
    discarded: AtomicU64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            discarded: AtomicU64::new(0),
        }
    }

    pub fn push(&self, at_ms: u64, event: EconomyEvent) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
        entries.push_back(LoggedEvent { at_ms, event });
    }

    /// Remove and return every buffered event, oldest first.
    pub fn drain(&self) -> Vec<LoggedEvent> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.drain(..).collect()
    }

    /// Copy of the buffered events without removing them.
    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events lost to the capacity limit since creation.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stall(n: u32) -> EconomyEvent {
        EconomyEvent::TransferStalled {
            parcel: format!("p{n}"),
            at: TerritoryId(n),
            reason: StallReason::NoRoute,
        }
    }

    #[test]
    fn test_drain_returns_in_order() {
        let log = EventLog::new(8);
        log.push(10, stall(1));
        log.push(20, stall(2));
        let events = log.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].at_ms, 10);
        assert_eq!(events[1].event, stall(2));
        assert!(log.is_empty());
    }

    #[test]
    fn test_oldest_discarded_when_full() {
        let log = EventLog::new(2);
        for n in 0..5 {
            log.push(n as u64, stall(n));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.discarded(), 3);
        let events = log.snapshot();
        assert_eq!(events[0].event, stall(3));
        assert_eq!(events[1].event, stall(4));
        assert_eq!(log.len(), 2, "snapshot must not drain");
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let log = EventLog::new(0);
        assert_eq!(log.capacity(), 1);
        log.push(0, stall(0));
        log.push(1, stall(1));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_concurrent_pushes() {
        let log = EventLog::new(10_000);
        std::thread::scope(|s| {
            for worker in 0..4 {
                let log = &log;
                s.spawn(move || {
                    for n in 0..100 {
                        log.push(n, stall(worker));
                    }
                });
            }
        });
        assert_eq!(log.len(), 400);
    }
}
