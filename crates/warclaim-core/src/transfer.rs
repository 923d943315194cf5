//! Transfer protocol - moving parcels between territories of a claim.
//!
//! `transfer` picks the next hop for a parcel held by `from` and hands it
//! over with `receive`. A direct neighbour gets the parcel without any route
//! computation. Otherwise the route finder is asked for a path toward the
//! sender's target territory (or the parcel's destination) and the parcel
//! moves one hop. Intermediate territories queue it and forward it on their
//! own next transfer cycle.
//!
//! Only one territory lock is held at a time. A parcel that cannot move is
//! handled by the configured [`UnroutablePolicy`]. Parking never grows a
//! queue per cycle: a territory's own stock is stored back under its
//! capacity, and relays merge into a held parcel bound the same way.

use warclaim_logic::config::UnroutablePolicy;
use warclaim_logic::ledger::StoreReport;
use warclaim_logic::routing::TerritoryId;
use warclaim_logic::transference::{TransferDirection, Transference};

use crate::claim::Claim;
use crate::events::{EconomyEvent, StallReason};

/// Result of one `transfer` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Stored at its destination.
    Delivered { territory: TerritoryId },
    /// Queued at an intermediate territory.
    Relayed { via: TerritoryId },
    /// The next hop refused the relay; the sender kept the parcel.
    Refused { by: TerritoryId },
    /// Held back at the sender: its own stock goes back into its ledger,
    /// a relay waits in its queue.
    Stalled(StallReason),
    Dropped(StallReason),
}

/// What `receive` did with an accepted parcel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    /// Merged into the recipient's ledger.
    Stored(StoreReport),
    /// Appended to the recipient's relay queue.
    Queued,
}

impl Claim {
    /// Move `parcel`, currently held by `from`, one step toward its goal.
    pub fn transfer(&self, from: TerritoryId, mut parcel: Transference) -> TransferOutcome {
        if parcel.direction == TransferDirection::TerritoryToHq {
            match self.headquarters() {
                Some(hq) => parcel.destination = hq,
                None => return self.unroutable(from, parcel, StallReason::NoHeadquarters),
            }
        }

        let Some(destination_name) = self.territory_name(parcel.destination) else {
            return self.unroutable(from, parcel, StallReason::UnknownDestination);
        };
        let Some((direct, style, target)) = self.with_territory(from, |t| {
            (
                t.is_connected_to(&destination_name),
                t.route_style,
                t.target_territory.clone(),
            )
        }) else {
            log::warn!("Parcel {} sent from unknown territory {}", parcel.id, from);
            return self.discard(from, parcel, StallReason::UnknownSender);
        };

        let next = if parcel.destination == from || direct {
            parcel.destination
        } else {
            let goal = self.route_goal(from, target.as_deref(), parcel.destination);
            match self.route(from, goal, style).first() {
                Some(&hop) => hop,
                None => return self.unroutable(from, parcel, StallReason::NoRoute),
            }
        };

        log::debug!(
            "Parcel {} at {} -> {} (destination {})",
            parcel.id,
            from,
            next,
            destination_name
        );
        self.hand_over(from, next, parcel)
    }

    /// Accept a parcel into `to`.
    ///
    /// The destination stores the payload; anyone else queues it. When
    /// closed borders block relays, a closed territory refuses to queue and
    /// the parcel is handed back.
    pub fn receive(&self, to: TerritoryId, parcel: Transference) -> Result<Receipt, Transference> {
        let Some(mut territory) = self.lock(to) else {
            return Err(parcel);
        };

        if territory.id() == parcel.destination {
            let report = territory.store(
                &parcel.payload,
                self.config(),
                self.services().catalog.as_ref(),
            );
            drop(territory);
            self.record_overflow(to, &report);
            return Ok(Receipt::Stored(report));
        }

        if !territory.accepts_relays(self.config()) {
            return Err(parcel);
        }
        territory.relay_queue.push(parcel);
        Ok(Receipt::Queued)
    }

    fn route_goal(
        &self,
        from: TerritoryId,
        target: Option<&str>,
        destination: TerritoryId,
    ) -> TerritoryId {
        let Some(name) = target else {
            return destination;
        };
        match self.territory_id(name) {
            Some(goal) if goal != from => goal,
            Some(_) => destination,
            None => {
                log::warn!("Territory {} targets unknown territory '{}'", from, name);
                destination
            }
        }
    }

    fn hand_over(&self, from: TerritoryId, to: TerritoryId, parcel: Transference) -> TransferOutcome {
        let parcel_id = parcel.id.clone();
        match self.receive(to, parcel) {
            Ok(Receipt::Stored(_)) => {
                self.record(EconomyEvent::Delivered {
                    parcel: parcel_id,
                    territory: to,
                });
                TransferOutcome::Delivered { territory: to }
            }
            Ok(Receipt::Queued) => {
                self.record(EconomyEvent::Relayed {
                    parcel: parcel_id,
                    via: to,
                });
                TransferOutcome::Relayed { via: to }
            }
            Err(parcel) => {
                log::warn!("Territory {} refused relay {} from {}", to, parcel_id, from);
                self.park(from, parcel);
                self.record(EconomyEvent::RelayRefused {
                    parcel: parcel_id,
                    by: to,
                    sender: from,
                });
                TransferOutcome::Refused { by: to }
            }
        }
    }

    fn unroutable(&self, at: TerritoryId, parcel: Transference, reason: StallReason) -> TransferOutcome {
        match self.config().unroutable {
            UnroutablePolicy::Park => {
                log::warn!("Parcel {} parked at {}: {}", parcel.id, at, reason);
                let parcel_id = parcel.id.clone();
                if !self.park(at, parcel) {
                    return TransferOutcome::Dropped(reason);
                }
                self.record(EconomyEvent::TransferStalled {
                    parcel: parcel_id,
                    at,
                    reason,
                });
                TransferOutcome::Stalled(reason)
            }
            UnroutablePolicy::Drop => {
                log::warn!("Parcel {} dropped at {}: {}", parcel.id, at, reason);
                self.discard(at, parcel, reason)
            }
        }
    }

    fn discard(&self, at: TerritoryId, parcel: Transference, reason: StallReason) -> TransferOutcome {
        self.record(EconomyEvent::TransferDropped {
            parcel: parcel.id,
            at,
            reason,
        });
        TransferOutcome::Dropped(reason)
    }

    /// Hold a parcel at `at`. False if `at` is unknown.
    ///
    /// A parcel `at` packed itself is stored back into its ledger, clamped
    /// to capacity. Anything else joins a queued parcel with the same
    /// direction and destination, or is appended.
    fn park(&self, at: TerritoryId, parcel: Transference) -> bool {
        let Some(mut territory) = self.lock(at) else {
            return false;
        };

        if parcel.origin == at {
            let report = territory.store(
                &parcel.payload,
                self.config(),
                self.services().catalog.as_ref(),
            );
            drop(territory);
            self.record_overflow(at, &report);
            return true;
        }

        let held = territory
            .relay_queue
            .iter()
            .position(|t| t.direction == parcel.direction && t.destination == parcel.destination);
        match held {
            Some(index) => {
                let held = &mut territory.relay_queue[index];
                for (kind, amount) in parcel.payload.iter() {
                    held.payload.add(kind, amount);
                }
            }
            None => territory.relay_queue.push(parcel),
        }
        true
    }

    fn record_overflow(&self, territory: TerritoryId, report: &StoreReport) {
        for &(kind, discarded) in &report.overflowed {
            self.record(EconomyEvent::Overflow {
                territory,
                kind,
                discarded,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warclaim_logic::config::EconomyConfig;
    use warclaim_logic::ledger::Ledger;
    use warclaim_logic::resources::ResourceKind;

    use crate::territory::{BorderStyle, MapTerritory};

    // A <-> B <-> C, D isolated
    fn claim(config: EconomyConfig) -> Claim {
        let map = vec![
            MapTerritory::new("A").with_connections(&["B"]),
            MapTerritory::new("B").with_connections(&["A", "C"]),
            MapTerritory::new("C").with_connections(&["B"]),
            MapTerritory::new("D"),
        ];
        Claim::from_map("Test", &map, config).unwrap()
    }

    fn parcel(id: &str, from: u32, to: u32, ore: i64) -> Transference {
        Transference::new(
            id,
            TransferDirection::HqToTerritory,
            TerritoryId(from),
            TerritoryId(to),
            Ledger::from_pairs(&[(ResourceKind::Ore, ore)]),
        )
    }

    fn ore(claim: &Claim, id: u32) -> i64 {
        claim
            .with_territory(TerritoryId(id), |t| t.ledger.get(ResourceKind::Ore))
            .unwrap()
    }

    fn queued(claim: &Claim, id: u32) -> Vec<String> {
        claim
            .with_territory(TerritoryId(id), |t| {
                t.relay_queue.iter().map(|p| p.id.clone()).collect()
            })
            .unwrap()
    }

    #[test]
    fn test_direct_neighbour_delivery() {
        let claim = claim(EconomyConfig::default());
        let result = claim.transfer(TerritoryId(0), parcel("p", 0, 1, 12));
        assert_eq!(result, TransferOutcome::Delivered { territory: TerritoryId(1) });
        assert_eq!(ore(&claim, 1), 12);
    }

    #[test]
    fn test_relay_queues_at_first_hop() {
        let claim = claim(EconomyConfig::default());
        let result = claim.transfer(TerritoryId(0), parcel("p", 0, 2, 12));
        assert_eq!(result, TransferOutcome::Relayed { via: TerritoryId(1) });
        assert_eq!(queued(&claim, 1), vec!["p".to_string()]);
        assert_eq!(ore(&claim, 1), 0);
    }

    #[test]
    fn test_hq_bound_parcel_follows_headquarters() {
        let claim = claim(EconomyConfig::default());
        claim.set_headquarters("B").unwrap();
        let mut p = parcel("p", 0, 3, 7);
        p.direction = TransferDirection::TerritoryToHq;
        let result = claim.transfer(TerritoryId(0), p);
        assert_eq!(result, TransferOutcome::Delivered { territory: TerritoryId(1) });
        assert_eq!(ore(&claim, 1), 7);
    }

    #[test]
    fn test_no_headquarters_parks() {
        let claim = claim(EconomyConfig::default());
        // relay from C waiting at A
        let mut p = parcel("p", 2, 1, 7);
        p.direction = TransferDirection::TerritoryToHq;
        let result = claim.transfer(TerritoryId(0), p);
        assert_eq!(result, TransferOutcome::Stalled(StallReason::NoHeadquarters));
        assert_eq!(queued(&claim, 0), vec!["p".to_string()]);
    }

    #[test]
    fn test_unreachable_parks_by_default() {
        let claim = claim(EconomyConfig::default());
        let result = claim.transfer(TerritoryId(0), parcel("p", 1, 3, 5));
        assert_eq!(result, TransferOutcome::Stalled(StallReason::NoRoute));
        assert_eq!(queued(&claim, 0), vec!["p".to_string()]);
        assert!(claim.events().drain().iter().any(|e| matches!(
            e.event,
            EconomyEvent::TransferStalled { reason: StallReason::NoRoute, .. }
        )));
    }

    #[test]
    fn test_own_parcel_returns_to_ledger() {
        let claim = claim(EconomyConfig::default());
        claim.with_territory_mut(TerritoryId(0), |t| t.ledger.set(ResourceKind::Ore, 290));
        let result = claim.transfer(TerritoryId(0), parcel("p", 0, 3, 30));
        assert_eq!(result, TransferOutcome::Stalled(StallReason::NoRoute));
        assert!(queued(&claim, 0).is_empty());
        assert_eq!(ore(&claim, 0), 300);
        assert!(claim.events().drain().iter().any(|e| matches!(
            e.event,
            EconomyEvent::Overflow {
                territory: TerritoryId(0),
                kind: ResourceKind::Ore,
                discarded: 20
            }
        )));
    }

    #[test]
    fn test_parked_relays_merge() {
        let claim = claim(EconomyConfig::default());
        claim.transfer(TerritoryId(0), parcel("p", 1, 3, 5));
        claim.transfer(TerritoryId(0), parcel("q", 2, 3, 7));
        assert_eq!(queued(&claim, 0), vec!["p".to_string()]);
        let held = claim
            .with_territory(TerritoryId(0), |t| t.relay_queue[0].payload.get(ResourceKind::Ore))
            .unwrap();
        assert_eq!(held, 12);

        // a different direction is kept apart
        claim.transfer(TerritoryId(0), {
            let mut p = parcel("r", 1, 3, 1);
            p.direction = TransferDirection::TerritoryToHq;
            p
        });
        assert_eq!(queued(&claim, 0).len(), 2);
    }

    #[test]
    fn test_unreachable_dropped_when_configured() {
        let config = EconomyConfig {
            unroutable: UnroutablePolicy::Drop,
            ..EconomyConfig::default()
        };
        let claim = claim(config);
        let result = claim.transfer(TerritoryId(0), parcel("p", 0, 3, 5));
        assert_eq!(result, TransferOutcome::Dropped(StallReason::NoRoute));
        assert!(queued(&claim, 0).is_empty());
    }

    #[test]
    fn test_closed_border_refuses_relay() {
        let config = EconomyConfig {
            closed_borders_block_relays: true,
            ..EconomyConfig::default()
        };
        let claim = claim(config);
        let result = claim.transfer(TerritoryId(0), parcel("p", 3, 2, 5));
        assert_eq!(result, TransferOutcome::Refused { by: TerritoryId(1) });
        assert_eq!(queued(&claim, 0), vec!["p".to_string()]);
        assert!(queued(&claim, 1).is_empty());

        claim.with_territory_mut(TerritoryId(1), |t| t.borders = BorderStyle::Open);
        let result = claim.transfer(TerritoryId(0), parcel("q", 0, 2, 5));
        assert_eq!(result, TransferOutcome::Relayed { via: TerritoryId(1) });
    }

    #[test]
    fn test_closed_border_still_accepts_final_delivery() {
        let config = EconomyConfig {
            closed_borders_block_relays: true,
            ..EconomyConfig::default()
        };
        let claim = claim(config);
        let result = claim.transfer(TerritoryId(0), parcel("p", 0, 1, 5));
        assert_eq!(result, TransferOutcome::Delivered { territory: TerritoryId(1) });
    }

    #[test]
    fn test_target_territory_steers_route() {
        let claim = claim(EconomyConfig::default());
        claim.set_target(TerritoryId(2), Some("B")).unwrap();
        // C is not adjacent to A, so C routes toward its target B
        let result = claim.transfer(TerritoryId(2), parcel("p", 2, 0, 5));
        assert_eq!(result, TransferOutcome::Relayed { via: TerritoryId(1) });
    }

    #[test]
    fn test_receive_at_destination_respects_capacity() {
        let claim = claim(EconomyConfig::default());
        claim.with_territory_mut(TerritoryId(1), |t| t.ledger.set(ResourceKind::Ore, 290));
        let receipt = claim.receive(TerritoryId(1), parcel("p", 0, 1, 30)).unwrap();
        match receipt {
            Receipt::Stored(report) => {
                assert_eq!(report.overflowed, vec![(ResourceKind::Ore, 20)])
            }
            Receipt::Queued => panic!("expected storage"),
        }
        assert_eq!(ore(&claim, 1), 300);
        assert!(claim
            .with_territory(TerritoryId(1), |t| t.flags().overflow(ResourceKind::Ore))
            .unwrap());
    }

    #[test]
    fn test_receive_unknown_territory_hands_back() {
        let claim = claim(EconomyConfig::default());
        let p = parcel("p", 0, 1, 1);
        let back = claim.receive(TerritoryId(99), p.clone()).unwrap_err();
        assert_eq!(back, p);
    }
}
