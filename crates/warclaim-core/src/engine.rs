//! Claim engine - drives a claim on a simulated clock

use std::io::{Read, Write};

use warclaim_logic::ledger::Ledger;

use crate::claim::Claim;
use crate::events::LoggedEvent;
use crate::persistence::{load_claim, save_claim, SaveError};

/// Main simulation engine for one claim
pub struct ClaimEngine {
    /// Territory registry, HQ and services
    claim: Claim,
    /// Simulation time in milliseconds since start
    now_ms: u64,
    /// Number of `update` calls so far
    updates: u64,
    time_scale: f32,
}

impl ClaimEngine {
    pub fn new(claim: Claim) -> Self {
        Self::resume(claim, 0, 1.0)
    }

    /// Continue a claim from a known clock, e.g. after loading a save.
    pub fn resume(claim: Claim, now_ms: u64, time_scale: f32) -> Self {
        Self {
            claim,
            now_ms,
            updates: 0,
            time_scale: time_scale.max(0.0),
        }
    }

    fn advance(&mut self, delta_ms: u64) -> u64 {
        let scaled = (delta_ms as f64 * self.time_scale as f64) as u64;
        self.now_ms = self.now_ms.saturating_add(scaled);
        self.updates += 1;
        self.now_ms
    }

    /// Advance the clock by `delta_ms` (scaled) and tick every territory once
    pub fn update(&mut self, delta_ms: u64) {
        let now = self.advance(delta_ms);
        self.claim.tick_all(now);
    }

    /// Like `update`, but ticks territories from `workers` scoped threads.
    ///
    /// Each territory is still ticked exactly once per call.
    pub fn update_parallel(&mut self, delta_ms: u64, workers: usize) {
        let now = self.advance(delta_ms);
        let ids: Vec<_> = self.claim.ids().collect();
        if ids.is_empty() {
            return;
        }
        let chunk = ids.len().div_ceil(workers.max(1));
        let claim = &self.claim;
        std::thread::scope(|s| {
            for part in ids.chunks(chunk) {
                s.spawn(move || {
                    for &id in part {
                        claim.tick_territory(id, now);
                    }
                });
            }
        });
    }

    /// Repeat `update` in steps of `step_ms` until `duration_ms` has passed
    pub fn run_for(&mut self, duration_ms: u64, step_ms: u64) {
        let step_ms = step_ms.max(1);
        let mut elapsed = 0;
        while elapsed < duration_ms {
            let step = step_ms.min(duration_ms - elapsed);
            self.update(step);
            elapsed += step;
        }
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Current simulation time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    pub fn into_claim(self) -> Claim {
        self.claim
    }

    pub fn territory_count(&self) -> usize {
        self.claim.territory_count()
    }

    /// Stock summed over every territory
    pub fn total_stock(&self) -> Ledger {
        self.claim.total_stock()
    }

    /// Take every buffered economy event
    pub fn drain_events(&self) -> Vec<LoggedEvent> {
        self.claim.events().drain()
    }

    /// Save engine state to a writer
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        save_claim(writer, self)
    }

    /// Load engine state from a reader, keeping this claim's services
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let loaded = load_claim(reader, self.claim.services().clone())?;
        *self = loaded;
        Ok(())
    }
}

impl std::fmt::Debug for ClaimEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimEngine")
            .field("claim", &self.claim)
            .field("now_ms", &self.now_ms)
            .field("time_scale", &self.time_scale)
            .finish()
    }
}
