//! Warclaim Core - live territory economy for a guild claim
//!
//! Territories produce raw resources and emeralds on cooldowns, pay bonus
//! upkeep every second, and once a minute ship their stock toward the claim
//! headquarters, hop by hop through neighbouring territories.
//!
//! # Architecture
//!
//! - **Territory**: owned state plus a tick state machine ([`territory`])
//! - **Claim**: registry of territories, each behind its own lock, with the
//!   headquarters, routing graph and injected services ([`claim`])
//! - **Transfer**: next-hop delivery of parcels between territories ([`transfer`])
//! - **Engine**: simulated clock driving every territory ([`engine`])
//!
//! Pure formulas and data types live in `warclaim_logic`.
//!
//! # Example
//!
//! ```rust,no_run
//! use warclaim_core::prelude::*;
//!
//! let map = load_map(&std::fs::read_to_string("data/territories.json").unwrap()).unwrap();
//! let claim = Claim::from_map("My Guild", &map, EconomyConfig::default()).unwrap();
//! claim.set_headquarters("Ragni").unwrap();
//!
//! let mut engine = ClaimEngine::new(claim);
//! loop {
//!     engine.update(1_000);
//!     for entry in engine.drain_events() {
//!         println!("{:?}", entry.event);
//!     }
//! }
//! ```

pub mod claim;
pub mod data;
pub mod engine;
pub mod events;
pub mod persistence;
pub mod territory;
pub mod transfer;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::claim::{Claim, ClaimError, ClaimServices, ResourceAccounting};
    pub use crate::data::{load_bonus_table, load_config, load_map};
    pub use crate::engine::ClaimEngine;
    pub use crate::events::{EconomyEvent, LoggedEvent, StallReason};
    pub use crate::territory::{BorderStyle, MapTerritory, Territory, Treasury};
    pub use crate::transfer::{Receipt, TransferOutcome};
    pub use warclaim_logic::bonuses::{BonusCatalog, BonusKey, BonusTable};
    pub use warclaim_logic::config::{EconomyConfig, UnroutablePolicy};
    pub use warclaim_logic::ledger::Ledger;
    pub use warclaim_logic::resources::ResourceKind;
    pub use warclaim_logic::routing::{GraphRouter, RouteFinder, RouteStyle, TerritoryId};
    pub use warclaim_logic::transference::{TransferDirection, Transference};
}
