//! Pure territory economy logic for Warclaim.
//!
//! This crate contains the economy rules that are independent of any live
//! claim, clock or runtime. Functions take plain data and return results,
//! so they can be unit-tested and reused by the simulation engine, the
//! headless harness and any game server.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`bonuses`] | Bonus keys, per-level effects, catalog lookup, cost aggregation |
//! | [`config`] | Economy configuration and validation |
//! | [`economy`] | Production amounts, storage capacities, intervals |
//! | [`ledger`] | Resource ledger, health flags, store and debit algorithms |
//! | [`resources`] | Resource kinds (raw resources and the emerald currency) |
//! | [`routing`] | Territory graph, route styles, route finder |
//! | [`transference`] | In-flight resource parcels |

pub mod bonuses;
pub mod config;
pub mod economy;
pub mod ledger;
pub mod resources;
pub mod routing;
pub mod transference;
