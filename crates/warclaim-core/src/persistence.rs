//! Save/Load functionality for persisting claim state
//!
//! Uses bincode for binary serialization of every territory plus the engine
//! clock. The routing graph is not saved; it is rebuilt from each
//! territory's connections and treasury on load.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use warclaim_logic::config::EconomyConfig;
use warclaim_logic::ledger::Ledger;
use warclaim_logic::routing::TerritoryId;

use crate::claim::{Claim, ClaimError, ClaimServices};
use crate::engine::ClaimEngine;
use crate::territory::Territory;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of an engine and its claim
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    pub claim_name: String,
    /// Simulation time in milliseconds
    pub now_ms: u64,
    pub time_scale: f32,
    pub config: EconomyConfig,
    pub headquarters: Option<TerritoryId>,
    /// Territories in id order, including timers, flags and relay queues
    pub territories: Vec<Territory>,
    /// Accumulated upkeep requests
    pub requested_totals: Ledger,
}

/// Save the engine and its claim to a writer
pub fn save_claim<W: Write>(writer: W, engine: &ClaimEngine) -> Result<(), SaveError> {
    let claim = engine.claim();
    let save_data = SaveData {
        version: SAVE_VERSION,
        claim_name: claim.name().to_string(),
        now_ms: engine.now_ms(),
        time_scale: engine.time_scale(),
        config: claim.config().clone(),
        headquarters: claim.headquarters(),
        territories: claim.snapshot_all(),
        requested_totals: claim.requested_totals(),
    };

    bincode::serialize_into(writer, &save_data)?;
    log::info!(
        "Saved claim '{}' ({} territories) at {} ms",
        save_data.claim_name,
        save_data.territories.len(),
        save_data.now_ms
    );
    Ok(())
}

/// Load an engine from a reader, wiring in the given services
pub fn load_claim<R: Read>(reader: R, services: ClaimServices) -> Result<ClaimEngine, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let claim = Claim::from_territories(
        save_data.claim_name,
        save_data.config,
        save_data.territories,
        save_data.headquarters,
    )?
    .with_services(services);
    claim.restore_counters(save_data.requested_totals, save_data.now_ms);

    log::info!(
        "Loaded claim '{}' at {} ms",
        claim.name(),
        save_data.now_ms
    );
    Ok(ClaimEngine::resume(
        claim,
        save_data.now_ms,
        save_data.time_scale,
    ))
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    /// The saved territories do not form a valid claim
    Claim(ClaimError),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl From<ClaimError> for SaveError {
    fn from(e: ClaimError) -> Self {
        SaveError::Claim(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveError::Claim(e) => write!(f, "Invalid claim in save: {}", e),
        }
    }
}

impl std::error::Error for SaveError {}
