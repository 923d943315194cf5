//! JSON data files: territory maps, bonus tables and economy config.

use std::path::Path;

use warclaim_logic::bonuses::BonusTable;
use warclaim_logic::config::EconomyConfig;

use crate::territory::MapTerritory;

/// Error reading a data file.
#[derive(Debug)]
pub enum DataError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        DataError::Io(e)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        DataError::Json(e)
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Io(e) => write!(f, "IO error: {}", e),
            DataError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for DataError {}

/// Parse a territory map: a JSON array of territory definitions.
pub fn load_map(json: &str) -> Result<Vec<MapTerritory>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parse a bonus table keyed by bonus name.
pub fn load_bonus_table(json: &str) -> Result<BonusTable, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parse an economy config. Missing fields take their defaults.
pub fn load_config(json: &str) -> Result<EconomyConfig, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn read_map(path: impl AsRef<Path>) -> Result<Vec<MapTerritory>, DataError> {
    Ok(load_map(&std::fs::read_to_string(path)?)?)
}

pub fn read_bonus_table(path: impl AsRef<Path>) -> Result<BonusTable, DataError> {
    Ok(load_bonus_table(&std::fs::read_to_string(path)?)?)
}
