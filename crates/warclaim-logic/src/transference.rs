//! In-flight resource parcels moving between territories.

use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::routing::TerritoryId;

/// Which way a parcel is flowing relative to the claim headquarters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransferDirection {
    /// Funnel toward the headquarters. The destination is re-resolved to the
    /// current headquarters every time the parcel is sent.
    TerritoryToHq = 0,
    /// Sent out from the headquarters to an explicit destination.
    HqToTerritory = 1,
}

/// A parcel of resources in motion.
///
/// The payload is owned: it is a copy taken when the parcel was created and
/// is never shared with any territory's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transference {
    /// Unique token.
    pub id: String,
    pub direction: TransferDirection,
    /// Territory that created the parcel.
    pub origin: TerritoryId,
    /// Where the parcel is headed. Referenced by identity only.
    pub destination: TerritoryId,
    pub payload: Ledger,
}

impl Transference {
    pub fn new(
        id: impl Into<String>,
        direction: TransferDirection,
        origin: TerritoryId,
        destination: TerritoryId,
        payload: Ledger,
    ) -> Self {
        Self {
            id: id.into(),
            direction,
            origin,
            destination,
            payload,
        }
    }

    /// True when nothing is left in the payload.
    pub fn is_spent(&self) -> bool {
        self.payload.is_empty()
    }
}
