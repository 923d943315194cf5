//! Resource kinds produced, stored and consumed by territories.

use serde::{Deserialize, Serialize};

/// A kind of resource held in a territory ledger.
///
/// `Emerald` is the premium currency: it has its own production interval and
/// its own (larger) storage size. Every other kind is a raw resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ResourceKind {
    Crop = 0,
    Ore = 1,
    Emerald = 2,
    Wood = 3,
    Fish = 4,
}

impl ResourceKind {
    /// Every resource kind, in ledger order.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Crop,
        ResourceKind::Ore,
        ResourceKind::Emerald,
        ResourceKind::Wood,
        ResourceKind::Fish,
    ];

    /// The raw (non-currency) kinds.
    pub const RAW: [ResourceKind; 4] = [
        ResourceKind::Crop,
        ResourceKind::Ore,
        ResourceKind::Wood,
        ResourceKind::Fish,
    ];

    /// True for the premium currency.
    pub fn is_currency(self) -> bool {
        self == ResourceKind::Emerald
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Crop => "crop",
            ResourceKind::Ore => "ore",
            ResourceKind::Emerald => "emerald",
            ResourceKind::Wood => "wood",
            ResourceKind::Fish => "fish",
        }
    }

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(ResourceKind::Crop),
            1 => Some(ResourceKind::Ore),
            2 => Some(ResourceKind::Emerald),
            3 => Some(ResourceKind::Wood),
            4 => Some(ResourceKind::Fish),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_emerald_is_currency() {
        let currencies: Vec<_> = ResourceKind::ALL
            .iter()
            .filter(|k| k.is_currency())
            .collect();
        assert_eq!(currencies, vec![&ResourceKind::Emerald]);
    }

    #[test]
    fn test_raw_excludes_currency() {
        assert_eq!(ResourceKind::RAW.len(), ResourceKind::ALL.len() - 1);
        assert!(!ResourceKind::RAW.contains(&ResourceKind::Emerald));
    }

    #[test]
    fn test_from_u8() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(ResourceKind::from_u8(9), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ResourceKind::Emerald).unwrap();
        assert_eq!(json, "\"emerald\"");
        let kind: ResourceKind = serde_json::from_str("\"fish\"").unwrap();
        assert_eq!(kind, ResourceKind::Fish);
    }
}
