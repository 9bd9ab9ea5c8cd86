use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A market-capitalization quartile, recomputed from scratch at every timestamp.
///
/// `Large` holds the highest-capitalization quartile, `Micro` the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Large = 0,
    Mid = 1,
    Small = 2,
    Micro = 3,
}

impl Tier {
    /// Number of tiers the market is partitioned into.
    pub const COUNT: usize = 4;

    /// All tiers in index order (0 = largest).
    pub const ALL: [Tier; Tier::COUNT] = [Tier::Large, Tier::Mid, Tier::Small, Tier::Micro];

    /// The tier's position in `Tier::ALL`; used to index per-tier arrays and matrices.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self, CoreError> {
        Tier::ALL.get(index).copied().ok_or_else(|| {
            CoreError::InvalidInput("tier".to_string(), format!("{index} is not in 0..=3"))
        })
    }
}

impl TryFrom<u8> for Tier {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Tier::from_index(value as usize)
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier as u8
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// The category of a rotation signal. Only tier-to-tier rotation exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    TierRotation,
}

/// Lifecycle state of a trade. `Closed` and `Stopped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Open,
    /// Exited at or above take-profit, or force-closed at the end of the data.
    Closed,
    /// Exited at or below stop-loss.
    Stopped,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Open)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
            TradeStatus::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_index_round_trips_through_u8() {
        for tier in Tier::ALL {
            assert_eq!(Tier::try_from(u8::from(tier)).unwrap(), tier);
        }
        assert!(Tier::try_from(4u8).is_err());
    }

    #[test]
    fn only_open_is_non_terminal() {
        assert!(!TradeStatus::Open.is_terminal());
        assert!(TradeStatus::Closed.is_terminal());
        assert!(TradeStatus::Stopped.is_terminal());
    }
}
