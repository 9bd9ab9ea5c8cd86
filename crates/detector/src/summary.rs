use crate::error::DetectorError;
use chrono::{DateTime, Utc};
use core_types::{MarketSnapshot, Tier};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

/// Totals for the rows of one tier, across every timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierTotals {
    pub tier: Tier,
    pub rows: usize,
    pub market_cap: Decimal,
    pub volume: Decimal,
}

impl TierTotals {
    fn empty(tier: Tier) -> Self {
        Self {
            tier,
            rows: 0,
            market_cap: Decimal::ZERO,
            volume: Decimal::ZERO,
        }
    }
}

/// A dataset-level overview of a snapshot table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub rows: usize,
    pub assets: usize,
    pub timestamps: usize,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub total_market_cap: Decimal,
    pub total_volume: Decimal,
    /// Rows that carry no tier yet.
    pub unclassified: usize,
    pub tiers: [TierTotals; Tier::COUNT],
}

/// Summarises `snapshots`. Caps and volumes are summed in `Decimal`.
pub fn summarize(snapshots: &[MarketSnapshot]) -> Result<MarketSummary, DetectorError> {
    let (Some(first), Some(last)) = (
        snapshots.iter().map(|s| s.timestamp).min(),
        snapshots.iter().map(|s| s.timestamp).max(),
    ) else {
        return Err(DetectorError::Validation("market data is empty".to_string()));
    };

    let mut tiers = Tier::ALL.map(TierTotals::empty);
    let mut unclassified = 0;
    for row in snapshots {
        match row.tier {
            Some(tier) => {
                let totals = &mut tiers[tier.index()];
                totals.rows += 1;
                totals.market_cap += row.market_cap;
                totals.volume += row.total_volume;
            }
            None => unclassified += 1,
        }
    }

    let assets: HashSet<&str> = snapshots.iter().map(|s| s.asset_id.as_str()).collect();
    let timestamps: HashSet<DateTime<Utc>> = snapshots.iter().map(|s| s.timestamp).collect();

    Ok(MarketSummary {
        rows: snapshots.len(),
        assets: assets.len(),
        timestamps: timestamps.len(),
        first_timestamp: first,
        last_timestamp: last,
        total_market_cap: snapshots.iter().map(|s| s.market_cap).sum(),
        total_volume: snapshots.iter().map(|s| s.total_volume).sum(),
        unclassified,
        tiers,
    })
}
