use chrono::{DateTime, Utc};
use core_types::{MarketSnapshot, Tier};
use std::collections::BTreeMap;

/// All snapshots that share one timestamp, in their original row order.
#[derive(Debug, Clone)]
pub struct MarketFrame<'a> {
    pub timestamp: DateTime<Utc>,
    pub rows: Vec<&'a MarketSnapshot>,
}

impl<'a> MarketFrame<'a> {
    /// Rows classified into `tier`. Unclassified rows never match.
    pub fn tier_rows(&self, tier: Tier) -> impl Iterator<Item = &'a MarketSnapshot> + '_ {
        self.rows.iter().copied().filter(move |row| row.tier == Some(tier))
    }

    /// The largest-capitalization row carrying `tier`; on equal caps the earlier row wins.
    pub fn largest_in_tier(&self, tier: Tier) -> Option<&'a MarketSnapshot> {
        self.tier_rows(tier).fold(None::<&'a MarketSnapshot>, |best, row| match best {
            Some(current) if current.market_cap >= row.market_cap => Some(current),
            _ => Some(row),
        })
    }

    pub fn find_asset(&self, asset_id: &str) -> Option<&'a MarketSnapshot> {
        self.rows.iter().copied().find(|row| row.asset_id == asset_id)
    }
}

/// Groups snapshots into frames ordered by ascending timestamp.
pub fn group_by_timestamp(snapshots: &[MarketSnapshot]) -> Vec<MarketFrame<'_>> {
    let mut grouped: BTreeMap<DateTime<Utc>, Vec<&MarketSnapshot>> = BTreeMap::new();
    for snapshot in snapshots {
        grouped.entry(snapshot.timestamp).or_default().push(snapshot);
    }
    grouped
        .into_iter()
        .map(|(timestamp, rows)| MarketFrame { timestamp, rows })
        .collect()
}
