use crate::error::DetectorError;
use crate::stats::percentile;
use chrono::{DateTime, Utc};
use core_types::{MarketSnapshot, Tier};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;

/// Assigns every snapshot a capitalization tier.
///
/// Tiers are cross-sectional: each timestamp is partitioned into quartiles of
/// `log10(market_cap)` on its own, with no memory of an asset's tier at other timestamps.
/// Returns classified copies in the original row order.
pub fn classify(snapshots: &[MarketSnapshot]) -> Result<Vec<MarketSnapshot>, DetectorError> {
    if snapshots.is_empty() {
        return Err(DetectorError::Validation("market data is empty".to_string()));
    }

    // Row indices per timestamp, so tiers can be written back in input order.
    let mut by_timestamp: BTreeMap<DateTime<Utc>, Vec<usize>> = BTreeMap::new();
    for (index, row) in snapshots.iter().enumerate() {
        by_timestamp.entry(row.timestamp).or_default().push(index);
    }

    let mut classified = snapshots.to_vec();
    for indices in by_timestamp.values() {
        let log_caps = indices
            .iter()
            .map(|&i| log_market_cap(&snapshots[i]))
            .collect::<Result<Vec<_>, _>>()?;

        for (&i, tier) in indices.iter().zip(assign_quartiles(&log_caps)) {
            classified[i].tier = Some(tier);
        }
    }

    tracing::debug!(
        rows = classified.len(),
        timestamps = by_timestamp.len(),
        "classified snapshots into tiers"
    );
    Ok(classified)
}

/// Tiers for one timestamp's `log10(market_cap)` values, in input order.
///
/// Values at or above the 75th percentile are `Large`, at or above the median `Mid`, at or
/// above the 25th percentile `Small`, and everything below `Micro`.
pub fn assign_quartiles(log_caps: &[f64]) -> Vec<Tier> {
    let mut sorted = log_caps.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let (Some(p25), Some(p50), Some(p75)) = (
        percentile(&sorted, 25.0),
        percentile(&sorted, 50.0),
        percentile(&sorted, 75.0),
    ) else {
        return Vec::new();
    };

    log_caps
        .iter()
        .map(|&value| {
            if value >= p75 {
                Tier::Large
            } else if value >= p50 {
                Tier::Mid
            } else if value >= p25 {
                Tier::Small
            } else {
                Tier::Micro
            }
        })
        .collect()
}

fn log_market_cap(row: &MarketSnapshot) -> Result<f64, DetectorError> {
    if row.market_cap <= Decimal::ZERO {
        return Err(DetectorError::Validation(format!(
            "market_cap for {} at {} must be positive, got {}",
            row.asset_id, row.timestamp, row.market_cap
        )));
    }
    row.market_cap
        .to_f64()
        .map(f64::log10)
        .ok_or_else(|| DetectorError::Validation(format!("market_cap for {} is not representable", row.asset_id)))
}
