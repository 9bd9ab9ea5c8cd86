use crate::frame::MarketFrame;
use crate::stats::{mean, std_dev};
use core_types::{MarketSnapshot, Tier};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Aggregate statistics for one tier at one timestamp.
///
/// An empty tier yields all-zero metrics rather than NaN, so downstream ratios stay defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierMetrics {
    pub tier: Tier,
    pub avg_volume: f64,
    pub avg_market_cap: f64,
    /// Sample standard deviation of the members' 24h % change.
    pub volatility: f64,
    pub volume_mcap_ratio: f64,
    pub asset_count: usize,
}

impl TierMetrics {
    fn empty(tier: Tier) -> Self {
        Self {
            tier,
            avg_volume: 0.0,
            avg_market_cap: 0.0,
            volatility: 0.0,
            volume_mcap_ratio: 0.0,
            asset_count: 0,
        }
    }
}

/// Computes `TierMetrics` for all four tiers of one frame, indexed by `Tier::index()`.
pub fn tier_metrics(frame: &MarketFrame<'_>) -> [TierMetrics; Tier::COUNT] {
    Tier::ALL.map(|tier| {
        let rows: Vec<&MarketSnapshot> = frame.tier_rows(tier).collect();
        if rows.is_empty() {
            return TierMetrics::empty(tier);
        }

        let volumes: Vec<f64> = rows.iter().map(|r| as_f64(r.total_volume)).collect();
        let caps: Vec<f64> = rows.iter().map(|r| as_f64(r.market_cap)).collect();
        let changes: Vec<f64> = rows.iter().map(|r| as_f64(r.price_change_pct_24h)).collect();
        let ratios: Vec<f64> = volumes
            .iter()
            .zip(&caps)
            .filter(|(_, cap)| **cap > 0.0)
            .map(|(volume, cap)| volume / cap)
            .collect();

        TierMetrics {
            tier,
            avg_volume: mean(&volumes).unwrap_or(0.0),
            avg_market_cap: mean(&caps).unwrap_or(0.0),
            volatility: std_dev(&changes, 1).unwrap_or(0.0),
            volume_mcap_ratio: mean(&ratios).unwrap_or(0.0),
            asset_count: rows.len(),
        }
    })
}

/// Volume anomaly score per tier: the mean z-score of the members' volumes, where each
/// volume is standardised against the whole timestamp cross-section.
///
/// Empty tiers, and frames whose volumes do not vary, score 0.
pub fn volume_anomalies(frame: &MarketFrame<'_>) -> [f64; Tier::COUNT] {
    let volumes: Vec<f64> = frame.rows.iter().map(|r| as_f64(r.total_volume)).collect();
    let (Some(center), Some(spread)) = (mean(&volumes), std_dev(&volumes, 0)) else {
        return [0.0; Tier::COUNT];
    };
    if spread == 0.0 {
        return [0.0; Tier::COUNT];
    }

    Tier::ALL.map(|tier| {
        let z_scores: Vec<f64> = frame
            .tier_rows(tier)
            .map(|r| (as_f64(r.total_volume) - center) / spread)
            .collect();
        mean(&z_scores).unwrap_or(0.0)
    })
}

fn as_f64(value: rust_decimal::Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::group_by_timestamp;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn row(id: &str, tier: Tier, cap: Decimal, volume: Decimal, change: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            asset_id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            market_cap: cap,
            total_volume: volume,
            price: dec!(1),
            price_change_pct_24h: change,
            tier: Some(tier),
        }
    }

    #[test]
    fn metrics_only_cover_rows_of_their_tier() {
        let rows = vec![
            row("a", Tier::Large, dec!(1000), dec!(100), dec!(2)),
            row("b", Tier::Large, dec!(3000), dec!(300), dec!(4)),
            row("c", Tier::Mid, dec!(100), dec!(50), dec!(-1)),
        ];
        let frames = group_by_timestamp(&rows);
        let metrics = tier_metrics(&frames[0]);

        let large = metrics[Tier::Large.index()];
        assert_eq!(large.asset_count, 2);
        assert_eq!(large.avg_volume, 200.0);
        assert_eq!(large.avg_market_cap, 2000.0);
        assert!((large.volume_mcap_ratio - 0.1).abs() < 1e-12);
        assert!((large.volatility - 2f64.sqrt()).abs() < 1e-12);

        // A single member has no sample spread.
        let mid = metrics[Tier::Mid.index()];
        assert_eq!(mid.asset_count, 1);
        assert_eq!(mid.volatility, 0.0);
        assert_eq!(mid.volume_mcap_ratio, 0.5);
    }

    #[test]
    fn empty_tiers_yield_zero_metrics() {
        let rows = vec![row("a", Tier::Large, dec!(1000), dec!(100), dec!(2))];
        let frames = group_by_timestamp(&rows);
        let metrics = tier_metrics(&frames[0]);
        assert_eq!(metrics[Tier::Micro.index()], TierMetrics::empty(Tier::Micro));
    }

    #[test]
    fn anomalies_compare_tiers_against_the_cross_section() {
        let rows = vec![
            row("a", Tier::Large, dec!(1000), dec!(10), dec!(0)),
            row("b", Tier::Mid, dec!(500), dec!(10), dec!(0)),
            row("c", Tier::Small, dec!(100), dec!(10), dec!(0)),
            row("d", Tier::Micro, dec!(10), dec!(50), dec!(0)),
        ];
        let frames = group_by_timestamp(&rows);
        let scores = volume_anomalies(&frames[0]);

        assert!(scores[Tier::Micro.index()] > 0.0);
        assert!(scores[Tier::Large.index()] < 0.0);
        let total: f64 = scores.iter().sum();
        assert!(total.abs() < 1e-12);
    }

    #[test]
    fn flat_volumes_score_zero() {
        let rows = vec![
            row("a", Tier::Large, dec!(1000), dec!(10), dec!(0)),
            row("b", Tier::Micro, dec!(10), dec!(10), dec!(0)),
        ];
        let frames = group_by_timestamp(&rows);
        assert_eq!(volume_anomalies(&frames[0]), [0.0; 4]);
    }
}
