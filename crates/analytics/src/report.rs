use core_types::Tier;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate performance of one backtest run.
///
/// All return figures are fractional (0.01 = 1%), matching `Trade::pnl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    // I. Trade-Level Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub win_rate: Decimal,

    // II. Return Distribution
    pub average_return: Decimal,
    /// Population standard deviation of trade returns.
    pub return_std: Decimal,
    /// `average_return / return_std`, or 0 when the returns do not vary.
    pub sharpe_ratio: Decimal,
    /// The single worst trade return. Not a running-equity drawdown.
    pub max_drawdown: Decimal,

    // III. Capital
    pub final_capital: Decimal,
    pub total_return: Decimal,

    // IV. Per-Tier Breakdown, indexed by `Tier::index()`
    pub tiers: [TierPerformance; Tier::COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPerformance {
    pub tier: Tier,
    pub trades: usize,
    /// `None` when the tier had no trades.
    pub mean_return: Option<Decimal>,
}

impl TierPerformance {
    pub fn empty(tier: Tier) -> Self {
        Self {
            tier,
            trades: 0,
            mean_return: None,
        }
    }
}
