use crate::error::AnalyticsError;
use crate::report::{PerformanceReport, TierPerformance};
use core_types::{Tier, Trade};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// A stateless calculator for deriving performance metrics from settled trades.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `trades` - The trades of a run. Trades that are still open carry no return and
    ///   are ignored.
    /// * `initial_capital` - The starting capital of the run.
    /// * `final_capital` - Capital after every trade has been settled.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when there are no settled trades, otherwise the `PerformanceReport`.
    pub fn calculate(
        &self,
        trades: &[Trade],
        initial_capital: Decimal,
        final_capital: Decimal,
    ) -> Result<Option<PerformanceReport>, AnalyticsError> {
        let settled: Vec<(Tier, Decimal)> = trades
            .iter()
            .filter_map(|t| t.pnl().map(|pnl| (t.tier(), pnl)))
            .collect();
        if settled.is_empty() {
            return Ok(None);
        }
        if initial_capital <= Decimal::ZERO {
            return Err(AnalyticsError::Calculation(format!(
                "initial capital must be positive to compute a total return, got {initial_capital}"
            )));
        }

        let returns: Vec<Decimal> = settled.iter().map(|&(_, pnl)| pnl).collect();
        let count = Decimal::from(returns.len());

        // --- 1. Trade-level statistics ---
        let winning_trades = returns.iter().filter(|r| **r > Decimal::ZERO).count();
        let win_rate = Decimal::from(winning_trades) / count;

        // --- 2. Return distribution ---
        let average_return = returns.iter().sum::<Decimal>() / count;
        let return_std = population_std(&returns, average_return)?;
        let sharpe_ratio = if return_std.is_zero() {
            Decimal::ZERO
        } else {
            average_return / return_std
        };
        let max_drawdown = returns.iter().copied().min().unwrap_or_default();

        // --- 3. Capital ---
        let total_return = (final_capital - initial_capital) / initial_capital;

        // --- 4. Per-tier breakdown ---
        let tiers = Tier::ALL.map(|tier| {
            let tier_returns: Vec<Decimal> = settled
                .iter()
                .filter(|(t, _)| *t == tier)
                .map(|&(_, pnl)| pnl)
                .collect();
            if tier_returns.is_empty() {
                return TierPerformance::empty(tier);
            }
            TierPerformance {
                tier,
                trades: tier_returns.len(),
                mean_return: Some(tier_returns.iter().sum::<Decimal>() / Decimal::from(tier_returns.len())),
            }
        });

        let report = PerformanceReport {
            total_trades: returns.len(),
            winning_trades,
            win_rate,
            average_return,
            return_std,
            sharpe_ratio,
            max_drawdown,
            final_capital,
            total_return,
            tiers,
        };

        tracing::debug!(
            trades = report.total_trades,
            win_rate = %report.win_rate,
            sharpe = %report.sharpe_ratio,
            total_return = %report.total_return,
            "performance report calculated"
        );
        Ok(Some(report))
    }
}

fn population_std(returns: &[Decimal], mean: Decimal) -> Result<Decimal, AnalyticsError> {
    let variance = returns
        .iter()
        .map(|r| (*r - mean) * (*r - mean))
        .sum::<Decimal>()
        / Decimal::from(returns.len());

    if variance <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    variance
        .sqrt()
        .ok_or_else(|| AnalyticsError::Calculation("failed to take the square root of the return variance".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::TradeStatus;
    use rust_decimal_macros::dec;

    fn settled(id: u64, tier: Tier, exit_price: Decimal) -> Trade {
        let entry = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let status = if exit_price < dec!(100) { TradeStatus::Stopped } else { TradeStatus::Closed };
        Trade::open(id, entry, format!("asset-{id}"), tier, dec!(100), dec!(1000), dec!(95), dec!(110), dec!(0.8))
            .settle(status, exit, exit_price)
            .unwrap()
    }

    #[test]
    fn no_trades_means_no_report() {
        let engine = AnalyticsEngine::new();
        assert_eq!(engine.calculate(&[], dec!(100000), dec!(100000)), Ok(None));
    }

    #[test]
    fn open_trades_are_ignored() {
        let open = Trade::open(
            1,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            "btc".into(),
            Tier::Large,
            dec!(100),
            dec!(1000),
            dec!(95),
            dec!(110),
            dec!(0.8),
        );
        assert_eq!(AnalyticsEngine::new().calculate(&[open], dec!(1000), dec!(0)), Ok(None));
    }

    #[test]
    fn aggregates_returns() {
        // Returns: +0.10, -0.05, +0.10, -0.03
        let trades = vec![
            settled(1, Tier::Large, dec!(110)),
            settled(2, Tier::Large, dec!(95)),
            settled(3, Tier::Micro, dec!(110)),
            settled(4, Tier::Small, dec!(97)),
        ];
        let report = AnalyticsEngine::new()
            .calculate(&trades, dec!(100000), dec!(101200))
            .unwrap()
            .unwrap();

        assert_eq!(report.total_trades, 4);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.win_rate, dec!(0.5));
        assert_eq!(report.average_return, dec!(0.03));
        assert_eq!(report.max_drawdown, dec!(-0.05));
        assert_eq!(report.final_capital, dec!(101200));
        assert_eq!(report.total_return, dec!(0.012));

        // Population variance: (0.0049 + 0.0064 + 0.0049 + 0.0036) / 4 = 0.00495
        let expected_std = dec!(0.00495).sqrt().unwrap();
        assert!((report.return_std - expected_std).abs() < dec!(0.000000001));
        assert!((report.sharpe_ratio - dec!(0.03) / expected_std).abs() < dec!(0.000001));

        let large = report.tiers[Tier::Large.index()];
        assert_eq!(large.trades, 2);
        assert_eq!(large.mean_return, Some(dec!(0.025)));
        assert_eq!(report.tiers[Tier::Small.index()].mean_return, Some(dec!(-0.03)));
        assert_eq!(report.tiers[Tier::Mid.index()], TierPerformance::empty(Tier::Mid));
    }

    #[test]
    fn flat_returns_have_zero_sharpe() {
        let trades = vec![settled(1, Tier::Mid, dec!(102)), settled(2, Tier::Mid, dec!(102))];
        let report = AnalyticsEngine::new()
            .calculate(&trades, dec!(1000), dec!(1040))
            .unwrap()
            .unwrap();
        assert_eq!(report.return_std, Decimal::ZERO);
        assert_eq!(report.sharpe_ratio, Decimal::ZERO);
        assert_eq!(report.win_rate, dec!(1));
    }

    #[test]
    fn break_even_trades_are_not_wins() {
        let trades = vec![settled(1, Tier::Mid, dec!(100))];
        let report = AnalyticsEngine::new()
            .calculate(&trades, dec!(1000), dec!(1000))
            .unwrap()
            .unwrap();
        assert_eq!(report.winning_trades, 0);
    }

    #[test]
    fn non_positive_initial_capital_is_an_error() {
        let trades = vec![settled(1, Tier::Mid, dec!(101))];
        assert!(AnalyticsEngine::new().calculate(&trades, dec!(0), dec!(10)).is_err());
    }
}
