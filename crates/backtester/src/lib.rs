//! # Tierwatch Backtester
//!
//! Replays historical market snapshots against a pre-generated sequence of rotation
//! signals. Each signal buys the largest asset of its destination tier; positions leave
//! through their stop-loss or take-profit, and whatever is still open after the last
//! timestamp is closed at its last observed price.
//!
//! The loop is strictly sequential: every step sees the capital and open positions left
//! behind by the previous one.

use crate::error::BacktestError;
use analytics::AnalyticsEngine;
use chrono::{DateTime, Utc};
use configuration::Config;
use core_types::{MarketSnapshot, RotationSignal, Tier, Trade, TradeStatus};
use detector::{MarketFrame, group_by_timestamp};
use indicatif::{ProgressBar, ProgressStyle};
use risk::{RiskError, RiskLevels, RiskManager, TierRiskManager};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

pub mod error;
pub mod result;

pub use result::BacktestResult;

/// Mutable state of one run. Reset at the start of every `run_backtest`.
#[derive(Debug, Clone, Default)]
struct BacktestState {
    capital: Decimal,
    open: Vec<Trade>,
    closed: Vec<Trade>,
    next_trade_id: u64,
}

/// The main backtesting engine.
pub struct Backtester {
    // --- Context ---
    initial_capital: Decimal,
    // --- Components ---
    risk_manager: Box<dyn RiskManager>,
    analytics_engine: AnalyticsEngine,
    // --- Run state ---
    state: BacktestState,
}

impl Backtester {
    pub fn new(
        initial_capital: Decimal,
        risk_manager: Box<dyn RiskManager>,
        analytics_engine: AnalyticsEngine,
    ) -> Self {
        Self {
            initial_capital,
            risk_manager,
            analytics_engine,
            state: BacktestState {
                capital: initial_capital,
                next_trade_id: 1,
                ..BacktestState::default()
            },
        }
    }

    /// Builds a backtester with the tier-based risk manager described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, BacktestError> {
        let risk_manager = TierRiskManager::new(&config.backtest, &config.tiers)?;
        Ok(Self::new(
            config.backtest.initial_capital,
            Box::new(risk_manager),
            AnalyticsEngine::new(),
        ))
    }

    pub fn capital(&self) -> Decimal {
        self.state.capital
    }

    pub fn open_trades(&self) -> &[Trade] {
        &self.state.open
    }

    pub fn closed_trades(&self) -> &[Trade] {
        &self.state.closed
    }

    /// Position size for a new entry, based on the capital available right now.
    pub fn calculate_position_size(&self, tier: Tier, confidence: Decimal) -> Decimal {
        self.risk_manager.position_size(self.state.capital, tier, confidence)
    }

    pub fn calculate_risk_levels(
        &self,
        tier: Tier,
        entry_price: Decimal,
        volatility: Decimal,
    ) -> Result<RiskLevels, BacktestError> {
        Ok(self.risk_manager.risk_levels(tier, entry_price, volatility)?)
    }

    /// Opens a long position on `asset` at its current price.
    ///
    /// Returns `Ok(None)`, leaving all state untouched, when the position would cost more
    /// than the capital available. Volatility is the asset's 24h % change over 100.
    pub fn enter_position(
        &mut self,
        asset: &MarketSnapshot,
        tier: Tier,
        confidence: Decimal,
    ) -> Result<Option<Trade>, BacktestError> {
        let size = self.calculate_position_size(tier, confidence);
        if size > self.state.capital {
            tracing::debug!(asset = %asset.asset_id, %size, capital = %self.state.capital, "entry rejected, insufficient capital");
            return Ok(None);
        }

        let volatility = asset.price_change_pct_24h / Decimal::ONE_HUNDRED;
        let levels = self.calculate_risk_levels(tier, asset.price, volatility)?;

        let trade = Trade::open(
            self.state.next_trade_id,
            asset.timestamp,
            asset.asset_id.clone(),
            tier,
            asset.price,
            size,
            levels.stop_loss,
            levels.take_profit,
            confidence,
        );
        self.state.next_trade_id += 1;
        self.state.capital -= size;
        self.state.open.push(trade.clone());

        tracing::debug!(
            trade_id = trade.trade_id(),
            asset = %trade.asset_id(),
            %tier,
            price = %trade.entry_price(),
            %size,
            stop_loss = %trade.stop_loss(),
            take_profit = %trade.take_profit(),
            "position opened"
        );
        Ok(Some(trade))
    }

    /// Closes every open trade whose stop-loss or take-profit is hit by the prices in
    /// `frame`. The stop-loss is checked first. Trades whose asset is absent stay open.
    pub fn update_positions(&mut self, frame: &MarketFrame<'_>) -> Result<(), BacktestError> {
        let open = std::mem::take(&mut self.state.open);
        for trade in open {
            let Some(row) = frame.find_asset(trade.asset_id()) else {
                tracing::debug!(trade_id = trade.trade_id(), asset = %trade.asset_id(), timestamp = %frame.timestamp, "no price for open trade");
                self.state.open.push(trade);
                continue;
            };

            let status = if row.price <= trade.stop_loss() {
                TradeStatus::Stopped
            } else if row.price >= trade.take_profit() {
                TradeStatus::Closed
            } else {
                self.state.open.push(trade);
                continue;
            };
            self.close_trade(trade, status, frame.timestamp, row.price)?;
        }
        Ok(())
    }

    /// Runs the simulation over `data`, acting on `signals` at their timestamps.
    ///
    /// Rows without a tier are never chosen as entry targets.
    pub fn run_backtest(
        &mut self,
        data: &[MarketSnapshot],
        signals: &[RotationSignal],
    ) -> Result<BacktestResult, BacktestError> {
        if data.is_empty() {
            return Err(BacktestError::DataUnavailable);
        }
        self.reset();

        let frames = group_by_timestamp(data);
        let mut signals_by_time: BTreeMap<DateTime<Utc>, Vec<&RotationSignal>> = BTreeMap::new();
        for signal in signals {
            signals_by_time.entry(signal.timestamp).or_default().push(signal);
        }
        let mut last_prices: HashMap<&str, Decimal> = HashMap::new();

        tracing::info!(
            timestamps = frames.len(),
            signals = signals.len(),
            capital = %self.initial_capital,
            "starting backtest"
        );

        let progress_bar = ProgressBar::new(frames.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=>-"),
        );

        for frame in &frames {
            for row in &frame.rows {
                last_prices.insert(row.asset_id.as_str(), row.price);
            }

            // --- 1. EXITS ---
            self.update_positions(frame)?;

            // --- 2. ENTRIES ---
            for signal in signals_by_time.get(&frame.timestamp).into_iter().flatten() {
                if self.state.capital <= Decimal::ZERO {
                    break;
                }
                let Some(asset) = frame.largest_in_tier(signal.to_tier) else {
                    tracing::debug!(timestamp = %frame.timestamp, tier = %signal.to_tier, "no asset in destination tier");
                    continue;
                };
                match self.enter_position(asset, signal.to_tier, signal.confidence) {
                    Ok(_) => {}
                    Err(BacktestError::Risk(RiskError::InvalidEntryPrice(price))) => {
                        tracing::warn!(asset = %asset.asset_id, %price, "skipping entry on non-positive price");
                    }
                    Err(e) => return Err(e),
                }
            }
            progress_bar.inc(1);
        }

        // --- 3. TRUE-UP ---
        // `data` is non-empty, so there is always a last frame.
        if let Some(last) = frames.last() {
            self.close_remaining(last.timestamp, &last_prices)?;
        }
        progress_bar.finish_with_message("Simulation complete.");

        let metrics = self.analytics_engine.calculate(
            &self.state.closed,
            self.initial_capital,
            self.state.capital,
        )?;

        tracing::info!(
            trades = self.state.closed.len(),
            final_capital = %self.state.capital,
            "backtest complete"
        );

        Ok(BacktestResult {
            metrics,
            trades: self.state.closed.clone(),
            final_capital: self.state.capital,
        })
    }

    /// Closes every still-open trade at its asset's last observed price.
    fn close_remaining(
        &mut self,
        time: DateTime<Utc>,
        last_prices: &HashMap<&str, Decimal>,
    ) -> Result<(), BacktestError> {
        let open = std::mem::take(&mut self.state.open);
        for trade in open {
            // Every open trade was entered on a row of `data`, so its asset has a price.
            let price = last_prices
                .get(trade.asset_id())
                .copied()
                .unwrap_or(trade.entry_price());
            let status = if price <= trade.stop_loss() {
                TradeStatus::Stopped
            } else {
                TradeStatus::Closed
            };
            self.close_trade(trade, status, time, price)?;
        }
        Ok(())
    }

    fn close_trade(
        &mut self,
        trade: Trade,
        status: TradeStatus,
        time: DateTime<Utc>,
        price: Decimal,
    ) -> Result<(), BacktestError> {
        let settled = trade.settle(status, time, price)?;
        let pnl = settled.pnl().unwrap_or_default();
        self.state.capital += settled.position_size() * (Decimal::ONE + pnl);

        tracing::debug!(
            trade_id = settled.trade_id(),
            asset = %settled.asset_id(),
            %status,
            %price,
            %pnl,
            "position closed"
        );
        self.state.closed.push(settled);
        Ok(())
    }

    fn reset(&mut self) {
        self.state = BacktestState {
            capital: self.initial_capital,
            next_trade_id: 1,
            ..BacktestState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use configuration::{BacktestParams, TierParams};
    use rust_decimal_macros::dec;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap()
    }

    fn snapshot(id: &str, day: u32, price: Decimal, change: Decimal, tier: Tier) -> MarketSnapshot {
        MarketSnapshot {
            asset_id: id.to_string(),
            timestamp: at(day),
            market_cap: dec!(1000000),
            total_volume: dec!(5000),
            price,
            price_change_pct_24h: change,
            tier: Some(tier),
        }
    }

    fn backtester() -> Backtester {
        Backtester::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn entry_debits_capital_by_position_size() {
        let mut bt = backtester();
        let btc = snapshot("btc", 1, dec!(100), dec!(1), Tier::Large);

        let first = bt.enter_position(&btc, Tier::Large, dec!(0.9)).unwrap().unwrap();
        assert_eq!(first.position_size(), dec!(9000));
        assert_eq!(first.trade_id(), 1);
        assert_eq!(bt.capital(), dec!(91000));

        // Sizing follows the capital that is left.
        let second = bt.enter_position(&btc, Tier::Large, dec!(0.9)).unwrap().unwrap();
        assert_eq!(second.position_size(), dec!(8190));
        assert_eq!(second.trade_id(), 2);
        assert_eq!(bt.capital(), dec!(82810));
        assert_eq!(bt.open_trades().len(), 2);
    }

    #[test]
    fn oversized_entry_is_rejected_without_state_change() {
        let mut tiers = Tier::ALL.map(TierParams::for_tier);
        tiers[0].position_size_multiplier = dec!(1.25);
        let params = BacktestParams {
            initial_capital: dec!(1000),
            max_position_fraction: dec!(1),
        };
        let risk = TierRiskManager::new(&params, &tiers).unwrap();
        let mut bt = Backtester::new(dec!(1000), Box::new(risk), AnalyticsEngine::new());

        let btc = snapshot("btc", 1, dec!(100), dec!(1), Tier::Large);
        assert_eq!(bt.enter_position(&btc, Tier::Large, dec!(1)).unwrap(), None);
        assert_eq!(bt.capital(), dec!(1000));
        assert!(bt.open_trades().is_empty());
    }

    /// Places both exit levels on the entry price.
    struct ZeroBand;

    impl RiskManager for ZeroBand {
        fn position_size(&self, capital: Decimal, _tier: Tier, _confidence: Decimal) -> Decimal {
            capital / dec!(10)
        }

        fn risk_levels(&self, _tier: Tier, entry_price: Decimal, _volatility: Decimal) -> Result<RiskLevels, RiskError> {
            Ok(RiskLevels {
                stop_loss: entry_price,
                take_profit: entry_price,
            })
        }
    }

    #[test]
    fn stop_loss_wins_when_both_levels_are_hit() {
        let mut bt = Backtester::new(dec!(1000), Box::new(ZeroBand), AnalyticsEngine::new());
        let entry = snapshot("eth", 1, dec!(100), dec!(1), Tier::Mid);
        let trade = bt.enter_position(&entry, Tier::Mid, dec!(1)).unwrap().unwrap();
        assert_eq!(trade.stop_loss(), trade.take_profit());

        let rows = vec![snapshot("eth", 2, dec!(100), dec!(0), Tier::Mid)];
        let frames = group_by_timestamp(&rows);
        bt.update_positions(&frames[0]).unwrap();

        assert!(bt.open_trades().is_empty());
        assert_eq!(bt.closed_trades()[0].status(), TradeStatus::Stopped);
    }

    #[test]
    fn closing_credits_size_times_one_plus_pnl() {
        let mut bt = backtester();
        let entry = snapshot("sol", 1, dec!(100), dec!(1), Tier::Mid);
        let trade = bt.enter_position(&entry, Tier::Mid, dec!(1)).unwrap().unwrap();
        let before = bt.capital();

        let rows = vec![snapshot("sol", 2, dec!(100.70), dec!(0), Tier::Mid)];
        let frames = group_by_timestamp(&rows);
        bt.update_positions(&frames[0]).unwrap();

        let closed = &bt.closed_trades()[0];
        assert_eq!(closed.status(), TradeStatus::Closed);
        assert_eq!(closed.pnl(), Some(dec!(0.007)));
        assert_eq!(bt.capital(), before + trade.position_size() * dec!(1.007));
    }

    #[test]
    fn trades_without_a_price_stay_open() {
        let mut bt = backtester();
        let entry = snapshot("ada", 1, dec!(100), dec!(1), Tier::Small);
        bt.enter_position(&entry, Tier::Small, dec!(1)).unwrap();

        let rows = vec![snapshot("dot", 2, dec!(1), dec!(0), Tier::Small)];
        let frames = group_by_timestamp(&rows);
        bt.update_positions(&frames[0]).unwrap();
        assert_eq!(bt.open_trades().len(), 1);
        assert!(bt.closed_trades().is_empty());
    }

    #[test]
    fn empty_data_is_rejected() {
        assert!(matches!(
            backtester().run_backtest(&[], &[]),
            Err(BacktestError::DataUnavailable)
        ));
    }
}
