use crate::enums::{SignalType, Tier, TradeStatus};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One asset observed at one timestamp.
///
/// `tier` is `None` until the snapshot has been through the tier classifier (or was
/// loaded from a table that already carried a `tier` column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub asset_id: String,
    pub timestamp: DateTime<Utc>,
    pub market_cap: Decimal,
    pub total_volume: Decimal,
    /// Current (close) price at this timestamp.
    pub price: Decimal,
    /// 24h price change in percent units (5.0 means +5%).
    pub price_change_pct_24h: Decimal,
    pub tier: Option<Tier>,
}

impl MarketSnapshot {
    pub fn with_tier(&self, tier: Tier) -> Self {
        Self { tier: Some(tier), ..self.clone() }
    }
}

/// The three factors blended into a signal's confidence, kept for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalMetrics {
    pub volume_factor: f64,
    pub correlation: f64,
    pub relative_strength: f64,
}

/// A scored hypothesis that capital is moving from `from_tier` into `to_tier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationSignal {
    pub timestamp: DateTime<Utc>,
    pub from_tier: Tier,
    pub to_tier: Tier,
    pub confidence: Decimal,
    pub signal_type: SignalType,
    pub metrics: SignalMetrics,
}

/// How a trade ended. Always set as a unit when the trade leaves the `Open` state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeExit {
    pub time: DateTime<Utc>,
    pub price: Decimal,
    /// Fractional return: `(exit - entry) / entry`.
    pub pnl: Decimal,
}

/// A long position opened on a rotation signal.
///
/// Every field is read-only once the trade exists. The only way out of `Open` is
/// [`Trade::settle`], which consumes the open record and returns the settled one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    trade_id: u64,
    entry_time: DateTime<Utc>,
    asset_id: String,
    tier: Tier,
    entry_price: Decimal,
    /// Currency units committed to the position.
    position_size: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
    signal_confidence: Decimal,
    status: TradeStatus,
    exit: Option<TradeExit>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        trade_id: u64,
        entry_time: DateTime<Utc>,
        asset_id: String,
        tier: Tier,
        entry_price: Decimal,
        position_size: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        signal_confidence: Decimal,
    ) -> Self {
        Self {
            trade_id,
            entry_time,
            asset_id,
            tier,
            entry_price,
            position_size,
            stop_loss,
            take_profit,
            signal_confidence,
            status: TradeStatus::Open,
            exit: None,
        }
    }

    pub fn trade_id(&self) -> u64 {
        self.trade_id
    }

    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Currency units committed to the position.
    pub fn position_size(&self) -> Decimal {
        self.position_size
    }

    pub fn stop_loss(&self) -> Decimal {
        self.stop_loss
    }

    pub fn take_profit(&self) -> Decimal {
        self.take_profit
    }

    pub fn signal_confidence(&self) -> Decimal {
        self.signal_confidence
    }

    pub fn status(&self) -> TradeStatus {
        self.status
    }

    pub fn exit(&self) -> Option<&TradeExit> {
        self.exit.as_ref()
    }

    pub fn pnl(&self) -> Option<Decimal> {
        self.exit.map(|e| e.pnl)
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Moves an open trade into a terminal status, fixing exit time, price and PnL together.
    pub fn settle(
        self,
        status: TradeStatus,
        time: DateTime<Utc>,
        price: Decimal,
    ) -> Result<Trade, CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::TradeAlreadySettled(self.trade_id));
        }
        if !status.is_terminal() {
            return Err(CoreError::InvalidExitStatus(status.to_string()));
        }
        let pnl = price
            .checked_sub(self.entry_price)
            .and_then(|change| change.checked_div(self.entry_price))
            .ok_or_else(|| {
                CoreError::Calculation(format!(
                    "trade {}: return from {} to {} is not representable",
                    self.trade_id, self.entry_price, price
                ))
            })?;
        Ok(Trade {
            status,
            exit: Some(TradeExit { time, price, pnl }),
            ..self
        })
    }
}
