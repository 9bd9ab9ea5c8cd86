//! # Tierwatch Risk
//!
//! Turns a rotation signal into a sized position with stop-loss and take-profit levels.
//! Lower-capitalization tiers get smaller positions and wider bands.

pub mod error;
pub mod tier_manager;

pub use error::RiskError;
pub use tier_manager::{RiskLevels, TierRiskManager};

use core_types::Tier;
use rust_decimal::Decimal;

/// Position sizing and exit-level policy used by the backtester.
///
/// `Send + Sync` so a manager can be shared by simulations running on other threads.
pub trait RiskManager: Send + Sync {
    /// Currency amount to commit to a new position given the capital currently available.
    fn position_size(&self, capital: Decimal, tier: Tier, confidence: Decimal) -> Decimal;

    /// Stop-loss and take-profit prices for a long entry at `entry_price`.
    ///
    /// `volatility` is a fraction (0.05 means 5%).
    fn risk_levels(
        &self,
        tier: Tier,
        entry_price: Decimal,
        volatility: Decimal,
    ) -> Result<RiskLevels, RiskError>;
}
