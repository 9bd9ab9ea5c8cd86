use crate::RiskManager;
use crate::error::RiskError;
use configuration::{BacktestParams, TierParams};
use core_types::Tier;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Confidence is clamped into this range before it scales a position.
pub const MIN_CONFIDENCE_SCALE: Decimal = dec!(0.3);
pub const MAX_CONFIDENCE_SCALE: Decimal = dec!(1.0);

/// Volatility is clamped into this range before it sets the risk bands.
pub const MIN_VOLATILITY: Decimal = dec!(0.02);
pub const MAX_VOLATILITY: Decimal = dec!(0.15);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskLevels {
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

/// Sizes positions as a fraction of current capital, scaled by tier and signal confidence,
/// and places exit levels at a tier-dependent multiple of the asset's volatility.
#[derive(Debug, Clone)]
pub struct TierRiskManager {
    max_position_fraction: Decimal,
    tiers: [TierParams; Tier::COUNT],
}

impl TierRiskManager {
    /// Creates a new `TierRiskManager` with the given configuration parameters.
    pub fn new(backtest: &BacktestParams, tiers: &[TierParams; Tier::COUNT]) -> Result<Self, RiskError> {
        // Validate that risk parameters are logical.
        let fraction = backtest.max_position_fraction;
        if fraction <= dec!(0) || fraction > dec!(1) {
            return Err(RiskError::InvalidParameters(
                "max_position_fraction must be in (0, 1]".to_string(),
            ));
        }
        for (index, params) in tiers.iter().enumerate() {
            if params.stop_loss_multiplier <= dec!(0) || params.take_profit_multiplier <= dec!(0) {
                return Err(RiskError::InvalidParameters(format!(
                    "tier {index} stop-loss and take-profit multipliers must be greater than 0"
                )));
            }
            if params.position_size_multiplier <= dec!(0) {
                return Err(RiskError::InvalidParameters(format!(
                    "tier {index} position_size_multiplier must be greater than 0"
                )));
            }
        }
        Ok(Self {
            max_position_fraction: fraction,
            tiers: tiers.clone(),
        })
    }

    fn params(&self, tier: Tier) -> &TierParams {
        &self.tiers[tier.index()]
    }
}

impl RiskManager for TierRiskManager {
    fn position_size(&self, capital: Decimal, tier: Tier, confidence: Decimal) -> Decimal {
        // Confidence is unbounded upstream; keep it from shrinking a position to nothing
        // or inflating it past the tier allowance.
        let confidence_scale = confidence.clamp(MIN_CONFIDENCE_SCALE, MAX_CONFIDENCE_SCALE);
        capital * self.max_position_fraction * self.params(tier).position_size_multiplier * confidence_scale
    }

    fn risk_levels(
        &self,
        tier: Tier,
        entry_price: Decimal,
        volatility: Decimal,
    ) -> Result<RiskLevels, RiskError> {
        if entry_price <= dec!(0) {
            return Err(RiskError::InvalidEntryPrice(entry_price));
        }

        let params = self.params(tier);
        let volatility = volatility.clamp(MIN_VOLATILITY, MAX_VOLATILITY);
        let levels = RiskLevels {
            stop_loss: entry_price * (dec!(1) - params.stop_loss_multiplier * volatility),
            take_profit: entry_price * (dec!(1) + params.take_profit_multiplier * volatility),
        };

        tracing::trace!(%tier, %entry_price, %volatility, ?levels, "risk levels");
        Ok(levels)
    }
}
