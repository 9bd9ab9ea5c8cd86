use crate::error::ConfigError;
use core_types::Tier;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its defaults, so an empty environment yields a usable config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisParams,
    pub backtest: BacktestParams,
    /// One entry per tier, indexed by `Tier::index()`.
    pub tiers: [TierParams; Tier::COUNT],
    pub logging: LoggingSettings,
}

/// Thresholds used by the rotation detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Volume z-score considered anomalous.
    pub volume_threshold: f64,
    pub correlation_threshold: f64,
    /// Signals are emitted only when confidence is strictly greater than this.
    pub min_confidence: f64,
    /// Number of timestamps in the working window used for tier correlations.
    pub lookback_periods: usize,
}

/// Contains parameters for a single backtest run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BacktestParams {
    /// The initial starting capital for the simulation.
    pub initial_capital: Decimal,
    /// Largest fraction of current capital committed to a single position (before tier
    /// and confidence scaling).
    pub max_position_fraction: Decimal,
}

/// Tier-specific sizing and risk-band multipliers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TierParams {
    pub position_size_multiplier: Decimal,
    pub stop_loss_multiplier: Decimal,
    pub take_profit_multiplier: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// Optional log file written alongside the terminal output.
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis: AnalysisParams::default(),
            backtest: BacktestParams::default(),
            tiers: Tier::ALL.map(TierParams::for_tier),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            volume_threshold: 2.0,
            correlation_threshold: 0.7,
            min_confidence: 0.6,
            lookback_periods: 30,
        }
    }
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            max_position_fraction: dec!(0.1),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl TierParams {
    /// Lower-cap tiers get smaller positions and wider stop/target bands.
    pub fn for_tier(tier: Tier) -> Self {
        let index = Decimal::from(tier.index() as u32);
        Self {
            position_size_multiplier: dec!(1.0) - index * dec!(0.15),
            stop_loss_multiplier: dec!(0.05) * (index + Decimal::ONE),
            take_profit_multiplier: dec!(0.15) * (index + Decimal::ONE),
        }
    }
}

impl Config {
    pub fn tier(&self, tier: Tier) -> &TierParams {
        &self.tiers[tier.index()]
    }

    /// Rejects parameter sets the detector and backtester cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "backtest.initial_capital must be greater than 0".to_string(),
            ));
        }
        let fraction = self.backtest.max_position_fraction;
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "backtest.max_position_fraction must be in (0, 1]".to_string(),
            ));
        }
        if self.analysis.lookback_periods == 0 {
            return Err(ConfigError::ValidationError(
                "analysis.lookback_periods must be at least 1".to_string(),
            ));
        }
        if !self.analysis.min_confidence.is_finite() {
            return Err(ConfigError::ValidationError(
                "analysis.min_confidence must be a finite number".to_string(),
            ));
        }

        for (index, params) in self.tiers.iter().enumerate() {
            if params.position_size_multiplier <= Decimal::ZERO
                || params.stop_loss_multiplier <= Decimal::ZERO
                || params.take_profit_multiplier <= Decimal::ZERO
            {
                return Err(ConfigError::ValidationError(format!(
                    "tier {index} multipliers must all be greater than 0"
                )));
            }
        }

        // Risk bands may only widen as capitalization drops.
        for pair in self.tiers.windows(2) {
            if pair[1].stop_loss_multiplier < pair[0].stop_loss_multiplier
                || pair[1].take_profit_multiplier < pair[0].take_profit_multiplier
            {
                return Err(ConfigError::ValidationError(
                    "stop-loss and take-profit multipliers must not decrease with tier".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_monotonic_in_tier() {
        let config = Config::default();
        assert_eq!(config.tier(Tier::Large).position_size_multiplier, dec!(1.0));
        assert_eq!(config.tier(Tier::Mid).stop_loss_multiplier, dec!(0.10));
        assert_eq!(config.tier(Tier::Mid).take_profit_multiplier, dec!(0.30));
        assert_eq!(config.tier(Tier::Micro).position_size_multiplier, dec!(0.55));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_position_fraction_above_one() {
        let mut config = Config::default();
        config.backtest.max_position_fraction = dec!(1.5);
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn rejects_narrowing_stop_bands() {
        let mut config = Config::default();
        config.tiers[3].stop_loss_multiplier = dec!(0.01);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_lookback() {
        let mut config = Config::default();
        config.analysis.lookback_periods = 0;
        assert!(config.validate().is_err());
    }
}
