use crate::settings::Config;
use rust_decimal::Decimal;

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CliOverrides {
    /// Starting capital for the simulation.
    #[arg(long)]
    pub initial_capital: Option<Decimal>,

    /// Largest fraction of capital committed to one position.
    #[arg(long)]
    pub max_position_fraction: Option<Decimal>,

    /// Minimum confidence a rotation signal must exceed.
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Number of timestamps in the correlation window.
    #[arg(long)]
    pub lookback: Option<usize>,
}

impl CliOverrides {
    /// Returns a copy of `config` with every provided override applied.
    pub fn apply(&self, config: &Config) -> Config {
        let mut config = config.clone();
        if let Some(capital) = self.initial_capital {
            config.backtest.initial_capital = capital;
        }
        if let Some(fraction) = self.max_position_fraction {
            config.backtest.max_position_fraction = fraction;
        }
        if let Some(min_confidence) = self.min_confidence {
            config.analysis.min_confidence = min_confidence;
        }
        if let Some(lookback) = self.lookback {
            config.analysis.lookback_periods = lookback;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use rust_decimal_macros::dec;

    #[test]
    fn only_provided_flags_are_applied() {
        let overrides = CliOverrides {
            min_confidence: Some(0.8),
            lookback: Some(5),
            ..CliOverrides::default()
        };
        let base = Config::default();
        let config = overrides.apply(&base);

        assert_eq!(config.analysis.min_confidence, 0.8);
        assert_eq!(config.analysis.lookback_periods, 5);
        assert_eq!(config.backtest, base.backtest);
    }

    #[test]
    fn out_of_range_fraction_fails_validation_after_apply() {
        let overrides = CliOverrides {
            max_position_fraction: Some(dec!(1.5)),
            ..CliOverrides::default()
        };
        let config = overrides.apply(&Config::default());

        assert_eq!(config.backtest.max_position_fraction, dec!(1.5));
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn overrides_parse_from_flags() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            overrides: CliOverrides,
        }

        let harness = Harness::try_parse_from(["tierwatch", "--initial-capital", "2500.50", "--lookback", "7"]).unwrap();
        assert_eq!(harness.overrides.initial_capital, Some(dec!(2500.50)));
        assert_eq!(harness.overrides.lookback, Some(7));
        assert_eq!(harness.overrides.min_confidence, None);
    }
}
