use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Risk management error: {0}")]
    Risk(#[from] risk::RiskError),

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Trade lifecycle error: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),

    #[error("Market data for the backtest is empty.")]
    DataUnavailable,
}

impl From<indicatif::style::TemplateError> for BacktestError {
    fn from(error: indicatif::style::TemplateError) -> Self {
        BacktestError::ProgressBarTemplate(error.to_string())
    }
}
