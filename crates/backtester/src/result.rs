use analytics::PerformanceReport;
use core_types::Trade;
use rust_decimal::Decimal;
use serde::Serialize;

/// Everything a finished run produces. Exporters consume it read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    /// `None` when the run produced no trades.
    pub metrics: Option<PerformanceReport>,
    /// Settled trades in the order they were closed.
    pub trades: Vec<Trade>,
    pub final_capital: Decimal,
}
