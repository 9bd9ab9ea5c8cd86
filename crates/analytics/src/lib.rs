//! # Tierwatch Analytics Engine
//!
//! Summarises the settled trades of a backtest run into a `PerformanceReport`.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** depends only on `core-types`. No I/O, no configuration.
//! - **Stateless calculation:** `AnalyticsEngine` takes trades and capital figures and
//!   returns a report. A run without trades has no report (`Ok(None)`), not an error.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: the calculator.
//! - `PerformanceReport` / `TierPerformance`: the aggregate and per-tier results.
//! - `AnalyticsError`: returned when the inputs cannot produce a meaningful report.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::{PerformanceReport, TierPerformance};
