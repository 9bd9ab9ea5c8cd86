//! # Tierwatch Rotation Detector
//!
//! Cross-sectional analysis of a crypto market: assets are bucketed into four
//! capitalization tiers per timestamp, each tier is summarised, tiers are correlated,
//! and the result is scored into `RotationSignal`s describing capital moving between tiers.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** Pure computation over `MarketSnapshot` slices. The only I/O is the
//!   optional table reader in [`table`].
//! - **No tier memory:** Classification is a pure function of one timestamp's rows.
//! - **Numeric guards, not errors:** Empty tiers, zero denominators and undefined
//!   correlations all map to fixed fallback values. Only malformed input is an error.
//!
//! ## Public API
//!
//! - `classify`: assigns tiers.
//! - `tier_metrics`, `volume_anomalies`, `tier_correlations`: per-timestamp statistics.
//! - `RotationDetector`: the signal generator.
//! - `snapshots_from_frame` / `read_table`: the tabular input boundary.
//! - `summarize`: dataset totals per tier.

// Declare all the modules that constitute this crate.
pub mod correlation;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod signals;
pub mod stats;
pub mod summary;
pub mod table;
pub mod tiers;

// Re-export the key components to create a clean, public-facing API.
pub use correlation::{CorrelationMatrix, tier_correlations};
pub use error::DetectorError;
pub use frame::{MarketFrame, group_by_timestamp};
pub use metrics::{TierMetrics, tier_metrics, volume_anomalies};
pub use signals::{RotationDetector, TierSnapshot, relative_strength};
pub use summary::{MarketSummary, TierTotals, summarize};
pub use table::{read_table, snapshots_from_frame};
pub use tiers::{assign_quartiles, classify};
