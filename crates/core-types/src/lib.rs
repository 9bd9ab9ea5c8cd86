//! # Tierwatch Core Types
//!
//! Layer 0 of the workspace. Every other crate speaks in terms of these structures:
//! market snapshots going in, rotation signals and trades coming out.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{SignalType, Tier, TradeStatus};
pub use error::CoreError;
pub use structs::{MarketSnapshot, RotationSignal, SignalMetrics, Trade, TradeExit};
