use crate::frame::MarketFrame;
use crate::stats::{mean, pearson};
use core_types::Tier;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Symmetric tier-to-tier correlation of 24h % price change.
///
/// The diagonal is always exactly 1.0. Off-diagonal cells whose correlation is undefined
/// hold [`CorrelationMatrix::FALLBACK`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    values: [[f64; Tier::COUNT]; Tier::COUNT],
}

impl CorrelationMatrix {
    /// Value for tier pairs with too little (or non-varying) data to correlate.
    pub const FALLBACK: f64 = 0.0;

    /// The matrix before any correlation is known: identity diagonal, fallback elsewhere.
    pub fn neutral() -> Self {
        let mut values = [[Self::FALLBACK; Tier::COUNT]; Tier::COUNT];
        for (i, row) in values.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { values }
    }

    pub fn get(&self, from: Tier, to: Tier) -> f64 {
        self.values[from.index()][to.index()]
    }

    pub fn rows(&self) -> &[[f64; Tier::COUNT]; Tier::COUNT] {
        &self.values
    }

    /// Writes both (a, b) and (b, a). Diagonal cells are never overwritten.
    fn set_pair(&mut self, a: Tier, b: Tier, value: f64) {
        if a == b {
            return;
        }
        self.values[a.index()][b.index()] = value;
        self.values[b.index()][a.index()] = value;
    }
}

impl Default for CorrelationMatrix {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Correlates the tiers over a window of frames.
///
/// Each frame contributes one point per tier: the mean 24h % change of that tier's
/// members. A pair of tiers is correlated over the frames where both have members.
pub fn tier_correlations(window: &[MarketFrame<'_>]) -> CorrelationMatrix {
    let tier_means: Vec<[Option<f64>; Tier::COUNT]> = window
        .iter()
        .map(|frame| {
            Tier::ALL.map(|tier| {
                let changes: Vec<f64> = frame
                    .tier_rows(tier)
                    .map(|r| r.price_change_pct_24h.to_f64().unwrap_or(0.0))
                    .collect();
                mean(&changes)
            })
        })
        .collect();

    let mut matrix = CorrelationMatrix::neutral();
    for (i, &a) in Tier::ALL.iter().enumerate() {
        for &b in &Tier::ALL[i + 1..] {
            let (xs, ys): (Vec<f64>, Vec<f64>) = tier_means
                .iter()
                .filter_map(|point| Some((point[a.index()]?, point[b.index()]?)))
                .unzip();

            if let Some(r) = pearson(&xs, &ys) {
                matrix.set_pair(a, b, r);
            }
        }
    }
    matrix
}
