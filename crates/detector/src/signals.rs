use crate::correlation::{CorrelationMatrix, tier_correlations};
use crate::error::DetectorError;
use crate::frame::{MarketFrame, group_by_timestamp};
use crate::metrics::{TierMetrics, tier_metrics, volume_anomalies};
use crate::tiers::classify;
use configuration::AnalysisParams;
use core_types::{MarketSnapshot, RotationSignal, SignalMetrics, SignalType, Tier};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::borrow::Cow;

/// Scores capital rotation between every ordered pair of tiers.
///
/// Confidence is the plain mean of three factors: the destination-minus-source volume
/// anomaly, the tier correlation, and the destination-over-source volume/cap ratio.
/// A signal is emitted only when confidence is strictly above `min_confidence`.
#[derive(Debug, Clone)]
pub struct RotationDetector {
    params: AnalysisParams,
    /// `min_confidence` in the same representation as emitted confidences.
    threshold: Decimal,
}

/// Everything the detector derived for one timestamp, for inspection and export.
#[derive(Debug, Clone)]
pub struct TierSnapshot {
    pub metrics: [TierMetrics; Tier::COUNT],
    pub anomalies: [f64; Tier::COUNT],
    pub correlations: CorrelationMatrix,
}

impl RotationDetector {
    pub fn new(params: AnalysisParams) -> Result<Self, DetectorError> {
        if params.lookback_periods == 0 {
            return Err(DetectorError::InvalidParameters(
                "lookback_periods must be at least 1".to_string(),
            ));
        }
        let threshold = Decimal::from_f64(params.min_confidence).ok_or_else(|| {
            DetectorError::InvalidParameters(format!(
                "min_confidence {} is not a finite decimal",
                params.min_confidence
            ))
        })?;
        Ok(Self { params, threshold })
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Runs one full pass over the historical data and returns every signal, ordered by
    /// timestamp and then by (from, to) tier.
    ///
    /// Rows are classified first unless every row already carries a tier.
    pub fn generate_rotation_signals(
        &self,
        snapshots: &[MarketSnapshot],
    ) -> Result<Vec<RotationSignal>, DetectorError> {
        if snapshots.is_empty() {
            return Err(DetectorError::Validation("market data is empty".to_string()));
        }
        let classified: Cow<'_, [MarketSnapshot]> = if snapshots.iter().all(|r| r.tier.is_some()) {
            Cow::Borrowed(snapshots)
        } else {
            Cow::Owned(classify(snapshots)?)
        };

        let frames = group_by_timestamp(&classified);
        let lookback = self.params.lookback_periods;

        // Each timestamp only reads its own window, so the steps are independent.
        // `collect` on an indexed parallel iterator keeps timestamp order.
        let per_step: Vec<Vec<RotationSignal>> = (0..frames.len())
            .into_par_iter()
            .map(|end| {
                let start = (end + 1).saturating_sub(lookback);
                self.evaluate(&frames[start..=end])
            })
            .collect();

        let signals: Vec<RotationSignal> = per_step.into_iter().flatten().collect();
        tracing::info!(
            timestamps = frames.len(),
            signals = signals.len(),
            min_confidence = self.params.min_confidence,
            "rotation signal pass complete"
        );
        Ok(signals)
    }

    /// Computes metrics, anomalies and correlations for the last frame of `window`.
    pub fn analyze(&self, window: &[MarketFrame<'_>]) -> Option<TierSnapshot> {
        let current = window.last()?;
        Some(TierSnapshot {
            metrics: tier_metrics(current),
            anomalies: volume_anomalies(current),
            correlations: tier_correlations(window),
        })
    }

    /// Signals for the last frame of `window`; earlier frames only feed the correlations.
    pub fn evaluate(&self, window: &[MarketFrame<'_>]) -> Vec<RotationSignal> {
        let (Some(current), Some(snapshot)) = (window.last(), self.analyze(window)) else {
            return Vec::new();
        };

        let mut signals = Vec::new();
        for from in Tier::ALL {
            for to in Tier::ALL {
                if from == to {
                    continue;
                }
                let metrics = score_pair(&snapshot, from, to);
                let blended = (metrics.volume_factor + metrics.correlation + metrics.relative_strength) / 3.0;
                if !blended.is_finite() {
                    continue;
                }
                // Compared after conversion: the stored confidence is what must clear the threshold.
                let Some(confidence) = Decimal::from_f64(blended) else {
                    tracing::warn!(%from, %to, blended, "confidence not representable as decimal, dropping signal");
                    continue;
                };
                if confidence <= self.threshold {
                    continue;
                }

                tracing::debug!(
                    timestamp = %current.timestamp,
                    %from,
                    %to,
                    %confidence,
                    volume_surge = metrics.volume_factor.abs() >= self.params.volume_threshold,
                    correlated = metrics.correlation >= self.params.correlation_threshold,
                    "rotation signal"
                );
                signals.push(RotationSignal {
                    timestamp: current.timestamp,
                    from_tier: from,
                    to_tier: to,
                    confidence,
                    signal_type: SignalType::TierRotation,
                    metrics,
                });
            }
        }
        signals
    }
}

/// The three confidence factors for capital moving `from` → `to`.
pub fn score_pair(snapshot: &TierSnapshot, from: Tier, to: Tier) -> SignalMetrics {
    let volume_factor = snapshot.anomalies[to.index()] - snapshot.anomalies[from.index()];
    let correlation = snapshot.correlations.get(from, to);
    let relative_strength = relative_strength(
        snapshot.metrics[from.index()].volume_mcap_ratio,
        snapshot.metrics[to.index()].volume_mcap_ratio,
    );
    SignalMetrics {
        volume_factor,
        correlation,
        relative_strength,
    }
}

/// Destination ratio over source ratio; 0 when the source ratio is zero or undefined.
pub fn relative_strength(source_ratio: f64, destination_ratio: f64) -> f64 {
    if source_ratio == 0.0 || !source_ratio.is_finite() {
        return 0.0;
    }
    let strength = destination_ratio / source_ratio;
    if strength.is_finite() { strength } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn detector(min_confidence: f64) -> RotationDetector {
        RotationDetector::new(AnalysisParams {
            min_confidence,
            ..AnalysisParams::default()
        })
        .unwrap()
    }

    fn coin(id: &str, day: u32, cap: Decimal, volume: Decimal, change: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            asset_id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
            market_cap: cap,
            total_volume: volume,
            price: dec!(10),
            price_change_pct_24h: change,
            tier: None,
        }
    }

    /// Eight coins per day; the two smallest trade far more than their size suggests.
    fn market(days: u32) -> Vec<MarketSnapshot> {
        let mut rows = Vec::new();
        for day in 1..=days {
            let drift = Decimal::from(day % 3);
            for i in 0..8u32 {
                let cap = dec!(1_000_000_000) / Decimal::from(10u32.pow(i / 2));
                let volume = if i >= 6 { cap * dec!(0.8) } else { cap * dec!(0.05) };
                let change = Decimal::from(i) * drift - dec!(2);
                rows.push(coin(&format!("c{i}"), day, cap, volume, change));
            }
        }
        rows
    }

    #[test]
    fn relative_strength_is_guarded_against_zero_source() {
        assert_eq!(relative_strength(0.0, 0.5), 0.0);
        assert_eq!(relative_strength(f64::NAN, 0.5), 0.0);
        assert_eq!(relative_strength(0.25, 0.5), 2.0);
    }

    #[test]
    fn empty_data_is_rejected() {
        let err = detector(0.6).generate_rotation_signals(&[]).unwrap_err();
        assert!(matches!(err, DetectorError::Validation(_)));
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let params = AnalysisParams {
            lookback_periods: 0,
            ..AnalysisParams::default()
        };
        assert!(RotationDetector::new(params).is_err());
    }

    #[test]
    fn no_signal_is_at_or_below_the_threshold() {
        for threshold in [-1.0, 0.0, 0.6, 2.0] {
            let signals = detector(threshold).generate_rotation_signals(&market(6)).unwrap();
            let floor = Decimal::from_f64(threshold).unwrap();
            assert!(signals.iter().all(|s| s.confidence > floor));
        }
    }

    #[test]
    fn confidence_rounding_onto_the_threshold_is_not_emitted() {
        // Flat volumes and a single frame zero out the anomaly and correlation factors, so
        // Large -> Mid confidence is (9/45) / (9/81) / 3, a hair above 0.6 in f64.
        let row = |id: &str, cap: Decimal, tier: Tier| MarketSnapshot {
            tier: Some(tier),
            ..coin(id, 1, cap, dec!(9), dec!(0))
        };
        let rows = vec![row("large", dec!(81), Tier::Large), row("mid", dec!(45), Tier::Mid)];

        let blended = relative_strength(9.0 / 81.0, 9.0 / 45.0) / 3.0;
        assert!(blended > 0.6);

        let signals = detector(0.6).generate_rotation_signals(&rows).unwrap();
        assert!(signals.iter().all(|s| s.confidence > dec!(0.6)));
    }

    #[test]
    fn non_finite_threshold_is_rejected() {
        let params = AnalysisParams {
            min_confidence: f64::NAN,
            ..AnalysisParams::default()
        };
        assert!(matches!(
            RotationDetector::new(params),
            Err(DetectorError::InvalidParameters(_))
        ));
    }

    #[test]
    fn surging_small_caps_attract_rotation_from_large_caps() {
        let signals = detector(0.6).generate_rotation_signals(&market(1)).unwrap();
        assert!(
            signals
                .iter()
                .any(|s| s.from_tier == Tier::Large && s.to_tier == Tier::Micro)
        );
        for signal in &signals {
            assert_ne!(signal.from_tier, signal.to_tier);
            assert_eq!(signal.signal_type, SignalType::TierRotation);
            let m = signal.metrics;
            let blended = (m.volume_factor + m.correlation + m.relative_strength) / 3.0;
            assert!((Decimal::from_f64(blended).unwrap() - signal.confidence).abs() < dec!(0.000001));
        }
    }

    #[test]
    fn signals_are_ordered_by_timestamp() {
        let signals = detector(-10.0).generate_rotation_signals(&market(5)).unwrap();
        // Every ordered pair clears a threshold this low.
        assert_eq!(signals.len(), 5 * 12);
        assert!(signals.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn repeated_passes_are_identical() {
        let detector = detector(0.0);
        let data = market(8);
        assert_eq!(
            detector.generate_rotation_signals(&data).unwrap(),
            detector.generate_rotation_signals(&data).unwrap()
        );
    }
}
