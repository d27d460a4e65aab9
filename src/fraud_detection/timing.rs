use tracing::{debug, warn};

use crate::config::TimingConfig;
use crate::types::{RiskSignal, SignalSource};

/// Bot-likelihood scoring from interaction timestamps captured during form
/// completion.
///
/// Missing or empty timing data is neutral: assistive-technology users and
/// clients that cannot capture events are never penalized for it. Only a
/// recorded sequence that looks machine-driven contributes weight.
pub struct TimingAnalyzer {
    config: TimingConfig,
}

impl TimingAnalyzer {
    pub fn new(config: TimingConfig) -> Self {
        Self { config }
    }

    /// Analyze an ordered sequence of millisecond timestamps.
    pub fn analyze(&self, timings: Option<&[i64]>) -> Vec<RiskSignal> {
        let timings = match timings {
            Some(t) if !t.is_empty() => t,
            _ => return Vec::new(),
        };

        if timings.len() < 2 {
            return vec![RiskSignal::advisory(
                SignalSource::Timing,
                25,
                "only a single interaction event was recorded",
            )];
        }

        let deltas: Vec<i64> = timings.windows(2).map(|w| w[1] - w[0]).collect();
        if deltas.iter().any(|d| *d <= 0) {
            // Non-monotonic clocks happen on real devices; treat as unusable
            // rather than suspicious.
            warn!("non-monotonic interaction timestamps, skipping timing analysis");
            return Vec::new();
        }

        let mut signals = Vec::new();

        if deltas.iter().all(|d| *d < self.config.min_reaction_ms) {
            signals.push(RiskSignal::advisory(
                SignalSource::Timing,
                25,
                "interaction cadence is faster than human reaction time",
            ));
        }

        if deltas.len() >= 2 {
            let mean = deltas.iter().sum::<i64>() as f64 / deltas.len() as f64;
            let variance = deltas
                .iter()
                .map(|d| {
                    let diff = *d as f64 - mean;
                    diff * diff
                })
                .sum::<f64>()
                / deltas.len() as f64;

            if variance < self.config.variance_epsilon {
                debug!(variance, "uniform interaction cadence");
                signals.push(RiskSignal::advisory(
                    SignalSource::Timing,
                    25,
                    "interaction timing is suspiciously uniform",
                ));
            }
        }

        let total = timings[timings.len() - 1] - timings[0];
        if total < self.config.min_total_ms {
            signals.push(RiskSignal::advisory(
                SignalSource::Timing,
                20,
                "form completed implausibly fast",
            ));
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> TimingAnalyzer {
        TimingAnalyzer::new(TimingConfig::default())
    }

    #[test]
    fn absent_timing_is_neutral() {
        assert!(analyzer().analyze(None).is_empty());
        assert!(analyzer().analyze(Some(&[])).is_empty());
    }

    #[test]
    fn single_event_is_bot_like() {
        let signals = analyzer().analyze(Some(&[1_000]));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].weight, 25);
    }

    #[test]
    fn human_cadence_is_clean() {
        // Irregular multi-second gaps, > 3s total.
        let signals = analyzer().analyze(Some(&[0, 1_800, 3_100, 6_400, 9_700]));
        assert!(signals.is_empty(), "{:?}", signals);
    }

    #[test]
    fn sub_reaction_deltas_are_flagged() {
        let signals = analyzer().analyze(Some(&[0, 90, 170, 260]));
        assert!(signals
            .iter()
            .any(|s| s.message.contains("faster than human reaction")));
    }

    #[test]
    fn uniform_cadence_is_flagged_even_when_slow() {
        // 500 ms like clockwork: above the reaction threshold but zero variance.
        let signals = analyzer().analyze(Some(&[0, 500, 1_000, 1_500, 2_000, 2_500, 3_000]));
        assert!(signals
            .iter()
            .any(|s| s.message.contains("suspiciously uniform")));
        assert!(!signals
            .iter()
            .any(|s| s.message.contains("faster than human reaction")));
    }

    #[test]
    fn fast_total_span_is_flagged() {
        let signals = analyzer().analyze(Some(&[0, 400, 1_900]));
        assert!(signals
            .iter()
            .any(|s| s.message.contains("implausibly fast")));
    }

    #[test]
    fn non_monotonic_timestamps_are_neutral() {
        let signals = analyzer().analyze(Some(&[5_000, 4_000, 6_000]));
        assert!(signals.is_empty());
    }
}
