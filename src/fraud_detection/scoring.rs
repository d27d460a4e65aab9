use tracing::debug;

use crate::types::{Decision, RiskAssessment, RiskSignal, SignalSeverity};

/// Score below which a submission is allowed without comment
const ALLOW_BELOW: i32 = 25;

/// Score at or above which phone verification is required
const VERIFY_AT: i32 = 50;

/// Aggregates every collected signal into a composite score and decision.
///
/// Soft signals sum (proximity consistency may subtract) and the total is
/// clamped to [0, 100]. Any blocking signal forces `Block` regardless of
/// score; the block is final for the submission.
pub struct RiskScoringEngine;

impl RiskScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, signals: Vec<RiskSignal>) -> RiskAssessment {
        let sum: i32 = signals.iter().map(|s| i32::from(s.weight)).sum();
        let score = sum.clamp(0, 100) as u8;

        let hard_fail = signals
            .iter()
            .any(|s| s.severity == SignalSeverity::Blocking);

        let decision = if hard_fail {
            Decision::Block
        } else if i32::from(score) < ALLOW_BELOW {
            Decision::Allow
        } else if i32::from(score) < VERIFY_AT {
            Decision::AllowWithWarnings
        } else {
            Decision::RequireVerification
        };

        debug!(score, ?decision, signal_count = signals.len(), "risk aggregation complete");

        RiskAssessment {
            score,
            signals,
            decision,
        }
    }
}

impl Default for RiskScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskAssessment {
    /// Advisory findings that raised the score
    pub fn warnings(&self) -> Vec<String> {
        self.signals
            .iter()
            .filter(|s| s.severity == SignalSeverity::Advisory && s.weight > 0)
            .map(|s| s.message.clone())
            .collect()
    }

    /// Blocking findings
    pub fn errors(&self) -> Vec<String> {
        self.signals
            .iter()
            .filter(|s| s.severity == SignalSeverity::Blocking)
            .map(|s| s.message.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalSource;

    fn advisory(weight: i16) -> RiskSignal {
        RiskSignal::advisory(SignalSource::Pattern, weight, format!("weight {}", weight))
    }

    #[test]
    fn empty_signals_allow() {
        let assessment = RiskScoringEngine::new().aggregate(vec![]);
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.decision, Decision::Allow);
    }

    #[test]
    fn mid_band_scores_allow_with_warnings() {
        let assessment = RiskScoringEngine::new().aggregate(vec![advisory(15), advisory(20)]);
        assert_eq!(assessment.score, 35);
        assert_eq!(assessment.decision, Decision::AllowWithWarnings);
        assert_eq!(assessment.warnings().len(), 2);
    }

    #[test]
    fn high_scores_require_verification() {
        let assessment =
            RiskScoringEngine::new().aggregate(vec![advisory(30), advisory(25), advisory(20)]);
        assert_eq!(assessment.decision, Decision::RequireVerification);
    }

    #[test]
    fn score_is_clamped_at_100() {
        let assessment =
            RiskScoringEngine::new().aggregate(vec![advisory(60), advisory(60), advisory(60)]);
        assert_eq!(assessment.score, 100);
    }

    #[test]
    fn negative_contributions_clamp_at_zero() {
        let assessment = RiskScoringEngine::new()
            .aggregate(vec![RiskSignal::advisory(SignalSource::Proximity, -10, "consistent")]);
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.decision, Decision::Allow);
        assert!(assessment.warnings().is_empty());
    }

    #[test]
    fn blocking_signal_forces_block_at_any_score() {
        let assessment = RiskScoringEngine::new().aggregate(vec![RiskSignal::blocking(
            SignalSource::RateLimit,
            "hourly booking limit reached",
        )]);
        assert_eq!(assessment.decision, Decision::Block);
        assert_eq!(assessment.errors().len(), 1);
    }

    #[test]
    fn proximity_subtraction_lowers_the_band() {
        let signals = vec![
            advisory(30),
            RiskSignal::advisory(SignalSource::Proximity, -10, "consistent"),
        ];
        let assessment = RiskScoringEngine::new().aggregate(signals);
        assert_eq!(assessment.score, 20);
        assert_eq!(assessment.decision, Decision::Allow);
    }
}
