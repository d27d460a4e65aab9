//! Spam and abuse heuristics for booking submissions
//!
//! This module implements the soft-signal side of the defense layer. The
//! detection pipeline incorporates multiple signals:
//!
//! 1. String-pattern heuristics over name, phone, and location
//! 2. Weak device signal occurrence tracking (multi-account abuse)
//! 3. Interaction-timing analysis (bot cadence detection)
//! 4. Composite risk scoring with an explicit decision mapping
//!
//! Soft signals never fail a validation on their own; they accumulate into
//! the composite score. Only blocklist-tier matches and rate-limit
//! violations hard-fail a submission.

mod fingerprint;
mod patterns;
mod scoring;
mod timing;

pub use fingerprint::{DeviceFingerprintTracker, EnvironmentSignal, WeakDeviceSignal};
pub use patterns::PatternDetector;
pub use scoring::RiskScoringEngine;
pub use timing::TimingAnalyzer;
