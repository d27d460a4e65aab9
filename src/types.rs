use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

/// Service categories offered through the booking flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Therapist,
    MassagePlace,
    SkinClinic,
}

/// A booking submission to be validated before acceptance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingValidationRequest {
    /// Customer display name as entered in the form
    pub customer_name: String,

    /// Customer phone number, free-form; normalized before use
    pub customer_phone: String,

    /// Free-text service location entered by the customer
    pub location: String,

    /// Category of the requested service
    pub service_type: ServiceType,

    /// Requests a cheap/partial check: the phone-verification gate and the
    /// stateful device/timing trackers are skipped, and no booking quota is
    /// consumed. Used for live-typing feedback.
    #[serde(default)]
    pub skip_phone_verification: bool,

    /// Interaction timestamps (milliseconds) captured during form completion
    #[serde(default)]
    pub timing_patterns: Option<Vec<i64>>,

    /// Opaque weak device signal, when the client could produce one
    #[serde(default)]
    pub device_fingerprint: Option<String>,
}

/// A geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Where a location sample was captured
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Landing,
    Booking,
    Chat,
    Manual,
}

/// A captured customer coordinate with its accuracy and capture time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSample {
    /// The captured coordinate
    pub coordinate: Coordinate,

    /// Reported accuracy in meters
    pub accuracy_m: f64,

    /// When the sample was captured
    pub captured_at: DateTime<Utc>,

    /// Capture context
    pub source: LocationSource,
}

impl LocationSample {
    /// Age of the sample relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.captured_at
    }
}

/// Categorical judgment of the customer-provider distance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProximityStatus {
    /// Within the direct service radius
    Verified,

    /// Plausible but worth confirming with the customer
    NeedsCheck,

    /// Far outside the service radius
    Mismatch,

    /// No provider coordinate, or no fresh customer sample
    Unknown,
}

/// Outcome of a proximity comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityVerdict {
    /// Great-circle distance in kilometers, when both coordinates were known
    pub distance_km: Option<f64>,

    /// Categorical classification
    pub status: ProximityStatus,

    /// Ranking score used to sort/filter candidate providers; 0 means the
    /// candidate is excluded from candidate lists
    pub ranking_score: u8,
}

/// Which component produced a risk signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Pattern,
    RateLimit,
    Fingerprint,
    Timing,
    Proximity,
}

/// Whether a signal merely raises the score or unconditionally blocks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalSeverity {
    Advisory,
    Blocking,
}

/// A single weighted risk contribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSignal {
    /// Component that raised the signal
    pub source: SignalSource,

    /// Score contribution; proximity consistency may be negative
    pub weight: i16,

    /// Human-readable finding
    pub message: String,

    /// Advisory signals accumulate; blocking signals force a Block decision
    pub severity: SignalSeverity,
}

impl RiskSignal {
    pub fn advisory(source: SignalSource, weight: i16, message: impl Into<String>) -> Self {
        Self {
            source,
            weight,
            message: message.into(),
            severity: SignalSeverity::Advisory,
        }
    }

    pub fn blocking(source: SignalSource, message: impl Into<String>) -> Self {
        Self {
            source,
            weight: 100,
            message: message.into(),
            severity: SignalSeverity::Blocking,
        }
    }
}

/// Final decision for a submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    AllowWithWarnings,
    RequireVerification,
    Block,
}

/// Aggregated risk picture for one submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Composite risk score, clamped to [0, 100]
    pub score: u8,

    /// Every signal that contributed to the score
    pub signals: Vec<RiskSignal>,

    /// Decision derived from the score and any hard-fail signals
    pub decision: Decision,
}

/// Lifecycle of a phone verification session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Unverified,
    CodeSent,
    Verified,
    Locked,
}

/// The orchestrator's output for one booking submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Composite risk score in [0, 100]
    pub risk_score: u8,

    /// Whether the booking may proceed as submitted
    pub allowed: bool,

    /// Whether the OTP verification sub-flow must complete first
    pub requires_verification: bool,

    /// Advisory findings; the booking proceeds
    pub warnings: Vec<String>,

    /// Blocking findings; not retryable until the window/lockout clears
    pub errors: Vec<String>,
}

/// Normalize a phone number to its digits, which key all per-identity state.
///
/// A phone that does not normalize to 8-15 digits is malformed input, not a
/// suspicious pattern, and is rejected outright.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 || digits.len() > 15 {
        return Err(GuardError::InvalidInput(format!(
            "phone must contain 8-15 digits, got {}",
            digits.len()
        )));
    }
    Ok(digits)
}

/// Normalize a customer name for pattern scanning
pub fn normalize_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GuardError::InvalidInput("customer name is empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Normalize a free-text location for pattern scanning
pub fn normalize_location(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GuardError::InvalidInput("location is empty".into()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_normalization_strips_formatting() {
        assert_eq!(
            normalize_phone("+62 812-3456-7890").unwrap(),
            "6281234567890"
        );
    }

    #[test]
    fn short_phone_is_invalid_input() {
        assert!(matches!(
            normalize_phone("12345"),
            Err(GuardError::InvalidInput(_))
        ));
    }

    #[test]
    fn oversized_phone_is_invalid_input() {
        assert!(matches!(
            normalize_phone("1234567890123456"),
            Err(GuardError::InvalidInput(_))
        ));
    }

    #[test]
    fn blank_name_is_invalid_input() {
        assert!(matches!(
            normalize_name("   "),
            Err(GuardError::InvalidInput(_))
        ));
    }
}
