use thiserror::Error;

/// Core error types for the booking guard.
///
/// Hard policy violations (`RateLimit`, `Blocklisted`) are surfaced to
/// callers inside `ValidationResult::errors` and are not retryable until the
/// offending window or lockout clears. Advisory risk never appears here; it
/// accumulates into the risk score instead.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("blocklisted: {0}")]
    Blocklisted(String),

    #[error("verification cooldown active, retry in {retry_in_secs}s")]
    CooldownActive { retry_in_secs: i64 },

    #[error("verification code expired")]
    Expired,

    #[error("verification code mismatch, {attempts_remaining} attempts remaining")]
    CodeMismatch { attempts_remaining: u8 },

    #[error("maximum verification attempts exceeded")]
    MaxAttemptsExceeded,

    #[error("no pending verification code for {0}")]
    NoPendingCode(String),

    #[error("sms dispatch failed: {0}")]
    SmsDispatch(String),

    #[error("geolocation error: {0}")]
    Geolocation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure modes of a coordinate read from a `LocationProvider`.
///
/// All of these degrade to an absent sample at the acquisition layer; none
/// of them fail a validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("location request timed out")]
    Timeout,
}

impl From<LocationError> for GuardError {
    fn from(error: LocationError) -> Self {
        GuardError::Geolocation(error.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GuardError>;
