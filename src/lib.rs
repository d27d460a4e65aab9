// Booking Guard
//
// This crate implements the fraud/spam defense layer for a home-service
// booking marketplace. Before a booking is accepted it must pass a composite
// risk assessment combining request-pattern heuristics, rate limiting, weak
// device identification, interaction-timing analysis, and geographic
// proximity verification between customer and provider, with an optional
// phone one-time-code verification gate for high-risk submissions.
//
// # Architecture
//
// The defense layer is built around several modular components:
//
// * **Pattern detection**: declarative rule table over name/phone/location
// * **Rate limiting**: per-identity fixed-window counters with linearizable
//   check-and-increment
// * **Device tracking**: weak device signal occurrence counting
// * **Timing analysis**: bot-cadence detection over interaction timestamps
// * **Proximity verification**: great-circle distance classification between
//   customer and provider coordinates
// * **Phone verification**: OTP state machine with retry/lockout semantics
// * **Orchestration**: a single entry point composing every signal into a
//   score and decision
//
// # Usage
//
// ```rust,no_run
// use std::sync::Arc;
// use booking_guard::{
//     BookingValidationOrchestrator, BookingValidationRequest, GuardConfig, ServiceType,
// };
// use booking_guard::orchestrator::ProviderDirectory;
// use booking_guard::verification::SmsTransport;
//
// async fn example(
//     sms: Arc<dyn SmsTransport>,
//     providers: Arc<dyn ProviderDirectory>,
// ) -> booking_guard::Result<()> {
//     let guard = BookingValidationOrchestrator::with_system_clock(
//         GuardConfig::default(),
//         sms,
//         providers,
//     )?;
//
//     let result = guard.validate(&BookingValidationRequest {
//         customer_name: "John Smith".into(),
//         customer_phone: "+6281234567890".into(),
//         location: "Jl. Sudirman, Jakarta".into(),
//         service_type: ServiceType::Therapist,
//         skip_phone_verification: false,
//         timing_patterns: None,
//         device_fingerprint: None,
//     })?;
//
//     if result.requires_verification {
//         guard.request_verification("+6281234567890").await?;
//     }
//     Ok(())
// }
// ```

/// Time source abstraction so window arithmetic, freshness bounds, and
/// cooldowns are testable against a fake clock.
pub mod clock;

/// Configuration for every defense component, loadable from a JSON file.
pub mod config;

/// Error taxonomy and the crate-wide `Result` alias.
pub mod error;

/// Soft-signal heuristics: pattern rules, device tracking, timing analysis,
/// and the composite risk scoring engine.
pub mod fraud_detection;

/// Geographic proximity verification: distance math, the customer location
/// cache, classification, and bounded coordinate acquisition.
pub mod geo;

/// The top-level validation entry point composing every component.
pub mod orchestrator;

/// Per-identity fixed-window rate limiting.
pub mod rate_limit;

/// Core request/result and signal types.
pub mod types;

/// Phone verification state machine and its SMS transport seam.
pub mod verification;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GuardConfig;
pub use error::{GuardError, LocationError, Result};
pub use orchestrator::{BookingValidationOrchestrator, ProviderDirectory};
pub use types::{
    BookingValidationRequest, Coordinate, Decision, LocationSample, LocationSource,
    ProximityStatus, ProximityVerdict, RiskAssessment, RiskSignal, ServiceType, ValidationResult,
    VerificationState,
};
