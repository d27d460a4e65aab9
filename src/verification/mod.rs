//! Phone verification gate for high-risk submissions
//!
//! Implements the one-time-code state machine
//! (`Unverified → CodeSent → Verified`, with `CodeSent → Locked` on repeated
//! failure) on top of an external SMS transport. The service owns every
//! per-phone session; transport and code generation are the only things it
//! delegates.

mod otp;

pub use otp::{OtpVerificationService, SmsTransport};
