use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::OtpConfig;
use crate::error::{GuardError, Result};
use crate::rate_limit::{LimitKind, RateLimiter};
use crate::types::{normalize_phone, VerificationState};

/// External SMS delivery collaborator.
///
/// The core decides when to dispatch and how a failure propagates; the
/// transport only moves the message.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(&self, phone: &str, code: &str) -> Result<()>;
}

/// One phone's verification session. The issued code is opaque payload to
/// the session; only `submit_code` ever interprets it.
struct VerificationSession {
    state: VerificationState,
    code: Option<String>,
    code_issued_at: Option<DateTime<Utc>>,
    resend_available_at: DateTime<Utc>,
    attempts_remaining: u8,
    locked_until: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
}

impl VerificationSession {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: VerificationState::Unverified,
            code: None,
            code_issued_at: None,
            resend_available_at: now,
            attempts_remaining: 0,
            locked_until: None,
            verified_at: None,
            expires_at: now,
        }
    }
}

/// Phone verification state machine with retry and lockout semantics.
///
/// Attempts-remaining only ever decreases until an explicit reset by a
/// fresh `send_code`. A lockout auto-clears after its cooldown; submissions
/// while locked fail without the code even being compared.
pub struct OtpVerificationService {
    sessions: DashMap<String, VerificationSession>,
    transport: Arc<dyn SmsTransport>,
    limiter: Arc<RateLimiter>,
    config: OtpConfig,
    clock: Arc<dyn Clock>,
}

impl OtpVerificationService {
    pub fn new(
        config: OtpConfig,
        transport: Arc<dyn SmsTransport>,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            transport,
            limiter,
            config,
            clock,
        }
    }

    /// Generate and dispatch a 6-digit code, transitioning the session to
    /// `CodeSent` and starting the resend cooldown.
    pub async fn send_code(&self, phone: &str) -> Result<()> {
        let phone = normalize_phone(phone)?;
        let now = self.clock.now();

        // Gate on session state first so a cooldown rejection does not burn
        // SMS quota. No lock is held across the dispatch await.
        self.check_send_allowed(&phone, now)?;

        self.limiter
            .check_and_increment(&phone, LimitKind::SmsDispatch)?;

        let code = generate_code();
        self.transport
            .send_sms(&phone, &code)
            .await
            .map_err(|e| match e {
                GuardError::SmsDispatch(_) => e,
                other => GuardError::SmsDispatch(other.to_string()),
            })?;

        let now = self.clock.now();
        let mut entry = self
            .sessions
            .entry(phone.clone())
            .or_insert_with(|| VerificationSession::new(now));

        entry.state = VerificationState::CodeSent;
        entry.code = Some(code);
        entry.code_issued_at = Some(now);
        entry.resend_available_at = now + Duration::seconds(self.config.resend_cooldown_secs);
        entry.attempts_remaining = self.config.max_attempts;
        entry.locked_until = None;
        entry.expires_at = now + Duration::seconds(self.config.code_ttl_secs);

        info!(%phone, "verification code dispatched");
        Ok(())
    }

    /// Submit a code for a phone. Valid only while a code is pending.
    pub fn submit_code(&self, phone: &str, code: &str) -> Result<()> {
        let phone = normalize_phone(phone)?;
        let now = self.clock.now();

        let mut entry = self
            .sessions
            .get_mut(&phone)
            .ok_or_else(|| GuardError::NoPendingCode(phone.clone()))?;

        match entry.state {
            VerificationState::Verified => Ok(()),
            VerificationState::Unverified => Err(GuardError::NoPendingCode(phone.clone())),
            VerificationState::Locked => {
                match entry.locked_until {
                    Some(until) if now < until => Err(GuardError::MaxAttemptsExceeded),
                    _ => {
                        // Lockout elapsed: the session clears, but the old
                        // code is gone and a fresh send_code is required.
                        entry.state = VerificationState::Unverified;
                        entry.code = None;
                        entry.locked_until = None;
                        Err(GuardError::NoPendingCode(phone.clone()))
                    }
                }
            }
            VerificationState::CodeSent => {
                let issued_at = entry
                    .code_issued_at
                    .ok_or_else(|| GuardError::NoPendingCode(phone.clone()))?;

                if now - issued_at > Duration::seconds(self.config.code_ttl_secs) {
                    debug!(%phone, "submitted against an expired code");
                    entry.state = VerificationState::Unverified;
                    entry.code = None;
                    return Err(GuardError::Expired);
                }

                if entry.code.as_deref() == Some(code.trim()) {
                    entry.state = VerificationState::Verified;
                    entry.code = None;
                    entry.verified_at = Some(now);
                    entry.expires_at = now + Duration::seconds(self.config.verified_ttl_secs);
                    info!(%phone, "phone verified");
                    return Ok(());
                }

                entry.attempts_remaining = entry.attempts_remaining.saturating_sub(1);
                if entry.attempts_remaining == 0 {
                    let until = now + Duration::seconds(self.config.lockout_secs);
                    entry.state = VerificationState::Locked;
                    entry.code = None;
                    entry.locked_until = Some(until);
                    entry.expires_at = until;
                    warn!(%phone, "verification locked after repeated failures");
                }
                Err(GuardError::CodeMismatch {
                    attempts_remaining: entry.attempts_remaining,
                })
            }
        }
    }

    /// Whether a phone currently satisfies the verification requirement
    pub fn is_verified(&self, phone: &str) -> bool {
        let digits = match normalize_phone(phone) {
            Ok(d) => d,
            Err(_) => return false,
        };
        let now = self.clock.now();
        self.sessions
            .get(&digits)
            .map(|s| {
                s.state == VerificationState::Verified
                    && s.verified_at
                        .is_some_and(|at| now - at < Duration::seconds(self.config.verified_ttl_secs))
            })
            .unwrap_or(false)
    }

    /// Current session state for a phone, if a session exists
    pub fn session_state(&self, phone: &str) -> Option<VerificationState> {
        let digits = normalize_phone(phone).ok()?;
        self.sessions.get(&digits).map(|s| s.state)
    }

    /// Attempts remaining on the pending code, if a session exists
    pub fn attempts_remaining(&self, phone: &str) -> Option<u8> {
        let digits = normalize_phone(phone).ok()?;
        self.sessions.get(&digits).map(|s| s.attempts_remaining)
    }

    /// Drop sessions whose TTL has elapsed
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.sessions.retain(|_, session| session.expires_at > now);
    }

    /// Enforce resend cooldown and lockout before a new code may go out.
    /// A lockout past its cooldown auto-clears here, which is what resets
    /// attempts for the fresh code.
    fn check_send_allowed(&self, phone: &str, now: DateTime<Utc>) -> Result<()> {
        let mut entry = match self.sessions.get_mut(phone) {
            Some(e) => e,
            None => return Ok(()),
        };

        if let Some(until) = entry.locked_until {
            if now < until {
                return Err(GuardError::CooldownActive {
                    retry_in_secs: (until - now).num_seconds().max(1),
                });
            }
            entry.state = VerificationState::Unverified;
            entry.code = None;
            entry.locked_until = None;
            debug!(phone, "lockout cooldown elapsed, session cleared");
        }

        if entry.state == VerificationState::CodeSent && now < entry.resend_available_at {
            return Err(GuardError::CooldownActive {
                retry_in_secs: (entry.resend_available_at - now).num_seconds().max(1),
            });
        }
        Ok(())
    }
}

/// 6-digit numeric one-time code
fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}
