use std::sync::Arc;

use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::error::{GuardError, Result};
use crate::fraud_detection::{
    DeviceFingerprintTracker, PatternDetector, RiskScoringEngine, TimingAnalyzer,
};
use crate::geo::{LocationAcquisition, LocationCache, LocationProvider, ProximityVerifier};
use crate::rate_limit::{LimitKind, RateLimiter};
use crate::types::{
    normalize_location, normalize_name, normalize_phone, BookingValidationRequest, Coordinate,
    Decision, LocationSample, LocationSource, ProximityStatus, RiskSignal, ServiceType,
    SignalSeverity, SignalSource, ValidationResult,
};
use crate::verification::{OtpVerificationService, SmsTransport};

/// Supplies the candidate provider's coordinate for proximity checks.
///
/// The directory itself (profiles, availability, pricing) lives outside
/// this crate; the defense layer only needs a coordinate to compare
/// against.
pub trait ProviderDirectory: Send + Sync {
    fn candidate_coordinate(&self, service_type: ServiceType) -> Option<Coordinate>;
}

/// Top-level entry point composing every defense component.
///
/// `validate` is synchronous and callable concurrently from independent
/// sessions: all shared state is behind per-key locks and nothing in the
/// hot path awaits. The flows that reach outside the process (coordinate
/// acquisition, SMS dispatch) are separate async methods.
pub struct BookingValidationOrchestrator {
    rate_limiter: Arc<RateLimiter>,
    patterns: PatternDetector,
    fingerprints: DeviceFingerprintTracker,
    timing: TimingAnalyzer,
    proximity: ProximityVerifier,
    location_cache: Arc<LocationCache>,
    acquisition: LocationAcquisition,
    otp: Arc<OtpVerificationService>,
    providers: Arc<dyn ProviderDirectory>,
    scoring: RiskScoringEngine,
    clock: Arc<dyn Clock>,
}

impl BookingValidationOrchestrator {
    pub fn new(
        config: GuardConfig,
        transport: Arc<dyn SmsTransport>,
        providers: Arc<dyn ProviderDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limits.clone(),
            Arc::clone(&clock),
        ));
        let location_cache = Arc::new(LocationCache::new(config.location.freshness_secs));
        let acquisition = LocationAcquisition::new(
            Arc::clone(&location_cache),
            config.location.acquire_timeout_ms,
        );
        let otp = Arc::new(OtpVerificationService::new(
            config.otp.clone(),
            transport,
            Arc::clone(&rate_limiter),
            Arc::clone(&clock),
        ));

        Ok(Self {
            patterns: PatternDetector::new(&config.blocklist),
            fingerprints: DeviceFingerprintTracker::new(&config.fingerprint, Arc::clone(&clock)),
            timing: TimingAnalyzer::new(config.timing.clone()),
            proximity: ProximityVerifier::new(config.proximity.clone(), &config.location),
            rate_limiter,
            location_cache,
            acquisition,
            otp,
            providers,
            scoring: RiskScoringEngine::new(),
            clock,
        })
    }

    /// Convenience constructor on the wall clock
    pub fn with_system_clock(
        config: GuardConfig,
        transport: Arc<dyn SmsTransport>,
        providers: Arc<dyn ProviderDirectory>,
    ) -> Result<Self> {
        Self::new(config, transport, providers, Arc::new(SystemClock))
    }

    /// Run the composite risk assessment for one booking submission.
    ///
    /// Malformed input is rejected outright. Hard policy violations (rate
    /// limit, blocklist) short-circuit into a Block result; every soft
    /// signal runs to completion and degrades to neutral on internal
    /// failure.
    pub fn validate(&self, request: &BookingValidationRequest) -> Result<ValidationResult> {
        let name = normalize_name(&request.customer_name)?;
        let phone = normalize_phone(&request.customer_phone)?;
        let location = normalize_location(&request.location)?;
        let quick = request.skip_phone_verification;
        let now = self.clock.now();

        let mut signals: Vec<RiskSignal> = Vec::new();

        // Rate limiting. A cheap/partial check must not burn booking quota,
        // so it only peeks at the windows.
        let limit_check = if quick {
            self.rate_limiter.peek(&phone, LimitKind::Booking)
        } else {
            self.rate_limiter.check_and_increment(&phone, LimitKind::Booking)
        };
        if let Err(e) = limit_check {
            match e {
                GuardError::RateLimit(msg) => {
                    signals.push(RiskSignal::blocking(SignalSource::RateLimit, msg));
                    return Ok(self.finish(request, &phone, signals, quick));
                }
                other => return Err(other),
            }
        }

        // Pattern scan. All rules run; a blocklist match still surfaces the
        // full finding list, then blocks.
        let pattern_signals =
            self.patterns
                .scan(&name, &phone, &location, request.device_fingerprint.as_deref());
        let blocklisted = pattern_signals
            .iter()
            .any(|s| s.severity == SignalSeverity::Blocking);
        signals.extend(pattern_signals);
        if blocklisted {
            return Ok(self.finish(request, &phone, signals, quick));
        }

        // Stateful trackers only run on a full submission so live-typing
        // feedback stays cheap and side-effect free.
        if !quick {
            if let Some(device) = request.device_fingerprint.as_deref() {
                if let Some(signal) = self.fingerprints.record(device, &phone) {
                    signals.push(signal);
                }
            }
            signals.extend(self.timing.analyze(request.timing_patterns.as_deref()));
        }

        // Proximity: closer means lower risk; anything missing degrades to
        // Unknown and contributes nothing.
        let provider_coordinate = self.providers.candidate_coordinate(request.service_type);
        let sample = self.location_cache.get();
        let verdict = self
            .proximity
            .compare(sample.as_ref(), provider_coordinate, now);
        match verdict.status {
            ProximityStatus::Verified => signals.push(RiskSignal::advisory(
                SignalSource::Proximity,
                -10,
                "customer location is consistent with the provider area",
            )),
            ProximityStatus::Mismatch => signals.push(RiskSignal::advisory(
                SignalSource::Proximity,
                15,
                "entered location is far from the detected position",
            )),
            ProximityStatus::NeedsCheck | ProximityStatus::Unknown => {}
        }

        Ok(self.finish(request, &phone, signals, quick))
    }

    /// Aggregate the collected signals and map to the caller-facing result.
    fn finish(
        &self,
        request: &BookingValidationRequest,
        phone: &str,
        signals: Vec<RiskSignal>,
        quick: bool,
    ) -> ValidationResult {
        let assessment = self.scoring.aggregate(signals);

        let requires_verification = assessment.decision == Decision::RequireVerification
            && !quick
            && !self.otp.is_verified(phone);

        let allowed = match assessment.decision {
            Decision::Allow | Decision::AllowWithWarnings => true,
            Decision::RequireVerification => !requires_verification,
            Decision::Block => false,
        };

        info!(
            risk_score = assessment.score,
            allowed,
            requires_verification,
            service_type = ?request.service_type,
            "booking validation complete"
        );

        ValidationResult {
            risk_score: assessment.score,
            allowed,
            requires_verification,
            warnings: assessment.warnings(),
            errors: assessment.errors(),
        }
    }

    /// Acquire the customer's coordinate through the host's location
    /// capability and cache it for subsequent proximity checks. Bounded by
    /// the configured per-attempt timeout across a high-accuracy attempt
    /// and a low-accuracy fallback; failure leaves the cache untouched.
    pub async fn collect_customer_location(
        &self,
        provider: &dyn LocationProvider,
        source: LocationSource,
    ) -> Option<LocationSample> {
        self.acquisition.acquire(provider, source).await
    }

    /// Start the OTP sub-flow for a phone
    pub async fn request_verification(&self, phone: &str) -> Result<()> {
        self.otp.send_code(phone).await
    }

    /// Complete the OTP sub-flow for a phone
    pub fn confirm_verification(&self, phone: &str, code: &str) -> Result<()> {
        self.otp.submit_code(phone, code)
    }

    /// The verification service, for hosts that drive the OTP flow directly
    pub fn verification(&self) -> Arc<OtpVerificationService> {
        Arc::clone(&self.otp)
    }

    /// The customer location cache
    pub fn location_cache(&self) -> Arc<LocationCache> {
        Arc::clone(&self.location_cache)
    }

    /// Drop all per-identity records whose TTL has elapsed
    pub fn purge_expired(&self) {
        self.rate_limiter.purge_expired();
        self.fingerprints.purge_expired();
        self.otp.purge_expired();
    }
}
