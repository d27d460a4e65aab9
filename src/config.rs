use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::error::{GuardError, Result};

/// Configuration for the booking guard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Per-identity booking and SMS quotas
    pub rate_limits: RateLimitConfig,

    /// Phone verification state machine parameters
    pub otp: OtpConfig,

    /// Distance thresholds for proximity classification
    pub proximity: ProximityConfig,

    /// Location sample freshness and acquisition bounds
    pub location: LocationConfig,

    /// Interaction-timing analysis thresholds
    pub timing: TimingConfig,

    /// Weak device signal tracking
    pub fingerprint: FingerprintConfig,

    /// Hard-fail identity blocklists
    pub blocklist: BlocklistConfig,
}

/// Fixed-window quotas per identity key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum accepted bookings per hour per identity
    pub bookings_per_hour: u32,

    /// Maximum accepted bookings per day per identity
    pub bookings_per_day: u32,

    /// Maximum verification SMS dispatches per hour per phone
    pub sms_per_hour: u32,
}

/// Phone verification parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Seconds a dispatched code remains valid
    pub code_ttl_secs: i64,

    /// Seconds before another code may be requested
    pub resend_cooldown_secs: i64,

    /// Wrong submissions tolerated before lockout
    pub max_attempts: u8,

    /// Seconds a lockout lasts before it auto-clears
    pub lockout_secs: i64,

    /// Seconds a verified phone satisfies the verification requirement
    pub verified_ttl_secs: i64,
}

/// Distance thresholds in kilometers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// At or under this distance the location is considered verified
    pub verified_km: f64,

    /// At or under this distance the booking needs a manual check
    pub needs_check_km: f64,

    /// Beyond this distance a provider is excluded from candidate lists
    pub candidate_cap_km: f64,
}

/// Location sample handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Seconds before a stored sample is stale and excluded from proximity math
    pub freshness_secs: i64,

    /// Per-attempt timeout for a coordinate read
    pub acquire_timeout_ms: u64,
}

/// Bot-cadence thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Minimum human-plausible inter-event delta in milliseconds
    pub min_reaction_ms: i64,

    /// Delta variance (ms^2) under which the cadence counts as uniform
    pub variance_epsilon: f64,

    /// Minimum plausible total form-completion span in milliseconds
    pub min_total_ms: i64,
}

/// Weak device signal tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Rolling window over which signal occurrences are counted, in seconds
    pub window_secs: i64,

    /// Distinct phone count above which one signal flags multi-account abuse
    pub multi_account_threshold: u32,
}

/// Identities that hard-fail regardless of score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlocklistConfig {
    /// Normalized phone numbers (digits only)
    pub phones: Vec<String>,

    /// Opaque device signals
    pub device_signals: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            bookings_per_hour: 3,
            bookings_per_day: 10,
            sms_per_hour: 5,
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 600,
            resend_cooldown_secs: 60,
            max_attempts: 3,
            lockout_secs: 900,
            verified_ttl_secs: 1800,
        }
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            verified_km: 5.0,
            needs_check_km: 15.0,
            candidate_cap_km: 25.0,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            freshness_secs: 2 * 3600,
            acquire_timeout_ms: 15_000,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_reaction_ms: 150,
            variance_epsilon: 10_000.0,
            min_total_ms: 3_000,
        }
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            window_secs: 24 * 3600,
            multi_account_threshold: 3,
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rate_limits: RateLimitConfig::default(),
            otp: OtpConfig::default(),
            proximity: ProximityConfig::default(),
            location: LocationConfig::default(),
            timing: TimingConfig::default(),
            fingerprint: FingerprintConfig::default(),
            blocklist: BlocklistConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Load config from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_content = fs::read_to_string(path)
            .await
            .map_err(|e| GuardError::Configuration(format!("failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&file_content)
            .map_err(|e| GuardError::Configuration(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .map_err(|e| GuardError::Configuration(format!("failed to serialize config: {}", e)))?;

        fs::write(path, config_json)
            .await
            .map_err(|e| GuardError::Configuration(format!("failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate config values
    pub fn validate(&self) -> Result<()> {
        if self.rate_limits.bookings_per_hour == 0 {
            return Err(GuardError::Configuration(
                "hourly booking limit cannot be zero".to_string(),
            ));
        }

        if self.rate_limits.bookings_per_day < self.rate_limits.bookings_per_hour {
            return Err(GuardError::Configuration(
                "daily booking limit cannot be below the hourly limit".to_string(),
            ));
        }

        if self.otp.max_attempts == 0 {
            return Err(GuardError::Configuration(
                "verification attempts cannot be zero".to_string(),
            ));
        }

        if self.otp.code_ttl_secs <= self.otp.resend_cooldown_secs {
            return Err(GuardError::Configuration(
                "code validity must outlast the resend cooldown".to_string(),
            ));
        }

        if self.proximity.verified_km >= self.proximity.needs_check_km
            || self.proximity.needs_check_km > self.proximity.candidate_cap_km
        {
            return Err(GuardError::Configuration(
                "proximity thresholds must be ordered verified < needs_check <= candidate_cap"
                    .to_string(),
            ));
        }

        if self.location.freshness_secs <= 0 {
            return Err(GuardError::Configuration(
                "location freshness must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        GuardConfig::default().validate().unwrap();
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = GuardConfig::default();
        config.proximity.verified_km = 20.0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn config_round_trips_through_file() {
        let dir = std::env::temp_dir().join("booking-guard-config-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("guard.json");

        let config = GuardConfig::default();
        config.save_to_file(&path).await.unwrap();

        let loaded = GuardConfig::from_file(&path).await.unwrap();
        assert_eq!(
            loaded.rate_limits.bookings_per_hour,
            config.rate_limits.bookings_per_hour
        );
        assert_eq!(loaded.otp.code_ttl_secs, config.otp.code_ttl_secs);
    }
}
