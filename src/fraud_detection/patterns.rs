use std::collections::HashSet;

use tracing::debug;

use crate::config::BlocklistConfig;
use crate::types::{RiskSignal, SignalSource};

/// Which request field a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
    Name,
    Phone,
    Location,
    Device,
}

/// Advisory rules contribute weight; blocklisted rules hard-fail the
/// submission independent of score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleTier {
    Advisory,
    Blocklisted,
}

/// One entry in the rule table. Adding a rule never touches control flow:
/// the scan evaluates every rule and surfaces every match.
struct PatternRule {
    subject: Subject,
    weight: i16,
    message: &'static str,
    tier: RuleTier,
    predicate: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

/// Rule-based scan of name, phone, and location strings.
///
/// The table is ordered and non-short-circuiting: all findings surface
/// together so the caller sees the full picture in one pass.
pub struct PatternDetector {
    rules: Vec<PatternRule>,
}

/// Names that appear constantly in throwaway submissions
const PLACEHOLDER_NAMES: &[&str] = &[
    "john doe",
    "jane doe",
    "admin",
    "user",
    "customer",
    "budi",
    "siti",
    "andi",
    "test user",
    "testing",
];

/// Locations too generic to dispatch a provider to
const GENERIC_LOCATIONS: &[&str] = &[
    "jakarta",
    "surabaya",
    "bandung",
    "medan",
    "home",
    "house",
    "apartment",
    "hotel",
    "test",
    "testing",
    "location",
    "address",
];

impl PatternDetector {
    pub fn new(blocklist: &BlocklistConfig) -> Self {
        let blocked_phones: HashSet<String> = blocklist.phones.iter().cloned().collect();
        let blocked_devices: HashSet<String> = blocklist.device_signals.iter().cloned().collect();

        let rules: Vec<PatternRule> = vec![
            PatternRule {
                subject: Subject::Name,
                weight: 30,
                message: "name matches a known placeholder pattern",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| {
                    let n = s.to_lowercase();
                    ["test", "fake", "spam", "xxx", "aaa"]
                        .iter()
                        .any(|p| n.starts_with(p))
                }),
            },
            PatternRule {
                subject: Subject::Name,
                weight: 30,
                message: "name repeats a single character",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| has_repeated_run(s, 5)),
            },
            PatternRule {
                subject: Subject::Name,
                weight: 30,
                message: "name contains only digits",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())),
            },
            PatternRule {
                subject: Subject::Name,
                weight: 30,
                message: "name is too short",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| s.chars().count() < 3),
            },
            PatternRule {
                subject: Subject::Name,
                weight: 30,
                message: "name contains no letters",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| !s.chars().any(|c| c.is_alphabetic())),
            },
            PatternRule {
                subject: Subject::Name,
                weight: 15,
                message: "name is a commonly used placeholder",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| PLACEHOLDER_NAMES.contains(&s.to_lowercase().as_str())),
            },
            PatternRule {
                subject: Subject::Phone,
                weight: 25,
                message: "phone number is all zeros",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| !s.is_empty() && s.chars().all(|c| c == '0')),
            },
            PatternRule {
                subject: Subject::Phone,
                weight: 25,
                message: "phone number repeats a single digit",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| {
                    s.len() >= 8 && s.chars().next().is_some_and(|first| s.chars().all(|c| c == first))
                }),
            },
            PatternRule {
                subject: Subject::Phone,
                weight: 10,
                message: "phone number contains a sequential digit run",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| {
                    ["12345", "23456", "34567", "45678", "56789"]
                        .iter()
                        .any(|run| s.contains(run))
                }),
            },
            PatternRule {
                subject: Subject::Location,
                weight: 20,
                message: "location is a generic placeholder",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| GENERIC_LOCATIONS.contains(&s.to_lowercase().as_str())),
            },
            PatternRule {
                subject: Subject::Location,
                weight: 20,
                message: "location is too short to dispatch to",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| s.chars().count() < 5),
            },
            PatternRule {
                subject: Subject::Location,
                weight: 20,
                message: "location is implausibly long",
                tier: RuleTier::Advisory,
                predicate: Box::new(|s| s.chars().count() > 200),
            },
            PatternRule {
                subject: Subject::Phone,
                weight: 100,
                message: "phone number is blocklisted",
                tier: RuleTier::Blocklisted,
                predicate: Box::new(move |s| blocked_phones.contains(s)),
            },
            PatternRule {
                subject: Subject::Device,
                weight: 100,
                message: "device signal is blocklisted",
                tier: RuleTier::Blocklisted,
                predicate: Box::new(move |s| blocked_devices.contains(s)),
            },
        ];

        Self { rules }
    }

    /// Evaluate every rule against its subject field. `phone` must already
    /// be normalized to digits.
    pub fn scan(
        &self,
        name: &str,
        phone: &str,
        location: &str,
        device: Option<&str>,
    ) -> Vec<RiskSignal> {
        let name = name.trim();
        let location = location.trim();

        let mut signals = Vec::new();
        for rule in &self.rules {
            let subject = match rule.subject {
                Subject::Name => name,
                Subject::Phone => phone,
                Subject::Location => location,
                Subject::Device => match device {
                    Some(d) => d,
                    None => continue,
                },
            };

            if (rule.predicate)(subject) {
                debug!(message = rule.message, weight = rule.weight, "pattern rule matched");
                signals.push(match rule.tier {
                    RuleTier::Advisory => {
                        RiskSignal::advisory(SignalSource::Pattern, rule.weight, rule.message)
                    }
                    RuleTier::Blocklisted => {
                        RiskSignal::blocking(SignalSource::Pattern, rule.message)
                    }
                });
            }
        }
        signals
    }
}

/// True when any character repeats `run` or more times consecutively
fn has_repeated_run(s: &str, run: usize) -> bool {
    let mut count = 0;
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if Some(c) == prev {
            count += 1;
            if count >= run {
                return true;
            }
        } else {
            prev = Some(c);
            count = 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalSeverity;

    fn detector() -> PatternDetector {
        PatternDetector::new(&BlocklistConfig::default())
    }

    fn total_weight(signals: &[RiskSignal]) -> i16 {
        signals.iter().map(|s| s.weight).sum()
    }

    #[test]
    fn clean_submission_yields_no_signals() {
        let signals = detector().scan(
            "Maria Lestari",
            "628119876543",
            "Jl. Gatot Subroto 12, Jakarta Selatan",
            None,
        );
        assert!(signals.is_empty(), "{:?}", signals);
    }

    #[test]
    fn placeholder_name_and_repeated_phone_stack() {
        let signals = detector().scan("test", "1111111111", "hotel", None);
        let weights = total_weight(&signals);
        assert!(weights >= 50, "expected stacked weights, got {}", weights);
        assert!(signals.iter().any(|s| s.message.contains("placeholder pattern")));
        assert!(signals.iter().any(|s| s.message.contains("repeats a single digit")));
        assert!(signals.iter().any(|s| s.message.contains("generic placeholder")));
    }

    #[test]
    fn common_fake_name_is_a_soft_signal() {
        let signals = detector().scan("budi", "6289876543210", "Jl. Melati 4, Depok", None);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].weight, 15);
    }

    #[test]
    fn repeated_character_name_is_flagged() {
        let signals = detector().scan("aaaaa", "628119876543", "Jl. Melati 4, Depok", None);
        // Matches both the placeholder-prefix rule and the repeated-run rule.
        assert_eq!(signals.len(), 2);
    }

    #[test]
    fn all_matching_rules_surface_together() {
        let signals = detector().scan("123", "0000000000", "test", None);
        // Name: digits-only + no-letters. Phone: all-zeros + repeated-digit.
        // Location: generic + too-short.
        assert_eq!(signals.len(), 6, "{:?}", signals);
    }

    #[test]
    fn sequential_run_is_low_weight() {
        let signals = detector().scan(
            "John Smith",
            "6281234567890",
            "Jl. Sudirman, Jakarta",
            None,
        );
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].weight, 10);
    }

    #[test]
    fn blocklisted_phone_is_a_hard_fail() {
        let blocklist = BlocklistConfig {
            phones: vec!["6281234567890".to_string()],
            device_signals: vec![],
        };
        let detector = PatternDetector::new(&blocklist);
        let signals = detector.scan("John Smith", "6281234567890", "Jl. Sudirman 1, Jakarta", None);
        assert!(signals
            .iter()
            .any(|s| s.severity == SignalSeverity::Blocking));
    }

    #[test]
    fn device_rules_are_skipped_without_a_signal() {
        let blocklist = BlocklistConfig {
            phones: vec![],
            device_signals: vec!["abc123".to_string()],
        };
        let detector = PatternDetector::new(&blocklist);
        let clean = detector.scan("John Smith", "628119876543", "Jl. Sudirman 1, Jakarta", None);
        assert!(clean.is_empty());

        let flagged =
            detector.scan("John Smith", "628119876543", "Jl. Sudirman 1, Jakarta", Some("abc123"));
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].severity, SignalSeverity::Blocking);
    }
}
