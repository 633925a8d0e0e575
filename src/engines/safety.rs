//! Keyword safety scanner.
//!
//! A stateless classifier over a fixed pattern table. Matching is
//! case-insensitive substring search; each matched pattern yields one event
//! tagged with a category and severity.

use chrono::Utc;

use super::{SafetyEvent, SafetyScanner};

struct Pattern {
    needle: &'static str,
    tag: &'static str,
    severity: u8,
    correction: Option<&'static str>,
}

const PATTERNS: &[Pattern] = &[
    Pattern {
        needle: "password",
        tag: "credential_leak",
        severity: 3,
        correction: Some("redact credentials before storing"),
    },
    Pattern {
        needle: "api key",
        tag: "credential_leak",
        severity: 3,
        correction: Some("redact credentials before storing"),
    },
    Pattern {
        needle: "ssn",
        tag: "pii",
        severity: 4,
        correction: Some("remove personally identifying numbers"),
    },
    Pattern {
        needle: "credit card",
        tag: "pii",
        severity: 4,
        correction: Some("remove payment card data"),
    },
    Pattern {
        needle: "kill",
        tag: "violence",
        severity: 4,
        correction: None,
    },
    Pattern {
        needle: "suicide",
        tag: "self_harm",
        severity: 5,
        correction: None,
    },
];

#[derive(Default)]
pub struct KeywordSafetyScanner;

impl KeywordSafetyScanner {
    pub fn new() -> Self {
        Self
    }
}

impl SafetyScanner for KeywordSafetyScanner {
    fn scan(&self, text: &str) -> Vec<SafetyEvent> {
        let lowered = text.to_lowercase();
        PATTERNS
            .iter()
            .filter(|pattern| lowered.contains(pattern.needle))
            .map(|pattern| SafetyEvent {
                text: pattern.needle.to_string(),
                tag: pattern.tag.to_string(),
                severity: pattern.severity,
                correction: pattern.correction.map(str::to_string),
                timestamp: Utc::now(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_credential_leaks() {
        let scanner = KeywordSafetyScanner::new();
        let events = scanner.scan("my PASSWORD is hunter2");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tag, "credential_leak");
        assert!(events[0].correction.is_some());
    }

    #[test]
    fn clean_text_yields_no_events() {
        let scanner = KeywordSafetyScanner::new();
        assert!(scanner.scan("a perfectly ordinary note").is_empty());
    }

    #[test]
    fn multiple_categories_reported_together() {
        let scanner = KeywordSafetyScanner::new();
        let events = scanner.scan("password and credit card in one line");
        let tags: Vec<&str> = events.iter().map(|e| e.tag.as_str()).collect();
        assert!(tags.contains(&"credential_leak"));
        assert!(tags.contains(&"pii"));
    }
}
