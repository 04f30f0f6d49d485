//! Tier 1: the opt-in heuristic detector.
//!
//! Three low-confidence rules over sensitive variable names, logging of
//! user/customer objects, and serialization of sensitive objects. Assembly
//! mirrors the regex detector exactly; only the rule table and confidence
//! differ.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DetectorError;
use crate::finding::{Category, DetectorKind, Finding, Severity};

use super::{Detector, containing_line, line_for_offset};

struct HeuristicRule {
    id: &'static str,
    category: Category,
    severity: Severity,
    confidence: f64,
    message: &'static str,
    pattern: &'static LazyLock<Regex>,
}

static SENSITIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(password|ssn|dob|date_of_birth|credit_card|social_security)\b\s*[:=]")
        .expect("built-in pattern must compile")
});

static LOGGED_USER_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:console\.log|log(?:ger)?\.(?:debug|info|warn|error))\s*\(\s*(user|customer|account|profile)\b")
        .expect("built-in pattern must compile")
});

static SERIALIZED_SENSITIVE_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)JSON\.stringify\s*\(\s*(user|customer|account|profile)\b")
        .expect("built-in pattern must compile")
});

static HEURISTIC_RULES: &[HeuristicRule] = &[
    HeuristicRule {
        id: "HEUR-001",
        category: Category::PiiGeneric,
        severity: Severity::Medium,
        confidence: 0.7,
        message: "sensitive variable name assigned without obvious redaction",
        pattern: &SENSITIVE_NAME,
    },
    HeuristicRule {
        id: "HEUR-002",
        category: Category::LoggingPii,
        severity: Severity::Medium,
        confidence: 0.6,
        message: "logging call references a user/customer object directly",
        pattern: &LOGGED_USER_OBJECT,
    },
    HeuristicRule {
        id: "HEUR-003",
        category: Category::ThirdPartyTransfer,
        severity: Severity::Low,
        confidence: 0.5,
        message: "serializing a user/customer object may leak sensitive fields",
        pattern: &SERIALIZED_SENSITIVE_OBJECT,
    },
];

pub struct HeuristicDetector;

impl HeuristicDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for HeuristicDetector {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn detect(&self, content: &str, path: &str) -> Result<Vec<Finding>, DetectorError> {
        let mut findings = Vec::new();

        for rule in HEURISTIC_RULES {
            for m in rule.pattern.find_iter(content) {
                let line = line_for_offset(content, m.start());
                let snippet = Finding::sanitize_snippet(containing_line(content, m.start()));
                let fingerprint = Finding::fingerprint(rule.id, path, line);

                findings.push(Finding {
                    id: 0,
                    rule_id: rule.id.to_string(),
                    category: rule.category,
                    severity: rule.severity,
                    file: path.to_string(),
                    line,
                    column: None,
                    snippet,
                    message: rule.message.to_string(),
                    suggestion: None,
                    legal_reference: None,
                    detector: DetectorKind::Heuristic,
                    fingerprint,
                    confidence: rule.confidence,
                });
            }
        }

        Ok(findings)
    }
}
