//! The [`Finding`] data model and its fingerprinting contract.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The severity of a single [`Finding`].
///
/// Ordered low-to-high so that `severity >= threshold` comparisons in
/// [`crate::gate::GatePolicy`] work directly via derived [`Ord`].
#[derive(
    Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialOrd, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// The numeric rank used by [`crate::gate::FailOn`].
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];
}

/// The category of sensitive-data exposure a [`Finding`] represents.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialOrd, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    PiiEmail,
    PiiPhone,
    PiiFinancial,
    PiiHealth,
    PiiGeneric,
    HardcodedSecret,
    LoggingPii,
    TrackingCookie,
    TrackingAnalyticsId,
    UnencryptedStorage,
    ThirdPartyTransfer,
    UnknownRisk,
}

/// Which detector tier produced a [`Finding`].
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialOrd, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Regex,
    Heuristic,
    Llm,
}

impl DetectorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectorKind::Regex => "regex",
            DetectorKind::Heuristic => "heuristic",
            DetectorKind::Llm => "llm",
        }
    }
}

/// The maximum length, in Unicode code points, of a [`Finding::snippet`].
pub const MAX_SNIPPET_CODEPOINTS: usize = 300;

/// A single detection and its attributes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Finding {
    /// Opaque, process-lifetime-unique identifier for this occurrence.
    pub id: u64,
    pub rule_id: String,
    pub category: Category,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub column: Option<u32>,
    pub snippet: String,
    pub message: String,
    pub suggestion: Option<String>,
    pub legal_reference: Option<String>,
    pub detector: DetectorKind,
    pub fingerprint: String,
    pub confidence: f64,
}

impl Finding {
    /// Builds a finding's fingerprint: `lower_hex(sha256_bytes("rule_id:file:line"))`.
    ///
    /// A pure function of `rule_id`, `file`, `line`, so the same occurrence
    /// always hashes to the same fingerprint across runs.
    pub fn fingerprint(rule_id: &str, file: &str, line: u32) -> String {
        let key = format!("{rule_id}:{file}:{line}");
        let digest = Sha256::digest(key.as_bytes());
        hex_lower(&digest)
    }

    /// Truncates `text` to at most [`MAX_SNIPPET_CODEPOINTS`] Unicode code
    /// points, appending an ellipsis when truncation occurred, and stripping
    /// any embedded NUL bytes.
    pub fn sanitize_snippet(text: &str) -> String {
        let cleaned: String = text.chars().filter(|&c| c != '\0').collect();
        let mut chars = cleaned.chars();
        let truncated: String = chars.by_ref().take(MAX_SNIPPET_CODEPOINTS).collect();

        if chars.next().is_some() {
            format!("{truncated}…")
        } else {
            truncated
        }
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // `write!` to a `String` never fails.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_matches_known_vector() {
        // sha256("PII-001:src/a.ts:1")
        let fp = Finding::fingerprint("PII-001", "src/a.ts", 1);
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn fingerprint_is_pure() {
        let a = Finding::fingerprint("SEC-001", "cfg.ts", 42);
        let b = Finding::fingerprint("SEC-001", "cfg.ts", 42);
        assert_eq!(a, b);

        let c = Finding::fingerprint("SEC-001", "cfg.ts", 43);
        assert_ne!(a, c);
    }

    #[test]
    fn snippet_truncation_bounds_codepoints() {
        let long = "é".repeat(400);
        let snippet = Finding::sanitize_snippet(&long);
        assert!(snippet.chars().count() <= MAX_SNIPPET_CODEPOINTS + 1);
        assert!(snippet.ends_with('…'));
    }

    #[test]
    fn snippet_strips_nul() {
        let dirty = "abc\0def";
        let snippet = Finding::sanitize_snippet(dirty);
        assert!(!snippet.contains('\0'));
    }

    #[test]
    fn snippet_short_text_untouched() {
        let short = "const e = \"x@y.com\";";
        assert_eq!(Finding::sanitize_snippet(short), short);
    }
}
