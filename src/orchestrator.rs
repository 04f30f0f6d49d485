//! Two-phase detection composition: local detectors always run; the LLM
//! detector is offered a second look at low-confidence local findings,
//! gated by quota.

use chrono::Utc;

use crate::detectors::llm::LlmDetector;
use crate::detectors::{CodeSnippet, Detector, language_for_path};
use crate::finding::Finding;

/// Local findings below this confidence are escalated to the semantic phase.
pub const SEMANTIC_ESCALATION_THRESHOLD: f64 = 0.8;

/// Lines of context included on either side of an escalated finding.
const CONTEXT_LINES: u32 = 2;

pub struct DetectionOrchestrator {
    local_detectors: Vec<Box<dyn Detector>>,
    llm_detector: Option<LlmDetector>,
}

impl DetectionOrchestrator {
    pub fn new(local_detectors: Vec<Box<dyn Detector>>, llm_detector: Option<LlmDetector>) -> Self {
        Self {
            local_detectors,
            llm_detector,
        }
    }

    /// Runs every local detector over a single file's content, then escalates
    /// low-confidence candidates to the semantic phase if one is configured
    /// and its quota gate is open. Never fails outright: detector errors and
    /// LLM errors are both swallowed so the orchestrator always returns the
    /// local result at minimum.
    pub fn detect(&self, content: &str, path: &str) -> Vec<Finding> {
        let mut local_findings = Vec::new();

        for detector in &self.local_detectors {
            match detector.detect(content, path) {
                Ok(findings) => local_findings.extend(findings),
                Err(err) => {
                    tracing::warn!(detector = detector.name(), file = path, error = %err, "detector failed on file, skipping");
                    continue;
                }
            }
        }

        let llm_findings = self.run_semantic_phase(content, path, &local_findings);

        dedup_by_fingerprint(local_findings, llm_findings)
    }

    fn run_semantic_phase(&self, content: &str, path: &str, local_findings: &[Finding]) -> Vec<Finding> {
        let Some(llm) = &self.llm_detector else {
            return Vec::new();
        };
        if !llm.allows_call(Utc::now()) {
            return Vec::new();
        }

        let candidates: Vec<&Finding> = local_findings
            .iter()
            .filter(|f| f.confidence < SEMANTIC_ESCALATION_THRESHOLD)
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let snippets: Vec<CodeSnippet> = candidates
            .iter()
            .map(|f| build_snippet(content, path, f))
            .collect();

        llm.analyze(&snippets).unwrap_or_else(|err| {
            tracing::warn!(file = path, error = %err, "llm detector failed, falling back to local findings");
            Vec::new()
        })
    }
}

fn build_snippet(content: &str, path: &str, finding: &Finding) -> CodeSnippet {
    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len() as u32;
    let center = finding.line.max(1);
    let start = center.saturating_sub(CONTEXT_LINES).max(1);
    let end = (center + CONTEXT_LINES).min(total.max(1));

    let body = lines
        .get((start.saturating_sub(1)) as usize..(end.min(total)) as usize)
        .unwrap_or(&[])
        .join("\n");

    CodeSnippet {
        file: path.to_string(),
        line_start: start,
        line_end: end,
        language: language_for_path(path),
        content: body,
        heuristic_tags: vec![finding.rule_id.clone()],
    }
}

/// First-wins merge by fingerprint; local findings are listed before LLM
/// findings so a local detection always takes precedence over a later
/// semantic one for the same occurrence.
fn dedup_by_fingerprint(local: Vec<Finding>, llm: Vec<Finding>) -> Vec<Finding> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(local.len() + llm.len());

    for finding in local.into_iter().chain(llm) {
        if seen.insert(finding.fingerprint.clone()) {
            out.push(finding);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::regex_detector::RegexDetector;
    use crate::error::DetectorError;

    struct AlwaysFailsDetector;

    impl Detector for AlwaysFailsDetector {
        fn name(&self) -> &'static str {
            "always-fails"
        }

        fn detect(&self, _content: &str, _path: &str) -> Result<Vec<Finding>, DetectorError> {
            Err(DetectorError::Request("boom".into()))
        }
    }

    #[test]
    fn swallows_detector_errors_and_returns_other_findings() {
        let orchestrator = DetectionOrchestrator::new(
            vec![Box::new(RegexDetector::new()), Box::new(AlwaysFailsDetector)],
            None,
        );
        let findings = orchestrator.detect("const e = \"x@y.com\";", "a.ts");
        assert!(findings.iter().any(|f| f.rule_id == "PII-001"));
    }

    #[test]
    fn without_llm_detector_returns_local_only() {
        let orchestrator = DetectionOrchestrator::new(vec![Box::new(RegexDetector::new())], None);
        let findings = orchestrator.detect("const e = \"x@y.com\";", "a.ts");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn dedup_prefers_local_over_llm_for_same_fingerprint() {
        let fp = Finding::fingerprint("PII-001", "a.ts", 1);
        let local = vec![Finding {
            id: 0,
            rule_id: "PII-001".into(),
            category: crate::finding::Category::PiiEmail,
            severity: crate::finding::Severity::Medium,
            file: "a.ts".into(),
            line: 1,
            column: None,
            snippet: "local".into(),
            message: "local".into(),
            suggestion: None,
            legal_reference: None,
            detector: crate::finding::DetectorKind::Regex,
            fingerprint: fp.clone(),
            confidence: 1.0,
        }];
        let llm = vec![Finding {
            id: 0,
            rule_id: "PII-001".into(),
            category: crate::finding::Category::PiiEmail,
            severity: crate::finding::Severity::Medium,
            file: "a.ts".into(),
            line: 1,
            column: None,
            snippet: "llm".into(),
            message: "llm".into(),
            suggestion: None,
            legal_reference: None,
            detector: crate::finding::DetectorKind::Llm,
            fingerprint: fp,
            confidence: 0.9,
        }];

        let merged = dedup_by_fingerprint(local, llm);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].detector, crate::finding::DetectorKind::Regex);
    }

    #[test]
    fn build_snippet_clamps_to_file_bounds() {
        let content = "a\nb\nc";
        let finding = Finding {
            id: 0,
            rule_id: "X".into(),
            category: crate::finding::Category::UnknownRisk,
            severity: crate::finding::Severity::Low,
            file: "a.ts".into(),
            line: 1,
            column: None,
            snippet: String::new(),
            message: String::new(),
            suggestion: None,
            legal_reference: None,
            detector: crate::finding::DetectorKind::Regex,
            fingerprint: String::new(),
            confidence: 0.5,
        };
        let snippet = build_snippet(content, "a.ts", &finding);
        assert_eq!(snippet.line_start, 1);
        assert_eq!(snippet.line_end, 3);
    }
}
