//! The audit pipeline: scope resolution, detection, waiver filtering, and
//! summarization composed end to end.

use chrono::Utc;

use crate::error::PipelineError;
use crate::file_access::FileAccess;
use crate::finding::{Category, DetectorKind, Finding, Severity};
use crate::orchestrator::DetectionOrchestrator;
use crate::scope::{ScopeRequest, ScopeResolver};
use crate::vcs::VersionControl;
use crate::waiver::WaiverIndex;

/// Files are read and detected in batches of this size so a run over a very
/// large tree doesn't need to hold every file's content in memory at once.
const BATCH_SIZE: usize = 100;

/// Once the resolved scope exceeds this many files, batching kicks in.
const BATCH_THRESHOLD: usize = 1000;

/// Waiver accounting: how many retained-after-dedup findings were
/// acknowledged by an active waiver versus newly surfaced.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct WaiverCounts {
    pub acknowledged: usize,
    pub new: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Summary {
    pub files_scanned: usize,
    pub scanned_lines: usize,
    pub findings_total: usize,
    pub findings_waived: usize,
    pub by_severity: std::collections::BTreeMap<Severity, usize>,
    pub by_category: std::collections::BTreeMap<Category, usize>,
    pub by_detector: std::collections::BTreeMap<DetectorKind, usize>,
    pub detectors: Vec<&'static str>,
    pub waivers: WaiverCounts,
    pub duration_ms: u64,
}

pub struct AuditResult {
    pub findings: Vec<Finding>,
    pub summary: Summary,
}

/// Builds the histograms and detector list shared by `audit` and
/// `audit_contents`: `by_severity`/`by_category`/`by_detector` counts (I-R4)
/// and the sorted, deduped list of detectors that contributed at least one
/// retained finding (I-R5).
fn summarize(active: &[Finding]) -> (
    std::collections::BTreeMap<Severity, usize>,
    std::collections::BTreeMap<Category, usize>,
    std::collections::BTreeMap<DetectorKind, usize>,
    Vec<&'static str>,
) {
    let mut by_severity = std::collections::BTreeMap::new();
    let mut by_category: std::collections::BTreeMap<Category, usize> = std::collections::BTreeMap::new();
    let mut by_detector: std::collections::BTreeMap<DetectorKind, usize> = std::collections::BTreeMap::new();

    for f in active {
        *by_severity.entry(f.severity).or_insert(0) += 1;
        *by_category.entry(f.category).or_insert(0) += 1;
        *by_detector.entry(f.detector).or_insert(0) += 1;
    }

    let mut detectors: Vec<&'static str> = by_detector.keys().map(|d| d.as_str()).collect();
    detectors.sort_unstable();

    (by_severity, by_category, by_detector, detectors)
}

/// Counts lines in file content: `1 + count('\n')`, so a zero-length file
/// still counts as one line.
fn count_lines(content: &str) -> usize {
    1 + content.bytes().filter(|&b| b == b'\n').count()
}

pub struct AuditPipeline<'a> {
    file_access: &'a dyn FileAccess,
    version_control: Option<&'a dyn VersionControl>,
    orchestrator: &'a DetectionOrchestrator,
    waivers: &'a WaiverIndex,
}

impl<'a> AuditPipeline<'a> {
    pub fn new(
        file_access: &'a dyn FileAccess,
        version_control: Option<&'a dyn VersionControl>,
        orchestrator: &'a DetectionOrchestrator,
        waivers: &'a WaiverIndex,
    ) -> Self {
        Self {
            file_access,
            version_control,
            orchestrator,
            waivers,
        }
    }

    /// Resolves scope, reads and detects over every file, filters waived
    /// findings, and orders the result `(file, line, rule_id)` ascending.
    pub fn audit(&self, request: &ScopeRequest) -> Result<AuditResult, PipelineError> {
        let started = std::time::Instant::now();

        let resolver = ScopeResolver::new(self.file_access, self.version_control);
        let files = resolver.resolve(request)?;
        tracing::debug!(file_count = files.len(), "scope resolved");

        let mut findings = Vec::new();
        let mut scanned_lines = 0usize;
        for batch in files.chunks(batch_size_for(files.len())) {
            let contents: Vec<(&String, String)> = batch
                .iter()
                .filter_map(|path| match self.file_access.read(path) {
                    Ok(content) => Some((path, content)),
                    Err(err) => {
                        tracing::warn!(file = %path, error = %err, "failed to read file, excluding from scan");
                        None
                    }
                })
                .collect();
            for (_, content) in &contents {
                scanned_lines += count_lines(content);
            }
            findings.extend(self.detect_batch(&contents));
        }

        let files_scanned = files.len();
        let findings_total = findings.len();

        let now = Utc::now();
        let (active, waived): (Vec<_>, Vec<_>) = findings
            .into_iter()
            .partition(|f| !self.waivers.has_active(&f.fingerprint, now));
        let findings_waived = waived.len();

        let mut active = active;
        active.sort_by(|a, b| (a.file.as_str(), a.line, a.rule_id.as_str()).cmp(&(b.file.as_str(), b.line, b.rule_id.as_str())));

        let (by_severity, by_category, by_detector, detectors) = summarize(&active);

        let summary = Summary {
            files_scanned,
            scanned_lines,
            findings_total,
            findings_waived,
            by_severity,
            by_category,
            by_detector,
            detectors,
            waivers: WaiverCounts {
                acknowledged: findings_waived,
                new: active.len(),
            },
            duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            files_scanned = summary.files_scanned,
            findings_new = summary.waivers.new,
            findings_waived = summary.waivers.acknowledged,
            duration_ms = summary.duration_ms,
            "audit complete"
        );

        Ok(AuditResult {
            findings: active,
            summary,
        })
    }

    /// Runs detection over one read batch, restoring the batch's original
    /// order regardless of which path ran it. Sequential by default; with
    /// the `parallel` feature, farmed out over a bounded `rayon` pool.
    #[cfg(feature = "parallel")]
    fn detect_batch(&self, contents: &[(&String, String)]) -> Vec<Finding> {
        use rayon::prelude::*;

        // Capture just the orchestrator, not `self`, so this doesn't require
        // every `FileAccess`/`VersionControl` backend to be `Sync`.
        let orchestrator = self.orchestrator;
        contents
            .par_iter()
            .map(|(path, content)| orchestrator.detect(content, path))
            .flatten_iter()
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn detect_batch(&self, contents: &[(&String, String)]) -> Vec<Finding> {
        contents
            .iter()
            .flat_map(|(path, content)| self.orchestrator.detect(content, path))
            .collect()
    }

    /// Detects over in-memory content directly, bypassing scope resolution
    /// and the on-disk [`FileAccess`] read path entirely. Used by library
    /// callers that already hold file content (e.g. editor integrations)
    /// and by tests.
    pub fn audit_contents(&self, files: &[(String, String)]) -> AuditResult {
        let started = std::time::Instant::now();

        let mut findings = Vec::new();
        let mut scanned_lines = 0usize;
        for (path, content) in files {
            scanned_lines += count_lines(content);
            findings.extend(self.orchestrator.detect(content, path));
        }

        let findings_total = findings.len();
        let now = Utc::now();
        let (active, waived): (Vec<_>, Vec<_>) = findings
            .into_iter()
            .partition(|f| !self.waivers.has_active(&f.fingerprint, now));
        let findings_waived = waived.len();

        let mut active = active;
        active.sort_by(|a, b| (a.file.as_str(), a.line, a.rule_id.as_str()).cmp(&(b.file.as_str(), b.line, b.rule_id.as_str())));

        let (by_severity, by_category, by_detector, detectors) = summarize(&active);
        let findings_new = active.len();

        AuditResult {
            findings: active,
            summary: Summary {
                files_scanned: files.len(),
                scanned_lines,
                findings_total,
                findings_waived,
                by_severity,
                by_category,
                by_detector,
                detectors,
                waivers: WaiverCounts {
                    acknowledged: findings_waived,
                    new: findings_new,
                },
                duration_ms: started.elapsed().as_millis() as u64,
            },
        }
    }
}

fn batch_size_for(total_files: usize) -> usize {
    if total_files > BATCH_THRESHOLD {
        BATCH_SIZE
    } else {
        total_files.max(1)
    }
}
