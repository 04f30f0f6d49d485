//! Stable, 2-space-indented JSON output.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::finding::{Category, Severity};
use crate::pipeline::{AuditResult, WaiverCounts};

use super::{EmitOptions, truncate};

#[derive(Serialize)]
struct JsonReport<'a> {
    findings: &'a [crate::finding::Finding],
    summary: JsonSummary<'a>,
    truncated: usize,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    total: usize,
    files_scanned: usize,
    scanned_lines: usize,
    findings_waived: usize,
    by_severity: &'a BTreeMap<Severity, usize>,
    by_category: &'a BTreeMap<Category, usize>,
    by_detector: &'a BTreeMap<crate::finding::DetectorKind, usize>,
    detectors: &'a [&'static str],
    waivers: &'a WaiverCounts,
    duration_ms: u64,
}

pub fn render(result: &AuditResult, options: &EmitOptions) -> String {
    let (visible, dropped) = truncate(&result.findings, options.max_findings);

    let report = JsonReport {
        findings: if options.quiet || options.summary { &[] } else { visible },
        summary: JsonSummary {
            total: result.summary.waivers.new,
            files_scanned: result.summary.files_scanned,
            scanned_lines: result.summary.scanned_lines,
            findings_waived: result.summary.findings_waived,
            by_severity: &result.summary.by_severity,
            by_category: &result.summary.by_category,
            by_detector: &result.summary.by_detector,
            detectors: &result.summary.detectors,
            waivers: &result.summary.waivers,
            duration_ms: result.summary.duration_ms,
        },
        truncated: dropped,
    };

    serde_json::to_string_pretty(&report).expect("JsonReport is always serializable")
}
