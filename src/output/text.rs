//! Human-readable text output, cargo-style: colorized when stdout is a
//! terminal, plain when redirected (handled by `anstream` transparently).
//!
//! Sectioned as `FINDINGS` / `SUMMARY` / `SCAN INFO`. Quiet mode collapses
//! all three into one line per critical finding; summary mode suppresses
//! only `FINDINGS`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use owo_colors::OwoColorize;

use crate::finding::Severity;
use crate::pipeline::AuditResult;

use super::{EmitOptions, GroupBy, group_key, truncate};

pub fn render(result: &AuditResult, options: &EmitOptions) -> String {
    let mut out = String::new();

    // Quiet mode emits only a single line per critical finding — no section
    // headers, no snippets, no summary.
    if options.quiet {
        let (visible, _dropped) = truncate(&result.findings, options.max_findings);
        for finding in visible.iter().filter(|f| f.severity == Severity::Critical) {
            let _ = writeln!(out, "{}", finding_line(finding));
        }
        return out;
    }

    if !options.summary {
        render_findings(&mut out, result, options);
    }
    render_summary(&mut out, result);
    render_scan_info(&mut out, result);
    out
}

fn render_findings(out: &mut String, result: &AuditResult, options: &EmitOptions) {
    let (visible, dropped) = truncate(&result.findings, options.max_findings);

    let _ = writeln!(out, "{}", "FINDINGS".bold().underline());

    let mut groups: BTreeMap<String, Vec<&crate::finding::Finding>> = BTreeMap::new();
    for finding in visible {
        groups.entry(group_key(finding, options.group_by)).or_default().push(finding);
    }

    for (group, findings) in &groups {
        let header = if options.group_by == GroupBy::File {
            group.clone()
        } else {
            group.to_uppercase()
        };
        let _ = writeln!(out, "{}", header.bold());
        for finding in findings {
            let _ = writeln!(out, "  {}", finding_line(finding));
            if !finding.snippet.is_empty() {
                let _ = writeln!(out, "    {}", finding.snippet.dimmed());
            }
        }
    }

    if dropped > 0 {
        let _ = writeln!(out, "{dropped} more … use --max-findings 0");
    }
    let _ = writeln!(out);
}

fn finding_line(finding: &crate::finding::Finding) -> String {
    format!(
        "{severity} {rule_id} {file}:{line} — {message}",
        severity = severity_label(finding.severity),
        rule_id = finding.rule_id,
        file = finding.file,
        line = finding.line,
        message = finding.message,
    )
}

fn render_summary(out: &mut String, result: &AuditResult) {
    let summary = &result.summary;
    let _ = writeln!(out, "{}", "SUMMARY".bold().underline());

    if result.findings.is_empty() {
        let _ = writeln!(out, "{}", "No findings to report. Good job!".green());
        let _ = writeln!(out);
        return;
    }

    let _ = writeln!(
        out,
        "{nfindings} finding{s} across {nfiles} file{fs} ({nwaived} waived, {ms}ms)",
        nfindings = result.findings.len().to_string().bold(),
        s = if result.findings.len() == 1 { "" } else { "s" },
        nfiles = summary.files_scanned,
        fs = if summary.files_scanned == 1 { "" } else { "s" },
        nwaived = summary.findings_waived,
        ms = summary.duration_ms,
    );

    for severity in Severity::ALL {
        if let Some(count) = summary.by_severity.get(&severity) {
            let _ = writeln!(out, "  {}: {count}", severity_label(severity));
        }
    }
    let _ = writeln!(out);
}

fn render_scan_info(out: &mut String, result: &AuditResult) {
    let summary = &result.summary;
    let _ = writeln!(out, "{}", "SCAN INFO".bold().underline());
    let _ = writeln!(
        out,
        "files: {} | lines: {} | duration: {}ms",
        summary.files_scanned, summary.scanned_lines, summary.duration_ms
    );
    if !summary.detectors.is_empty() {
        let _ = writeln!(out, "detectors: {}", summary.detectors.join(", "));
    }
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Critical => "critical".red().bold().to_string(),
        Severity::High => "high".red().to_string(),
        Severity::Medium => "medium".yellow().to_string(),
        Severity::Low => "low".cyan().to_string(),
        Severity::Info => "info".purple().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Category, DetectorKind, Finding};
    use crate::pipeline::Summary;

    fn sample_result() -> AuditResult {
        let finding = Finding {
            id: 0,
            rule_id: "PII-001".into(),
            category: Category::PiiEmail,
            severity: Severity::Medium,
            file: "a.ts".into(),
            line: 3,
            column: None,
            snippet: "const e = \"x@y.com\";".into(),
            message: "email literal".into(),
            suggestion: None,
            legal_reference: None,
            detector: DetectorKind::Regex,
            fingerprint: "fp1".into(),
            confidence: 1.0,
        };
        let mut by_severity = BTreeMap::new();
        by_severity.insert(Severity::Medium, 1);
        AuditResult {
            findings: vec![finding],
            summary: Summary {
                files_scanned: 1,
                findings_total: 1,
                findings_waived: 0,
                by_severity,
                duration_ms: 5,
                ..Summary::default()
            },
        }
    }

    #[test]
    fn renders_finding_and_summary() {
        let result = sample_result();
        let out = render(&result, &EmitOptions::default());
        assert!(out.contains("FINDINGS"));
        assert!(out.contains("SUMMARY"));
        assert!(out.contains("SCAN INFO"));
        assert!(out.contains("PII-001"));
        assert!(out.contains("a.ts:3"));
        assert!(out.contains("1 finding"));
    }

    #[test]
    fn quiet_emits_only_critical_finding_lines() {
        let mut result = sample_result();
        result.findings[0].severity = Severity::Critical;
        let options = EmitOptions {
            quiet: true,
            ..EmitOptions::default()
        };
        let out = render(&result, &options);
        assert!(out.contains("PII-001"));
        assert!(!out.contains("SUMMARY"));
        assert!(!out.contains("SCAN INFO"));
    }

    #[test]
    fn quiet_omits_non_critical_findings() {
        let result = sample_result();
        let options = EmitOptions {
            quiet: true,
            ..EmitOptions::default()
        };
        let out = render(&result, &options);
        assert!(out.is_empty());
    }

    #[test]
    fn summary_mode_omits_findings_section() {
        let result = sample_result();
        let options = EmitOptions {
            summary: true,
            ..EmitOptions::default()
        };
        let out = render(&result, &options);
        assert!(!out.contains("FINDINGS"));
        assert!(!out.contains("PII-001"));
        assert!(out.contains("SUMMARY"));
        assert!(out.contains("SCAN INFO"));
    }

    #[test]
    fn group_by_severity_uppercases_header() {
        let result = sample_result();
        let options = EmitOptions {
            group_by: GroupBy::Severity,
            ..EmitOptions::default()
        };
        let out = render(&result, &options);
        assert!(out.contains("MEDIUM"));
    }

    #[test]
    fn empty_findings_reports_good_job() {
        let result = AuditResult {
            findings: vec![],
            summary: Summary::default(),
        };
        let out = render(&result, &EmitOptions::default());
        assert!(out.contains("Good job"));
    }
}
