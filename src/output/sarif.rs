//! SARIF 2.1.0 output, built with `serde-sarif`'s typed builders.

use std::collections::HashSet;

use serde_sarif::sarif::{
    ArtifactLocation, Invocation, Location as SarifLocation, Message, MultiformatMessageString,
    PhysicalLocation, PropertyBag, Region, ReportingDescriptor, Result as SarifResult, ResultKind,
    ResultLevel, Run, Sarif, Tool, ToolComponent,
};

use crate::finding::{Finding, Severity};
use crate::pipeline::AuditResult;

use super::{EmitOptions, truncate};

const TOOL_NAME: &str = "gitgov-audit";

impl From<Severity> for ResultLevel {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Critical | Severity::High => ResultLevel::Error,
            Severity::Medium => ResultLevel::Warning,
            Severity::Low => ResultLevel::Note,
            Severity::Info => ResultLevel::None,
        }
    }
}

impl From<Severity> for ResultKind {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Critical | Severity::High | Severity::Medium | Severity::Low => ResultKind::Fail,
            Severity::Info => ResultKind::Review,
        }
    }
}

pub fn render(result: &AuditResult, options: &EmitOptions) -> String {
    let (visible, _dropped) = truncate(&result.findings, options.max_findings);
    let sarif = build(visible);
    serde_json::to_string_pretty(&sarif).expect("Sarif is always serializable")
}

fn build(findings: &[Finding]) -> Sarif {
    Sarif::builder()
        .version("2.1.0")
        .schema(
            "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        )
        .runs([build_run(findings)])
        .build()
}

fn build_run(findings: &[Finding]) -> Run {
    Run::builder()
        .tool(
            Tool::builder()
                .driver(
                    ToolComponent::builder()
                        .name(TOOL_NAME)
                        .version(env!("CARGO_PKG_VERSION"))
                        .rules(build_rules(findings))
                        .build(),
                )
                .build(),
        )
        .results(build_results(findings))
        .invocations([Invocation::builder().execution_successful(true).build()])
        .build()
}

fn build_rules(findings: &[Finding]) -> Vec<ReportingDescriptor> {
    let mut seen = HashSet::new();
    findings
        .iter()
        .filter(|f| seen.insert(f.rule_id.clone()))
        .map(build_rule)
        .collect()
}

fn build_rule(finding: &Finding) -> ReportingDescriptor {
    ReportingDescriptor::builder()
        .id(finding.rule_id.clone())
        .name(finding.rule_id.clone())
        .help(
            MultiformatMessageString::builder()
                .text(finding.message.clone())
                .build(),
        )
        .build()
}

fn build_results(findings: &[Finding]) -> Vec<SarifResult> {
    findings.iter().map(build_result).collect()
}

fn build_result(finding: &Finding) -> SarifResult {
    SarifResult::builder()
        .rule_id(finding.rule_id.clone())
        .message(
            Message::builder()
                .text(finding.message.clone())
                .build(),
        )
        .locations([build_location(finding)])
        .level(ResultLevel::from(finding.severity))
        .kind(ResultKind::from(finding.severity))
        .fingerprints([("gitgov/v1".to_string(), finding.fingerprint.clone())])
        .properties(
            PropertyBag::builder()
                .additional_properties([(
                    "confidence".to_string(),
                    serde_json::json!(finding.confidence),
                )])
                .build(),
        )
        .build()
}

fn build_location(finding: &Finding) -> SarifLocation {
    let mut region = Region::builder().start_line(finding.line as i64);
    if let Some(column) = finding.column {
        region = region.start_column(column as i64);
    }

    SarifLocation::builder()
        .physical_location(
            PhysicalLocation::builder()
                .artifact_location(ArtifactLocation::builder().uri(finding.file.clone()).build())
                .region(region.build())
                .build(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Category, DetectorKind};
    use crate::pipeline::Summary;

    fn sample() -> AuditResult {
        AuditResult {
            findings: vec![Finding {
                id: 0,
                rule_id: "PII-001".into(),
                category: Category::PiiEmail,
                severity: Severity::High,
                file: "a.ts".into(),
                line: 3,
                column: None,
                snippet: String::new(),
                message: "email literal".into(),
                suggestion: None,
                legal_reference: None,
                detector: DetectorKind::Regex,
                fingerprint: "fp1".into(),
                confidence: 1.0,
            }],
            summary: Summary::default(),
        }
    }

    #[test]
    fn renders_sarif_with_expected_shape() {
        let out = render(&sample(), &EmitOptions::default());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["version"], "2.1.0");
        assert_eq!(value["runs"][0]["tool"]["driver"]["name"], TOOL_NAME);
        assert_eq!(value["runs"][0]["results"][0]["ruleId"], "PII-001");
        assert_eq!(
            value["runs"][0]["results"][0]["fingerprints"]["gitgov/v1"],
            "fp1"
        );
    }
}
