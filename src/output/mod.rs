//! Findings emission: three output modes sharing one grouping and
//! truncation layer.

pub mod json;
pub mod sarif;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::finding::Finding;
use crate::pipeline::AuditResult;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Text,
    Json,
    Sarif,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    File,
    Severity,
    Category,
}

/// Shared rendering knobs across all three output formats.
#[derive(Clone, Debug)]
pub struct EmitOptions {
    pub quiet: bool,
    pub summary: bool,
    pub group_by: GroupBy,
    pub max_findings: Option<usize>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            summary: false,
            group_by: GroupBy::File,
            max_findings: None,
        }
    }
}

/// Truncates `findings` to `max_findings`, returning the visible slice and
/// the count of findings dropped from the tail. `Some(0)` means "no cap",
/// matching the CLI's own `--max-findings 0` convention.
pub fn truncate<'a>(findings: &'a [Finding], max_findings: Option<usize>) -> (&'a [Finding], usize) {
    match max_findings {
        Some(0) | None => (findings, 0),
        Some(max) if findings.len() > max => (&findings[..max], findings.len() - max),
        _ => (findings, 0),
    }
}

pub fn group_key(finding: &Finding, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::File => finding.file.clone(),
        GroupBy::Severity => format!("{:?}", finding.severity).to_lowercase(),
        GroupBy::Category => format!("{:?}", finding.category),
    }
}

/// Renders an [`AuditResult`] in the requested format to a `String`.
pub fn render(result: &AuditResult, format: OutputFormat, options: &EmitOptions) -> String {
    match format {
        OutputFormat::Text => text::render(result, options),
        OutputFormat::Json => json::render(result, options),
        OutputFormat::Sarif => sarif::render(result, options),
    }
}
