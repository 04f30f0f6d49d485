//! Detection tiers: Regex (always on), Heuristic (opt-in), LLM (premium,
//! quota-gated). Each implements a single [`Detector`] capability and must
//! not observe another detector's output.

pub mod heuristic;
pub mod llm;
pub mod regex_detector;

use crate::error::DetectorError;
use crate::finding::Finding;

/// A single detector's capability: produce raw findings from file content.
///
/// `Send + Sync` so a [`crate::orchestrator::DetectionOrchestrator`] can be
/// shared across a bounded worker pool when the `parallel` feature is on.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, content: &str, path: &str) -> Result<Vec<Finding>, DetectorError>;
}

/// Context fed to the LLM detector: at most a handful of lines of
/// surrounding context per candidate, never a whole file.
#[derive(Clone, Debug)]
pub struct CodeSnippet {
    pub file: String,
    pub line_start: u32,
    pub line_end: u32,
    pub language: String,
    pub content: String,
    pub heuristic_tags: Vec<String>,
}

/// Derives a language tag from a file extension.
pub fn language_for_path(path: &str) -> String {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" => "javascript",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "rs" => "rust",
        "rb" => "ruby",
        _ => "unknown",
    }
    .to_string()
}

/// Computes the 1-based line number for a byte offset within `content`:
/// `1 + count('\n' before offset)`.
pub fn line_for_offset(content: &str, offset: usize) -> u32 {
    1 + content.as_bytes()[..offset.min(content.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u32
}

/// Extracts the full line containing `offset`, trimmed.
pub fn containing_line(content: &str, offset: usize) -> &str {
    let start = content[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = content[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(content.len());
    content[start..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_mapping_covers_known_extensions() {
        assert_eq!(language_for_path("a/b.ts"), "typescript");
        assert_eq!(language_for_path("a/b.py"), "python");
        assert_eq!(language_for_path("a/b.xyz"), "unknown");
    }

    #[test]
    fn line_for_offset_counts_newlines() {
        let content = "line1\nline2\nline3";
        assert_eq!(line_for_offset(content, 0), 1);
        assert_eq!(line_for_offset(content, 6), 2);
        assert_eq!(line_for_offset(content, 12), 3);
    }

    #[test]
    fn containing_line_extracts_and_trims() {
        let content = "a\n  const e = \"x@y.com\";  \nb";
        let offset = content.find("const").unwrap();
        assert_eq!(containing_line(content, offset), "const e = \"x@y.com\";");
    }
}
