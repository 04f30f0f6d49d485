//! A static source auditor for PII, credentials, and unsafe logging
//! exposure, with waiver-aware CI gating.

pub mod actor;
pub mod config;
pub mod detectors;
pub mod error;
pub mod file_access;
pub mod finding;
pub mod gate;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod record_store;
pub mod rule;
pub mod scope;
pub mod vcs;
pub mod waiver;
pub mod waiver_author;

pub use error::{ConfigError, FileAccessError, PipelineError, ScopeError, WaiverAuthorError};
pub use finding::{Category, DetectorKind, Finding, Severity};
pub use pipeline::{AuditPipeline, AuditResult, Summary};
pub use scope::ScopeRequest;
pub use waiver::{Waiver, WaiverIndex};

/// Runs an audit against a content map directly, bypassing scope
/// resolution and any on-disk `FileAccess` backend. The entry point used by
/// editor integrations and other hosts that already hold file content in
/// memory.
pub fn audit_contents(
    files: &[(String, String)],
    detectors: Vec<Box<dyn detectors::Detector>>,
    llm_detector: Option<detectors::llm::LlmDetector>,
    waivers: &WaiverIndex,
) -> AuditResult {
    let orchestrator = orchestrator::DetectionOrchestrator::new(detectors, llm_detector);
    let file_access = file_access::memory::MemoryFileAccess::new(std::collections::BTreeMap::new());
    let pipeline = AuditPipeline::new(&file_access, None, &orchestrator, waivers);
    pipeline.audit_contents(files)
}
