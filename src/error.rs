//! Crate-wide error taxonomy.
//!
//! Every component gets its own `thiserror` enum; `anyhow` is reserved for
//! the CLI boundary (see `main.rs`), never used inside library code.

use thiserror::Error;

/// Uniform error taxonomy for [`crate::file_access::FileAccess`] backends.
#[derive(Debug, Error)]
pub enum FileAccessError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("read error: {0}")]
    ReadError(String),

    #[error("network error: {0}")]
    NetworkError(String),
}

impl FileAccessError {
    /// `exists` returns `false` only for `FILE_NOT_FOUND`; any other error
    /// must surface.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileAccessError::NotFound(_))
    }
}

/// Errors surfaced while resolving an audit's scope.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error(transparent)]
    FileAccess(#[from] FileAccessError),

    #[error("version control command failed: {0}")]
    VersionControl(String),
}

/// Errors surfaced while a single detector runs over a single file.
///
/// Swallowed per-file by the orchestrator; the type exists so detector
/// implementations have something concrete to `?`-propagate internally
/// before the orchestrator decides to swallow it.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("llm detector quota exhausted or endpoint unreachable")]
    QuotaDenied,

    #[error("llm detector request failed: {0}")]
    Request(String),
}

/// Errors surfaced while loading waivers from the Record Store.
#[derive(Debug, Error)]
pub enum WaiverError {
    #[error("record store failed: {0}")]
    RecordStore(String),
}

/// Errors that abort an `audit` call outright, surfacing to the caller
/// rather than being swallowed per-file.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("initialization error: {0}")]
    Init(String),
}

/// Precondition and persistence errors for [`crate::waiver_author::WaiverAuthor`].
#[derive(Debug, Error)]
pub enum WaiverAuthorError {
    #[error("justification is required to create a waiver")]
    MissingJustification,

    #[error("finding has no fingerprint")]
    MissingFingerprint,

    #[error("record store rejected the waiver: {0}")]
    RecordStore(String),
}

/// Errors surfaced while loading the optional `audit.yml` configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration syntax in {path}: {source}")]
    Syntax {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
