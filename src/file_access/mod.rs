//! Backend-pluggable file access.
//!
//! A single capability trait with interchangeable concrete
//! implementations, none of which share a concrete layout.

pub mod local;
pub mod memory;
pub mod remote;

use crate::error::FileAccessError;

/// Options for [`FileAccess::list`].
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    pub ignore: Vec<String>,
    pub only_files: bool,
    pub absolute: bool,
    pub max_depth: Option<usize>,
}

/// File metadata returned by [`FileAccess::stat`].
#[derive(Clone, Copy, Debug)]
pub struct Stat {
    pub size: u64,
    pub mtime: Option<i64>,
    pub is_file: bool,
}

/// Uniform read/list/exists/stat capability over a file tree, backend-pluggable.
pub trait FileAccess {
    fn list(
        &self,
        patterns: &[String],
        options: &ListOptions,
    ) -> Result<Vec<String>, FileAccessError>;

    /// Returns `Ok(false)` only for `FILE_NOT_FOUND`; any other failure
    /// surfaces as an `Err` rather than being folded into `false`.
    fn exists(&self, path: &str) -> Result<bool, FileAccessError> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn read(&self, path: &str) -> Result<String, FileAccessError>;

    fn stat(&self, path: &str) -> Result<Stat, FileAccessError>;
}
