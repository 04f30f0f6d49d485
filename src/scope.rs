//! The scope resolver: turns an audit request into a concrete file list.

use crate::error::ScopeError;
use crate::file_access::{FileAccess, ListOptions};
use crate::vcs::VersionControl;

/// What to scan, what to skip, and an optional changed-since narrowing.
#[derive(Clone, Debug, Default)]
pub struct ScopeRequest {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub changed_since: Option<String>,
    pub base_dir: Option<String>,
}

/// Turns a [`ScopeRequest`] into a stable, sorted list of repo-relative
/// file paths.
pub struct ScopeResolver<'a> {
    file_access: &'a dyn FileAccess,
    version_control: Option<&'a dyn VersionControl>,
    /// Ignore-file patterns are always discovered relative to this path;
    /// supplied separately from the file-access backend so ignore-file
    /// content can be read through the same capability.
    ignore_file_reader: &'a dyn FileAccess,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(file_access: &'a dyn FileAccess, version_control: Option<&'a dyn VersionControl>) -> Self {
        Self {
            file_access,
            version_control,
            ignore_file_reader: file_access,
        }
    }

    pub fn resolve(&self, request: &ScopeRequest) -> Result<Vec<String>, ScopeError> {
        // Step 1: empty include resolves to zero files, no implicit default.
        if request.include.is_empty() {
            return Ok(vec![]);
        }

        // Step 2: ignore-file patterns, prepended to exclude.
        let mut exclude = load_ignore_file_patterns(self.ignore_file_reader);
        exclude.extend(request.exclude.iter().cloned());

        let options = ListOptions {
            ignore: exclude,
            only_files: true,
            absolute: false,
            max_depth: None,
        };

        let listed = self.file_access.list(&request.include, &options)?;

        // Step 3: intersect with VCS-changed set if requested and available.
        if let Some(changed_since) = &request.changed_since {
            if let Some(vcs) = self.version_control {
                let changed = vcs
                    .changed_since(changed_since)
                    .map_err(|e| ScopeError::VersionControl(e.to_string()))?;

                let mut intersected: Vec<String> = listed
                    .into_iter()
                    .filter(|path| changed.contains(path))
                    .collect();
                intersected.sort();
                return Ok(intersected);
            }
            // VersionControl unavailable: silently degrade to a full listing
            // rather than hard-error, since `changed_since` is a narrowing,
            // not a guarantee.
            tracing::debug!(changed_since, "version control unavailable, degrading to full listing");
        }

        // Step 4: full listing, already sorted ascending by the backend's
        // own list() contract; sort defensively in case a backend doesn't.
        let mut listed = listed;
        listed.sort();
        Ok(listed)
    }
}

/// Translates ignore-file lines (e.g. `.gitignore`-style content) into
/// glob exclude patterns:
///
/// - comments (`#...`) and blank lines are dropped
/// - trailing-slash entries become `**/<pat>**`
/// - entries without a slash become `**/<pat>`
/// - entries with slashes are used as-is
fn load_ignore_file_patterns(file_access: &dyn FileAccess) -> Vec<String> {
    const CANDIDATES: &[&str] = &[".gitignore", ".auditignore"];

    let mut patterns = Vec::new();
    for candidate in CANDIDATES {
        if let Ok(content) = file_access.read(candidate) {
            patterns.extend(translate_ignore_file(&content));
        }
    }
    patterns
}

pub fn translate_ignore_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(translate_ignore_line)
        .collect()
}

fn translate_ignore_line(line: &str) -> String {
    if let Some(dir) = line.strip_suffix('/') {
        format!("**/{dir}**")
    } else if !line.contains('/') {
        format!("**/{line}")
    } else {
        line.to_string()
    }
}
