//! Local-disk [`FileAccess`] backend, bounded to a `base_dir`.

use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;

use super::{FileAccess, ListOptions, Stat};
use crate::error::FileAccessError;

/// Reads from local disk, rejecting any path that escapes `base_dir`.
pub struct LocalFileAccess {
    base_dir: Utf8PathBuf,
}

impl LocalFileAccess {
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolves `path` (repo-relative) against `base_dir`, rejecting any
    /// escape with `INVALID_PATH`.
    fn resolve(&self, path: &str) -> Result<PathBuf, FileAccessError> {
        let candidate = self.base_dir.as_std_path().join(path);

        let base_abs = std::fs::canonicalize(self.base_dir.as_std_path())
            .unwrap_or_else(|_| self.base_dir.as_std_path().to_path_buf());

        // Canonicalizing the candidate directly would fail for paths that
        // don't exist yet; instead we lexically normalize the joined path
        // and check containment, which is sufficient to catch `..` escapes.
        let normalized = normalize_lexically(&candidate);

        if !normalized.starts_with(&base_abs) && !normalized.starts_with(self.base_dir.as_std_path())
        {
            return Err(FileAccessError::InvalidPath(path.to_string()));
        }

        Ok(normalized)
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl FileAccess for LocalFileAccess {
    fn list(
        &self,
        patterns: &[String],
        options: &ListOptions,
    ) -> Result<Vec<String>, FileAccessError> {
        if patterns.is_empty() {
            return Ok(vec![]);
        }

        let mut overrides = OverrideBuilder::new(self.base_dir.as_std_path());
        for pattern in patterns {
            overrides
                .add(pattern)
                .map_err(|e| FileAccessError::InvalidPath(e.to_string()))?;
        }
        for pattern in &options.ignore {
            let negated = format!("!{pattern}");
            overrides
                .add(&negated)
                .map_err(|e| FileAccessError::InvalidPath(e.to_string()))?;
        }
        let overrides = overrides
            .build()
            .map_err(|e| FileAccessError::InvalidPath(e.to_string()))?;

        let mut builder = WalkBuilder::new(self.base_dir.as_std_path());
        builder.overrides(overrides).hidden(false);
        if let Some(depth) = options.max_depth {
            builder.max_depth(Some(depth));
        }

        let mut results = Vec::new();
        for entry in builder.build() {
            let entry = entry.map_err(|e| FileAccessError::ReadError(e.to_string()))?;
            let file_type = entry.file_type();
            if options.only_files && file_type.is_some_and(|t| !t.is_file()) {
                continue;
            }

            let path = entry.path();
            if path == self.base_dir.as_std_path() {
                continue;
            }

            let rel = path
                .strip_prefix(self.base_dir.as_std_path())
                .unwrap_or(path);

            let rendered = if options.absolute {
                path.to_string_lossy().to_string()
            } else {
                rel.to_string_lossy().replace('\\', "/")
            };

            results.push(rendered);
        }

        results.sort();
        Ok(results)
    }

    fn read(&self, path: &str) -> Result<String, FileAccessError> {
        let resolved = self.resolve(path)?;
        match std::fs::read(&resolved) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FileAccessError::NotFound(path.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(FileAccessError::PermissionDenied(path.to_string()))
            }
            Err(err) => Err(FileAccessError::ReadError(err.to_string())),
        }
    }

    fn stat(&self, path: &str) -> Result<Stat, FileAccessError> {
        let resolved = self.resolve(path)?;
        match std::fs::metadata(&resolved) {
            Ok(meta) => Ok(Stat {
                size: meta.len(),
                mtime: meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64),
                is_file: meta.is_file(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FileAccessError::NotFound(path.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(FileAccessError::PermissionDenied(path.to_string()))
            }
            Err(err) => Err(FileAccessError::ReadError(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_escaping_base_dir() {
        let dir = tempdir();
        let access = LocalFileAccess::new(Utf8PathBuf::from_path_buf(dir.clone()).unwrap());
        let err = access.read("../../etc/passwd").unwrap_err();
        assert!(matches!(err, FileAccessError::InvalidPath(_)));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn reads_file_within_base_dir() {
        let dir = tempdir();
        std::fs::write(dir.join("a.txt"), "hello").unwrap();
        let access = LocalFileAccess::new(Utf8PathBuf::from_path_buf(dir.clone()).unwrap());
        assert_eq!(access.read("a.txt").unwrap(), "hello");
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir();
        let access = LocalFileAccess::new(Utf8PathBuf::from_path_buf(dir.clone()).unwrap());
        let err = access.read("missing.txt").unwrap_err();
        assert!(err.is_not_found());
        std::fs::remove_dir_all(dir).ok();
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "gitgov-audit-test-{}",
            std::process::id().wrapping_add(line!())
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
