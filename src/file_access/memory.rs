//! In-memory [`FileAccess`] backend: an explicit path→content map.

use std::collections::BTreeMap;

use super::{FileAccess, ListOptions, Stat};
use crate::error::FileAccessError;

/// A fully in-memory file tree, useful for tests and for the pure
/// `audit_contents` entry point.
#[derive(Clone, Debug, Default)]
pub struct MemoryFileAccess {
    files: BTreeMap<String, String>,
}

impl MemoryFileAccess {
    pub fn new(files: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            files: files.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl FileAccess for MemoryFileAccess {
    fn list(
        &self,
        patterns: &[String],
        options: &ListOptions,
    ) -> Result<Vec<String>, FileAccessError> {
        if patterns.is_empty() {
            return Ok(vec![]);
        }

        let includes = build_glob_set(patterns)?;
        let excludes = build_glob_set(&options.ignore)?;

        let mut results: Vec<String> = self
            .files
            .keys()
            .filter(|path| includes.is_match(path.as_str()))
            .filter(|path| excludes.as_ref().is_none_or(|e| !e.is_match(path.as_str())))
            .cloned()
            .collect();

        results.sort();
        Ok(results)
    }

    fn read(&self, path: &str) -> Result<String, FileAccessError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FileAccessError::NotFound(path.to_string()))
    }

    fn stat(&self, path: &str) -> Result<Stat, FileAccessError> {
        self.files
            .get(path)
            .map(|content| Stat {
                size: content.len() as u64,
                mtime: None,
                is_file: true,
            })
            .ok_or_else(|| FileAccessError::NotFound(path.to_string()))
    }
}

fn build_glob_set(patterns: &[String]) -> Result<Option<ignore::gitignore::Gitignore>, FileAccessError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = ignore::gitignore::GitignoreBuilder::new(".");
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| FileAccessError::InvalidPath(e.to_string()))?;
    }
    let set = builder
        .build()
        .map_err(|e| FileAccessError::InvalidPath(e.to_string()))?;
    Ok(Some(set))
}

trait GitignoreMatch {
    fn is_match(&self, path: &str) -> bool;
}

impl GitignoreMatch for ignore::gitignore::Gitignore {
    fn is_match(&self, path: &str) -> bool {
        self.matched(path, false).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_matching_files_sorted() {
        let fa = MemoryFileAccess::new([
            ("src/b.ts".to_string(), "".to_string()),
            ("src/a.ts".to_string(), "".to_string()),
            ("README.md".to_string(), "".to_string()),
        ]);

        let files = fa
            .list(&["**/*.ts".to_string()], &ListOptions::default())
            .unwrap();
        assert_eq!(files, vec!["src/a.ts", "src/b.ts"]);
    }

    #[test]
    fn empty_include_yields_empty_list() {
        let fa = MemoryFileAccess::new([("a.ts".to_string(), "".to_string())]);
        let files = fa.list(&[], &ListOptions::default()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn exclude_removes_matches() {
        let fa = MemoryFileAccess::new([
            ("src/a.ts".to_string(), "".to_string()),
            ("src/a.test.ts".to_string(), "".to_string()),
        ]);
        let opts = ListOptions {
            ignore: vec!["**/*.test.ts".to_string()],
            ..Default::default()
        };
        let files = fa.list(&["**/*.ts".to_string()], &opts).unwrap();
        assert_eq!(files, vec!["src/a.ts"]);
    }
}
