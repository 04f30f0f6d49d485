//! Remote (Git forge API) [`FileAccess`] backend.
//!
//! A minimal REST façade built directly on `reqwest` rather than a full
//! SDK, so the rest of the crate doesn't need to know about the forge's
//! object model.

use std::cell::RefCell;
use std::collections::HashMap;

use base64::Engine as _;
use serde::Deserialize;

use super::{FileAccess, ListOptions, Stat};
use crate::error::FileAccessError;

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: Option<String>,
    encoding: Option<String>,
    sha: String,
    size: u64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

/// Talks to a GitHub-forge-shaped REST API: one recursive tree listing
/// (cached for the backend's lifetime), per-file `contents` fetches, and a
/// `blob`-by-SHA fallback for entries whose content isn't inlined.
pub struct RemoteFileAccess {
    api_base: String,
    owner: String,
    repo: String,
    git_ref: String,
    token: Option<String>,
    /// An optional sub-path prefix, transparently applied to requests and
    /// stripped from results.
    prefix: Option<String>,
    client: reqwest::blocking::Client,
    tree_cache: RefCell<Option<HashMap<String, TreeEntry>>>,
}

impl RemoteFileAccess {
    pub fn new(
        api_base: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        git_ref: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            owner: owner.into(),
            repo: repo.into(),
            git_ref: git_ref.into(),
            token,
            prefix: None,
            client: reqwest::blocking::Client::new(),
            tree_cache: RefCell::new(None),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn full_path(&self, path: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }

    fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        match &self.prefix {
            Some(prefix) => path
                .strip_prefix(prefix.trim_end_matches('/'))
                .map(|rest| rest.trim_start_matches('/'))
                .unwrap_or(path),
            None => path,
        }
    }

    fn auth(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetches and caches the recursive tree listing. A truncated listing
    /// is a hard `READ_ERROR`: silently undercounting would corrupt scope.
    fn tree(&self) -> Result<HashMap<String, TreeEntry>, FileAccessError> {
        if let Some(cached) = self.tree_cache.borrow().as_ref() {
            return Ok(clone_tree(cached));
        }

        let url = format!(
            "{base}/repos/{owner}/{repo}/git/trees/{git_ref}?recursive=1",
            base = self.api_base,
            owner = self.owner,
            repo = self.repo,
            git_ref = self.git_ref,
        );

        let response = self
            .auth(self.client.get(&url))
            .send()
            .map_err(|e| FileAccessError::NetworkError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FileAccessError::NotFound(format!(
                "{owner}/{repo}@{git_ref}",
                owner = self.owner,
                repo = self.repo,
                git_ref = self.git_ref
            )));
        }

        let response = response
            .error_for_status()
            .map_err(|e| FileAccessError::NetworkError(e.to_string()))?;

        let body: TreeResponse = response
            .json()
            .map_err(|e| FileAccessError::ReadError(e.to_string()))?;

        if body.truncated {
            return Err(FileAccessError::ReadError(
                "remote tree listing was truncated".to_string(),
            ));
        }

        let map: HashMap<String, TreeEntry> = body
            .tree
            .into_iter()
            .map(|entry| (entry.path.clone(), entry))
            .collect();

        let snapshot = clone_tree(&map);
        *self.tree_cache.borrow_mut() = Some(map);
        Ok(snapshot)
    }

    fn fetch_blob(&self, sha: &str) -> Result<String, FileAccessError> {
        let url = format!(
            "{base}/repos/{owner}/{repo}/git/blobs/{sha}",
            base = self.api_base,
            owner = self.owner,
            repo = self.repo,
        );

        let response = self
            .auth(self.client.get(&url))
            .send()
            .map_err(|e| FileAccessError::NetworkError(e.to_string()))?
            .error_for_status()
            .map_err(|e| FileAccessError::NetworkError(e.to_string()))?;

        let body: BlobResponse = response
            .json()
            .map_err(|e| FileAccessError::ReadError(e.to_string()))?;

        decode_content(&body.content, &body.encoding)
    }

    fn fetch_contents(&self, full_path: &str) -> Result<String, FileAccessError> {
        let url = format!(
            "{base}/repos/{owner}/{repo}/contents/{path}?ref={git_ref}",
            base = self.api_base,
            owner = self.owner,
            repo = self.repo,
            path = full_path,
            git_ref = self.git_ref,
        );

        let response = self
            .auth(self.client.get(&url))
            .send()
            .map_err(|e| FileAccessError::NetworkError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FileAccessError::NotFound(full_path.to_string()));
        }

        let response = response
            .error_for_status()
            .map_err(|e| FileAccessError::NetworkError(e.to_string()))?;

        let body: ContentsResponse = response
            .json()
            .map_err(|e| FileAccessError::ReadError(e.to_string()))?;

        if body.kind != "file" {
            return Err(FileAccessError::ReadError(format!(
                "{full_path} is not a file"
            )));
        }

        match (body.content, body.encoding) {
            (Some(content), Some(encoding)) => decode_content(&content, &encoding),
            // Large files may not inline content; fall back to the blob endpoint.
            _ => self.fetch_blob(&body.sha),
        }
    }
}

fn decode_content(content: &str, encoding: &str) -> Result<String, FileAccessError> {
    if encoding != "base64" {
        return Err(FileAccessError::ReadError(format!(
            "unsupported content encoding: {encoding}"
        )));
    }

    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| FileAccessError::ReadError(e.to_string()))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn clone_tree(tree: &HashMap<String, TreeEntry>) -> HashMap<String, TreeEntry> {
    tree.iter()
        .map(|(k, v)| {
            (
                k.clone(),
                TreeEntry {
                    path: v.path.clone(),
                    kind: v.kind.clone(),
                    sha: v.sha.clone(),
                    size: v.size,
                },
            )
        })
        .collect()
}

impl FileAccess for RemoteFileAccess {
    fn list(
        &self,
        patterns: &[String],
        options: &ListOptions,
    ) -> Result<Vec<String>, FileAccessError> {
        if patterns.is_empty() {
            return Ok(vec![]);
        }

        let tree = self.tree()?;

        let includes = build_glob_set(patterns)?;
        let excludes = build_glob_set(&options.ignore)?;

        let mut results: Vec<String> = tree
            .values()
            .filter(|entry| !options.only_files || entry.kind == "blob")
            .map(|entry| self.strip_prefix(&entry.path).to_string())
            .filter(|path| {
                self.prefix.is_none() || tree.contains_key(&self.full_path(path))
            })
            .filter(|path| includes.is_match(path))
            .filter(|path| excludes.as_ref().is_none_or(|e| !e.is_match(path)))
            .collect();

        results.sort();
        results.dedup();
        Ok(results)
    }

    fn read(&self, path: &str) -> Result<String, FileAccessError> {
        let full_path = self.full_path(path);

        // Prefer the cached tree for existence/type checks, but always
        // fetch content fresh via the contents endpoint.
        if let Some(tree) = self.tree_cache.borrow().as_ref() {
            match tree.get(&full_path) {
                Some(entry) if entry.kind != "blob" => {
                    return Err(FileAccessError::ReadError(format!(
                        "{path} is not a file"
                    )));
                }
                None => return Err(FileAccessError::NotFound(path.to_string())),
                _ => {}
            }
        }

        self.fetch_contents(&full_path)
    }

    fn stat(&self, path: &str) -> Result<Stat, FileAccessError> {
        let full_path = self.full_path(path);
        let tree = self.tree()?;

        let entry = tree
            .get(&full_path)
            .ok_or_else(|| FileAccessError::NotFound(path.to_string()))?;

        Ok(Stat {
            size: entry.size.unwrap_or(0),
            mtime: None,
            is_file: entry.kind == "blob",
        })
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
    Ok(Some(
        builder
            .build()
            .map_err(|e| FileAccessError::InvalidPath(e.to_string()))?,
    ))
}

trait GitignoreMatch {
    fn is_match(&self, path: &str) -> bool;
}

impl GitignoreMatch for ignore::gitignore::Gitignore {
    fn is_match(&self, path: &str) -> bool {
        self.matched(path, false).is_ignore()
    }
}
