//! Configuration discovery: an optional `audit.yml` file layered underneath
//! CLI flags and environment variables, found by walking up from the scan
//! root to the first recognized config filename or the repository root.

use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::detectors::llm::LlmConfig;
use crate::error::ConfigError;
use crate::gate::FailOn;

const CONFIG_CANDIDATES: &[&str] = &[".gitgov/audit.yml", ".gitgov/audit.yaml", "audit.yml", "audit.yaml"];

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DetectorsConfig {
    pub regex: bool,
    pub heuristic: bool,
    pub llm: LlmConfig,
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        Self {
            regex: true,
            heuristic: false,
            llm: LlmConfig::default(),
        }
    }
}

/// The shape of an `audit.yml` configuration file.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct AuditorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub fail_on: FailOn,
    pub detectors: DetectorsConfig,
    pub max_findings: Option<usize>,
    /// The commit-ish used as `--scope baseline`'s `changed_since` ref.
    pub baseline_ref: Option<String>,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include: vec!["**/*".to_string()],
            exclude: vec![],
            fail_on: FailOn::High,
            detectors: DetectorsConfig::default(),
            max_findings: None,
            baseline_ref: None,
        }
    }
}

impl AuditorConfig {
    fn load(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Walks from `start_dir` up to the filesystem root (or the first
    /// `.git` directory) looking for a recognized config filename.
    pub fn discover(start_dir: &Utf8Path) -> Result<Self, ConfigError> {
        let mut candidate_dir = start_dir;

        loop {
            for candidate in CONFIG_CANDIDATES {
                let candidate_path = candidate_dir.join(candidate);
                if candidate_path.is_file() {
                    let contents = fs::read_to_string(&candidate_path).map_err(|source| ConfigError::Io {
                        path: candidate_path.to_string(),
                        source,
                    })?;
                    return Self::load(&contents).map_err(|source| ConfigError::Syntax {
                        path: candidate_path.to_string(),
                        source,
                    });
                }
            }

            if candidate_dir.join(".git").is_dir() {
                return Ok(Self::default());
            }

            match candidate_dir.parent() {
                Some(parent) => candidate_dir = parent,
                None => return Ok(Self::default()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_regex_only() {
        let config = AuditorConfig::default();
        assert!(config.detectors.regex);
        assert!(!config.detectors.heuristic);
        assert!(!config.detectors.llm.enabled);
    }

    #[test]
    fn loads_minimal_yaml() {
        let yaml = "fail-on: critical\ninclude:\n  - \"src/**\"\n";
        let config = AuditorConfig::load(yaml).unwrap();
        assert_eq!(config.fail_on, FailOn::Critical);
        assert_eq!(config.include, vec!["src/**".to_string()]);
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = "bogus-field: true\n";
        assert!(AuditorConfig::load(yaml).is_err());
    }

    #[test]
    fn discover_falls_back_to_default_when_absent() {
        let dir = std::env::temp_dir();
        let unique = dir.join(format!("gitgov-audit-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&unique).unwrap();
        let utf8_dir = camino::Utf8PathBuf::from_path_buf(unique.clone()).unwrap();

        let config = AuditorConfig::discover(&utf8_dir).unwrap();
        assert!(config.enabled);

        std::fs::remove_dir_all(&unique).ok();
    }
}
