//! The optional VersionControl capability, used by [`crate::scope`] to
//! resolve `changed_since` scopes.

use std::collections::BTreeSet;
use std::process::Command;

/// The result of running a version-control subprocess.
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// `exec(argv) → {exit_code, stdout, stderr}`, sufficient to run the three
/// commands this capability needs: `diff --name-only`, `status --porcelain`,
/// and `ls-files --others --exclude-standard`.
pub trait VersionControl {
    fn exec(&self, argv: &[&str]) -> anyhow::Result<ExecOutput>;

    /// Computes the changed-path set for `changed_since..HEAD`: the
    /// committed diff, union staged+unstaged modifications, union
    /// untracked-but-not-ignored paths.
    fn changed_since(&self, changed_since: &str) -> anyhow::Result<BTreeSet<String>> {
        let mut changed = BTreeSet::new();

        let diff = self.exec(&["diff", "--name-only", &format!("{changed_since}..HEAD")])?;
        changed.extend(lines(&diff.stdout));

        let status = self.exec(&["status", "--porcelain"])?;
        changed.extend(parse_porcelain(&status.stdout));

        let untracked = self.exec(&["ls-files", "--others", "--exclude-standard"])?;
        changed.extend(lines(&untracked.stdout));

        Ok(changed)
    }
}

fn lines(s: &str) -> impl Iterator<Item = String> + '_ {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
}

fn parse_porcelain(s: &str) -> impl Iterator<Item = String> + '_ {
    s.lines().filter_map(|line| {
        if line.len() < 4 {
            return None;
        }
        // `XY path` or `XY orig -> new`; we only care about the final path.
        let rest = line[3..].trim();
        let path = rest.rsplit(" -> ").next().unwrap_or(rest);
        Some(path.to_string())
    })
}

/// Shells out to the system `git` binary, implementing `exec(argv)`
/// directly against a real repository.
pub struct GitVersionControl {
    pub repo_dir: String,
}

impl GitVersionControl {
    pub fn new(repo_dir: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }
}

impl VersionControl for GitVersionControl {
    fn exec(&self, argv: &[&str]) -> anyhow::Result<ExecOutput> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(argv)
            .output()?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeVcs {
        diff: &'static str,
        status: &'static str,
        untracked: &'static str,
    }

    impl VersionControl for FakeVcs {
        fn exec(&self, argv: &[&str]) -> anyhow::Result<ExecOutput> {
            let stdout = match argv[0] {
                "diff" => self.diff,
                "status" => self.status,
                "ls-files" => self.untracked,
                _ => "",
            };
            Ok(ExecOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn unions_diff_status_and_untracked() {
        let vcs = FakeVcs {
            diff: "src/a.ts\nsrc/b.ts\n",
            status: " M src/c.ts\n?? ignored_by_status.ts\n",
            untracked: "src/d.ts\n",
        };

        let changed = vcs.changed_since("main").unwrap();
        assert!(changed.contains("src/a.ts"));
        assert!(changed.contains("src/b.ts"));
        assert!(changed.contains("src/c.ts"));
        assert!(changed.contains("src/d.ts"));
    }

    #[test]
    fn parses_rename_porcelain_lines() {
        let parsed: Vec<_> = parse_porcelain("R  old.ts -> new.ts\n").collect();
        assert_eq!(parsed, vec!["new.ts".to_string()]);
    }
}
