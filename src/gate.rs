//! CI gate policy: turns a set of findings into a pass/fail decision and
//! process exit code.

use serde::{Deserialize, Serialize};

use crate::finding::Severity;
use crate::pipeline::AuditResult;

/// The minimum severity that causes a non-zero exit code. `None` never
/// fails the gate regardless of what was found.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    Critical,
    High,
    Medium,
    Low,
    None,
}

impl FailOn {
    fn threshold_rank(self) -> Option<u8> {
        match self {
            FailOn::Critical => Some(Severity::Critical.rank()),
            FailOn::High => Some(Severity::High.rank()),
            FailOn::Medium => Some(Severity::Medium.rank()),
            FailOn::Low => Some(Severity::Low.rank()),
            FailOn::None => None,
        }
    }
}

pub struct GatePolicy {
    pub fail_on: FailOn,
}

impl GatePolicy {
    pub fn new(fail_on: FailOn) -> Self {
        Self { fail_on }
    }

    /// Returns `true` when at least one finding meets or exceeds the
    /// configured threshold. `FailOn::None` never fails.
    pub fn should_fail(&self, result: &AuditResult) -> bool {
        let Some(threshold) = self.fail_on.threshold_rank() else {
            return false;
        };
        result
            .findings
            .iter()
            .any(|f| f.severity.rank() >= threshold)
    }

    /// Process exit code for the CLI: `1` on gate failure, else `0`.
    pub fn exit_code(&self, result: &AuditResult) -> i32 {
        if self.should_fail(result) {
            1
        } else {
            0
        }
    }
}
