//! Waivers: durable suppressions keyed by finding fingerprint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single suppression record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Waiver {
    pub fingerprint: String,
    pub justification: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Waiver {
    /// A waiver is active iff it has no expiry, or its expiry is in the
    /// future relative to `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// An in-memory lookup over the active waiver set, built once per audit run.
///
/// Records lacking fingerprint metadata (e.g. malformed feedback entries)
/// are skipped rather than treated as a hard error, since a waiver store is
/// an optional overlay and a single bad record should not abort the audit.
pub struct WaiverIndex {
    by_fingerprint: std::collections::HashMap<String, Waiver>,
}

impl WaiverIndex {
    pub fn new(waivers: Vec<Waiver>) -> Self {
        let by_fingerprint = waivers
            .into_iter()
            .map(|w| (w.fingerprint.clone(), w))
            .collect();
        Self { by_fingerprint }
    }

    pub fn has_active(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        self.by_fingerprint
            .get(fingerprint)
            .is_some_and(|w| w.is_active(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn waiver(fingerprint: &str, expires_at: Option<DateTime<Utc>>) -> Waiver {
        Waiver {
            fingerprint: fingerprint.to_string(),
            justification: "reviewed, test fixture".into(),
            created_by: "tester".into(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn waiver_without_expiry_is_always_active() {
        let w = waiver("abc", None);
        assert!(w.is_active(Utc::now()));
    }

    #[test]
    fn waiver_past_expiry_is_inactive() {
        let w = waiver("abc", Some(Utc::now() - Duration::days(1)));
        assert!(!w.is_active(Utc::now()));
    }

    #[test]
    fn index_reports_active_only_for_known_fingerprints() {
        let index = WaiverIndex::new(vec![waiver("abc", None)]);
        assert!(index.has_active("abc", Utc::now()));
        assert!(!index.has_active("def", Utc::now()));
    }

    #[test]
    fn index_reports_expired_waiver_as_inactive() {
        let index = WaiverIndex::new(vec![waiver("abc", Some(Utc::now() - Duration::days(1)))]);
        assert!(!index.has_active("abc", Utc::now()));
    }
}
