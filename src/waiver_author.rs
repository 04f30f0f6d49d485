//! Creates and lists waivers through the [`RecordStore`] capability.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::actor::ActorService;
use crate::error::WaiverAuthorError;
use crate::finding::Finding;
use crate::record_store::{Feedback, FeedbackStatus, RecordStore};
use crate::waiver::Waiver;

pub struct WaiverAuthor<'a> {
    record_store: &'a dyn RecordStore,
    actor_service: &'a dyn ActorService,
}

impl<'a> WaiverAuthor<'a> {
    pub fn new(record_store: &'a dyn RecordStore, actor_service: &'a dyn ActorService) -> Self {
        Self {
            record_store,
            actor_service,
        }
    }

    /// Creates one approval feedback record for `finding`: `entity_type =
    /// "execution"`, `entity_id = execution_id`, `status = "resolved"`,
    /// `content = justification`, with `metadata` carrying
    /// `{fingerprint, rule_id, file, line, expires_at?, related_task_id?}`.
    pub fn create(
        &self,
        finding: &Finding,
        execution_id: &str,
        justification: &str,
        expires_at: Option<DateTime<Utc>>,
        related_task_id: Option<&str>,
    ) -> Result<Waiver, WaiverAuthorError> {
        self.create_record(
            &finding.fingerprint,
            Some(&finding.rule_id),
            Some(&finding.file),
            Some(finding.line),
            execution_id,
            justification,
            expires_at,
            related_task_id,
        )
    }

    /// Creates a waiver from a bare fingerprint, for callers (the CLI's
    /// `audit waive <fingerprint>`) that don't hold the originating
    /// [`Finding`]. `rule_id`/`file`/`line` metadata is omitted; the
    /// fingerprint alone is sufficient for [`crate::waiver::WaiverIndex`]
    /// matching.
    pub fn create_by_fingerprint(
        &self,
        fingerprint: &str,
        justification: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Waiver, WaiverAuthorError> {
        self.create_record(fingerprint, None, None, None, "manual", justification, expires_at, None)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_record(
        &self,
        fingerprint: &str,
        rule_id: Option<&str>,
        file: Option<&str>,
        line: Option<u32>,
        execution_id: &str,
        justification: &str,
        expires_at: Option<DateTime<Utc>>,
        related_task_id: Option<&str>,
    ) -> Result<Waiver, WaiverAuthorError> {
        if fingerprint.is_empty() {
            return Err(WaiverAuthorError::MissingFingerprint);
        }
        if justification.trim().is_empty() {
            return Err(WaiverAuthorError::MissingJustification);
        }

        let actor = self.actor_service.current_actor();
        let now = Utc::now();
        let waiver = Waiver {
            fingerprint: fingerprint.to_string(),
            justification: justification.to_string(),
            created_by: actor.id,
            created_at: now,
            expires_at,
        };

        let mut metadata = HashMap::new();
        metadata.insert("fingerprint".to_string(), json!(fingerprint));
        if let Some(rule_id) = rule_id {
            metadata.insert("rule_id".to_string(), json!(rule_id));
        }
        if let Some(file) = file {
            metadata.insert("file".to_string(), json!(file));
        }
        if let Some(line) = line {
            metadata.insert("line".to_string(), json!(line));
        }
        if let Some(expires_at) = expires_at {
            metadata.insert("expires_at".to_string(), json!(expires_at.to_rfc3339()));
        }
        if let Some(related_task_id) = related_task_id {
            metadata.insert("related_task_id".to_string(), json!(related_task_id));
        }

        let feedback = Feedback {
            id: uuid_like(fingerprint, now),
            feedback_type: "approval".into(),
            entity_type: "execution".into(),
            entity_id: execution_id.to_string(),
            status: FeedbackStatus::Resolved,
            content: serde_json::Value::String(justification.to_string()),
            metadata,
            created_at: now,
        };

        self.record_store
            .create_feedback(feedback)
            .map_err(|e| WaiverAuthorError::RecordStore(e.to_string()))?;

        Ok(waiver)
    }

    /// Creates one waiver per fingerprint, stopping at the first failure.
    /// An empty list is a no-op.
    pub fn create_batch(
        &self,
        fingerprints: &[String],
        justification: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Waiver>, WaiverAuthorError> {
        fingerprints
            .iter()
            .map(|fp| self.create_by_fingerprint(fp, justification, expires_at))
            .collect()
    }

    /// Lists every currently active waiver known to the record store, via
    /// [`crate::waiver::WaiverIndex`]'s own loading rules.
    pub fn list_active(&self) -> Result<Vec<Waiver>, WaiverAuthorError> {
        let now = Utc::now();
        let records = self
            .record_store
            .list_all_feedback()
            .map_err(|e| WaiverAuthorError::RecordStore(e.to_string()))?;

        Ok(records
            .into_iter()
            .filter(|r| r.feedback_type == "approval")
            .filter_map(feedback_to_waiver)
            .filter(|w| w.is_active(now))
            .collect())
    }
}

/// Records lacking `fingerprint` metadata are ignored (forward-compatible
/// with feedback records this core doesn't own).
fn feedback_to_waiver(record: Feedback) -> Option<Waiver> {
    let fingerprint = record.metadata.get("fingerprint")?.as_str()?.to_string();
    let justification = record.content.as_str().unwrap_or_default().to_string();
    let expires_at = record
        .metadata
        .get("expires_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(Waiver {
        fingerprint,
        justification,
        created_by: String::new(),
        created_at: record.created_at,
        expires_at,
    })
}

fn uuid_like(fingerprint: &str, now: DateTime<Utc>) -> String {
    format!("waiver-{}-{}", &fingerprint[..fingerprint.len().min(12)], now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::finding::{Category, DetectorKind, Severity};
    use crate::record_store::InMemoryRecordStore;

    struct FixedActor;
    impl ActorService for FixedActor {
        fn current_actor(&self) -> Actor {
            Actor {
                id: "tester".into(),
                display_name: None,
            }
        }
    }

    fn sample_finding() -> Finding {
        Finding {
            id: 0,
            rule_id: "PII-001".into(),
            category: Category::PiiEmail,
            severity: Severity::High,
            file: "src/a.ts".into(),
            line: 1,
            column: None,
            snippet: String::new(),
            message: "possible email address literal".into(),
            suggestion: None,
            legal_reference: None,
            detector: DetectorKind::Regex,
            fingerprint: Finding::fingerprint("PII-001", "src/a.ts", 1),
            confidence: 1.0,
        }
    }

    #[test]
    fn create_rejects_missing_justification() {
        let store = InMemoryRecordStore::new();
        let actor = FixedActor;
        let author = WaiverAuthor::new(&store, &actor);
        let err = author.create_by_fingerprint("fp1", "  ", None).unwrap_err();
        assert!(matches!(err, WaiverAuthorError::MissingJustification));
    }

    #[test]
    fn create_rejects_empty_fingerprint() {
        let store = InMemoryRecordStore::new();
        let actor = FixedActor;
        let author = WaiverAuthor::new(&store, &actor);
        let err = author.create_by_fingerprint("", "reviewed", None).unwrap_err();
        assert!(matches!(err, WaiverAuthorError::MissingFingerprint));
    }

    #[test]
    fn create_then_list_active_round_trips() {
        let store = InMemoryRecordStore::new();
        let actor = FixedActor;
        let author = WaiverAuthor::new(&store, &actor);
        author.create_by_fingerprint("fp1", "reviewed by security", None).unwrap();

        let active = author.list_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].fingerprint, "fp1");
    }

    #[test]
    fn create_batch_creates_one_waiver_per_fingerprint() {
        let store = InMemoryRecordStore::new();
        let actor = FixedActor;
        let author = WaiverAuthor::new(&store, &actor);
        let waivers = author
            .create_batch(&["fp1".to_string(), "fp2".to_string()], "batch reviewed", None)
            .unwrap();
        assert_eq!(waivers.len(), 2);
        assert_eq!(author.list_active().unwrap().len(), 2);
    }

    #[test]
    fn create_from_finding_carries_rule_metadata() {
        let store = InMemoryRecordStore::new();
        let actor = FixedActor;
        let author = WaiverAuthor::new(&store, &actor);
        let finding = sample_finding();

        let waiver = author
            .create(&finding, "exec-42", "reviewed, false positive", None, Some("task-1"))
            .unwrap();
        assert_eq!(waiver.fingerprint, finding.fingerprint);

        let records = store.list_all_feedback().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_type, "execution");
        assert_eq!(records[0].entity_id, "exec-42");
        assert_eq!(records[0].metadata["rule_id"], "PII-001");
        assert_eq!(records[0].metadata["file"], "src/a.ts");
        assert_eq!(records[0].metadata["related_task_id"], "task-1");
    }
}
