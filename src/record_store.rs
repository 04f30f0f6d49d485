//! The `RecordStore` capability: the durable home for waivers, modeled as
//! generic feedback records so the same store backs approvals, comments,
//! and suppressions alike.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WaiverError;

/// Lifecycle status of a [`Feedback`] record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Open,
    Resolved,
    Rejected,
}

/// A single record in the feedback/approval store. A waiver is a
/// `Feedback` whose `feedback_type` is `"approval"`, `entity_type` is
/// `"execution"`, and whose `metadata` carries the suppression's
/// fingerprint, rule id, file, line, and optional expiry/related task —
/// the shape any tooling creating waivers must match (§ fingerprint wire
/// format is the normative interop contract; this struct is the envelope
/// around it).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub feedback_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub status: FeedbackStatus,
    pub content: Value,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// The capability a composition root injects to persist and query feedback
/// records, mirroring the file-access/version-control capability pattern.
pub trait RecordStore {
    fn list_all_feedback(&self) -> Result<Vec<Feedback>, WaiverError>;

    fn list_feedback_by_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Feedback>, WaiverError>;

    fn create_feedback(&self, feedback: Feedback) -> Result<Feedback, WaiverError>;
}

/// An in-memory `RecordStore` for tests and for environments with no
/// external feedback backend configured.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<Feedback>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn list_all_feedback(&self) -> Result<Vec<Feedback>, WaiverError> {
        Ok(self
            .records
            .lock()
            .expect("record store lock poisoned")
            .clone())
    }

    fn list_feedback_by_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Feedback>, WaiverError> {
        Ok(self
            .records
            .lock()
            .expect("record store lock poisoned")
            .iter()
            .filter(|f| f.entity_type == entity_type && f.entity_id == entity_id)
            .cloned()
            .collect())
    }

    fn create_feedback(&self, feedback: Feedback) -> Result<Feedback, WaiverError> {
        let mut records = self.records.lock().expect("record store lock poisoned");
        records.push(feedback.clone());
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> Feedback {
        let mut metadata = HashMap::new();
        metadata.insert("fingerprint".to_string(), serde_json::json!("fp-123"));
        Feedback {
            id: id.to_string(),
            feedback_type: "approval".into(),
            entity_type: "execution".into(),
            entity_id: "exec-1".into(),
            status: FeedbackStatus::Resolved,
            content: serde_json::Value::String("reviewed".into()),
            metadata,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_then_list_all_round_trips() {
        let store = InMemoryRecordStore::new();
        store.create_feedback(sample("f1")).unwrap();
        assert_eq!(store.list_all_feedback().unwrap().len(), 1);
    }

    #[test]
    fn list_by_entity_filters_correctly() {
        let store = InMemoryRecordStore::new();
        store.create_feedback(sample("f1")).unwrap();
        let mut other = sample("f2");
        other.entity_id = "exec-2".into();
        store.create_feedback(other).unwrap();

        let found = store.list_feedback_by_entity("execution", "exec-1").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "f1");
    }
}
