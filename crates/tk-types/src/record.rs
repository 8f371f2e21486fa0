use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::identity::DurableId;
use crate::temporal;

/// Lifecycle state of a thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    /// The active state. Only open threads carry a short alias.
    #[default]
    Open,
    Done,
    Archived,
}

impl ThreadStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Done => "done",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

impl FromStr for ThreadStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "done" => Ok(Self::Done),
            "archived" => Ok(Self::Archived),
            other => Err(TypeError::UnknownStatus(other.to_string())),
        }
    }
}

/// Persisted form of a thread (`thread.json`).
///
/// The identity fields (`id`, `short_id`) and the ledger pointer
/// (`attachments_log`) are owned by the core; the rest are collaborator
/// fields. Keys this version does not know about are kept in `extra` and
/// written back unchanged, so older binaries never drop data added by newer
/// ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: DurableId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ThreadStatus,
    #[serde(default = "temporal::unset", with = "temporal::lenient")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "temporal::unset", with = "temporal::lenient")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "temporal::lenient_option"
    )]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Short alias; present only while the thread is open. Never written as null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<u32>,
    /// Ledger file name, set once the first attachment event is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments_log: Option<String>,
    /// Unrecognized keys, carried through load/save untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ThreadRecord {
    /// A new open thread created at `now`.
    pub fn new(id: DurableId, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: ThreadStatus::Open,
            created_at: now,
            updated_at: now,
            due_at: None,
            project: String::new(),
            tags: Vec::new(),
            short_id: None,
            attachments_log: None,
            extra: Map::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Fill defaults for fields that were missing or unreadable on disk.
    pub fn normalize(&mut self) {
        if temporal::is_unset(&self.created_at) {
            self.created_at = temporal::now();
        }
        if temporal::is_unset(&self.updated_at) {
            self.updated_at = self.created_at;
        }
        self.tags = normalize_tags(&self.tags);
    }

    /// Decode a record from `thread.json` bytes and normalize it.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        let mut record: Self = serde_json::from_slice(data)?;
        record.normalize();
        Ok(record)
    }
}

/// Trim, lowercase, and de-duplicate tags, keeping first-seen order.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id() -> DurableId {
        DurableId::parse("01HV8ZABCDEFGHJKMNPQRSTVWX").unwrap()
    }

    #[test]
    fn short_id_is_omitted_when_absent() {
        let record = ThreadRecord::new(id(), "write docs", temporal::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("short_id").is_none());
        assert!(json.get("attachments_log").is_none());
        assert!(json.get("due_at").is_none());
    }

    #[test]
    fn timestamps_are_rfc3339_seconds() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let record = ThreadRecord::new(id(), "t", ts);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["created_at"], "2024-01-02T03:04:05Z");
        assert_eq!(json["status"], "open");
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let raw = r#"{
            "id": "01HV8ZABCDEFGHJKMNPQRSTVWX",
            "title": "t",
            "status": "done",
            "created_at": "2024-01-02T03:04:05Z",
            "updated_at": "2024-01-02T03:04:05Z",
            "tags": [],
            "priority": "high",
            "links": {"a": 1}
        }"#;
        let record = ThreadRecord::from_json(raw.as_bytes()).unwrap();
        assert_eq!(record.status, ThreadStatus::Done);
        assert_eq!(record.extra["priority"], "high");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["priority"], "high");
        assert_eq!(json["links"]["a"], 1);
    }

    #[test]
    fn normalize_fills_missing_timestamps() {
        let raw = r#"{"id": "01HV8ZABCDEFGHJKMNPQRSTVWX", "created_at": "2024-01-02"}"#;
        let record = ThreadRecord::from_json(raw.as_bytes()).unwrap();
        assert_eq!(
            record.created_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(record.updated_at, record.created_at);
        assert_eq!(record.status, ThreadStatus::Open);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn invalid_id_fails_to_decode() {
        let raw = r#"{"id": "../../x"}"#;
        assert!(ThreadRecord::from_json(raw.as_bytes()).is_err());
    }

    #[test]
    fn tags_are_normalized() {
        let tags = normalize_tags(&[" Work ", "work", "", "Home"]);
        assert_eq!(tags, vec!["work", "home"]);
    }

    #[test]
    fn status_parse_and_display() {
        assert_eq!("Archived".parse::<ThreadStatus>().unwrap(), ThreadStatus::Archived);
        assert_eq!(ThreadStatus::Done.to_string(), "done");
        assert!("closed".parse::<ThreadStatus>().is_err());
        assert!(ThreadStatus::Open.is_active());
        assert!(!ThreadStatus::Archived.is_active());
    }
}
