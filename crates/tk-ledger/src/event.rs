use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tk_store::BlobRef;
use tk_types::temporal;

/// Operation recorded by a ledger line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Add,
    Remove,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Remove => "remove",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Note,
    Link,
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Note => "note",
            Self::Link => "link",
        })
    }
}

/// Attachment metadata as snapshotted into each event.
///
/// Notes carry `media_type`, `blob` and `size`; links carry `url` and an
/// optional `label`. Absent fields are omitted from the JSON line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub att_id: String,
    pub kind: AttachmentKind,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<BlobRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Attachment {
    pub fn note(
        att_id: impl Into<String>,
        name: impl Into<String>,
        media_type: impl Into<String>,
        blob: BlobRef,
        size: u64,
    ) -> Self {
        Self {
            att_id: att_id.into(),
            kind: AttachmentKind::Note,
            name: name.into(),
            media_type: Some(media_type.into()),
            blob: Some(blob),
            size: Some(size),
            url: None,
            label: None,
        }
    }

    pub fn link(
        att_id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        label: Option<String>,
    ) -> Self {
        Self {
            att_id: att_id.into(),
            kind: AttachmentKind::Link,
            name: name.into(),
            media_type: None,
            blob: None,
            size: None,
            url: Some(url.into()),
            label: label.filter(|l| !l.is_empty()),
        }
    }
}

/// One line of `attachments.jsonl`. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentEvent {
    pub op: Op,
    #[serde(with = "temporal::rfc3339")]
    pub ts: DateTime<Utc>,
    pub att: Attachment,
}

impl AttachmentEvent {
    pub fn add(att: Attachment, ts: DateTime<Utc>) -> Self {
        Self {
            op: Op::Add,
            ts,
            att,
        }
    }

    pub fn remove(att: Attachment, ts: DateTime<Utc>) -> Self {
        Self {
            op: Op::Remove,
            ts,
            att,
        }
    }
}
