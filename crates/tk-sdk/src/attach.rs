//! Attachment operations on a [`Workspace`].
//!
//! Every mutation appends one event to the thread's ledger and then patches
//! the thread record to point at the ledger. Reads replay the ledger; the
//! current attachment set is never stored.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tk_ledger::{
    append_event, compute_current, load_events, Attachment, AttachmentEvent, AttachmentKind,
    CurrentAttachment, LEDGER_FILE,
};
use tk_store::{locate_blob, read_blob, store_blob, StoredBlob};
use tk_types::{temporal, DurableId, ThreadRecord};
use tracing::debug;

use crate::error::{SdkError, SdkResult};
use crate::workspace::Workspace;

pub const NOTE_MEDIA_TYPE: &str = "text/markdown";

/// Picks one attachment out of a thread's current set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentSelector {
    /// 1-based position in the current view, as numbered by `show`.
    Index(usize),
    /// An attachment's `att_id`.
    Id(String),
}

impl fmt::Display for AttachmentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(n) => write!(f, "#{n}"),
            Self::Id(id) => f.write_str(id),
        }
    }
}

impl FromStr for AttachmentSelector {
    type Err = SdkError;

    /// A bare positive number is an index; anything else is an `att_id`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SdkError::InvalidInput("empty attachment selector".into()));
        }
        match s.parse::<usize>() {
            Ok(0) => Err(SdkError::InvalidInput(
                "attachment numbers start at 1".into(),
            )),
            Ok(n) => Ok(Self::Index(n)),
            Err(_) => Ok(Self::Id(s.to_string())),
        }
    }
}

/// Everything `show` needs about a thread.
#[derive(Clone, Debug)]
pub struct ThreadView {
    pub record: ThreadRecord,
    pub dir: PathBuf,
    pub current: Vec<CurrentAttachment>,
    pub history: Vec<AttachmentEvent>,
    /// Ledger lines that were skipped as unreadable.
    pub malformed: usize,
}

/// Result of attaching something to a thread.
#[derive(Clone, Debug)]
pub struct Attached {
    pub thread: DurableId,
    pub attachment: Attachment,
    /// Present for notes.
    pub blob: Option<StoredBlob>,
}

/// Where an attachment's content lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentTarget {
    Url(String),
    File(PathBuf),
}

impl Workspace {
    /// Store `body` as a note blob and record it on the thread.
    pub fn attach_note(&self, token: &str, body: &[u8], name: Option<&str>) -> SdkResult<Attached> {
        if String::from_utf8_lossy(body).trim().is_empty() {
            return Err(SdkError::InvalidInput("note body is empty".into()));
        }
        let record = self.resolve(token)?;
        let dir = self.dir_of(&record.id);
        let now = temporal::now();

        let stored = store_blob(&dir, body)?;
        let name = non_blank(name).unwrap_or_else(|| default_name("note", &now));
        let attachment = Attachment::note(
            DurableId::generate()?.to_string(),
            name,
            NOTE_MEDIA_TYPE,
            stored.blob.clone(),
            stored.size,
        );
        self.record_event(&record, AttachmentEvent::add(attachment.clone(), now))?;

        Ok(Attached {
            thread: record.id,
            attachment,
            blob: Some(stored),
        })
    }

    /// Record a URL on the thread. The label, if any, doubles as the name.
    pub fn attach_link(&self, token: &str, url: &str, label: Option<&str>) -> SdkResult<Attached> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SdkError::InvalidInput("url must not be empty".into()));
        }
        let record = self.resolve(token)?;
        let now = temporal::now();

        let label = non_blank(label);
        let name = label.clone().unwrap_or_else(|| default_name("link", &now));
        let attachment = Attachment::link(DurableId::generate()?.to_string(), name, url, label);
        self.record_event(&record, AttachmentEvent::add(attachment.clone(), now))?;

        Ok(Attached {
            thread: record.id,
            attachment,
            blob: None,
        })
    }

    /// Hide an attachment from the current view. Its history and any blob
    /// stay on disk.
    pub fn detach(&self, token: &str, selector: &AttachmentSelector) -> SdkResult<Attachment> {
        let view = self.view(token)?;
        let target = select(&view.current, selector)?.attachment.clone();
        self.record_event(
            &view.record,
            AttachmentEvent::remove(target.clone(), temporal::now()),
        )?;
        Ok(target)
    }

    /// Replay a thread's ledger.
    pub fn view(&self, token: &str) -> SdkResult<ThreadView> {
        let record = self.resolve(token)?;
        let dir = self.dir_of(&record.id);
        let loaded = load_events(&dir)?;
        Ok(ThreadView {
            current: compute_current(&loaded.events),
            history: loaded.events,
            malformed: loaded.malformed,
            record,
            dir,
        })
    }

    /// The URL of a link, or the on-disk path of a note's blob.
    pub fn locate(&self, token: &str, selector: &AttachmentSelector) -> SdkResult<AttachmentTarget> {
        let view = self.view(token)?;
        let attachment = &select(&view.current, selector)?.attachment;
        match attachment.kind {
            AttachmentKind::Link => attachment
                .url
                .clone()
                .filter(|u| !u.is_empty())
                .map(AttachmentTarget::Url)
                .ok_or_else(|| SdkError::InvalidInput(format!("link {} has no url", attachment.att_id))),
            AttachmentKind::Note => {
                let blob = attachment.blob.as_ref().ok_or_else(|| {
                    SdkError::InvalidInput(format!("note {} has no blob reference", attachment.att_id))
                })?;
                let path = locate_blob(&view.dir, blob)?;
                if !path.is_file() {
                    return Err(SdkError::Io {
                        path,
                        source: io::Error::new(io::ErrorKind::NotFound, "blob file is missing"),
                    });
                }
                Ok(AttachmentTarget::File(path))
            }
        }
    }

    /// Bytes of a note attachment.
    pub fn read_note(&self, token: &str, selector: &AttachmentSelector) -> SdkResult<Vec<u8>> {
        let view = self.view(token)?;
        let attachment = &select(&view.current, selector)?.attachment;
        let blob = match (attachment.kind, attachment.blob.as_ref()) {
            (AttachmentKind::Note, Some(blob)) => blob,
            _ => {
                return Err(SdkError::InvalidInput(format!(
                    "{} is not a note",
                    attachment.att_id
                )))
            }
        };
        Ok(read_blob(&view.dir, blob)?)
    }

    /// Append to the ledger, then point the record at it.
    fn record_event(&self, record: &ThreadRecord, event: AttachmentEvent) -> SdkResult<()> {
        let dir = self.dir_of(&record.id);
        append_event(&dir, &event)?;
        self.store()
            .mark_attachments_log(&record.id, LEDGER_FILE, event.ts)?;
        debug!(id = %record.id, op = %event.op, att_id = %event.att.att_id, "recorded attachment event");
        Ok(())
    }
}

fn select<'a>(
    current: &'a [CurrentAttachment],
    selector: &AttachmentSelector,
) -> SdkResult<&'a CurrentAttachment> {
    let found = match selector {
        AttachmentSelector::Index(n) => n.checked_sub(1).and_then(|i| current.get(i)),
        AttachmentSelector::Id(id) => current.iter().find(|c| c.attachment.att_id == *id),
    };
    found.ok_or_else(|| SdkError::AttachmentNotFound(selector.to_string()))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `note-20250102-030405` style names.
fn default_name(prefix: &str, now: &DateTime<Utc>) -> String {
    format!("{prefix}-{}", now.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkspacePaths;
    use crate::error::ErrorKind;
    use crate::workspace::NewThread;
    use std::fs;
    use tk_store::ThreadStore;

    fn workspace() -> (tempfile::TempDir, Workspace, ThreadRecord) {
        let dir = tempfile::tempdir().unwrap();
        let paths = WorkspacePaths::new(dir.path());
        Workspace::init(paths.clone()).unwrap();
        let ws = Workspace::open(paths).unwrap();
        let record = ws
            .create_thread(NewThread {
                title: "attachments".into(),
                ..Default::default()
            })
            .unwrap();
        (dir, ws, record)
    }

    #[test]
    fn selector_parsing() {
        assert_eq!("2".parse::<AttachmentSelector>().unwrap(), AttachmentSelector::Index(2));
        assert_eq!(
            "01HVXYZ".parse::<AttachmentSelector>().unwrap(),
            AttachmentSelector::Id("01HVXYZ".into())
        );
        assert!("0".parse::<AttachmentSelector>().is_err());
        assert!(" ".parse::<AttachmentSelector>().is_err());
    }

    #[test]
    fn note_is_stored_and_recorded() {
        let (_dir, ws, record) = workspace();
        let attached = ws.attach_note("1", b"# hello\n", None).unwrap();

        let blob = attached.blob.unwrap();
        assert!(blob.path.is_file());
        assert!(attached.attachment.name.starts_with("note-"));
        assert_eq!(attached.attachment.media_type.as_deref(), Some(NOTE_MEDIA_TYPE));
        assert_eq!(attached.attachment.size, Some(8));

        let saved = ws.store().get(&record.id).unwrap().unwrap();
        assert_eq!(saved.attachments_log.as_deref(), Some(LEDGER_FILE));

        let view = ws.view("1").unwrap();
        assert_eq!(view.current.len(), 1);
        assert_eq!(view.history.len(), 1);
        assert_eq!(view.malformed, 0);

        let body = ws.read_note("1", &AttachmentSelector::Index(1)).unwrap();
        assert_eq!(body, b"# hello\n");
        assert_eq!(
            ws.locate("1", &AttachmentSelector::Index(1)).unwrap(),
            AttachmentTarget::File(blob.path)
        );
    }

    #[test]
    fn empty_note_is_rejected() {
        let (_dir, ws, _) = workspace();
        let err = ws.attach_note("1", b"  \n\t", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(ws.view("1").unwrap().history.is_empty());
    }

    #[test]
    fn link_uses_label_as_name() {
        let (_dir, ws, _) = workspace();
        let labeled = ws
            .attach_link("1", "https://example.com/a", Some("Design doc"))
            .unwrap();
        assert_eq!(labeled.attachment.name, "Design doc");
        assert_eq!(labeled.attachment.label.as_deref(), Some("Design doc"));

        let plain = ws.attach_link("1", "https://example.com/b", None).unwrap();
        assert!(plain.attachment.name.starts_with("link-"));
        assert_eq!(plain.attachment.label, None);

        let target = ws
            .locate("1", &AttachmentSelector::Id(plain.attachment.att_id.clone()))
            .unwrap();
        assert_eq!(target, AttachmentTarget::Url("https://example.com/b".into()));

        assert!(ws.attach_link("1", "  ", None).is_err());
    }

    #[test]
    fn detach_hides_but_keeps_history() {
        let (_dir, ws, _) = workspace();
        let note = ws.attach_note("1", b"body", Some("n")).unwrap();
        ws.attach_link("1", "https://example.com", None).unwrap();

        let removed = ws
            .detach("1", &AttachmentSelector::Id(note.attachment.att_id.clone()))
            .unwrap();
        assert_eq!(removed, note.attachment);

        let view = ws.view("1").unwrap();
        assert_eq!(view.current.len(), 1);
        assert_eq!(view.current[0].attachment.kind, AttachmentKind::Link);
        assert_eq!(view.history.len(), 3);
        assert!(note.blob.unwrap().path.is_file());

        let err = ws
            .detach("1", &AttachmentSelector::Id(note.attachment.att_id))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn out_of_range_index_is_not_found() {
        let (_dir, ws, _) = workspace();
        let err = ws.locate("1", &AttachmentSelector::Index(1)).unwrap_err();
        assert!(matches!(err, SdkError::AttachmentNotFound(_)));
    }

    #[test]
    fn missing_blob_file_is_io_error() {
        let (_dir, ws, _) = workspace();
        let note = ws.attach_note("1", b"gone soon", None).unwrap();
        fs::remove_file(note.blob.unwrap().path).unwrap();
        let err = ws.locate("1", &AttachmentSelector::Index(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn reading_a_link_as_note_is_invalid() {
        let (_dir, ws, _) = workspace();
        ws.attach_link("1", "https://example.com", None).unwrap();
        let err = ws.read_note("1", &AttachmentSelector::Index(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn unknown_fields_survive_attach() {
        let (_dir, ws, record) = workspace();
        let path = ws.dir_of(&record.id).join("thread.json");
        let mut raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        raw["custom"] = serde_json::json!({"keep": true});
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        ws.attach_link("1", "https://example.com", None).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["custom"]["keep"], true);
        assert_eq!(raw["attachments_log"], LEDGER_FILE);
    }
}
