use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::event::AttachmentEvent;

/// File name of the ledger inside a thread directory.
pub const LEDGER_FILE: &str = "attachments.jsonl";

pub fn ledger_path(thread_dir: &Path) -> PathBuf {
    thread_dir.join(LEDGER_FILE)
}

/// Events read from a ledger, plus how many lines were skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadedEvents {
    pub events: Vec<AttachmentEvent>,
    pub malformed: usize,
}

/// Append one event as a JSON line, creating the ledger if absent.
///
/// The line, including its newline, is handed to the OS in a single write,
/// so a reported failure never leaves a partial event that counts as written.
pub fn append_event(thread_dir: &Path, event: &AttachmentEvent) -> LedgerResult<()> {
    let path = ledger_path(thread_dir);
    let mut line =
        serde_json::to_vec(event).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(LedgerError::io(&path))?;
    file.write_all(&line).map_err(LedgerError::io(&path))?;
    file.flush().map_err(LedgerError::io(&path))?;

    debug!(op = %event.op, att_id = %event.att.att_id, path = %path.display(), "ledger append");
    Ok(())
}

/// Read every well-formed event from a thread's ledger.
///
/// Blank lines are ignored. Lines that do not decode as an event are
/// skipped and counted; the file is always read to the end. A missing
/// ledger is an empty one.
pub fn load_events(thread_dir: &Path) -> LedgerResult<LoadedEvents> {
    let path = ledger_path(thread_dir);
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LoadedEvents::default()),
        Err(e) => return Err(LedgerError::Io { path, source: e }),
    };

    let mut loaded = LoadedEvents::default();
    for (index, raw) in data.split(|b| *b == b'\n').enumerate() {
        if raw.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match decode_line(raw) {
            Ok(event) => loaded.events.push(event),
            Err(e) => {
                warn!(line = index + 1, error = %e, path = %path.display(), "skipping malformed ledger line");
                loaded.malformed += 1;
            }
        }
    }

    debug!(
        events = loaded.events.len(),
        malformed = loaded.malformed,
        "ledger loaded"
    );
    Ok(loaded)
}

fn decode_line(raw: &[u8]) -> Result<AttachmentEvent, String> {
    let event: AttachmentEvent = serde_json::from_slice(raw).map_err(|e| e.to_string())?;
    if event.att.att_id.is_empty() {
        return Err("missing att_id".into());
    }
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Attachment;
    use chrono::{TimeZone, Utc};

    fn event(id: &str, secs: i64) -> AttachmentEvent {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        AttachmentEvent::add(Attachment::link(id, id, "https://example.com", None), ts)
    }

    #[test]
    fn missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_events(dir.path()).unwrap();
        assert!(loaded.events.is_empty());
        assert_eq!(loaded.malformed, 0);
    }

    #[test]
    fn append_then_load_in_order() {
        let dir = tempfile::tempdir().unwrap();
        append_event(dir.path(), &event("A", 0)).unwrap();
        append_event(dir.path(), &event("B", 1)).unwrap();

        let text = fs::read_to_string(ledger_path(dir.path())).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));

        let loaded = load_events(dir.path()).unwrap();
        assert_eq!(loaded.events, vec![event("A", 0), event("B", 1)]);
    }

    #[test]
    fn malformed_lines_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        append_event(dir.path(), &event("A", 0)).unwrap();
        {
            let mut file = OpenOptions::new()
                .append(true)
                .open(ledger_path(dir.path()))
                .unwrap();
            file.write_all(b"{not json}\n\n   \n").unwrap();
            file.write_all(br#"{"op":"add","ts":"yesterday","att":{"att_id":"X","kind":"note"}}"#).unwrap();
            file.write_all(b"\n").unwrap();
            file.write_all(br#"{"op":"add","ts":"2024-01-01T00:00:00Z","att":{"att_id":"","kind":"note"}}"#).unwrap();
            file.write_all(b"\n\xff\xfe\n").unwrap();
        }
        append_event(dir.path(), &event("B", 1)).unwrap();

        let loaded = load_events(dir.path()).unwrap();
        assert_eq!(loaded.events.len(), 2);
        assert_eq!(loaded.malformed, 4);
    }

    #[test]
    fn torn_final_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        append_event(dir.path(), &event("A", 0)).unwrap();
        let mut file = OpenOptions::new()
            .append(true)
            .open(ledger_path(dir.path()))
            .unwrap();
        file.write_all(br#"{"op":"add","ts":"2024-"#).unwrap();

        let loaded = load_events(dir.path()).unwrap();
        assert_eq!(loaded.events.len(), 1);
        assert_eq!(loaded.malformed, 1);
    }
}
