use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::event::{Attachment, AttachmentEvent, Op};

/// An attachment that survives replay, with the time of its winning `add`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentAttachment {
    pub attachment: Attachment,
    pub added_at: DateTime<Utc>,
}

/// Derive the visible attachments from a ledger's event history.
///
/// For each `att_id` the latest event wins, where "latest" means the highest
/// `ts`, with equal timestamps falling back to position in `events`. If the
/// winner is an `add`, its metadata is the attachment; if it is a `remove`,
/// the attachment is absent. The result is ordered by the winning `add`'s
/// timestamp, then `att_id`.
///
/// Pure: touches no storage, and the same input always yields the same
/// output. Reordering events with distinct timestamps does not change it;
/// events that share a timestamp are decided by log order.
pub fn compute_current(events: &[AttachmentEvent]) -> Vec<CurrentAttachment> {
    let mut latest: HashMap<&str, (usize, &AttachmentEvent)> = HashMap::new();
    for (index, event) in events.iter().enumerate() {
        let key = event.att.att_id.as_str();
        let replaces = match latest.get(key) {
            Some((seen_index, seen)) => (event.ts, index) > (seen.ts, *seen_index),
            None => true,
        };
        if replaces {
            latest.insert(key, (index, event));
        }
    }

    let mut current: Vec<CurrentAttachment> = latest
        .into_values()
        .filter(|(_, event)| event.op == Op::Add)
        .map(|(_, event)| CurrentAttachment {
            attachment: event.att.clone(),
            added_at: event.ts,
        })
        .collect();
    current.sort_by(|a, b| {
        a.added_at
            .cmp(&b.added_at)
            .then_with(|| a.attachment.att_id.cmp(&b.attachment.att_id))
    });
    current
}
