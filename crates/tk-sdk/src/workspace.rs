use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tk_refs::{ensure_short_id, next_short_id, ReindexReport};
use tk_store::{FileThreadStore, ThreadStore};
use tk_types::{normalize_tags, temporal, DurableId, ThreadRecord, ThreadStatus};
use tracing::{debug, info};

use crate::config::WorkspacePaths;
use crate::error::{SdkError, SdkResult};

/// Outcome of [`Workspace::init`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitReport {
    pub paths: WorkspacePaths,
    /// The threads directory was already there.
    pub existed: bool,
}

/// Fields for a new thread.
#[derive(Clone, Debug, Default)]
pub struct NewThread {
    pub title: String,
    pub description: String,
    pub project: String,
    pub tags: Vec<String>,
    pub due: Option<NaiveDate>,
}

/// Requested edits to a thread. `None` and empty lists leave a field alone.
#[derive(Clone, Debug, Default)]
pub struct ThreadUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub due: Option<NaiveDate>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

impl ThreadUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.project.is_none()
            && self.due.is_none()
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
    }

    /// Apply to `record`, returning whether anything changed.
    fn apply(&self, record: &mut ThreadRecord) -> bool {
        let mut changed = false;

        if let Some(title) = self.title.as_deref().map(str::trim) {
            if !title.is_empty() && title != record.title {
                record.title = title.to_string();
                changed = true;
            }
        }
        if let Some(description) = &self.description {
            if *description != record.description {
                record.description = description.clone();
                changed = true;
            }
        }
        if let Some(project) = self.project.as_deref().map(str::trim) {
            if !project.is_empty() && project != record.project {
                record.project = project.to_string();
                changed = true;
            }
        }
        if let Some(due) = self.due {
            if record.due_at.map(|d| d.date_naive()) != Some(due) {
                record.due_at = Some(due_timestamp(due));
                changed = true;
            }
        }
        if !self.add_tags.is_empty() || !self.remove_tags.is_empty() {
            let before: BTreeSet<String> = record.tags.iter().cloned().collect();
            let mut after = before.clone();
            after.extend(normalize_tags(&self.add_tags));
            for tag in normalize_tags(&self.remove_tags) {
                after.remove(&tag);
            }
            if after != before {
                record.tags = after.into_iter().collect();
                changed = true;
            }
        }
        changed
    }
}

/// Which threads [`Workspace::list`] returns.
#[derive(Clone, Debug, Default)]
pub struct ListFilter {
    /// Include every status. Ignored when `status` is set.
    pub all: bool,
    pub status: Option<ThreadStatus>,
    pub project: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

impl ListFilter {
    pub fn matches(&self, record: &ThreadRecord) -> bool {
        let status_ok = match self.status {
            Some(status) => record.status == status,
            None => self.all || record.is_active(),
        };
        let project_ok = self
            .project
            .as_deref()
            .map_or(true, |p| record.project == p);
        let tag_ok = match self.tag.as_deref().map(|t| normalize_tags(&[t])) {
            Some(tags) => tags.first().map_or(true, |t| record.tags.contains(t)),
            None => true,
        };
        status_ok && project_ok && tag_ok
    }
}

/// Result of a status transition or an update.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub record: ThreadRecord,
    /// Alias the thread held before the operation.
    pub previous_short_id: Option<u32>,
    /// `false` when the request was a no-op and nothing was written.
    pub changed: bool,
}

/// A Threadkeeper workspace on disk.
///
/// Owns the thread-collection root and exposes every thread operation. All
/// tokens accepted by methods here are resolved the same way: durable ID
/// first, then short alias among open threads.
pub struct Workspace {
    paths: WorkspacePaths,
    store: FileThreadStore,
}

impl Workspace {
    /// Create the workspace and its threads directory. Never deletes anything.
    pub fn init(paths: WorkspacePaths) -> SdkResult<InitReport> {
        let existed = paths.threads.is_dir();
        fs::create_dir_all(&paths.threads).map_err(SdkError::io(&paths.threads))?;
        info!(workspace = %paths.workspace.display(), existed, "initialized workspace");
        Ok(InitReport { paths, existed })
    }

    /// Open an initialized workspace.
    pub fn open(paths: WorkspacePaths) -> SdkResult<Self> {
        if !paths.threads.is_dir() {
            return Err(SdkError::NotInitialized(paths.threads));
        }
        let store = FileThreadStore::new(&paths.threads);
        Ok(Self { paths, store })
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    pub fn store(&self) -> &FileThreadStore {
        &self.store
    }

    /// Resolve a durable ID or short alias to its record.
    pub fn resolve(&self, token: &str) -> SdkResult<ThreadRecord> {
        Ok(tk_refs::resolve(&self.store, token)?)
    }

    /// Directory holding everything that belongs to a thread.
    pub fn thread_dir(&self, token: &str) -> SdkResult<PathBuf> {
        let record = self.resolve(token)?;
        Ok(self.dir_of(&record.id))
    }

    pub(crate) fn dir_of(&self, id: &DurableId) -> PathBuf {
        self.store.thread_dir(id)
    }

    pub fn threads_root(&self) -> &Path {
        self.store.root()
    }

    pub fn create_thread(&self, new: NewThread) -> SdkResult<ThreadRecord> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(SdkError::InvalidInput("title must not be empty".into()));
        }

        let id = DurableId::generate()?;
        let mut record = ThreadRecord::new(id, title, temporal::now());
        record.description = new.description;
        record.project = new.project.trim().to_string();
        record.tags = normalize_tags(&new.tags);
        record.due_at = new.due.map(due_timestamp);
        record.short_id = Some(next_short_id(&self.store.load_all()?));

        self.store.save(&record)?;
        debug!(id = %record.id, short_id = ?record.short_id, "created thread");
        Ok(record)
    }

    /// Threads matching `filter`, ordered by creation time.
    ///
    /// Open threads found without an alias are given one on the way.
    pub fn list(&self, filter: &ListFilter) -> SdkResult<Vec<ThreadRecord>> {
        let mut records = self.store.load_all()?;
        for record in records.iter_mut() {
            ensure_short_id(&self.store, record)?;
        }
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(records
            .into_iter()
            .filter(|r| filter.matches(r))
            .take(limit)
            .collect())
    }

    pub fn update(&self, token: &str, update: &ThreadUpdate) -> SdkResult<Change> {
        if update.is_empty() {
            return Err(SdkError::InvalidInput("no changes requested".into()));
        }
        let mut record = self.resolve(token)?;
        let previous_short_id = record.short_id;
        let changed = update.apply(&mut record);
        if changed {
            record.updated_at = temporal::now();
            self.store.save(&record)?;
            debug!(id = %record.id, "updated thread");
        }
        Ok(Change {
            record,
            previous_short_id,
            changed,
        })
    }

    /// Move a thread to `status`. Leaving the open state drops the alias;
    /// entering it assigns a fresh one.
    pub fn set_status(&self, token: &str, status: ThreadStatus) -> SdkResult<Change> {
        if status.is_active() {
            return self.reopen(token);
        }
        let mut record = self.resolve(token)?;
        let previous_short_id = record.short_id;
        if record.status == status {
            return Ok(Change {
                record,
                previous_short_id,
                changed: false,
            });
        }

        record.status = status;
        record.short_id = None;
        record.updated_at = temporal::now();
        self.store.save(&record)?;
        debug!(id = %record.id, %status, "changed thread status");
        Ok(Change {
            record,
            previous_short_id,
            changed: true,
        })
    }

    pub fn reopen(&self, token: &str) -> SdkResult<Change> {
        let mut record = self.resolve(token)?;
        let previous_short_id = record.short_id;
        if record.is_active() {
            return Ok(Change {
                record,
                previous_short_id,
                changed: false,
            });
        }

        record.status = ThreadStatus::Open;
        record.short_id = None;
        record.updated_at = temporal::now();
        if !ensure_short_id(&self.store, &mut record)? {
            self.store.save(&record)?;
        }
        debug!(id = %record.id, short_id = ?record.short_id, "reopened thread");
        Ok(Change {
            record,
            previous_short_id,
            changed: true,
        })
    }

    /// Delete a thread and everything under its directory.
    pub fn remove(&self, token: &str) -> SdkResult<ThreadRecord> {
        let record = self.resolve(token)?;
        self.store.remove(&record.id)?;
        info!(id = %record.id, "removed thread");
        Ok(record)
    }

    pub fn reindex(&self) -> SdkResult<ReindexReport> {
        Ok(tk_refs::reindex(&self.store)?)
    }
}

/// Due dates are stored as midnight UTC of the chosen day.
fn due_timestamp(date: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
