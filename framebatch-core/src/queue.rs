//! Job/status store abstraction.
//!
//! The queue that hands out work and records per-item status codes is an
//! external collaborator; this module defines the small operation vocabulary
//! the orchestrator consumes ([`StatusStore`]) and two implementations:
//!
//! - [`MemoryStore`] — in-memory, keeps a transition history; test double.
//! - [`YamlStore`] — one YAML document per job, atomic `.tmp` + rename
//!   saves, so the CLI can drive a job from a plain file.
//!
//! Stores are used from a single thread (the scheduling model is
//! synchronous); interior mutability keeps every method `&self` so callers
//! can hold shared references alongside failure hooks.

use std::cell::RefCell;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};
use crate::types::{AcqDate, FrameId, ItemId, ItemStatus, JobId, SourceId, WorkItem};

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Operations the orchestrator needs from the external job/status store.
pub trait StatusStore {
    /// Work items for `job` that have no recorded status yet.
    fn pending_items(&self, job: JobId) -> Result<Vec<WorkItem>, StoreError>;

    /// The frame this job operates on.
    fn frame(&self, job: JobId) -> Result<FrameId, StoreError>;

    /// The primary reference acquisition all items align to.
    fn primary_reference(&self, frame: &FrameId) -> Result<AcqDate, StoreError>;

    fn set_item_status(&self, item: ItemId, status: ItemStatus) -> Result<(), StoreError>;

    fn set_job_started(&self, job: JobId) -> Result<(), StoreError>;

    fn set_job_finished(&self, job: JobId, code: i32) -> Result<(), StoreError>;

    /// A source acquisition on `date` that no pending item still needs, if
    /// the store tracks one. Eligible for space reclamation.
    fn unreferenced_source(
        &self,
        frame: &FrameId,
        date: AcqDate,
    ) -> Result<Option<SourceId>, StoreError>;

    fn set_source_status(&self, source: SourceId, status: ItemStatus) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Job document
// ---------------------------------------------------------------------------

/// Status record for one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub target: AcqDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,
    /// `None` until the first status report; pending items are exactly the
    /// ones without a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// Status record for one raw source acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: SourceId,
    pub date: AcqDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// Everything the store persists for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFile {
    pub job: JobId,
    pub frame: FrameId,
    pub primary_reference: AcqDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<i32>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
}

impl JobFile {
    pub fn new(job: JobId, frame: FrameId, primary_reference: AcqDate) -> Self {
        Self {
            job,
            frame,
            primary_reference,
            started_at: None,
            finished: None,
            items: Vec::new(),
            sources: Vec::new(),
        }
    }

    fn check_job(&self, job: JobId) -> Result<(), StoreError> {
        if self.job == job {
            Ok(())
        } else {
            Err(StoreError::JobNotFound { job })
        }
    }

    fn pending(&self) -> Vec<WorkItem> {
        self.items
            .iter()
            .filter(|record| match record.status {
                None | Some(ItemStatus::Building) => true,
                Some(_) => false,
            })
            .map(|record| WorkItem {
                id: record.id,
                target: record.target,
                source: record.source,
            })
            .collect()
    }

    fn set_item_status(&mut self, item: ItemId, status: ItemStatus) -> Result<(), StoreError> {
        let record = self
            .items
            .iter_mut()
            .find(|record| record.id == item)
            .ok_or(StoreError::UnknownItem { item })?;
        record.status = Some(status);
        Ok(())
    }

    fn set_source_status(
        &mut self,
        source: SourceId,
        status: ItemStatus,
    ) -> Result<(), StoreError> {
        let record = self
            .sources
            .iter_mut()
            .find(|record| record.id == source)
            .ok_or(StoreError::UnknownSource { source_id: source })?;
        record.status = Some(status);
        Ok(())
    }

    /// A source on `date` is unreferenced when no item that needs it is
    /// still pending, and it has not already been purged.
    fn unreferenced_source(&self, date: AcqDate) -> Option<SourceId> {
        let source = self
            .sources
            .iter()
            .find(|record| record.date == date && record.status != Some(ItemStatus::Removed))?;
        let still_needed = self.items.iter().any(|item| {
            item.source == Some(source.id)
                && matches!(item.status, None | Some(ItemStatus::Building))
        });
        if still_needed {
            None
        } else {
            Some(source.id)
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store. Keeps the full status-transition history so tests can
/// assert on ordering and on exactly-once reporting.
#[derive(Debug)]
pub struct MemoryStore {
    state: RefCell<JobFile>,
    history: RefCell<Vec<(ItemId, ItemStatus)>>,
}

impl MemoryStore {
    pub fn new(job: JobId, frame: FrameId, primary_reference: AcqDate) -> Self {
        Self {
            state: RefCell::new(JobFile::new(job, frame, primary_reference)),
            history: RefCell::new(Vec::new()),
        }
    }

    pub fn push_item(&self, id: ItemId, target: AcqDate, source: Option<SourceId>) {
        self.state.borrow_mut().items.push(ItemRecord {
            id,
            target,
            source,
            status: None,
        });
    }

    pub fn push_source(&self, id: SourceId, date: AcqDate) {
        self.state.borrow_mut().sources.push(SourceRecord {
            id,
            date,
            status: None,
        });
    }

    pub fn item_status(&self, item: ItemId) -> Option<ItemStatus> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|record| record.id == item)
            .and_then(|record| record.status)
    }

    pub fn source_status(&self, source: SourceId) -> Option<ItemStatus> {
        self.state
            .borrow()
            .sources
            .iter()
            .find(|record| record.id == source)
            .and_then(|record| record.status)
    }

    /// Every `set_item_status` call in order.
    pub fn history(&self) -> Vec<(ItemId, ItemStatus)> {
        self.history.borrow().clone()
    }

    pub fn started(&self) -> bool {
        self.state.borrow().started_at.is_some()
    }

    pub fn finished(&self) -> Option<i32> {
        self.state.borrow().finished
    }
}

impl StatusStore for MemoryStore {
    fn pending_items(&self, job: JobId) -> Result<Vec<WorkItem>, StoreError> {
        let state = self.state.borrow();
        state.check_job(job)?;
        Ok(state.pending())
    }

    fn frame(&self, job: JobId) -> Result<FrameId, StoreError> {
        let state = self.state.borrow();
        state.check_job(job)?;
        Ok(state.frame.clone())
    }

    fn primary_reference(&self, _frame: &FrameId) -> Result<AcqDate, StoreError> {
        Ok(self.state.borrow().primary_reference)
    }

    fn set_item_status(&self, item: ItemId, status: ItemStatus) -> Result<(), StoreError> {
        self.state.borrow_mut().set_item_status(item, status)?;
        self.history.borrow_mut().push((item, status));
        Ok(())
    }

    fn set_job_started(&self, job: JobId) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        state.check_job(job)?;
        state.started_at = Some(Utc::now());
        Ok(())
    }

    fn set_job_finished(&self, job: JobId, code: i32) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        state.check_job(job)?;
        state.finished = Some(code);
        Ok(())
    }

    fn unreferenced_source(
        &self,
        _frame: &FrameId,
        date: AcqDate,
    ) -> Result<Option<SourceId>, StoreError> {
        Ok(self.state.borrow().unreferenced_source(date))
    }

    fn set_source_status(&self, source: SourceId, status: ItemStatus) -> Result<(), StoreError> {
        self.state.borrow_mut().set_source_status(source, status)
    }
}

// ---------------------------------------------------------------------------
// YamlStore
// ---------------------------------------------------------------------------

/// File-backed store: one job per YAML document at an explicit path.
///
/// Every mutation saves the whole document atomically (`.tmp` sibling, then
/// rename — same filesystem, no partial writes visible).
#[derive(Debug)]
pub struct YamlStore {
    path: PathBuf,
    state: RefCell<JobFile>,
}

impl YamlStore {
    /// Load an existing job file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let state: JobFile = serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self {
            path,
            state: RefCell::new(state),
        })
    }

    /// Create a job file on disk and return the open store.
    pub fn create(path: impl Into<PathBuf>, file: JobFile) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            state: RefCell::new(file),
        };
        store.save()?;
        Ok(store)
    }

    /// A point-in-time copy of the job document (for status listings).
    pub fn snapshot(&self) -> JobFile {
        self.state.borrow().clone()
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }
        let yaml = serde_yaml::to_string(&*self.state.borrow())?;
        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }
}

impl StatusStore for YamlStore {
    fn pending_items(&self, job: JobId) -> Result<Vec<WorkItem>, StoreError> {
        let state = self.state.borrow();
        state.check_job(job)?;
        Ok(state.pending())
    }

    fn frame(&self, job: JobId) -> Result<FrameId, StoreError> {
        let state = self.state.borrow();
        state.check_job(job)?;
        Ok(state.frame.clone())
    }

    fn primary_reference(&self, _frame: &FrameId) -> Result<AcqDate, StoreError> {
        Ok(self.state.borrow().primary_reference)
    }

    fn set_item_status(&self, item: ItemId, status: ItemStatus) -> Result<(), StoreError> {
        self.state.borrow_mut().set_item_status(item, status)?;
        self.save()
    }

    fn set_job_started(&self, job: JobId) -> Result<(), StoreError> {
        {
            let mut state = self.state.borrow_mut();
            state.check_job(job)?;
            state.started_at = Some(Utc::now());
        }
        self.save()
    }

    fn set_job_finished(&self, job: JobId, code: i32) -> Result<(), StoreError> {
        {
            let mut state = self.state.borrow_mut();
            state.check_job(job)?;
            state.finished = Some(code);
        }
        self.save()
    }

    fn unreferenced_source(
        &self,
        _frame: &FrameId,
        date: AcqDate,
    ) -> Result<Option<SourceId>, StoreError> {
        Ok(self.state.borrow().unreferenced_source(date))
    }

    fn set_source_status(&self, source: SourceId, status: ItemStatus) -> Result<(), StoreError> {
        self.state.borrow_mut().set_source_status(source, status)?;
        self.save()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn frame() -> FrameId {
        FrameId::parse("021D_04972_131313").expect("frame")
    }

    fn date(s: &str) -> AcqDate {
        AcqDate::parse_compact(s).expect("date")
    }

    fn seeded_memory() -> MemoryStore {
        let store = MemoryStore::new(JobId(7), frame(), date("20200101"));
        store.push_item(ItemId(1), date("20200110"), Some(SourceId(11)));
        store.push_item(ItemId(2), date("20200122"), Some(SourceId(12)));
        store.push_source(SourceId(11), date("20200110"));
        store.push_source(SourceId(12), date("20200122"));
        store
    }

    #[test]
    fn pending_excludes_terminal_statuses() {
        let store = seeded_memory();
        store
            .set_item_status(ItemId(1), ItemStatus::Built)
            .expect("set");
        let pending = store.pending_items(JobId(7)).expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ItemId(2));
    }

    #[test]
    fn building_items_stay_pending() {
        let store = seeded_memory();
        store
            .set_item_status(ItemId(1), ItemStatus::Building)
            .expect("set");
        assert_eq!(store.pending_items(JobId(7)).expect("pending").len(), 2);
    }

    #[test]
    fn wrong_job_id_is_rejected() {
        let store = seeded_memory();
        let err = store.pending_items(JobId(99)).unwrap_err();
        assert!(matches!(err, StoreError::JobNotFound { .. }));
    }

    #[test]
    fn unknown_item_is_rejected() {
        let store = seeded_memory();
        let err = store
            .set_item_status(ItemId(404), ItemStatus::Built)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownItem { .. }));
    }

    #[test]
    fn source_unreferenced_only_after_its_item_finishes() {
        let store = seeded_memory();
        assert_eq!(
            store
                .unreferenced_source(&frame(), date("20200110"))
                .expect("query"),
            None
        );
        store
            .set_item_status(ItemId(1), ItemStatus::Built)
            .expect("set");
        assert_eq!(
            store
                .unreferenced_source(&frame(), date("20200110"))
                .expect("query"),
            Some(SourceId(11))
        );
    }

    #[test]
    fn removed_source_is_not_offered_again() {
        let store = seeded_memory();
        store
            .set_item_status(ItemId(1), ItemStatus::Built)
            .expect("set");
        store
            .set_source_status(SourceId(11), ItemStatus::Removed)
            .expect("set");
        assert_eq!(
            store
                .unreferenced_source(&frame(), date("20200110"))
                .expect("query"),
            None
        );
    }

    #[test]
    fn yaml_store_roundtrip() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("job7.yaml");
        let mut file = JobFile::new(JobId(7), frame(), date("20200101"));
        file.items.push(ItemRecord {
            id: ItemId(1),
            target: date("20200110"),
            source: None,
            status: None,
        });
        let store = YamlStore::create(&path, file).expect("create");
        store
            .set_item_status(ItemId(1), ItemStatus::Failed(4))
            .expect("set");

        let reopened = YamlStore::open(&path).expect("open");
        let snapshot = reopened.snapshot();
        assert_eq!(snapshot.items[0].status, Some(ItemStatus::Failed(4)));
        assert_eq!(snapshot.frame, frame());
    }

    #[test]
    fn yaml_save_cleans_up_tmp() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("job.yaml");
        YamlStore::create(&path, JobFile::new(JobId(1), frame(), date("20200101")))
            .expect("create");
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    fn yaml_parse_error_names_the_path() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("broken.yaml");
        std::fs::write(&path, "items: {not: [valid").expect("write");
        let err = YamlStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn memory_history_records_every_transition() {
        let store = seeded_memory();
        store
            .set_item_status(ItemId(1), ItemStatus::Building)
            .expect("set");
        store
            .set_item_status(ItemId(1), ItemStatus::Built)
            .expect("set");
        assert_eq!(
            store.history(),
            vec![
                (ItemId(1), ItemStatus::Building),
                (ItemId(1), ItemStatus::Built)
            ]
        );
    }
}
