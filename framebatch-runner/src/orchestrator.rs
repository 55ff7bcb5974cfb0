//! The job orchestrator.
//!
//! Processes a job's pending items one at a time: select an auxiliary
//! reference, stage a working directory from the cache, invoke the external
//! routine, reconcile declared outputs back, and report every status
//! transition to the store. A single item's failure never aborts the job;
//! only orchestrator-level setup errors (missing cache root, unreadable
//! reference metadata) do.

use std::path::Path;

use framebatch_core::layout;
use framebatch_core::queue::StatusStore;
use framebatch_core::types::{AcqDate, FrameId, ItemId, ItemStatus, JobId, MultiLook, WorkItem};
use framebatch_core::Settings;
use framebatch_env::{closest_reference, EnvSpec, Outcome, StagingEnv};
use framebatch_sync::{PatternSet, SyncError};

use crate::error::{io_err, RunnerError};
use crate::metadata;
use crate::reporter::ProgressReporter;
use crate::routine::{CoregRequest, CoregRoutine};

/// Job-level completion code recorded when the run loop ends.
const JOB_FINISHED_CODE: i32 = 3;

// ---------------------------------------------------------------------------
// Pattern construction
// ---------------------------------------------------------------------------

/// Cache subset one item needs staged in: the target's raw acquisition, the
/// primary's raw and co-registered products, shared geometry, and the
/// auxiliary's co-registered products when one is used.
pub fn input_patterns(
    primary: AcqDate,
    target: AcqDate,
    auxiliary: Option<AcqDate>,
) -> Result<PatternSet, SyncError> {
    let mut sources = vec![
        format!("SLC/{}.*", target.compact()),
        format!("RSLC/{}.*", primary.compact()),
        format!("SLC/{}.*", primary.compact()),
        "geo".to_owned(),
        "DEM".to_owned(),
    ];
    if let Some(auxiliary) = auxiliary {
        sources.push(format!("RSLC/{}.*", auxiliary.compact()));
    }
    PatternSet::compile(sources)
}

/// Declared outputs written back after processing: the target's
/// co-registered products plus the routine's log and tab trees. Nothing
/// else leaves the working directory.
pub fn output_patterns(primary: AcqDate, target: AcqDate) -> Result<PatternSet, SyncError> {
    let t = target.compact();
    let p = primary.compact();
    PatternSet::compile([
        format!(r"RSLC/{t}/{t}\.IW[1-3]\.rslc.*"),
        format!(r"RSLC/{t}/{t}\.rslc\.par"),
        format!(r"RSLC/{t}/{t}\.rslc"),
        format!(r"RSLC/{t}/{t}.*mli.*"),
        format!(r"RSLC/{t}/{p}_{t}\.slc\.mli\.lt"),
        format!(r"RSLC/{t}/{p}_{t}\.off"),
        "log.*".to_owned(),
        "tab.*".to_owned(),
    ])
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Per-item outcome of a completed run.
#[derive(Debug)]
pub struct JobSummary {
    pub statuses: Vec<(ItemId, ItemStatus)>,
}

impl JobSummary {
    pub fn all_built(&self) -> bool {
        self.statuses
            .iter()
            .all(|(_, status)| *status == ItemStatus::Built)
    }

    pub fn failures(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(_, status)| *status != ItemStatus::Built)
            .count()
    }
}

/// Drives one job against a store, a routine, and a progress reporter.
pub struct Orchestrator<'a> {
    store: &'a dyn StatusStore,
    routine: &'a dyn CoregRoutine,
    reporter: &'a dyn ProgressReporter,
    settings: &'a Settings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn StatusStore,
        routine: &'a dyn CoregRoutine,
        reporter: &'a dyn ProgressReporter,
        settings: &'a Settings,
    ) -> Self {
        Self {
            store,
            routine,
            reporter,
            settings,
        }
    }

    /// Process every pending item of `job` to completion.
    pub fn run_job(&self, job: JobId) -> Result<JobSummary, RunnerError> {
        let frame = self.store.frame(job)?;
        let primary = self.store.primary_reference(&frame)?;
        let items = self.store.pending_items(job)?;
        tracing::info!(
            "processing job {job} in frame {frame} ({} pending item(s))",
            items.len()
        );
        self.store.set_job_started(job)?;

        // Every item processes with the primary's multi-look factors; an
        // unreadable header fails the whole job up front.
        let par_path = layout::reference_par_path(&self.settings.cache_root, &frame, primary);
        let looks = metadata::read_multilook(&par_path)?;

        let mut statuses = Vec::with_capacity(items.len());
        for item in &items {
            let status = match self.process_item(job, &frame, primary, looks, item) {
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!("item {} ({}): {err}", item.id, item.target);
                    if let Err(report_err) = self
                        .store
                        .set_item_status(item.id, ItemStatus::UnknownError)
                    {
                        tracing::warn!("could not report item {}: {report_err}", item.id);
                    }
                    ItemStatus::UnknownError
                }
            };
            statuses.push((item.id, status));
        }

        self.store.set_job_finished(job, JOB_FINISHED_CODE)?;
        Ok(JobSummary { statuses })
    }

    fn process_item(
        &self,
        job: JobId,
        frame: &FrameId,
        primary: AcqDate,
        looks: MultiLook,
        item: &WorkItem,
    ) -> Result<ItemStatus, RunnerError> {
        let cache = &self.settings.cache_root;

        // Absent source acquisition is a terminal item status; no staging
        // environment is created and the routine is never invoked.
        let source_slc = layout::slc_dir(cache, frame, item.target);
        if !source_slc.exists() {
            tracing::warn!("source acquisition {} missing from cache", item.target);
            self.store
                .set_item_status(item.id, ItemStatus::MissingSource)?;
            return Ok(ItemStatus::MissingSource);
        }

        let auxiliary = closest_reference(&layout::rslc_root(cache, frame), item.target, primary)?;
        self.reporter.report(&format!("Setting up {}", item.target));

        let mut env = StagingEnv::new(EnvSpec {
            job,
            scheduler_job: self.settings.scheduler_job_id.clone(),
            frame: frame.clone(),
            cache_root: cache.clone(),
            temp_root: self.settings.temp_root.clone(),
            input_patterns: Some(input_patterns(primary, item.target, auxiliary)?),
            output_patterns: Some(output_patterns(primary, item.target)?),
            scratch_dirs: vec!["tab".into(), "log".into()],
            cleanup_dirs: vec!["RSLC".into(), "tab".into()],
            writeback: self.settings.writeback,
        });
        let store = self.store;
        let item_id = item.id;
        env.on_failure(move || {
            store
                .set_item_status(item_id, ItemStatus::UnknownError)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        });

        self.store.set_item_status(item.id, ItemStatus::Building)?;
        let work_dir = env.acquire()?.to_path_buf();
        tracing::info!(
            "processing {} in staging environment {}",
            item.target,
            work_dir.display()
        );
        self.reporter.report(&format!("Processing {}", item.target));

        let code = match self.run_staged(&work_dir, frame, primary, auxiliary, looks, item) {
            Ok(code) => code,
            Err(err) => {
                // Failure-path release: the hook reports UnknownError, the
                // declared directories are purged, the work dir goes away.
                if let Err(release_err) = env.release(Outcome::Failure) {
                    tracing::warn!("release after fault also failed: {release_err}");
                }
                return Err(err);
            }
        };

        let outcome = if code == 0 {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        env.release(outcome)?;

        // The routine's result code is the item's final status, reported
        // after reconciliation.
        let status = ItemStatus::from_code(code);
        self.store.set_item_status(item.id, status)?;
        self.reporter.report(&format!("Cleaning {}", item.target));

        if status == ItemStatus::Built {
            self.reclaim_source(frame, item)?;
        }
        Ok(status)
    }

    fn run_staged(
        &self,
        work_dir: &Path,
        frame: &FrameId,
        primary: AcqDate,
        auxiliary: Option<AcqDate>,
        looks: MultiLook,
        item: &WorkItem,
    ) -> Result<i32, RunnerError> {
        let request = CoregRequest {
            target: item.target,
            auxiliary,
            primary,
            frame,
            input_dir: "SLC",
            output_dir: "RSLC",
            work_dir,
            looks,
            threads: self.settings.threads,
        };
        let code = self.routine.run(&request);

        // The mosaicked full-scene image is large and reproducible from the
        // per-swath products; never retain it.
        let mosaic = work_dir
            .join("RSLC")
            .join(item.target.compact())
            .join(format!("{}.rslc", item.target.compact()));
        if mosaic.exists() {
            tracing::info!("removing mosaicked image {}", mosaic.display());
            std::fs::remove_file(&mosaic).map_err(|e| io_err(&mosaic, e))?;
        }
        Ok(code)
    }

    /// After a successful build, purge the raw source acquisition from the
    /// cache if no other pending item still needs it.
    fn reclaim_source(&self, frame: &FrameId, item: &WorkItem) -> Result<(), RunnerError> {
        let Some(source) = self.store.unreferenced_source(frame, item.target)? else {
            return Ok(());
        };
        let slc_cache = layout::slc_dir(&self.settings.cache_root, frame, item.target);
        if slc_cache.exists() {
            std::fs::remove_dir_all(&slc_cache).map_err(|e| io_err(&slc_cache, e))?;
            tracing::info!("removed source cache {}", item.target);
        }
        self.store
            .set_source_status(source, ItemStatus::Removed)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
