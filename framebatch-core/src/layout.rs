//! Cache and staging-area layout helpers.
//!
//! # Layout
//!
//! ```text
//! <cache>/<frame>/
//!   SLC/<YYYYMMDD>/…        (raw acquisitions)
//!   RSLC/<YYYYMMDD>/…       (co-registered outputs)
//!   geo/…  DEM/…            (shared geometry and elevation products)
//!
//! <temp>/<frame>_envs/<jobId[_schedulerJobId]>/   (staging directories)
//!
//! <source>/<track>/<frame>/…                      (long-term archive)
//! ```
//!
//! All functions here are pure path arithmetic — no I/O.

use std::path::{Path, PathBuf};

use crate::types::{AcqDate, FrameId, JobId};

/// `<cache>/<frame>/`
pub fn frame_dir(cache_root: &Path, frame: &FrameId) -> PathBuf {
    cache_root.join(frame.name())
}

/// `<cache>/<frame>/SLC/`
pub fn slc_root(cache_root: &Path, frame: &FrameId) -> PathBuf {
    frame_dir(cache_root, frame).join("SLC")
}

/// `<cache>/<frame>/RSLC/`
pub fn rslc_root(cache_root: &Path, frame: &FrameId) -> PathBuf {
    frame_dir(cache_root, frame).join("RSLC")
}

/// `<cache>/<frame>/SLC/<YYYYMMDD>/`
pub fn slc_dir(cache_root: &Path, frame: &FrameId, date: AcqDate) -> PathBuf {
    slc_root(cache_root, frame).join(date.compact())
}

/// `<cache>/<frame>/RSLC/<YYYYMMDD>/`
pub fn rslc_dir(cache_root: &Path, frame: &FrameId, date: AcqDate) -> PathBuf {
    rslc_root(cache_root, frame).join(date.compact())
}

/// `<cache>/<frame>/IFG/`
pub fn ifg_root(cache_root: &Path, frame: &FrameId) -> PathBuf {
    frame_dir(cache_root, frame).join("IFG")
}

/// A frame's directory in the long-term archive tree:
/// `<source>/<track>/<frame>/` (track number with leading zeros stripped).
pub fn archive_frame_dir(source_root: &Path, frame: &FrameId) -> PathBuf {
    source_root.join(frame.track().to_string()).join(frame.name())
}

/// The primary reference's multi-look metadata header:
/// `<cache>/<frame>/SLC/<primary>/<primary>.slc.mli.par`
pub fn reference_par_path(cache_root: &Path, frame: &FrameId, primary: AcqDate) -> PathBuf {
    slc_dir(cache_root, frame, primary).join(format!("{}.slc.mli.par", primary.compact()))
}

/// Parent of all staging directories for a frame: `<temp>/<frame>_envs/`
pub fn frame_env_root(temp_root: &Path, frame: &FrameId) -> PathBuf {
    temp_root.join(format!("{}_envs", frame.name()))
}

/// Unique staging-directory name for one orchestrator instance.
///
/// Two instances working the same frame concurrently must never collide, so
/// the name composes the batch job id with the cluster scheduler's job id
/// when one is present.
pub fn env_id(job: JobId, scheduler_job: Option<&str>) -> String {
    match scheduler_job {
        Some(scheduler) => format!("{job}_{scheduler}"),
        None => job.to_string(),
    }
}
