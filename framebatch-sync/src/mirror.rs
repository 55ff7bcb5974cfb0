//! Selective tree mirroring.
//!
//! `mirror` is the single synchronization primitive: acquisition populates a
//! staging directory from the cache with input patterns, and release writes
//! declared outputs back with output patterns. It is deliberately not atomic
//! across files — a crash mid-mirror leaves a partially updated destination,
//! compensated for by status codes and idempotent re-runs.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{io_err, SyncError};
use crate::pattern::PatternSet;

/// Counters describing what one `mirror` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    /// Files written because they were new or out of date.
    pub copied: usize,
    /// Selected files left alone (same size, destination not older).
    pub skipped: usize,
    /// Destination entries deleted (full mirror only).
    pub removed: usize,
    /// Directories created in the destination.
    pub dirs_created: usize,
}

/// Replicate `source` into `dest`.
///
/// - `patterns: None` — true sync: `dest` becomes an exact copy of
///   `source`; extraneous destination entries are removed.
/// - `patterns: Some(set)` — only source paths selected by the set are
///   created or updated; all other destination content is untouched.
///
/// Unchanged files are skipped, so re-running against a synchronized
/// destination rewrites nothing. Intermediate destination directories are
/// created as needed; if nothing matches, the only effect is
/// empty-directory creation.
pub fn mirror(
    source: &Path,
    dest: &Path,
    patterns: Option<&PatternSet>,
) -> Result<MirrorStats, SyncError> {
    if !source.is_dir() {
        return Err(io_err(
            source,
            std::io::Error::new(ErrorKind::NotFound, "mirror source is not a directory"),
        ));
    }

    let mut stats = MirrorStats::default();
    let dest_existed = dest.is_dir();
    if !dest_existed {
        fs::create_dir_all(dest).map_err(|e| io_err(dest, e))?;
        stats.dirs_created += 1;
    }

    // Full mirrors purge first, so type conflicts (file vs directory under
    // the same name) are gone before the copy pass.
    if patterns.is_none() && dest_existed {
        purge_extraneous(source, dest, &mut stats)?;
    }

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        let rel_str = rel.to_string_lossy();
        let selected = patterns.map_or(true, |set| set.matches(&rel_str));
        if !selected {
            continue;
        }
        if entry.file_type().is_dir() {
            let target = dest.join(rel);
            if !target.is_dir() {
                fs::create_dir_all(&target).map_err(|e| io_err(&target, e))?;
                stats.dirs_created += 1;
                tracing::debug!("created {}", target.display());
            }
        } else if entry.file_type().is_file() {
            copy_if_changed(entry.path(), &dest.join(rel), &mut stats)?;
        }
    }

    tracing::debug!(
        "mirrored {} -> {}: {} copied, {} skipped, {} removed",
        source.display(),
        dest.display(),
        stats.copied,
        stats.skipped,
        stats.removed,
    );
    Ok(stats)
}

fn copy_if_changed(src: &Path, dst: &Path, stats: &mut MirrorStats) -> Result<(), SyncError> {
    if up_to_date(src, dst)? {
        stats.skipped += 1;
        return Ok(());
    }
    if let Some(parent) = dst.parent() {
        if !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            stats.dirs_created += 1;
        }
    }
    fs::copy(src, dst).map_err(|e| io_err(dst, e))?;
    stats.copied += 1;
    tracing::debug!("copied {}", dst.display());
    Ok(())
}

/// A destination file is current when it has the same size and is no older
/// than the source.
fn up_to_date(src: &Path, dst: &Path) -> Result<bool, SyncError> {
    let dst_meta = match fs::metadata(dst) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(io_err(dst, err)),
    };
    if !dst_meta.is_file() {
        return Ok(false);
    }
    let src_meta = fs::metadata(src).map_err(|e| io_err(src, e))?;
    if src_meta.len() != dst_meta.len() {
        return Ok(false);
    }
    match (src_meta.modified(), dst_meta.modified()) {
        (Ok(src_mtime), Ok(dst_mtime)) => Ok(src_mtime <= dst_mtime),
        _ => Ok(false),
    }
}

fn purge_extraneous(source: &Path, dest: &Path, stats: &mut MirrorStats) -> Result<(), SyncError> {
    let mut doomed: Vec<(PathBuf, bool)> = Vec::new();
    for entry in WalkDir::new(dest).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(dest) else {
            continue;
        };
        let is_dir = entry.file_type().is_dir();
        let keep = match fs::symlink_metadata(source.join(rel)) {
            Ok(meta) => meta.is_dir() == is_dir,
            Err(_) => false,
        };
        if !keep {
            doomed.push((entry.path().to_path_buf(), is_dir));
        }
    }
    for (path, is_dir) in doomed {
        let result = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => {
                stats.removed += 1;
                tracing::debug!("removed {}", path.display());
            }
            // Already gone with a removed ancestor.
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(path, err)),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
