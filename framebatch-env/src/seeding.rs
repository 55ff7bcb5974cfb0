//! Frame-cache provisioning from the long-term archive.
//!
//! The archive keeps frames under `<source>/<track>/<frame>/` with the same
//! `geo`/`DEM`/`SLC`/`RSLC`/`IFG` layout the cache uses. Seeding pulls the
//! shared geometry and the primary reference across with the same selective
//! mirror the staging environment uses, and links already co-registered
//! products instead of copying them. Archived `.7z` bundles are not
//! unpacked here; site tooling does that before seeding.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use regex::Regex;

use framebatch_core::layout;
use framebatch_core::types::{AcqDate, FrameId};
use framebatch_sync::{mirror, MirrorStats, Pattern, PatternSet, SyncError};

use crate::error::{io_err, EnvError};

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// What one `seed_frame_cache` call did.
#[derive(Debug, Clone, Copy)]
pub struct SeedSummary {
    /// The primary reference date, given or discovered.
    pub primary: AcqDate,
    pub staged: MirrorStats,
    /// Primary products newly linked into `RSLC/<primary>`.
    pub linked: usize,
}

/// Provision `<cache>/<frame>` from the archive.
///
/// Mirrors `DEM.*`, `geo.*`, and the primary's `SLC/<date>` subtree into
/// the frame cache, then makes the primary available as a co-registered
/// reference by symlinking each of its `*slc*` files into `RSLC/<date>`
/// under the `slc → rslc` renamed form. An existing `RSLC/<date>` is
/// reused, so re-seeding an already provisioned frame is harmless.
///
/// When `primary` is `None` the date is discovered from the archive's
/// `geo` directory (first filename, in sorted order, carrying a trailing
/// `YYYYMMDD.<ext>` date).
pub fn seed_frame_cache(
    source_root: &Path,
    cache_root: &Path,
    frame: &FrameId,
    primary: Option<AcqDate>,
) -> Result<SeedSummary, EnvError> {
    let archive = layout::archive_frame_dir(source_root, frame);
    let frame_cache = layout::frame_dir(cache_root, frame);

    let primary = match primary {
        Some(primary) => primary,
        None => discover_primary(&archive.join("geo"))?,
    };

    let patterns = PatternSet::compile([
        "DEM.*".to_owned(),
        "geo.*".to_owned(),
        format!("SLC/{}", primary.compact()),
    ])?;
    let staged = mirror(&archive, &frame_cache, Some(&patterns))?;
    tracing::info!(
        "staged {} archive file(s) into {}",
        staged.copied,
        frame_cache.display()
    );

    let rslc_dir = layout::rslc_dir(cache_root, frame, primary);
    if rslc_dir.is_dir() {
        tracing::info!(
            "co-registered primary already present at {}; reusing it",
            rslc_dir.display()
        );
    } else {
        fs::create_dir_all(&rslc_dir).map_err(|e| io_err(&rslc_dir, e))?;
    }
    let linked = link_primary_products(&layout::slc_dir(cache_root, frame, primary), &rslc_dir)?;

    Ok(SeedSummary {
        primary,
        staged,
        linked,
    })
}

/// Sorted dates of ready (unpacked) co-registered directories in the
/// archive's `RSLC/`.
pub fn list_archived_references(
    source_root: &Path,
    frame: &FrameId,
) -> Result<Vec<AcqDate>, EnvError> {
    let archive_rslc = layout::archive_frame_dir(source_root, frame).join("RSLC");
    if !archive_rslc.is_dir() {
        return Ok(Vec::new());
    }
    let date_name = Pattern::glob("20??????")?;

    let mut dates = Vec::new();
    for entry in fs::read_dir(&archive_rslc).map_err(|e| io_err(&archive_rslc, e))? {
        let entry = entry.map_err(|e| io_err(&archive_rslc, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !date_name.matches(&name) {
            continue;
        }
        if let Ok(date) = AcqDate::parse_compact(&name) {
            dates.push(date);
        }
    }
    dates.sort();
    dates.dedup();
    Ok(dates)
}

/// A date directory is complete when it holds at least one per-swath
/// product matching `pattern`.
fn has_swath_products(dir: &Path, pattern: &Pattern) -> Result<bool, EnvError> {
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name();
        if pattern.matches(&name.to_string_lossy()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Link archived co-registered directories into the cache `RSLC/`.
///
/// Only requested dates whose archive directory holds per-swath
/// `*.IW?.rslc` products are imported; dates already present in the cache
/// are counted but left alone. Returns the dates available in the cache
/// afterwards, sorted.
pub fn import_references(
    source_root: &Path,
    cache_root: &Path,
    frame: &FrameId,
    dates: &[AcqDate],
) -> Result<Vec<AcqDate>, EnvError> {
    let archive_rslc = layout::archive_frame_dir(source_root, frame).join("RSLC");
    let cache_rslc = layout::rslc_root(cache_root, frame);
    fs::create_dir_all(&cache_rslc).map_err(|e| io_err(&cache_rslc, e))?;
    if !archive_rslc.is_dir() {
        return Ok(Vec::new());
    }
    let swath = Pattern::glob("20??????.IW?.rslc")?;

    let mut imported = Vec::new();
    for date in dates {
        let source = archive_rslc.join(date.compact());
        if !source.is_dir() || !has_swath_products(&source, &swath)? {
            continue;
        }
        let dest = cache_rslc.join(date.compact());
        if !dest.exists() {
            symlink(&source, &dest).map_err(|e| io_err(&dest, e))?;
            tracing::debug!("linked {}", dest.display());
        }
        imported.push(*date);
    }
    imported.sort();
    Ok(imported)
}

/// Import archived interferogram pair directories (`<date>_<date>`) into
/// the cache `IFG/`, optionally restricted to an exclusive date window.
/// Each pair directory is created in the cache with its files symlinked.
pub fn import_interferograms(
    source_root: &Path,
    cache_root: &Path,
    frame: &FrameId,
    window: Option<(AcqDate, AcqDate)>,
) -> Result<Vec<(AcqDate, AcqDate)>, EnvError> {
    let archive_ifg = layout::archive_frame_dir(source_root, frame).join("IFG");
    let cache_ifg = layout::ifg_root(cache_root, frame);
    fs::create_dir_all(&cache_ifg).map_err(|e| io_err(&cache_ifg, e))?;
    if !archive_ifg.is_dir() {
        return Ok(Vec::new());
    }

    let mut imported = Vec::new();
    for entry in fs::read_dir(&archive_ifg).map_err(|e| io_err(&archive_ifg, e))? {
        let entry = entry.map_err(|e| io_err(&archive_ifg, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(pair) = parse_pair(&name) else {
            continue;
        };
        if let Some((start, end)) = window {
            if pair.0 <= start || pair.1 >= end {
                continue;
            }
        }
        let dest = cache_ifg.join(name.as_ref());
        if !dest.exists() {
            fs::create_dir_all(&dest).map_err(|e| io_err(&dest, e))?;
            for file in fs::read_dir(entry.path()).map_err(|e| io_err(entry.path(), e))? {
                let file = file.map_err(|e| io_err(entry.path(), e))?;
                let link = dest.join(file.file_name());
                symlink(file.path(), &link).map_err(|e| io_err(&link, e))?;
            }
        }
        imported.push(pair);
    }
    imported.sort();
    Ok(imported)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DATE_SUFFIX: &str = r"(\d{8})\.\w+$";

fn date_suffix_pattern() -> Result<Regex, EnvError> {
    Regex::new(DATE_SUFFIX).map_err(|e| {
        EnvError::Sync(SyncError::Pattern {
            pattern: DATE_SUFFIX.to_owned(),
            source: e,
        })
    })
}

/// Find the primary reference date from geometry-product filenames
/// (`<...><YYYYMMDD>.<ext>`). Sorted order makes the pick deterministic.
fn discover_primary(geo_dir: &Path) -> Result<AcqDate, EnvError> {
    let pattern = date_suffix_pattern()?;
    let mut names = Vec::new();
    for entry in fs::read_dir(geo_dir).map_err(|e| io_err(geo_dir, e))? {
        let entry = entry.map_err(|e| io_err(geo_dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    for name in &names {
        if let Some(captures) = pattern.captures(name) {
            if let Ok(date) = AcqDate::parse_compact(&captures[1]) {
                return Ok(date);
            }
        }
    }
    Err(EnvError::NoPrimaryReference {
        path: geo_dir.to_path_buf(),
    })
}

/// Symlink every `*slc*` file of the cached primary `SLC/<date>` into
/// `RSLC/<date>` under the `slc → rslc` renamed form. Existing links are
/// kept.
fn link_primary_products(slc_dir: &Path, rslc_dir: &Path) -> Result<usize, EnvError> {
    let mut linked = 0;
    for entry in fs::read_dir(slc_dir).map_err(|e| io_err(slc_dir, e))? {
        let entry = entry.map_err(|e| io_err(slc_dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.contains("slc") {
            continue;
        }
        let target = rslc_dir.join(name.replace("slc", "rslc"));
        if target.exists() {
            continue;
        }
        symlink(entry.path(), &target).map_err(|e| io_err(&target, e))?;
        linked += 1;
    }
    Ok(linked)
}

fn parse_pair(name: &str) -> Option<(AcqDate, AcqDate)> {
    let (first, second) = name.split_once('_')?;
    Some((
        AcqDate::parse_compact(first).ok()?,
        AcqDate::parse_compact(second).ok()?,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
