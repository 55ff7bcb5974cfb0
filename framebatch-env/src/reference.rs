//! Auxiliary reference selection.
//!
//! When the primary reference is temporally distant from the target
//! acquisition, a closer already-co-registered acquisition improves
//! alignment. The selector scans the staged RSLC directory for dated
//! entries and picks the chronologically closest one.

use std::path::Path;

use framebatch_core::types::AcqDate;
use framebatch_sync::Pattern;

use crate::error::{io_err, EnvError};

/// Pick the staged reference date closest to `target`.
///
/// Candidates are entries of `rslc_root` named in the compact `YYYYMMDD`
/// convention. Ties on day-distance break toward the earlier calendar date
/// (an explicit rule; the system this replaces depended on directory
/// enumeration order). Returns `None` when the winner is the primary
/// reference itself, and [`EnvError::NoCandidate`] when the directory holds
/// no parseable dates at all.
pub fn closest_reference(
    rslc_root: &Path,
    target: AcqDate,
    primary: AcqDate,
) -> Result<Option<AcqDate>, EnvError> {
    let date_name = Pattern::glob("20??????")?;

    let mut candidates: Vec<AcqDate> = Vec::new();
    let entries = std::fs::read_dir(rslc_root).map_err(|e| io_err(rslc_root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(rslc_root, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !date_name.matches(&name) {
            continue;
        }
        if let Ok(date) = AcqDate::parse_compact(&name) {
            candidates.push(date);
        }
    }
    candidates.sort();

    let Some(best) = candidates
        .iter()
        .copied()
        .min_by_key(|candidate| candidate.days_between(target).abs())
    else {
        return Err(EnvError::NoCandidate {
            path: rslc_root.to_path_buf(),
        });
    };

    if best == primary {
        Ok(None)
    } else {
        Ok(Some(best))
    }
}
