//! Reference metadata header parsing.
//!
//! The primary reference's `<date>.slc.mli.par` file carries the multi-look
//! factors every item of the job processes with, as `key: value` header
//! lines:
//!
//! ```text
//! range_looks:          20
//! azimuth_looks:         4
//! ```

use std::io::ErrorKind;
use std::path::Path;

use framebatch_core::types::MultiLook;

use crate::error::{io_err, RunnerError};

/// Read the multi-look factors out of a `.slc.mli.par` header.
///
/// An absent file or absent/unparseable keys is
/// [`RunnerError::MissingMetadata`] — every item needs these factors, so
/// the caller treats it as fatal to the job.
pub fn read_multilook(par_path: &Path) -> Result<MultiLook, RunnerError> {
    let contents = match std::fs::read_to_string(par_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(RunnerError::MissingMetadata {
                path: par_path.to_path_buf(),
            })
        }
        Err(err) => return Err(io_err(par_path, err)),
    };
    let range = header_value(&contents, "range_looks");
    let azimuth = header_value(&contents, "azimuth_looks");
    match (range, azimuth) {
        (Some(range), Some(azimuth)) => Ok(MultiLook { range, azimuth }),
        _ => Err(RunnerError::MissingMetadata {
            path: par_path.to_path_buf(),
        }),
    }
}

fn header_value(contents: &str, key: &str) -> Option<u32> {
    contents
        .lines()
        .find(|line| line.trim_start().starts_with(key))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|value| value.split_whitespace().next())
        .and_then(|value| value.parse().ok())
}
