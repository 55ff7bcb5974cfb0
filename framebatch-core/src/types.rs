//! Domain types for batch co-registration.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem
//! paths. Identifiers are newtypes so a job id can never be passed where an
//! item id is expected.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Identifier newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed batch job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for JobId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A strongly-typed work item identifier (one co-registration target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for ItemId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A strongly-typed identifier for a raw source acquisition in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for SourceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// FrameId
// ---------------------------------------------------------------------------

/// A validated frame identifier: `TTT[AD]_*` — track number, ascending or
/// descending orientation, then sub-identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrameId {
    name: String,
    track: u32,
}

impl FrameId {
    /// Parse and validate a frame name.
    ///
    /// The name must start with at least one digit (the track number)
    /// followed by `A` or `D`.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
        let rest = &name[digits.len()..];
        let orientation_ok = rest.starts_with('A') || rest.starts_with('D');
        let track = digits.parse::<u32>().ok();
        match (track, orientation_ok) {
            (Some(track), true) => Ok(Self {
                name: name.to_owned(),
                track,
            }),
            _ => Err(ConfigError::InvalidFrame {
                name: name.to_owned(),
            }),
        }
    }

    /// The full frame name, e.g. `021D_04972_131313`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Track number with leading zeros stripped.
    pub fn track(&self) -> u32 {
        self.track
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

impl TryFrom<String> for FrameId {
    type Error = ConfigError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::parse(&name)
    }
}

impl From<FrameId> for String {
    fn from(frame: FrameId) -> Self {
        frame.name
    }
}

// ---------------------------------------------------------------------------
// AcqDate
// ---------------------------------------------------------------------------

/// An acquisition date, rendered as compact `YYYYMMDD` in cache paths.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AcqDate(pub NaiveDate);

impl AcqDate {
    /// Parse the compact `YYYYMMDD` form used throughout the cache layout.
    pub fn parse_compact(value: &str) -> Result<Self, ConfigError> {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(Self)
            .map_err(|_| ConfigError::InvalidDate {
                value: value.to_owned(),
            })
    }

    /// Compact `YYYYMMDD` rendering.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Signed distance to `other` in whole days.
    pub fn days_between(&self, other: AcqDate) -> i64 {
        (self.0 - other.0).num_days()
    }
}

impl fmt::Display for AcqDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compact())
    }
}

impl From<NaiveDate> for AcqDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

// ---------------------------------------------------------------------------
// Status vocabulary
// ---------------------------------------------------------------------------

/// Closed status enumeration for work items and source acquisitions.
///
/// Replaces the small-integer status codes of the external store with a
/// tagged variant so illegal codes are unrepresentable. The external
/// routine's own non-zero failure codes pass through verbatim as `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ItemStatus {
    /// Source acquisition purged from the cache.
    Removed,
    /// Item is being staged and processed right now.
    Building,
    /// An unclassified fault interrupted processing.
    UnknownError,
    /// The raw source acquisition never reached the cache.
    MissingSource,
    /// Co-registration finished successfully.
    Built,
    /// The external routine returned this non-zero code.
    Failed(i32),
}

impl ItemStatus {
    /// The wire code reported to the external status store.
    pub fn code(&self) -> i32 {
        match self {
            ItemStatus::Removed => -6,
            ItemStatus::Building => -5,
            ItemStatus::UnknownError => -3,
            ItemStatus::MissingSource => -2,
            ItemStatus::Built => 0,
            ItemStatus::Failed(code) => *code,
        }
    }

    /// Map a wire code back to a status. Codes in the reserved band map to
    /// their named variants; any other non-zero code is a routine failure.
    pub fn from_code(code: i32) -> Self {
        match code {
            -6 => ItemStatus::Removed,
            -5 => ItemStatus::Building,
            -3 => ItemStatus::UnknownError,
            -2 => ItemStatus::MissingSource,
            0 => ItemStatus::Built,
            other => ItemStatus::Failed(other),
        }
    }

    /// True for statuses that end an item's lifecycle within a run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::Building)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Removed => write!(f, "removed"),
            ItemStatus::Building => write!(f, "building"),
            ItemStatus::UnknownError => write!(f, "unknown-error"),
            ItemStatus::MissingSource => write!(f, "missing-source"),
            ItemStatus::Built => write!(f, "built"),
            ItemStatus::Failed(code) => write!(f, "failed({code})"),
        }
    }
}

impl From<i32> for ItemStatus {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<ItemStatus> for i32 {
    fn from(status: ItemStatus) -> Self {
        status.code()
    }
}

// ---------------------------------------------------------------------------
// Work items and processing parameters
// ---------------------------------------------------------------------------

/// One unit of staging work: co-register `target` against the job's primary
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    /// Acquisition date to co-register.
    pub target: AcqDate,
    /// Raw source acquisition backing this item, if tracked by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,
}

/// Multi-look factors read from the primary reference's metadata header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiLook {
    pub range: u32,
    pub azimuth: u32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> AcqDate {
        AcqDate::parse_compact(s).expect("date")
    }

    #[test]
    fn frame_parse_accepts_track_and_orientation() {
        let frame = FrameId::parse("021D_04972_131313").expect("frame");
        assert_eq!(frame.track(), 21);
        assert_eq!(frame.name(), "021D_04972_131313");
    }

    #[test]
    fn frame_parse_rejects_missing_track() {
        assert!(matches!(
            FrameId::parse("D_04972"),
            Err(ConfigError::InvalidFrame { .. })
        ));
        assert!(matches!(
            FrameId::parse("021X_04972"),
            Err(ConfigError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn acq_date_compact_roundtrip() {
        let d = date("20200105");
        assert_eq!(d.compact(), "20200105");
        assert_eq!(d.to_string(), "20200105");
    }

    #[test]
    fn acq_date_rejects_garbage() {
        assert!(AcqDate::parse_compact("2020-01-05").is_err());
        assert!(AcqDate::parse_compact("20201399").is_err());
    }

    #[test]
    fn day_distance_is_signed() {
        assert_eq!(date("20200110").days_between(date("20200105")), 5);
        assert_eq!(date("20200105").days_between(date("20200110")), -5);
    }

    #[test]
    fn status_codes_roundtrip() {
        for status in [
            ItemStatus::Removed,
            ItemStatus::Building,
            ItemStatus::UnknownError,
            ItemStatus::MissingSource,
            ItemStatus::Built,
            ItemStatus::Failed(7),
        ] {
            assert_eq!(ItemStatus::from_code(status.code()), status);
        }
    }

    #[test]
    fn zero_code_is_built_not_failed() {
        assert_eq!(ItemStatus::from_code(0), ItemStatus::Built);
        assert_eq!(ItemStatus::from_code(2), ItemStatus::Failed(2));
    }

    #[test]
    fn newtype_display() {
        assert_eq!(JobId::from(3).to_string(), "3");
        assert_eq!(ItemId::from(9).to_string(), "9");
    }
}
