//! Row status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a planner row.
///
/// State transitions:
/// - Pending -> Processing -> Optimized (auto-upload off: stops here)
/// - Pending -> Processing -> Optimized -> Uploading -> Published
/// - Processing -> Error, Uploading -> Error
/// - Error -> Processing (manual re-run)
///
/// `ScriptReady` exists in stored data but nothing moves a row into or out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    /// Waiting to be picked up.
    Pending,

    /// The optimizer call is in flight.
    Processing,

    /// Metadata generated; not uploaded (yet).
    Optimized,

    ScriptReady,

    /// The publish call is in flight.
    Uploading,

    /// Uploaded; the row carries a video id.
    Published,

    /// Failed; the row carries the error text.
    Error,
}

impl RowStatus {
    /// A row in this state holds the single in-flight slot.
    pub fn is_busy(self) -> bool {
        matches!(self, RowStatus::Processing | RowStatus::Uploading)
    }

    /// Eligible for a single-row run.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, RowStatus::Pending | RowStatus::Error)
    }

    /// Counted as outstanding work on the dashboard.
    pub fn is_outstanding(self) -> bool {
        !matches!(self, RowStatus::Published | RowStatus::Error)
    }

    pub fn can_transition_to(self, next: RowStatus) -> bool {
        use RowStatus::*;
        matches!(
            (self, next),
            (Pending | Error, Processing)
                | (Processing, Optimized | Error)
                | (Optimized, Uploading)
                | (Uploading, Published | Error)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::Pending => "PENDING",
            RowStatus::Processing => "PROCESSING",
            RowStatus::Optimized => "OPTIMIZED",
            RowStatus::ScriptReady => "SCRIPT_READY",
            RowStatus::Uploading => "UPLOADING",
            RowStatus::Published => "PUBLISHED",
            RowStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
