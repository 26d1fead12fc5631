use thiserror::Error;

use crate::codec::CsvError;
use crate::domain::{GenerationError, ProfileId, RowId, ScriptId, TransitionError};
use crate::ports::{PublishError, StoreError};

#[derive(Debug, Error)]
pub enum TubeError {
    #[error("profile {0} has no Gemini API key configured")]
    MissingCredential(ProfileId),

    #[error("no active profile")]
    NoActiveProfile,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("row not found: {0}")]
    RowNotFound(RowId),

    #[error("profile not found: {0}")]
    ProfileNotFound(ProfileId),

    #[error("script not found: {0}")]
    ScriptNotFound(ScriptId),

    /// Another row holds the in-flight slot.
    #[error("another row is already being processed")]
    Busy,

    #[error("auto-pilot is already running")]
    AutoPilotRunning,

    #[error("nothing to export")]
    NothingToExport,

    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
}

impl TubeError {
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, TubeError::MissingCredential(_))
    }
}

pub type Result<T, E = TubeError> = std::result::Result<T, E>;
