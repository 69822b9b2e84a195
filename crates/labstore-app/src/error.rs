use labstore_client::BackendError;
use labstore_core::FieldErrors;
use std::fmt;
use thiserror::Error;

/// Why the save action is currently unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    InvalidFields,
    /// A rack has no parent shelf selected.
    ParentMissing,
    CodeChangeUnacknowledged,
    ParentImpactPending,
    ParentImpactUnacknowledged,
    ImpactCheckFailed(String),
    /// The server said the node cannot be moved at all.
    MoveRefused(String),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::InvalidFields => f.write_str("Some fields are invalid"),
            BlockReason::ParentMissing => f.write_str("The parent shelf is missing"),
            BlockReason::CodeChangeUnacknowledged => {
                f.write_str("The code change has not been acknowledged")
            }
            BlockReason::ParentImpactPending => {
                f.write_str("Checking the impact of the parent change")
            }
            BlockReason::ParentImpactUnacknowledged => {
                f.write_str("The parent change has not been acknowledged")
            }
            BlockReason::ImpactCheckFailed(_) => f.write_str("Impact check failed"),
            BlockReason::MoveRefused(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("No editor is open")]
    NotOpen,
    /// Edits and saves are refused while a write is in flight or loading.
    #[error("The editor is busy")]
    Busy,
    /// The session was closed or replaced while the request was in flight.
    #[error("The editor was closed")]
    Superseded,
    #[error("Failed to load location data")]
    LoadFailed(#[source] BackendError),
    #[error("Please fix the errors in the form")]
    Validation(FieldErrors),
    #[error("Save is blocked: {}", join_reasons(.0))]
    Blocked(Vec<BlockReason>),
    #[error("{0}")]
    DataIntegrity(String),
    /// The server refused the write; `message` is already reduced for display.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        field_errors: FieldErrors,
    },
    #[error("{0}")]
    Network(String),
}

fn join_reasons(reasons: &[BlockReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl EditorError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EditorError::Rejected { status: 409, .. })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeleteError {
    #[error("Deletion has not been confirmed")]
    NotConfirmed,
    #[error("{0}")]
    Blocked(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("No configuration directory available")]
    NoConfigDir,
    #[error("Failed to write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}
