//! Headless editor engine for the storage-location hierarchy.
//!
//! Any shell (CLI, web bridge, desktop) drives a [`MutationCoordinator`] for
//! edits and creates and a [`DeletionSession`] for deletes, reads their state
//! and subscribes to the [`labstore_events::EventBus`] they publish on.

pub mod analyzer;
mod buffer;
pub mod coordinator;
pub mod deletion;
mod error;
pub mod payload;
pub mod settings;

pub use analyzer::{ImpactResult, MoveAssessment, analyze_move, default_impact_message};
pub use buffer::EditBuffer;
pub use coordinator::{
    EditorPhase, EditorView, ImpactStatus, MutationCoordinator, ParentOption, SaveOutcome,
    SubmitGate, parse_parent,
};
pub use deletion::{DeleteCheck, DeletionSession, DeletionState, check_delete};
pub use error::{BlockReason, DeleteError, EditorError, SettingsError};
pub use payload::{WriteKind, build_payload};
pub use settings::{ConsoleSettings, ImpactCheckPolicy};
