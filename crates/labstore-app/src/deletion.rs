//! Delete-confirmation lifecycle.
//!
//! Deletion is only offered after the server has confirmed, through
//! `can-delete`, that the node has no children and no assigned samples, and the
//! operator has ticked the confirmation. Nothing the operator does can unlock a
//! node the server blocked; the cascade summary is shown for context only.

use crate::DeleteError;
use labstore_api::CascadeDeleteSummary;
use labstore_client::{BackendError, StorageBackend};
use labstore_core::NodeRef;
use labstore_events::{Event, EventBus};
use std::sync::Arc;
use tracing::{debug, info, warn};

const BLOCKED_FALLBACK: &str = "Cannot delete location";
const CONFLICT_FALLBACK: &str = "Cannot delete location due to constraints";
const FORBIDDEN_FALLBACK: &str = "Only Global Administrators can delete locations";
const FAILED_FALLBACK: &str = "Failed to delete location";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCheck {
    pub allowed: bool,
    pub reason: Option<String>,
    pub is_admin: Option<bool>,
}

/// Wraps `can-delete`. A 409 is a normal answer (`allowed == false`) carrying
/// the server's explanation verbatim.
pub async fn check_delete<B: StorageBackend + ?Sized>(
    backend: &B,
    node: NodeRef,
) -> Result<DeleteCheck, BackendError> {
    let response = backend.can_delete(node).await?;
    let reason = (!response.can_delete).then(|| {
        response
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| response.error.clone().filter(|e| !e.trim().is_empty()))
            .unwrap_or_else(|| BLOCKED_FALLBACK.to_string())
    });
    Ok(DeleteCheck {
        allowed: response.can_delete,
        reason,
        is_admin: response.is_admin,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionState {
    Checking,
    Blocked {
        reason: String,
        summary: Option<CascadeDeleteSummary>,
    },
    Confirmable {
        confirmed: bool,
        /// Failure of a previous delete attempt, kept for display.
        error: Option<String>,
    },
    /// The constraint check itself failed; deletion stays unavailable.
    CheckFailed(String),
    Deleting,
    Deleted,
    Cancelled,
}

/// One delete dialog for one node. Owned by whoever shows the dialog.
pub struct DeletionSession<B: StorageBackend> {
    backend: Arc<B>,
    events: EventBus,
    node: NodeRef,
    state: DeletionState,
}

impl<B: StorageBackend> DeletionSession<B> {
    /// Opens the dialog and runs the constraint check.
    pub async fn open(backend: Arc<B>, events: EventBus, node: NodeRef) -> Self {
        let mut session = Self {
            backend,
            events,
            node,
            state: DeletionState::Checking,
        };
        session.recheck().await;
        session
    }

    pub fn node(&self) -> NodeRef {
        self.node
    }

    pub fn state(&self) -> &DeletionState {
        &self.state
    }

    /// Enabled only once the server allowed the delete and the box is ticked.
    pub fn can_confirm(&self) -> bool {
        matches!(
            self.state,
            DeletionState::Confirmable {
                confirmed: true,
                ..
            }
        )
    }

    /// Ticks or clears the confirmation box. Has no effect unless deletion is
    /// allowed; returns whether the box is now ticked.
    pub fn set_confirmed(&mut self, value: bool) -> bool {
        match &mut self.state {
            DeletionState::Confirmable { confirmed, .. } => {
                *confirmed = value;
                value
            }
            _ => false,
        }
    }

    pub async fn recheck(&mut self) {
        self.state = DeletionState::Checking;
        match check_delete(self.backend.as_ref(), self.node).await {
            Ok(check) if check.allowed => {
                debug!(node = %self.node, "delete allowed");
                self.state = DeletionState::Confirmable {
                    confirmed: false,
                    error: None,
                };
            }
            Ok(check) => {
                let reason = check
                    .reason
                    .unwrap_or_else(|| BLOCKED_FALLBACK.to_string());
                let summary = if check.is_admin != Some(false) {
                    self.fetch_summary().await
                } else {
                    None
                };
                self.block(reason, summary);
            }
            Err(err) => {
                warn!(node = %self.node, "can-delete failed: {err}");
                self.state = DeletionState::CheckFailed(err.to_string());
            }
        }
    }

    async fn fetch_summary(&self) -> Option<CascadeDeleteSummary> {
        match self.backend.cascade_delete_summary(self.node).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                debug!(node = %self.node, "cascade summary unavailable: {err}");
                None
            }
        }
    }

    fn block(&mut self, reason: String, summary: Option<CascadeDeleteSummary>) {
        self.events.publish(Event::DeleteBlocked {
            node: self.node,
            reason: reason.clone(),
        });
        self.state = DeletionState::Blocked { reason, summary };
    }

    /// Sends the DELETE. Refused unless [`Self::can_confirm`] holds.
    pub async fn confirm(&mut self) -> Result<(), DeleteError> {
        if !self.can_confirm() {
            return Err(match &self.state {
                DeletionState::Blocked { reason, .. } => DeleteError::Blocked(reason.clone()),
                _ => DeleteError::NotConfirmed,
            });
        }

        self.state = DeletionState::Deleting;
        match self.backend.delete_node(self.node).await {
            Ok(()) => {
                info!(node = %self.node, "location deleted");
                self.state = DeletionState::Deleted;
                self.events.publish(Event::NodeDeleted { node: self.node });
                Ok(())
            }
            Err(err) if err.is_conflict() => {
                let reason = err
                    .body()
                    .and_then(|b| b.reason())
                    .unwrap_or_else(|| CONFLICT_FALLBACK.to_string());
                let summary = self.fetch_summary().await;
                self.block(reason.clone(), summary);
                Err(DeleteError::Blocked(reason))
            }
            Err(err) => {
                let (message, error) = if err.is_forbidden() {
                    let message = rejection_reason(&err, FORBIDDEN_FALLBACK);
                    (message.clone(), DeleteError::Forbidden(message))
                } else {
                    let message = rejection_reason(&err, FAILED_FALLBACK);
                    (message.clone(), DeleteError::Failed(message))
                };
                warn!(node = %self.node, "delete failed: {message}");
                self.events.publish(Event::DeleteFailed {
                    node: self.node,
                    message: message.clone(),
                });
                self.state = DeletionState::Confirmable {
                    confirmed: true,
                    error: Some(message),
                };
                Err(error)
            }
        }
    }

    /// Closes the dialog without sending anything.
    pub fn cancel(&mut self) {
        if self.state != DeletionState::Deleted {
            self.state = DeletionState::Cancelled;
        }
    }
}

fn rejection_reason(err: &BackendError, fallback: &str) -> String {
    match err {
        BackendError::Rejected { body, .. } => body.reason().unwrap_or_else(|| fallback.to_string()),
        BackendError::Network(_) | BackendError::Decode(_) => err.to_string(),
    }
}
