use crossbeam_channel::{Receiver, Sender, unbounded};
use labstore_core::{NodeRef, NodeType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one open editor or delete dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMode {
    Edit,
    Create,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Editor lifecycle
    EditorOpened {
        session: SessionId,
        node_type: NodeType,
        mode: EditMode,
        target: Option<NodeRef>,
    },
    NodeLoaded {
        session: SessionId,
        node: NodeRef,
    },
    LoadFailed {
        session: SessionId,
        message: String,
    },
    /// A record could not be edited safely; the session is unusable.
    DataIntegrityViolation {
        session: SessionId,
        message: String,
    },
    EditorClosed {
        session: SessionId,
    },

    // Risky edits
    ImpactDetected {
        session: SessionId,
        node: NodeRef,
        sample_count: u32,
        message: String,
    },
    ImpactCheckFailed {
        session: SessionId,
        message: String,
    },
    CodeChangePending {
        session: SessionId,
        original: String,
        current: String,
    },

    // Writes
    NodeSaved {
        session: SessionId,
        node: NodeRef,
        created: bool,
        /// False when the follow-up read failed and the caller must refresh.
        reconciled: bool,
    },
    SaveFailed {
        session: SessionId,
        message: String,
    },

    // Deletion
    DeleteBlocked {
        node: NodeRef,
        reason: String,
    },
    NodeDeleted {
        node: NodeRef,
    },
    DeleteFailed {
        node: NodeRef,
        message: String,
    },
}

impl Event {
    /// Session the event belongs to; deletion events are not tied to an editor.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Event::EditorOpened { session, .. }
            | Event::NodeLoaded { session, .. }
            | Event::LoadFailed { session, .. }
            | Event::DataIntegrityViolation { session, .. }
            | Event::EditorClosed { session }
            | Event::ImpactDetected { session, .. }
            | Event::ImpactCheckFailed { session, .. }
            | Event::CodeChangePending { session, .. }
            | Event::NodeSaved { session, .. }
            | Event::SaveFailed { session, .. } => Some(*session),
            Event::DeleteBlocked { .. } | Event::NodeDeleted { .. } | Event::DeleteFailed { .. } => {
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        tracing::trace!(?event, "publish");
        let _ = self.tx.send(event);
    }

    /// Drains pending events into a listener.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Pending events without blocking, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

/// Implement this to receive events from the [`EventBus`].
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
