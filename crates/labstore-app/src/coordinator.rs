//! The edit/create lifecycle of a single hierarchy node.
//!
//! [`MutationCoordinator`] is the only component that writes through the
//! backend. It loads the authoritative record, keeps the operator's edits in an
//! [`EditBuffer`], gates the save action on validation and on acknowledgment of
//! risky edits (code change, parent change with downstream samples), submits a
//! per-type payload and re-reads the node afterwards.
//!
//! Every async operation captures the session epoch before its first `.await`
//! and drops its result if the epoch moved on (the editor was closed or
//! reopened). Parent checks additionally carry a ticket so that only the
//! answer for the latest candidate parent is applied.

use crate::analyzer::{ImpactResult, MoveAssessment, analyze_move};
use crate::buffer::EditBuffer;
use crate::payload::{WriteKind, build_payload, missing_rack_parent};
use crate::settings::ImpactCheckPolicy;
use crate::{BlockReason, EditorError};
use labstore_api::NodeRecord;
use labstore_client::{BackendError, ListFilter, StorageBackend};
use labstore_core::{
    CodeAckGate, Field, FieldErrors, NodeFields, NodeId, NodeRef, NodeType, meaningful_id,
    normalize_code, validate,
};
use labstore_events::{EditMode, Event, EventBus, SessionId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const LOAD_FAILED: &str = "Failed to load location data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorPhase {
    Loading,
    Ready,
    Submitting,
    /// Recoverable with [`MutationCoordinator::reload`].
    LoadFailed(String),
    /// The record cannot be edited safely; only closing is possible.
    Broken(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImpactStatus {
    /// The parent is unchanged, or this is a new node.
    NotNeeded,
    Pending,
    Clear,
    Warning {
        result: ImpactResult,
        acknowledged: bool,
    },
    Failed(String),
    Refused(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitGate {
    ReadyToSave,
    Blocked(Vec<BlockReason>),
}

impl SubmitGate {
    pub fn is_ready(&self) -> bool {
        matches!(self, SubmitGate::ReadyToSave)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentOption {
    pub id: NodeId,
    pub name: String,
}

/// Read model of the open editor, everything a shell needs to render it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorView {
    pub session: SessionId,
    pub mode: EditMode,
    pub node_type: NodeType,
    pub target: Option<NodeRef>,
    pub phase: EditorPhase,
    pub title: String,
    pub fields: Option<NodeFields>,
    pub dirty: bool,
    /// Fields whose working value differs from the loaded one.
    pub changed: Vec<Field>,
    pub field_errors: FieldErrors,
    pub code_warning: Option<String>,
    pub code_acknowledged: bool,
    pub impact: ImpactStatus,
    pub gate: SubmitGate,
    pub banner: Option<String>,
    pub parent_options: Vec<ParentOption>,
    /// Audit trail and other read-only details of the loaded record.
    pub record: Option<NodeRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub node: Option<NodeRef>,
    pub created: bool,
    /// The server's copy after the write; `None` when the follow-up read failed.
    pub record: Option<NodeRecord>,
}

impl SaveOutcome {
    pub fn reconciled(&self) -> bool {
        self.record.is_some()
    }
}

struct Session {
    id: SessionId,
    epoch: u64,
    mode: EditMode,
    node_type: NodeType,
    target: Option<NodeRef>,
    phase: EditorPhase,
    placeholder: Option<NodeRecord>,
    record: Option<NodeRecord>,
    buffer: Option<EditBuffer>,
    code_gate: CodeAckGate,
    impact: ImpactStatus,
    impact_ticket: u64,
    server_errors: FieldErrors,
    banner: Option<String>,
    parent_options: Vec<ParentOption>,
}

impl Session {
    fn new(epoch: u64, mode: EditMode, node_type: NodeType, target: Option<NodeRef>) -> Self {
        Self {
            id: SessionId::new(),
            epoch,
            mode,
            node_type,
            target,
            phase: EditorPhase::Loading,
            placeholder: None,
            record: None,
            buffer: None,
            code_gate: CodeAckGate::default(),
            impact: ImpactStatus::NotNeeded,
            impact_ticket: 0,
            server_errors: FieldErrors::new(),
            banner: None,
            parent_options: Vec::new(),
        }
    }

    fn buffer_mut(&mut self) -> Result<&mut EditBuffer, EditorError> {
        match self.phase {
            EditorPhase::Ready => self.buffer.as_mut().ok_or(EditorError::NotOpen),
            EditorPhase::Broken(ref message) => Err(EditorError::DataIntegrity(message.clone())),
            _ => Err(EditorError::Busy),
        }
    }

    fn field_errors(&self) -> FieldErrors {
        let mut errors = self
            .buffer
            .as_ref()
            .map(|b| validate(self.node_type, b.current()))
            .unwrap_or_default();
        errors.extend(self.server_errors.clone());
        errors
    }

    fn block_reasons(&self) -> Vec<BlockReason> {
        let Some(buffer) = &self.buffer else {
            return Vec::new();
        };
        let mut reasons = Vec::new();
        if !validate(self.node_type, buffer.current()).is_empty() {
            reasons.push(BlockReason::InvalidFields);
        }
        if self.node_type.parent_is_mandatory_on_write() && buffer.current().parent().is_none() {
            reasons.push(BlockReason::ParentMissing);
        }
        if !self.code_gate.is_satisfied(&buffer.current().code) {
            reasons.push(BlockReason::CodeChangeUnacknowledged);
        }
        match &self.impact {
            ImpactStatus::Pending => reasons.push(BlockReason::ParentImpactPending),
            ImpactStatus::Warning {
                acknowledged: false,
                ..
            } => reasons.push(BlockReason::ParentImpactUnacknowledged),
            ImpactStatus::Failed(message) => {
                reasons.push(BlockReason::ImpactCheckFailed(message.clone()))
            }
            ImpactStatus::Refused(message) => reasons.push(BlockReason::MoveRefused(message.clone())),
            ImpactStatus::NotNeeded | ImpactStatus::Clear | ImpactStatus::Warning { .. } => {}
        }
        reasons
    }

    fn gate(&self) -> SubmitGate {
        if self.phase != EditorPhase::Ready {
            return SubmitGate::Blocked(Vec::new());
        }
        let reasons = self.block_reasons();
        if reasons.is_empty() {
            SubmitGate::ReadyToSave
        } else {
            SubmitGate::Blocked(reasons)
        }
    }

    fn title(&self) -> String {
        let from_record = |record: &NodeRecord| record.display_name(self.node_type).to_string();
        match (&self.buffer, &self.record, &self.placeholder) {
            (Some(buffer), _, _) if !buffer.current().display_name(self.node_type).is_empty() => {
                buffer.current().display_name(self.node_type).to_string()
            }
            (_, Some(record), _) => from_record(record),
            (_, None, Some(placeholder)) => from_record(placeholder),
            _ => format!("New {}", self.node_type.display_name()),
        }
    }

    fn view(&self) -> EditorView {
        let current_code = self
            .buffer
            .as_ref()
            .map(|b| b.current().code.clone())
            .unwrap_or_default();
        EditorView {
            session: self.id,
            mode: self.mode,
            node_type: self.node_type,
            target: self.target,
            phase: self.phase.clone(),
            title: self.title(),
            fields: self.buffer.as_ref().map(EditBuffer::snapshot),
            dirty: self.buffer.as_ref().is_some_and(EditBuffer::is_dirty),
            changed: self
                .buffer
                .as_ref()
                .map(EditBuffer::changed_fields)
                .unwrap_or_default(),
            field_errors: self.field_errors(),
            code_warning: self.code_gate.warning(&current_code),
            code_acknowledged: self.code_gate.is_acknowledged(&current_code),
            impact: self.impact.clone(),
            gate: self.gate(),
            banner: self.banner.clone(),
            parent_options: self.parent_options.clone(),
            record: self.record.clone(),
        }
    }
}

#[derive(Default)]
struct CoordinatorState {
    epoch: u64,
    session: Option<Session>,
}

impl CoordinatorState {
    /// The session opened at `epoch`, if it is still the open one.
    fn live(&mut self, epoch: u64) -> Option<&mut Session> {
        if self.epoch != epoch {
            return None;
        }
        self.session.as_mut()
    }

    fn open(&mut self, mode: EditMode, node_type: NodeType, target: Option<NodeRef>) -> u64 {
        self.epoch += 1;
        self.session = Some(Session::new(self.epoch, mode, node_type, target));
        self.epoch
    }
}

/// Headless editor for one hierarchy node at a time.
///
/// Cheap to clone; clones share the same editor. The state lock is never held
/// across an `.await`.
pub struct MutationCoordinator<B: StorageBackend> {
    backend: Arc<B>,
    state: Arc<Mutex<CoordinatorState>>,
    events: EventBus,
    policy: ImpactCheckPolicy,
}

impl<B: StorageBackend> Clone for MutationCoordinator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            policy: self.policy,
        }
    }
}

impl<B: StorageBackend> MutationCoordinator<B> {
    pub fn new(backend: Arc<B>, events: EventBus, policy: ImpactCheckPolicy) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(CoordinatorState::default())),
            events,
            policy,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn view(&self) -> Option<EditorView> {
        self.state.lock().session.as_ref().map(Session::view)
    }

    pub fn gate(&self) -> Option<SubmitGate> {
        self.state.lock().session.as_ref().map(Session::gate)
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().session.is_some()
    }

    /// Opens the editor on an existing node. `placeholder` is the row the
    /// operator picked; it is shown while loading and can supply a rack's
    /// parent when the authoritative record lacks one.
    pub async fn open_existing(
        &self,
        target: NodeRef,
        placeholder: Option<NodeRecord>,
    ) -> Result<(), EditorError> {
        let (epoch, session) = {
            let mut state = self.state.lock();
            let epoch = state.open(EditMode::Edit, target.node_type, Some(target));
            let session = state.live(epoch).ok_or(EditorError::Superseded)?;
            session.placeholder = placeholder;
            (epoch, session.id)
        };
        debug!(%target, %session, "editor loading");
        self.events.publish(Event::EditorOpened {
            session,
            node_type: target.node_type,
            mode: EditMode::Edit,
            target: Some(target),
        });
        self.load(epoch, target).await
    }

    /// Retries a load that failed.
    pub async fn reload(&self) -> Result<(), EditorError> {
        let (epoch, target) = {
            let mut state = self.state.lock();
            let session = state.session.as_mut().ok_or(EditorError::NotOpen)?;
            let target = match (&session.phase, session.target) {
                (EditorPhase::LoadFailed(_), Some(target)) => target,
                _ => return Err(EditorError::Busy),
            };
            session.phase = EditorPhase::Loading;
            session.banner = None;
            (session.epoch, target)
        };
        self.load(epoch, target).await
    }

    async fn load(&self, epoch: u64, target: NodeRef) -> Result<(), EditorError> {
        let (record, options) = tokio::join!(
            self.backend.get_node(target),
            self.parent_options(target.node_type)
        );

        let mut state = self.state.lock();
        let Some(session) = state.live(epoch) else {
            debug!(%target, "discarding load for a closed editor");
            return Err(EditorError::Superseded);
        };
        session.parent_options = options;

        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(%target, "load failed: {err}");
                session.phase = EditorPhase::LoadFailed(LOAD_FAILED.to_string());
                session.banner = Some(LOAD_FAILED.to_string());
                self.events.publish(Event::LoadFailed {
                    session: session.id,
                    message: LOAD_FAILED.to_string(),
                });
                return Err(EditorError::LoadFailed(err));
            }
        };

        let mut fields = record.to_fields(target.node_type);
        fields.code = normalize_code(&fields.code);
        if fields.parent().is_none()
            && let Some(parent) = session
                .placeholder
                .as_ref()
                .and_then(|p| p.parent_id(target.node_type))
        {
            fields.parent_id = parent.0.trim().to_string();
        }
        session.record = Some(record);

        if target.node_type.parent_is_mandatory_on_write() && fields.parent().is_none() {
            let message = crate::payload::missing_rack_parent(WriteKind::Update);
            error!(%target, "{message}");
            session.phase = EditorPhase::Broken(message.clone());
            session.banner = Some(message.clone());
            self.events.publish(Event::DataIntegrityViolation {
                session: session.id,
                message: message.clone(),
            });
            return Err(EditorError::DataIntegrity(message));
        }

        session.code_gate = CodeAckGate::new(fields.code.clone());
        session.buffer = Some(EditBuffer::new(fields));
        session.impact = ImpactStatus::NotNeeded;
        session.phase = EditorPhase::Ready;
        debug!(%target, "editor ready");
        self.events.publish(Event::NodeLoaded {
            session: session.id,
            node: target,
        });
        Ok(())
    }

    /// Opens the editor on a blank node, optionally under a known parent.
    pub async fn open_new(
        &self,
        node_type: NodeType,
        parent: Option<NodeId>,
    ) -> Result<(), EditorError> {
        let (epoch, session) = {
            let mut state = self.state.lock();
            let epoch = state.open(EditMode::Create, node_type, None);
            let session = state.live(epoch).ok_or(EditorError::Superseded)?;
            (epoch, session.id)
        };
        self.events.publish(Event::EditorOpened {
            session,
            node_type,
            mode: EditMode::Create,
            target: None,
        });

        let options = self.parent_options(node_type).await;

        let mut state = self.state.lock();
        let session = state.live(epoch).ok_or(EditorError::Superseded)?;
        let mut fields = NodeFields::new_active();
        if let Some(parent) = parent.filter(|_| node_type.parent().is_some()) {
            fields.parent_id = parent.to_string();
        }
        session.parent_options = options;
        session.buffer = Some(EditBuffer::new(fields));
        session.phase = EditorPhase::Ready;
        debug!(%node_type, "create editor ready");
        Ok(())
    }

    /// Active nodes of the parent type. A failure leaves the list empty.
    async fn parent_options(&self, node_type: NodeType) -> Vec<ParentOption> {
        let Some(parent_type) = node_type.parent() else {
            return Vec::new();
        };
        match self
            .backend
            .list_nodes(parent_type, ListFilter::active())
            .await
        {
            Ok(records) => records
                .into_iter()
                .filter(|record| !record.is_inactive())
                .filter_map(|record| {
                    let id = record.id.to_core().ok()?;
                    let name = record.display_name(parent_type).to_string();
                    Some(ParentOption { id, name })
                })
                .collect(),
            Err(err) => {
                warn!(%parent_type, "failed to load parent options: {err}");
                Vec::new()
            }
        }
    }

    /// Applies a text edit. A parent edit that needs an impact check leaves the
    /// gate at [`BlockReason::ParentImpactPending`] until
    /// [`Self::refresh_parent_impact`] runs; [`Self::change_parent`] does both.
    pub fn set_field(&self, field: Field, value: impl Into<String>) -> Result<(), EditorError> {
        let mut state = self.state.lock();
        let session = state.session.as_mut().ok_or(EditorError::NotOpen)?;
        let buffer = session.buffer_mut()?;
        let previous_parent = buffer.current().parent().map(str::to_string);
        if !buffer.set_text(field, value.into()) {
            return Ok(());
        }
        let current = buffer.current().clone();
        let parent_changed = buffer.parent_changed();
        session.server_errors.remove(field);
        session.banner = None;

        match field {
            Field::Code => {
                session.code_gate.observe(&current.code);
                if session.code_gate.is_diverged(&current.code) {
                    self.events.publish(Event::CodeChangePending {
                        session: session.id,
                        original: session.code_gate.original().to_string(),
                        current: current.code.clone(),
                    });
                }
            }
            Field::Parent
                if session.mode == EditMode::Edit
                    && current.parent() != previous_parent.as_deref() =>
            {
                session.impact_ticket += 1;
                session.impact = if parent_changed && current.parent().is_some() {
                    ImpactStatus::Pending
                } else {
                    ImpactStatus::NotNeeded
                };
            }
            _ => {}
        }
        Ok(())
    }

    pub fn set_active(&self, active: bool) -> Result<(), EditorError> {
        let mut state = self.state.lock();
        let session = state.session.as_mut().ok_or(EditorError::NotOpen)?;
        session.buffer_mut()?.set_active(active);
        Ok(())
    }

    /// Selects a new parent and checks what the move would affect.
    pub async fn change_parent(&self, candidate: &str) -> Result<(), EditorError> {
        self.set_field(Field::Parent, candidate)?;
        self.refresh_parent_impact().await
    }

    /// Runs the impact check for the currently selected parent, if one is
    /// needed or the previous attempt failed.
    pub async fn refresh_parent_impact(&self) -> Result<(), EditorError> {
        let (epoch, ticket, node, candidate) = {
            let mut state = self.state.lock();
            let session = state.session.as_mut().ok_or(EditorError::NotOpen)?;
            if !matches!(
                session.impact,
                ImpactStatus::Pending | ImpactStatus::Failed(_)
            ) {
                return Ok(());
            }
            let (Some(node), Some(buffer)) = (session.target, session.buffer.as_ref()) else {
                return Ok(());
            };
            let Some(candidate) = parse_parent(&buffer.current().parent_id) else {
                session.impact = ImpactStatus::Failed("Invalid parent id".to_string());
                return Ok(());
            };
            session.impact_ticket += 1;
            session.impact = ImpactStatus::Pending;
            (session.epoch, session.impact_ticket, node, candidate)
        };

        let assessment = analyze_move(self.backend.as_ref(), node, candidate).await;

        let mut state = self.state.lock();
        let Some(session) = state.live(epoch) else {
            debug!(%node, "discarding impact check for a closed editor");
            return Ok(());
        };
        if session.impact_ticket != ticket {
            debug!(%node, %candidate, "discarding superseded impact check");
            return Ok(());
        }
        session.impact = match assessment {
            Ok(MoveAssessment::Clear) => ImpactStatus::Clear,
            Ok(MoveAssessment::Impact(result)) => {
                self.events.publish(Event::ImpactDetected {
                    session: session.id,
                    node,
                    sample_count: result.sample_count,
                    message: result.message.clone(),
                });
                ImpactStatus::Warning {
                    result,
                    acknowledged: false,
                }
            }
            Ok(MoveAssessment::Refused(reason)) => ImpactStatus::Refused(reason),
            Err(err) => {
                self.events.publish(Event::ImpactCheckFailed {
                    session: session.id,
                    message: err.to_string(),
                });
                match self.policy {
                    ImpactCheckPolicy::FailClosed => {
                        warn!(%node, %candidate, "impact check failed, save blocked: {err}");
                        ImpactStatus::Failed(err.to_string())
                    }
                    ImpactCheckPolicy::FailOpen => {
                        warn!(%node, %candidate, "impact check failed, move allowed: {err}");
                        ImpactStatus::Clear
                    }
                }
            }
        };
        Ok(())
    }

    /// Acknowledges (or withdraws acknowledgment of) the current code change.
    /// Returns whether an acknowledgment is in effect.
    pub fn acknowledge_code_change(&self, acknowledged: bool) -> Result<bool, EditorError> {
        let mut state = self.state.lock();
        let session = state.session.as_mut().ok_or(EditorError::NotOpen)?;
        let code = session.buffer_mut()?.current().code.clone();
        Ok(session.code_gate.acknowledge(&code, acknowledged))
    }

    /// Acknowledges the sample impact of the selected parent. Returns whether an
    /// acknowledgment is in effect; there is nothing to acknowledge unless a
    /// warning is showing.
    pub fn acknowledge_parent_impact(&self, acknowledged: bool) -> Result<bool, EditorError> {
        let mut state = self.state.lock();
        let session = state.session.as_mut().ok_or(EditorError::NotOpen)?;
        session.buffer_mut()?;
        match &mut session.impact {
            ImpactStatus::Warning {
                acknowledged: flag, ..
            } => {
                *flag = acknowledged;
                Ok(acknowledged)
            }
            _ => Ok(false),
        }
    }

    /// Commits the buffer and writes it. On success the editor closes.
    pub async fn save(&self) -> Result<SaveOutcome, EditorError> {
        let (epoch, session_id, mode, node_type, target, payload) = {
            let mut state = self.state.lock();
            let session = state.session.as_mut().ok_or(EditorError::NotOpen)?;
            let snapshot = session.buffer_mut()?.snapshot();
            let kind = match session.mode {
                EditMode::Edit => WriteKind::Update,
                EditMode::Create => WriteKind::Create,
            };
            // A rack without its shelf is reported as an integrity failure, not
            // as an ordinary block.
            if session.node_type.parent_is_mandatory_on_write() && snapshot.parent().is_none() {
                let message = missing_rack_parent(kind);
                error!(node_type = %session.node_type, "{message}");
                session.banner = Some(message.clone());
                self.events.publish(Event::DataIntegrityViolation {
                    session: session.id,
                    message: message.clone(),
                });
                return Err(EditorError::DataIntegrity(message));
            }
            if let SubmitGate::Blocked(reasons) = session.gate() {
                return Err(EditorError::Blocked(reasons));
            }
            let errors = validate(session.node_type, &snapshot);
            if !errors.is_empty() {
                return Err(EditorError::Validation(errors));
            }
            let payload = build_payload(session.node_type, &snapshot, kind)?;
            session.phase = EditorPhase::Submitting;
            session.banner = None;
            session.server_errors = FieldErrors::new();
            (
                session.epoch,
                session.id,
                session.mode,
                session.node_type,
                session.target,
                payload,
            )
        };

        let written = match (mode, target) {
            (EditMode::Edit, Some(target)) => self
                .backend
                .update_node(target, &payload)
                .await
                .map(|()| Some(target)),
            _ => self
                .backend
                .create_node(node_type, &payload)
                .await
                .map(|record| {
                    record
                        .id
                        .to_core()
                        .ok()
                        .map(|id| NodeRef::new(node_type, id))
                }),
        };
        let kind = match mode {
            EditMode::Edit => WriteKind::Update,
            EditMode::Create => WriteKind::Create,
        };

        let node = match written {
            Ok(node) => node,
            Err(err) => return Err(self.reject(epoch, kind, err)),
        };
        info!(?node, created = mode == EditMode::Create, "location saved");

        let record = match node {
            Some(node) => match self.backend.get_node(node).await {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(%node, "saved, but the follow-up read failed: {err}");
                    None
                }
            },
            None => {
                warn!("saved, but the server returned no usable id");
                None
            }
        };

        let outcome = SaveOutcome {
            node,
            created: mode == EditMode::Create,
            record,
        };
        let still_open = {
            let mut state = self.state.lock();
            let live = state.live(epoch).is_some();
            if live {
                state.session = None;
            }
            live
        };
        if let Some(node) = outcome.node {
            self.events.publish(Event::NodeSaved {
                session: session_id,
                node,
                created: outcome.created,
                reconciled: outcome.reconciled(),
            });
        }
        if still_open {
            self.events.publish(Event::EditorClosed {
                session: session_id,
            });
        }
        Ok(outcome)
    }

    /// Returns the editor to `Ready` after a refused write, keeping the buffer.
    fn reject(&self, epoch: u64, kind: WriteKind, err: BackendError) -> EditorError {
        let message = match &err {
            BackendError::Rejected { status, body } => body
                .summary()
                .unwrap_or_else(|| kind.fallback_message(*status)),
            BackendError::Network(_) | BackendError::Decode(_) => err.to_string(),
        };
        warn!("save failed: {message}");

        let mut field_errors = FieldErrors::new();
        {
            let mut state = self.state.lock();
            if let Some(session) = state.live(epoch) {
                if let Some(reported) = err.body().and_then(|b| b.field_errors.as_ref()) {
                    for (key, msg) in reported {
                        if let Some(field) = Field::from_wire(key, session.node_type) {
                            field_errors.insert(field, msg.clone());
                        }
                    }
                }
                session.server_errors = field_errors.clone();
                session.phase = EditorPhase::Ready;
                session.banner = Some(message.clone());
                self.events.publish(Event::SaveFailed {
                    session: session.id,
                    message: message.clone(),
                });
            }
        }

        match err {
            BackendError::Rejected { status, .. } => EditorError::Rejected {
                status,
                message,
                field_errors,
            },
            BackendError::Network(_) | BackendError::Decode(_) => EditorError::Network(message),
        }
    }

    /// Closes the editor. Results of requests still in flight are discarded.
    pub fn close(&self) {
        let closed = {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.session.take()
        };
        if let Some(session) = closed {
            debug!(session = %session.id, "editor closed");
            self.events.publish(Event::EditorClosed {
                session: session.id,
            });
        }
    }
}

/// Parent id as the operator typed or picked it, if it names anything.
pub fn parse_parent(raw: &str) -> Option<NodeId> {
    meaningful_id(raw)?.parse::<i64>().ok().map(NodeId)
}
