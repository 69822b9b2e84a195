use crate::{BackendError, ListFilter, StorageBackend};
use async_trait::async_trait;
use labstore_api::{
    CanDeleteResponse, CanMoveResponse, CascadeDeleteSummary, ErrorBody, Flag,
    NodeId as WireId, NodePayload, NodeRecord,
};
use labstore_core::{DeviceKind, NodeId, NodeRef, NodeType, normalize_code, validate_code};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Which backend operation a request hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Get,
    List,
    Update,
    Create,
    CanMove,
    CanDelete,
    CascadeSummary,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub endpoint: Endpoint,
    pub node_type: NodeType,
    pub target: Option<NodeRef>,
    pub body: Option<serde_json::Value>,
}

/// Keeps requests to one endpoint waiting until released.
#[derive(Clone)]
pub struct Hold(Arc<Semaphore>);

impl Hold {
    /// Lets one waiting (or future) request through.
    pub fn release(&self) {
        self.0.add_permits(1);
    }
}

#[derive(Default)]
struct Store {
    nodes: HashMap<NodeRef, NodeRecord>,
    samples: HashMap<NodeRef, u32>,
    next_id: i64,
    requests: Vec<RecordedRequest>,
    faults: HashMap<Endpoint, VecDeque<BackendError>>,
    holds: HashMap<Endpoint, Arc<Semaphore>>,
    non_admin: bool,
}

/// Storage backend kept in memory.
///
/// It enforces the same constraints the server does (code format and per-type
/// uniqueness, mandatory rack parent, no deletion of nodes with children or
/// samples) and records every request, so callers can be exercised end to end
/// without a server. Faults and delays can be injected per endpoint.
#[derive(Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&self, name: &str, code: &str) -> NodeRef {
        self.put_record(
            NodeType::Room,
            NodeRecord {
                name: Some(name.to_string()),
                code: non_empty(code),
                ..active_record()
            },
        )
    }

    pub fn add_device(&self, room: NodeRef, name: &str, code: &str, kind: DeviceKind) -> NodeRef {
        self.put_record(
            NodeType::Device,
            NodeRecord {
                name: Some(name.to_string()),
                code: non_empty(code),
                device_type: Some(kind.key().to_string()),
                parent_room_id: Some(room.id.into()),
                ..active_record()
            },
        )
    }

    pub fn add_shelf(&self, device: NodeRef, label: &str, code: &str) -> NodeRef {
        self.put_record(
            NodeType::Shelf,
            NodeRecord {
                label: Some(label.to_string()),
                code: non_empty(code),
                parent_device_id: Some(device.id.into()),
                ..active_record()
            },
        )
    }

    pub fn add_rack(&self, shelf: NodeRef, label: &str, code: &str) -> NodeRef {
        self.put_record(
            NodeType::Rack,
            NodeRecord {
                label: Some(label.to_string()),
                code: non_empty(code),
                parent_shelf_id: Some(shelf.id.into()),
                ..active_record()
            },
        )
    }

    /// Stores a record as-is under a fresh id, bypassing every constraint.
    pub fn put_record(&self, node_type: NodeType, mut record: NodeRecord) -> NodeRef {
        let mut store = self.store.lock();
        store.next_id += 1;
        let node = NodeRef::new(node_type, NodeId(store.next_id));
        record.id = node.id.into();
        store.nodes.insert(node, record);
        node
    }

    pub fn set_active(&self, node: NodeRef, active: bool) {
        if let Some(record) = self.store.lock().nodes.get_mut(&node) {
            record.active = Some(Flag(active));
        }
    }

    /// Samples assigned directly to `node`.
    pub fn assign_samples(&self, node: NodeRef, count: u32) {
        self.store.lock().samples.insert(node, count);
    }

    /// Deletes answer 403 unless the caller is an administrator.
    pub fn set_admin(&self, admin: bool) {
        self.store.lock().non_admin = !admin;
    }

    pub fn record(&self, node: NodeRef) -> Option<NodeRecord> {
        self.store.lock().nodes.get(&node).cloned()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.store.lock().requests.clone()
    }

    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<RecordedRequest> {
        self.store
            .lock()
            .requests
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .cloned()
            .collect()
    }

    /// The next request to `endpoint` fails with `error`.
    pub fn fail_next(&self, endpoint: Endpoint, error: BackendError) {
        self.store
            .lock()
            .faults
            .entry(endpoint)
            .or_default()
            .push_back(error);
    }

    /// Requests to `endpoint` block until the returned hold is released.
    pub fn hold(&self, endpoint: Endpoint) -> Hold {
        let semaphore = Arc::new(Semaphore::new(0));
        self.store
            .lock()
            .holds
            .insert(endpoint, Arc::clone(&semaphore));
        Hold(semaphore)
    }

    async fn enter(
        &self,
        endpoint: Endpoint,
        node_type: NodeType,
        target: Option<NodeRef>,
        body: Option<serde_json::Value>,
    ) -> Result<(), BackendError> {
        let hold = {
            let mut store = self.store.lock();
            store.requests.push(RecordedRequest {
                endpoint,
                node_type,
                target,
                body,
            });
            store.holds.get(&endpoint).cloned()
        };
        if let Some(semaphore) = hold
            && let Ok(permit) = semaphore.acquire().await
        {
            permit.forget();
        }
        let mut store = self.store.lock();
        match store.faults.get_mut(&endpoint).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn active_record() -> NodeRecord {
    let mut record = NodeRecord::default();
    record.active = Some(Flag(true));
    record
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn not_found() -> BackendError {
    BackendError::Rejected {
        status: 404,
        body: ErrorBody::default(),
    }
}

impl Store {
    fn parent_of(&self, node: NodeRef) -> Option<NodeRef> {
        let parent_type = node.node_type.parent()?;
        let record = self.nodes.get(&node)?;
        let id = record.parent_id(node.node_type)?.to_core().ok()?;
        Some(NodeRef::new(parent_type, id))
    }

    fn children(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut children: Vec<NodeRef> = self
            .nodes
            .keys()
            .copied()
            .filter(|child| self.parent_of(*child) == Some(node))
            .collect();
        children.sort_by_key(|child| child.id);
        children
    }

    fn subtree_samples(&self, node: NodeRef) -> u32 {
        let own = self.samples.get(&node).copied().unwrap_or(0);
        own + self
            .children(node)
            .into_iter()
            .map(|child| self.subtree_samples(child))
            .sum::<u32>()
    }

    fn descendants_by_type(&self, node: NodeRef, counts: &mut BTreeMap<String, u32>) {
        for child in self.children(node) {
            *counts
                .entry(child.node_type.plural().to_string())
                .or_default() += 1;
            self.descendants_by_type(child, counts);
        }
    }

    fn delete_constraint(&self, node: NodeRef) -> Option<String> {
        let record = self.nodes.get(&node)?;
        let name = record.display_name(node.node_type);
        let display = node.node_type.display_name();
        let children = self.children(node).len();
        if children > 0
            && let Some(child_type) = node.node_type.child()
        {
            return Some(format!(
                "Cannot delete {display} '{name}' because it contains {children} {}(s)",
                child_type.key()
            ));
        }
        let samples = self.samples.get(&node).copied().unwrap_or(0);
        if samples > 0 {
            return Some(format!(
                "Cannot delete {display} '{name}' because it has {samples} sample(s) assigned"
            ));
        }
        None
    }

    /// Server-side checks shared by create and update. `exclude` is the node
    /// being updated, which may keep its own code.
    fn check_write(
        &self,
        node_type: NodeType,
        payload: &NodePayload,
        exclude: Option<NodeRef>,
    ) -> Result<(), BackendError> {
        if let Some(parent_type) = node_type.parent() {
            match payload.parent_id().and_then(|id| id.to_core().ok()) {
                Some(parent) => {
                    if !self.nodes.contains_key(&NodeRef::new(parent_type, parent)) {
                        return Err(BackendError::rejected(
                            400,
                            format!("Parent {} not found", parent_type.key()),
                        ));
                    }
                }
                None if node_type.parent_is_mandatory_on_write() => {
                    return Err(BackendError::rejected(
                        400,
                        format!("Parent {} ID is required", parent_type.key()),
                    ));
                }
                None => {}
            }
        }

        let Some(code) = payload.code().map(normalize_code).filter(|c| !c.is_empty()) else {
            return Ok(());
        };
        if let Err(err) = validate_code(&code) {
            return Err(BackendError::Rejected {
                status: 400,
                body: ErrorBody {
                    field_errors: Some(BTreeMap::from([("code".to_string(), err.to_string())])),
                    ..Default::default()
                },
            });
        }
        let taken = self.nodes.iter().any(|(other, record)| {
            other.node_type == node_type
                && Some(*other) != exclude
                && record.code.as_deref().map(normalize_code).as_deref() == Some(code.as_str())
        });
        if taken {
            return Err(BackendError::rejected(
                409,
                format!("Code '{code}' already exists for another {}", node_type.key()),
            ));
        }
        Ok(())
    }

    fn apply(&self, record: &mut NodeRecord, payload: &NodePayload) {
        let code = |c: &Option<String>| c.as_deref().map(normalize_code).filter(|c| !c.is_empty());
        match payload {
            NodePayload::Room(p) => {
                record.name = Some(p.name.clone());
                record.code = code(&p.code);
                record.description = p.description.clone();
            }
            NodePayload::Device(p) => {
                record.name = Some(p.name.clone());
                record.code = code(&p.code);
                record.device_type = Some(DeviceKind::from(p.device_type).key().to_string());
                record.temperature_setting = p.temperature_setting;
                record.capacity_limit = p.capacity_limit;
                if let Some(parent) = &p.parent_room_id {
                    record.parent_room_id = Some(parent.clone());
                    record.parent_room = None;
                    record.parent_room_name = self.name_of(NodeType::Room, parent);
                }
            }
            NodePayload::Shelf(p) => {
                record.label = Some(p.label.clone());
                record.code = code(&p.code);
                record.capacity_limit = p.capacity_limit;
                if let Some(parent) = &p.parent_device_id {
                    record.parent_device_id = Some(parent.clone());
                    record.parent_device = None;
                    record.parent_device_name = self.name_of(NodeType::Device, parent);
                }
            }
            NodePayload::Rack(p) => {
                record.label = Some(p.label.clone());
                record.code = code(&p.code);
                record.position_schema_hint = p.position_schema_hint.clone();
                record.parent_shelf_id = Some(p.parent_shelf_id.clone());
                record.parent_shelf = None;
                record.parent_shelf_label = self.name_of(NodeType::Shelf, &p.parent_shelf_id);
            }
        }
        record.active = Some(Flag(payload.active()));
    }

    fn name_of(&self, node_type: NodeType, id: &WireId) -> Option<String> {
        let id = id.to_core().ok()?;
        self.nodes
            .get(&NodeRef::new(node_type, id))
            .map(|r| r.display_name(node_type).to_string())
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get_node(&self, node: NodeRef) -> Result<NodeRecord, BackendError> {
        self.enter(Endpoint::Get, node.node_type, Some(node), None)
            .await?;
        self.record(node).ok_or_else(not_found)
    }

    async fn list_nodes(
        &self,
        node_type: NodeType,
        filter: ListFilter,
    ) -> Result<Vec<NodeRecord>, BackendError> {
        self.enter(Endpoint::List, node_type, filter.parent, None)
            .await?;
        let store = self.store.lock();
        let mut matching: Vec<(NodeRef, &NodeRecord)> = store
            .nodes
            .iter()
            .filter(|(node, record)| {
                node.node_type == node_type
                    && filter
                        .active
                        .is_none_or(|active| record.active.is_none_or(|flag| flag.0 == active))
                    && filter
                        .parent
                        .is_none_or(|parent| store.parent_of(**node) == Some(parent))
            })
            .map(|(node, record)| (*node, record))
            .collect();
        matching.sort_by_key(|(node, _)| node.id);
        Ok(matching.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn update_node(&self, node: NodeRef, payload: &NodePayload) -> Result<(), BackendError> {
        let body = serde_json::to_value(payload).ok();
        self.enter(Endpoint::Update, node.node_type, Some(node), body)
            .await?;
        let mut store = self.store.lock();
        let Some(mut record) = store.nodes.get(&node).cloned() else {
            return Err(not_found());
        };
        store.check_write(node.node_type, payload, Some(node))?;
        store.apply(&mut record, payload);
        store.nodes.insert(node, record);
        Ok(())
    }

    async fn create_node(
        &self,
        node_type: NodeType,
        payload: &NodePayload,
    ) -> Result<NodeRecord, BackendError> {
        let body = serde_json::to_value(payload).ok();
        self.enter(Endpoint::Create, node_type, None, body).await?;
        let mut store = self.store.lock();
        store.check_write(node_type, payload, None)?;
        let mut record = NodeRecord::default();
        store.apply(&mut record, payload);
        store.next_id += 1;
        let node = NodeRef::new(node_type, NodeId(store.next_id));
        record.id = node.id.into();
        store.nodes.insert(node, record.clone());
        Ok(record)
    }

    async fn can_move(
        &self,
        node: NodeRef,
        _new_parent: NodeId,
    ) -> Result<CanMoveResponse, BackendError> {
        self.enter(Endpoint::CanMove, node.node_type, Some(node), None)
            .await?;
        let store = self.store.lock();
        if !store.nodes.contains_key(&node) {
            return Err(not_found());
        }
        if node.node_type.parent().is_none() {
            return Ok(CanMoveResponse {
                can_move: false,
                has_downstream_samples: false,
                sample_count: 0,
                warning: None,
                error: Some("Rooms cannot be moved".to_string()),
            });
        }
        let sample_count = store.subtree_samples(node);
        let warning = (sample_count > 0).then(|| {
            format!(
                "Moving this {} will affect {sample_count} sample(s) assigned to this {} and its child locations. The samples will remain assigned but their hierarchical path will change.",
                node.node_type.key(),
                node.node_type.key()
            )
        });
        Ok(CanMoveResponse {
            can_move: true,
            has_downstream_samples: sample_count > 0,
            sample_count,
            warning,
            error: None,
        })
    }

    async fn can_delete(&self, node: NodeRef) -> Result<CanDeleteResponse, BackendError> {
        self.enter(Endpoint::CanDelete, node.node_type, Some(node), None)
            .await?;
        let store = self.store.lock();
        if !store.nodes.contains_key(&node) {
            return Err(not_found());
        }
        let is_admin = Some(!store.non_admin);
        Ok(match store.delete_constraint(node) {
            None => CanDeleteResponse {
                can_delete: true,
                is_admin,
                ..Default::default()
            },
            Some(message) => CanDeleteResponse {
                can_delete: false,
                is_admin,
                error: Some(format!("Cannot delete {}", node.node_type.key())),
                message: Some(message),
            },
        })
    }

    async fn cascade_delete_summary(
        &self,
        node: NodeRef,
    ) -> Result<CascadeDeleteSummary, BackendError> {
        self.enter(Endpoint::CascadeSummary, node.node_type, Some(node), None)
            .await?;
        let store = self.store.lock();
        if !store.nodes.contains_key(&node) {
            return Err(not_found());
        }
        let mut child_locations = BTreeMap::new();
        store.descendants_by_type(node, &mut child_locations);
        Ok(CascadeDeleteSummary {
            child_location_type: node.node_type.child().map(|t| t.key().to_string()),
            child_location_count: store.children(node).len() as u32,
            sample_count: store.subtree_samples(node),
            child_locations,
        })
    }

    async fn delete_node(&self, node: NodeRef) -> Result<(), BackendError> {
        self.enter(Endpoint::Delete, node.node_type, Some(node), None)
            .await?;
        let mut store = self.store.lock();
        if !store.nodes.contains_key(&node) {
            return Err(not_found());
        }
        if store.non_admin {
            return Err(BackendError::Rejected {
                status: 403,
                body: ErrorBody::default(),
            });
        }
        if let Some(message) = store.delete_constraint(node) {
            return Err(BackendError::Rejected {
                status: 409,
                body: ErrorBody {
                    error: Some(format!("Cannot delete {}", node.node_type.key())),
                    message: Some(message),
                    field_errors: None,
                },
            });
        }
        store.nodes.remove(&node);
        store.samples.remove(&node);
        Ok(())
    }
}
