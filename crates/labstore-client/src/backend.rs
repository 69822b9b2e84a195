use crate::BackendError;
use async_trait::async_trait;
use labstore_api::{CanDeleteResponse, CanMoveResponse, CascadeDeleteSummary, NodePayload, NodeRecord};
use labstore_core::{NodeId, NodeRef, NodeType};

/// Narrows a collection listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// `Some(true)` lists only active nodes, `Some(false)` only inactive ones.
    pub active: Option<bool>,
    /// Only children of this node.
    pub parent: Option<NodeRef>,
}

impl ListFilter {
    pub fn active() -> Self {
        Self {
            active: Some(true),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: NodeRef) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Persistence seam for the storage hierarchy.
///
/// Outcomes the server reports as part of its contract are values: a 409 from
/// `can-delete` is a `CanDeleteResponse` with `can_delete == false`. Every
/// other non-2xx status is a [`BackendError::Rejected`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get_node(&self, node: NodeRef) -> Result<NodeRecord, BackendError>;

    async fn list_nodes(
        &self,
        node_type: NodeType,
        filter: ListFilter,
    ) -> Result<Vec<NodeRecord>, BackendError>;

    async fn update_node(&self, node: NodeRef, payload: &NodePayload) -> Result<(), BackendError>;

    /// Returns the created record; only its id is relied upon.
    async fn create_node(
        &self,
        node_type: NodeType,
        payload: &NodePayload,
    ) -> Result<NodeRecord, BackendError>;

    async fn can_move(
        &self,
        node: NodeRef,
        new_parent: NodeId,
    ) -> Result<CanMoveResponse, BackendError>;

    async fn can_delete(&self, node: NodeRef) -> Result<CanDeleteResponse, BackendError>;

    async fn cascade_delete_summary(
        &self,
        node: NodeRef,
    ) -> Result<CascadeDeleteSummary, BackendError>;

    async fn delete_node(&self, node: NodeRef) -> Result<(), BackendError>;
}
