//! Blast radius of moving a node under a different parent.

use labstore_client::{BackendError, StorageBackend};
use labstore_core::{NodeId, NodeRef, NodeType};
use tracing::debug;

/// Samples that would change hierarchical path if the move went ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactResult {
    pub message: String,
    pub sample_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveAssessment {
    /// Nothing downstream is affected.
    Clear,
    Impact(ImpactResult),
    /// The server does not allow this node to move at all.
    Refused(String),
}

impl MoveAssessment {
    pub fn impact(&self) -> Option<&ImpactResult> {
        match self {
            MoveAssessment::Impact(result) => Some(result),
            _ => None,
        }
    }
}

pub fn default_impact_message(node_type: NodeType, sample_count: u32) -> String {
    format!(
        "Moving this {} will affect {sample_count} sample(s).",
        node_type.key()
    )
}

/// Asks the server what moving `node` under `candidate` would affect.
pub async fn analyze_move<B: StorageBackend + ?Sized>(
    backend: &B,
    node: NodeRef,
    candidate: NodeId,
) -> Result<MoveAssessment, BackendError> {
    let response = backend.can_move(node, candidate).await?;
    debug!(%node, %candidate, ?response, "can-move answered");

    if !response.can_move {
        let reason = response
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| format!("This {} cannot be moved", node.node_type.key()));
        return Ok(MoveAssessment::Refused(reason));
    }
    if !response.has_downstream_samples {
        return Ok(MoveAssessment::Clear);
    }
    let message = response
        .warning
        .filter(|w| !w.trim().is_empty())
        .unwrap_or_else(|| default_impact_message(node.node_type, response.sample_count));
    Ok(MoveAssessment::Impact(ImpactResult {
        message,
        sample_count: response.sample_count,
    }))
}
