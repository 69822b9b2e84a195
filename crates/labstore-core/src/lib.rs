use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod code_guard;
pub mod device_kind;
pub mod fields;
pub mod node_type;
pub mod occupancy;
pub mod validation;

pub use code_guard::{CodeAckGate, has_diverged};
pub use device_kind::DeviceKind;
pub use fields::{Field, NodeFields, editable_fields, meaningful_id};
pub use node_type::NodeType;
pub use occupancy::{
    DEFAULT_WARNING_PERCENT, Occupancy, OccupancyBand, describe as describe_occupancy,
};
pub use validation::{
    CodeError, FieldErrors, MAX_CODE_LENGTH, NumberError, normalize_code, parse_capacity,
    parse_temperature, validate, validate_code,
};

/// Server-side identifier of a hierarchy node. Ids are only unique per node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `(type, id)` pair; the only way a node is addressed across the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub node_type: NodeType,
    pub id: NodeId,
}

impl NodeRef {
    pub fn new(node_type: NodeType, id: NodeId) -> Self {
        Self { node_type, id }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.node_type.key(), self.id)
    }
}

/// Error type for string-to-enum conversion failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumConversionError {
    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),
    #[error("Invalid device type: {0}")]
    InvalidDeviceKind(String),
}
