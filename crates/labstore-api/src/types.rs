use serde::{Deserialize, Serialize};
use specta::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Room,
    Device,
    Shelf,
    Rack,
}

impl From<labstore_core::NodeType> for NodeType {
    fn from(value: labstore_core::NodeType) -> Self {
        match value {
            labstore_core::NodeType::Room => Self::Room,
            labstore_core::NodeType::Device => Self::Device,
            labstore_core::NodeType::Shelf => Self::Shelf,
            labstore_core::NodeType::Rack => Self::Rack,
        }
    }
}

impl From<NodeType> for labstore_core::NodeType {
    fn from(value: NodeType) -> Self {
        match value {
            NodeType::Room => Self::Room,
            NodeType::Device => Self::Device,
            NodeType::Shelf => Self::Shelf,
            NodeType::Rack => Self::Rack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Freezer,
    Refrigerator,
    Cabinet,
    Other,
}

impl From<labstore_core::DeviceKind> for DeviceKind {
    fn from(value: labstore_core::DeviceKind) -> Self {
        match value {
            labstore_core::DeviceKind::Freezer => Self::Freezer,
            labstore_core::DeviceKind::Refrigerator => Self::Refrigerator,
            labstore_core::DeviceKind::Cabinet => Self::Cabinet,
            labstore_core::DeviceKind::Other => Self::Other,
        }
    }
}

impl From<DeviceKind> for labstore_core::DeviceKind {
    fn from(value: DeviceKind) -> Self {
        match value {
            DeviceKind::Freezer => Self::Freezer,
            DeviceKind::Refrigerator => Self::Refrigerator,
            DeviceKind::Cabinet => Self::Cabinet,
            DeviceKind::Other => Self::Other,
        }
    }
}
