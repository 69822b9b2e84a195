use crate::EnumConversionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four levels of the physical storage hierarchy, outermost first.
///
/// Every per-type difference the editor cares about (REST segment, parent
/// link, naming field, capacity) is answered here so callers never branch on
/// type names themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Room,
    Device,
    Shelf,
    Rack,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::Room,
        NodeType::Device,
        NodeType::Shelf,
        NodeType::Rack,
    ];

    /// Singular lowercase key used in URLs, events and the CLI.
    pub fn key(self) -> &'static str {
        match self {
            NodeType::Room => "room",
            NodeType::Device => "device",
            NodeType::Shelf => "shelf",
            NodeType::Rack => "rack",
        }
    }

    /// Plural REST collection segment. Note `shelves`, not `shelfs`.
    pub fn plural(self) -> &'static str {
        match self {
            NodeType::Room => "rooms",
            NodeType::Device => "devices",
            NodeType::Shelf => "shelves",
            NodeType::Rack => "racks",
        }
    }

    /// Capitalized name used in titles ("Edit Shelf").
    pub fn display_name(self) -> &'static str {
        match self {
            NodeType::Room => "Room",
            NodeType::Device => "Device",
            NodeType::Shelf => "Shelf",
            NodeType::Rack => "Rack",
        }
    }

    pub fn parent(self) -> Option<NodeType> {
        match self {
            NodeType::Room => None,
            NodeType::Device => Some(NodeType::Room),
            NodeType::Shelf => Some(NodeType::Device),
            NodeType::Rack => Some(NodeType::Shelf),
        }
    }

    pub fn child(self) -> Option<NodeType> {
        NodeType::ALL
            .into_iter()
            .find(|candidate| candidate.parent() == Some(self))
    }

    /// JSON field carrying the parent id on records and write payloads.
    pub fn parent_field(self) -> Option<&'static str> {
        match self.parent()? {
            NodeType::Room => Some("parentRoomId"),
            NodeType::Device => Some("parentDeviceId"),
            NodeType::Shelf => Some("parentShelfId"),
            NodeType::Rack => None,
        }
    }

    /// Query parameter of the `can-move` endpoint.
    pub fn move_param(self) -> Option<&'static str> {
        match self.parent()? {
            NodeType::Room => Some("newParentRoomId"),
            NodeType::Device => Some("newParentDeviceId"),
            NodeType::Shelf => Some("newParentShelfId"),
            NodeType::Rack => None,
        }
    }

    /// Shelves and racks are identified by a `label`; rooms and devices by a `name`.
    pub fn uses_label(self) -> bool {
        matches!(self, NodeType::Shelf | NodeType::Rack)
    }

    pub fn has_capacity(self) -> bool {
        matches!(self, NodeType::Device | NodeType::Shelf)
    }

    /// A missing parent on this type cannot be fixed by the operator; it means
    /// the record itself is broken.
    pub fn parent_is_mandatory_on_write(self) -> bool {
        matches!(self, NodeType::Rack)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for NodeType {
    type Err = EnumConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        NodeType::ALL
            .into_iter()
            .find(|t| t.key() == needle || t.plural() == needle)
            .ok_or_else(|| EnumConversionError::InvalidNodeType(s.to_string()))
    }
}
