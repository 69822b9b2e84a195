use crate::ids::{Flag, LooseText, NodeId};
use crate::types::{DeviceKind, NodeType};
use labstore_core::{NodeFields, NodeType as CoreNodeType};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use specta::Type;
use std::collections::BTreeMap;

/// Minimal view of a parent embedded in a record (`parentRoom: {id, name}`).
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Type)]
pub struct ParentRef {
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Full node record returned by `GET /rest/storage/{plural}/{id}`.
///
/// One shape serves all four node types; fields that do not apply to a type are
/// absent. Parent links appear either flat (`parentRoomId`) or nested
/// (`parentRoom.id`) depending on the endpoint, so lookups go through
/// [`NodeRecord::parent_id`].
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` when the server sent no flag or `null`.
    #[serde(default)]
    pub active: Option<Flag>,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub temperature_setting: Option<f64>,
    #[serde(default)]
    pub capacity_limit: Option<u32>,
    #[serde(default)]
    pub position_schema_hint: Option<String>,
    #[serde(default)]
    pub occupied_count: Option<u32>,

    #[serde(default)]
    pub parent_room_id: Option<NodeId>,
    #[serde(default)]
    pub parent_device_id: Option<NodeId>,
    #[serde(default)]
    pub parent_shelf_id: Option<NodeId>,
    #[serde(default)]
    pub parent_room: Option<ParentRef>,
    #[serde(default)]
    pub parent_device: Option<ParentRef>,
    #[serde(default)]
    pub parent_shelf: Option<ParentRef>,
    #[serde(default)]
    pub parent_room_name: Option<String>,
    #[serde(default)]
    pub parent_device_name: Option<String>,
    #[serde(default)]
    pub parent_shelf_label: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub shelf_label: Option<String>,

    #[serde(default)]
    pub created_date: Option<LooseText>,
    #[serde(default)]
    pub created_by: Option<LooseText>,
    #[serde(default)]
    pub last_modified_date: Option<LooseText>,
    #[serde(default)]
    pub last_modified_by: Option<LooseText>,
}

impl NodeRecord {
    /// Parent id of a record of `node_type`, from the flat field or else the
    /// nested object. Placeholder ids (`""`, `"null"`) count as absent.
    pub fn parent_id(&self, node_type: CoreNodeType) -> Option<NodeId> {
        let (flat, nested) = match node_type {
            CoreNodeType::Room => return None,
            CoreNodeType::Device => (&self.parent_room_id, &self.parent_room),
            CoreNodeType::Shelf => (&self.parent_device_id, &self.parent_device),
            CoreNodeType::Rack => (&self.parent_shelf_id, &self.parent_shelf),
        };
        flat.iter()
            .chain(nested.as_ref().and_then(|p| p.id.as_ref()))
            .find(|id| id.meaningful().is_some())
            .cloned()
    }

    pub fn parent_display_name(&self, node_type: CoreNodeType) -> Option<&str> {
        let candidates = match node_type {
            CoreNodeType::Room => return None,
            CoreNodeType::Device => [
                self.parent_room_name.as_deref(),
                self.parent_room.as_ref().and_then(|p| p.name.as_deref()),
                self.room_name.as_deref(),
            ],
            CoreNodeType::Shelf => [
                self.parent_device_name.as_deref(),
                self.parent_device.as_ref().and_then(|p| p.name.as_deref()),
                self.device_name.as_deref(),
            ],
            CoreNodeType::Rack => [
                self.parent_shelf_label.as_deref(),
                self.parent_shelf.as_ref().and_then(|p| p.label.as_deref()),
                self.shelf_label.as_deref(),
            ],
        };
        candidates
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
    }

    /// Only an explicit `false` marks a record inactive.
    pub fn is_inactive(&self) -> bool {
        matches!(self.active, Some(Flag(false)))
    }

    pub fn display_name(&self, node_type: CoreNodeType) -> &str {
        let primary = if node_type.uses_label() {
            self.label.as_deref()
        } else {
            self.name.as_deref()
        };
        primary
            .filter(|name| !name.trim().is_empty())
            .or(self.code.as_deref())
            .unwrap_or("Location")
    }

    /// Form values for this record. Missing optional values become empty text.
    pub fn to_fields(&self, node_type: CoreNodeType) -> NodeFields {
        NodeFields {
            name: self.name.clone().unwrap_or_default(),
            label: self.label.clone().unwrap_or_default(),
            code: self.code.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            active: self.active.is_some_and(|flag| flag.0),
            device_type: self
                .device_type
                .as_deref()
                .map(str::to_ascii_lowercase)
                .unwrap_or_default(),
            temperature_setting: self
                .temperature_setting
                .map(|t| t.to_string())
                .unwrap_or_default(),
            capacity_limit: self
                .capacity_limit
                .map(|c| c.to_string())
                .unwrap_or_default(),
            position_schema_hint: self.position_schema_hint.clone().unwrap_or_default(),
            parent_id: self
                .parent_id(node_type)
                .map(|id| id.0.trim().to_string())
                .unwrap_or_default(),
        }
    }
}

/// PUT/POST body for a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct DevicePayload {
    pub name: String,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub device_type: DeviceKind,
    pub temperature_setting: Option<f64>,
    pub capacity_limit: Option<u32>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_room_id: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct ShelfPayload {
    pub label: String,
    pub code: Option<String>,
    pub capacity_limit: Option<u32>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_device_id: Option<NodeId>,
}

/// A rack's parent shelf is not optional on any write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct RackPayload {
    pub label: String,
    pub code: Option<String>,
    pub active: bool,
    pub position_schema_hint: Option<String>,
    pub parent_shelf_id: NodeId,
}

/// Write body for any node type; serializes as the inner payload.
#[derive(Debug, Clone, PartialEq, Serialize, Type)]
#[serde(untagged)]
pub enum NodePayload {
    Room(RoomPayload),
    Device(DevicePayload),
    Shelf(ShelfPayload),
    Rack(RackPayload),
}

impl NodePayload {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodePayload::Room(_) => NodeType::Room,
            NodePayload::Device(_) => NodeType::Device,
            NodePayload::Shelf(_) => NodeType::Shelf,
            NodePayload::Rack(_) => NodeType::Rack,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            NodePayload::Room(p) => p.code.as_deref(),
            NodePayload::Device(p) => p.code.as_deref(),
            NodePayload::Shelf(p) => p.code.as_deref(),
            NodePayload::Rack(p) => p.code.as_deref(),
        }
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        match self {
            NodePayload::Room(_) => None,
            NodePayload::Device(p) => p.parent_room_id.as_ref(),
            NodePayload::Shelf(p) => p.parent_device_id.as_ref(),
            NodePayload::Rack(p) => Some(&p.parent_shelf_id),
        }
    }

    pub fn active(&self) -> bool {
        match self {
            NodePayload::Room(p) => p.active,
            NodePayload::Device(p) => p.active,
            NodePayload::Shelf(p) => p.active,
            NodePayload::Rack(p) => p.active,
        }
    }
}

/// Response of `GET /{plural}/{id}/can-move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct CanMoveResponse {
    #[serde(default = "default_true")]
    pub can_move: bool,
    #[serde(default)]
    pub has_downstream_samples: bool,
    #[serde(default)]
    pub sample_count: u32,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Body of `GET /{plural}/{id}/can-delete`, returned with 200 or 409.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct CanDeleteResponse {
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What a cascading delete would remove; informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct CascadeDeleteSummary {
    #[serde(default)]
    pub child_locations: BTreeMap<String, u32>,
    #[serde(default)]
    pub sample_count: u32,
    #[serde(default)]
    pub child_location_type: Option<String>,
    #[serde(default)]
    pub child_location_count: u32,
}

/// Structured error body of a non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub field_errors: Option<BTreeMap<String, String>>,
}

impl ErrorBody {
    /// Reduces the body to a single display line: `error`, else `message`, else
    /// the flattened `fieldErrors`. `None` when the body carries nothing usable.
    pub fn summary(&self) -> Option<String> {
        fn present(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|v| !v.trim().is_empty())
        }
        if let Some(error) = present(&self.error) {
            return Some(error.to_string());
        }
        if let Some(message) = present(&self.message) {
            return Some(message.to_string());
        }
        let field_errors = self.field_errors.as_ref().filter(|m| !m.is_empty())?;
        let joined = field_errors
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("Validation errors: {joined}"))
    }

    /// The 409 bodies of can-delete put the human sentence in `message`.
    pub fn reason(&self) -> Option<String> {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.error.clone().filter(|e| !e.trim().is_empty()))
    }
}
