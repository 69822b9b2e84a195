use crate::NodeType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An editable field of a hierarchy node, as the operator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Label,
    Code,
    Description,
    Active,
    DeviceType,
    TemperatureSetting,
    CapacityLimit,
    PositionSchemaHint,
    Parent,
}

impl Field {
    /// Wire name of the field. `Parent` depends on the node type, so callers that
    /// need the JSON key should go through [`Field::wire_key`].
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Label => "label",
            Field::Code => "code",
            Field::Description => "description",
            Field::Active => "active",
            Field::DeviceType => "type",
            Field::TemperatureSetting => "temperatureSetting",
            Field::CapacityLimit => "capacityLimit",
            Field::PositionSchemaHint => "positionSchemaHint",
            Field::Parent => "parent",
        }
    }

    pub fn wire_key(self, node_type: NodeType) -> &'static str {
        match self {
            Field::Parent => node_type.parent_field().unwrap_or("parent"),
            other => other.key(),
        }
    }

    /// Maps a server-side field name (as found in `fieldErrors`) back to a field.
    pub fn from_wire(key: &str, node_type: NodeType) -> Option<Field> {
        if node_type.parent_field() == Some(key) {
            return Some(Field::Parent);
        }
        editable_fields(node_type)
            .iter()
            .copied()
            .find(|field| field.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Fields the operator may change for a node type, in form order.
pub fn editable_fields(node_type: NodeType) -> &'static [Field] {
    match node_type {
        NodeType::Room => &[Field::Name, Field::Code, Field::Description, Field::Active],
        NodeType::Device => &[
            Field::Name,
            Field::Code,
            Field::DeviceType,
            Field::TemperatureSetting,
            Field::CapacityLimit,
            Field::Active,
            Field::Parent,
        ],
        NodeType::Shelf => &[
            Field::Label,
            Field::Code,
            Field::CapacityLimit,
            Field::Active,
            Field::Parent,
        ],
        NodeType::Rack => &[
            Field::Label,
            Field::Code,
            Field::PositionSchemaHint,
            Field::Active,
            Field::Parent,
        ],
    }
}

/// Raw form values. Numeric fields stay textual until validation so that a
/// half-typed value like `-` can be reported instead of silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFields {
    pub name: String,
    pub label: String,
    pub code: String,
    pub description: String,
    pub active: bool,
    pub device_type: String,
    pub temperature_setting: String,
    pub capacity_limit: String,
    pub position_schema_hint: String,
    pub parent_id: String,
}

impl NodeFields {
    /// Blank form used by the create flow.
    pub fn new_active() -> Self {
        Self {
            active: true,
            ..Default::default()
        }
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Name => &self.name,
            Field::Label => &self.label,
            Field::Code => &self.code,
            Field::Description => &self.description,
            Field::DeviceType => &self.device_type,
            Field::TemperatureSetting => &self.temperature_setting,
            Field::CapacityLimit => &self.capacity_limit,
            Field::PositionSchemaHint => &self.position_schema_hint,
            Field::Parent => &self.parent_id,
            Field::Active => return None,
        };
        Some(value.as_str())
    }

    /// Writes a textual field. Returns `false` when the value is unchanged, and
    /// always for `Active`, which is boolean.
    pub fn set_text(&mut self, field: Field, value: String) -> bool {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Label => &mut self.label,
            Field::Code => &mut self.code,
            Field::Description => &mut self.description,
            Field::DeviceType => &mut self.device_type,
            Field::TemperatureSetting => &mut self.temperature_setting,
            Field::CapacityLimit => &mut self.capacity_limit,
            Field::PositionSchemaHint => &mut self.position_schema_hint,
            Field::Parent => &mut self.parent_id,
            Field::Active => return false,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    pub fn display_name(&self, node_type: NodeType) -> &str {
        if node_type.uses_label() {
            &self.label
        } else {
            &self.name
        }
    }

    pub fn parent(&self) -> Option<&str> {
        meaningful_id(&self.parent_id)
    }
}

/// Returns the trimmed id unless it is one of the placeholder values that
/// upstream serializers leak for a missing id.
pub fn meaningful_id(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    match trimmed {
        "" | "null" | "undefined" => None,
        _ => Some(trimmed),
    }
}
