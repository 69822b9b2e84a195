//! Turns form values into the per-type write body.

use crate::EditorError;
use labstore_api::{
    DeviceKind as WireDeviceKind, DevicePayload, NodeId as WireId, NodePayload, RackPayload,
    RoomPayload, ShelfPayload,
};
use labstore_core::{
    DeviceKind, Field, FieldErrors, NodeFields, NodeType, normalize_code, parse_capacity,
    parse_temperature,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Update,
    Create,
}

impl WriteKind {
    fn verb(self) -> &'static str {
        match self {
            WriteKind::Update => "edit",
            WriteKind::Create => "create",
        }
    }

    /// Banner text when the server's error body carried nothing usable.
    pub fn fallback_message(self, status: u16) -> String {
        match self {
            WriteKind::Update => format!("Failed to update location (status: {status})"),
            WriteKind::Create => format!("Failed to create location (status: {status})"),
        }
    }
}

pub fn missing_rack_parent(kind: WriteKind) -> String {
    format!(
        "Cannot {} rack: parent shelf information is missing. This may indicate a data integrity issue.",
        kind.verb()
    )
}

/// Builds the body for `node_type` from a committed form snapshot.
///
/// Only mutable fields are sent. A rack must always name its parent shelf;
/// without one nothing can be sent and the error is a data-integrity failure.
pub fn build_payload(
    node_type: NodeType,
    fields: &NodeFields,
    kind: WriteKind,
) -> Result<NodePayload, EditorError> {
    let code = Some(normalize_code(&fields.code)).filter(|c| !c.is_empty());
    let parent = fields.parent().map(|id| WireId(id.to_string()));

    let payload = match node_type {
        NodeType::Room => NodePayload::Room(RoomPayload {
            name: fields.name.trim().to_string(),
            code,
            description: Some(fields.description.clone()).filter(|d| !d.trim().is_empty()),
            active: fields.active,
        }),
        NodeType::Device => {
            let device_type = fields
                .device_type
                .parse::<DeviceKind>()
                .map_err(|e| invalid(Field::DeviceType, e.to_string()))?;
            NodePayload::Device(DevicePayload {
                name: fields.name.trim().to_string(),
                code,
                device_type: WireDeviceKind::from(device_type),
                temperature_setting: parse_temperature(&fields.temperature_setting).map_err(
                    |_| invalid(Field::TemperatureSetting, "Temperature must be a number"),
                )?,
                capacity_limit: capacity(fields)?,
                active: fields.active,
                parent_room_id: parent,
            })
        }
        NodeType::Shelf => NodePayload::Shelf(ShelfPayload {
            label: fields.label.trim().to_string(),
            code,
            capacity_limit: capacity(fields)?,
            active: fields.active,
            parent_device_id: parent,
        }),
        NodeType::Rack => {
            let Some(parent_shelf_id) = parent else {
                return Err(EditorError::DataIntegrity(missing_rack_parent(kind)));
            };
            NodePayload::Rack(RackPayload {
                label: fields.label.trim().to_string(),
                code,
                active: fields.active,
                position_schema_hint: Some(fields.position_schema_hint.trim().to_string())
                    .filter(|h| !h.is_empty()),
                parent_shelf_id,
            })
        }
    };
    Ok(payload)
}

fn capacity(fields: &NodeFields) -> Result<Option<u32>, EditorError> {
    parse_capacity(&fields.capacity_limit).map_err(|_| {
        invalid(
            Field::CapacityLimit,
            "Capacity must be a non-negative whole number",
        )
    })
}

fn invalid(field: Field, message: impl Into<String>) -> EditorError {
    let mut errors = FieldErrors::new();
    errors.insert(field, message);
    EditorError::Validation(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rack(parent: &str) -> NodeFields {
        NodeFields {
            label: "Rack A".into(),
            code: " ra-1 ".into(),
            parent_id: parent.into(),
            ..NodeFields::new_active()
        }
    }

    #[test]
    fn test_rack_without_parent_is_data_integrity_error() {
        for placeholder in ["", "  ", "null", "undefined"] {
            let err = build_payload(NodeType::Rack, &rack(placeholder), WriteKind::Update)
                .expect_err("no parent");
            match err {
                EditorError::DataIntegrity(message) => assert_eq!(
                    message,
                    "Cannot edit rack: parent shelf information is missing. This may indicate a data integrity issue."
                ),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_rack_payload_normalizes_code_and_keeps_parent() {
        let payload = build_payload(NodeType::Rack, &rack("12"), WriteKind::Create).expect("payload");
        let body = serde_json::to_value(&payload).expect("json");
        assert_eq!(body["code"], "RA-1");
        assert_eq!(body["parentShelfId"], "12");
        assert!(body.get("positionSchemaHint").is_some());
    }

    #[test]
    fn test_device_payload_carries_typed_values() {
        let fields = NodeFields {
            name: "Freezer".into(),
            device_type: "freezer".into(),
            temperature_setting: "-20".into(),
            capacity_limit: "40".into(),
            parent_id: "3".into(),
            ..NodeFields::new_active()
        };
        let payload = build_payload(NodeType::Device, &fields, WriteKind::Update).expect("payload");
        let body = serde_json::to_value(&payload).expect("json");
        assert_eq!(body["type"], "freezer");
        assert_eq!(body["temperatureSetting"], -20.0);
        assert_eq!(body["capacityLimit"], 40);
        assert_eq!(body["parentRoomId"], "3");
        assert_eq!(body["code"], serde_json::Value::Null);
    }

    #[test]
    fn test_room_payload_has_only_room_fields() {
        let fields = NodeFields {
            name: "Main Lab".into(),
            code: "LAB1".into(),
            description: "Ground floor".into(),
            ..NodeFields::new_active()
        };
        let body = serde_json::to_value(
            build_payload(NodeType::Room, &fields, WriteKind::Update).expect("payload"),
        )
        .expect("json");
        let keys: Vec<&str> = body
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["active", "code", "description", "name"]);
    }
}
