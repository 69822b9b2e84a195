//! Field-level validation shared by the edit and create flows.
//!
//! Validation is pure: it looks only at the values in the form. Uniqueness of
//! codes and referential checks belong to the server and come back as 409/400.

use crate::{DeviceKind, Field, NodeFields, NodeType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const MAX_CODE_LENGTH: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("Code cannot exceed 10 characters")]
    TooLong,
    #[error("Code must start with a letter or number")]
    BadLeadingCharacter,
    #[error("Code can only contain letters, numbers, hyphens, and underscores")]
    InvalidCharacters,
}

/// Codes are stored upper-cased and trimmed; the form applies the same
/// normalization as the operator types.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Checks an already-normalized code. An empty code is valid (codes are optional).
pub fn validate_code(code: &str) -> Result<(), CodeError> {
    if code.is_empty() {
        return Ok(());
    }
    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(CodeError::TooLong);
    }
    let allowed = |c: char| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_';
    if !code.chars().all(allowed) {
        return Err(CodeError::InvalidCharacters);
    }
    if code.starts_with(['-', '_']) {
        return Err(CodeError::BadLeadingCharacter);
    }
    Ok(())
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("not a valid number")]
pub struct NumberError;

/// Field → message, ordered by field so reports are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    /// Merges errors reported by the server on top of local ones.
    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }
}

/// Validates the form for `node_type`. An empty result means the values may be
/// submitted as far as the client can tell.
pub fn validate(node_type: NodeType, fields: &NodeFields) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if node_type.uses_label() {
        if fields.label.trim().is_empty() {
            errors.insert(Field::Label, "Label is required");
        }
    } else if fields.name.trim().is_empty() {
        errors.insert(Field::Name, "Name is required");
    }

    if let Err(err) = validate_code(&normalize_code(&fields.code)) {
        errors.insert(Field::Code, err.to_string());
    }

    if node_type == NodeType::Device {
        let raw_kind = fields.device_type.trim();
        if raw_kind.is_empty() {
            errors.insert(Field::DeviceType, "Device type is required");
        } else if raw_kind.parse::<DeviceKind>().is_err() {
            errors.insert(
                Field::DeviceType,
                "Device type must be freezer, refrigerator, cabinet, or other",
            );
        }

        if parse_temperature(&fields.temperature_setting).is_err() {
            errors.insert(Field::TemperatureSetting, "Temperature must be a number");
        }
    }

    if node_type.has_capacity() && parse_capacity(&fields.capacity_limit).is_err() {
        errors.insert(
            Field::CapacityLimit,
            "Capacity must be a non-negative whole number",
        );
    }

    // A rack without a parent is a broken record, not a form mistake; the
    // payload builder reports it as a data-integrity failure instead.
    if let Some(parent_type) = node_type.parent()
        && !node_type.parent_is_mandatory_on_write()
        && fields.parent().is_none()
    {
        errors.insert(
            Field::Parent,
            format!("Parent {} is required", parent_type.key()),
        );
    }

    errors
}

/// Empty means "not set". Anything else must be a finite number.
pub fn parse_temperature(raw: &str) -> Result<Option<f64>, NumberError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(NumberError),
    }
}

/// Empty means "not set". Anything else must be a non-negative integer.
pub fn parse_capacity(raw: &str) -> Result<Option<u32>, NumberError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<u32>().map(Some).map_err(|_| NumberError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn device(temperature: &str) -> NodeFields {
        NodeFields {
            name: "Freezer A".into(),
            device_type: "freezer".into(),
            temperature_setting: temperature.into(),
            parent_id: "1".into(),
            ..NodeFields::new_active()
        }
    }

    #[test]
    fn test_temperature_accepts_empty_and_signed_numbers() {
        for ok in ["", "-20", "0", "4.5", " -80 "] {
            let errors = validate(NodeType::Device, &device(ok));
            assert!(errors.is_empty(), "{ok:?} should be valid: {errors:?}");
        }
    }

    #[test]
    fn test_temperature_rejects_text() {
        let errors = validate(NodeType::Device, &device("abc"));
        assert_eq!(
            errors.get(Field::TemperatureSetting),
            Some("Temperature must be a number")
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_capacity_must_be_non_negative_integer() {
        let mut shelf = NodeFields {
            label: "Shelf 1".into(),
            parent_id: "3".into(),
            ..NodeFields::new_active()
        };
        for bad in ["-1", "1.5", "ten"] {
            shelf.capacity_limit = bad.into();
            assert!(
                validate(NodeType::Shelf, &shelf).contains(Field::CapacityLimit),
                "{bad:?}"
            );
        }
        for ok in ["", "0", "120"] {
            shelf.capacity_limit = ok.into();
            assert!(validate(NodeType::Shelf, &shelf).is_empty(), "{ok:?}");
        }
    }

    #[test]
    fn test_required_name_or_label_by_type() {
        let blank = NodeFields::new_active();
        assert!(validate(NodeType::Room, &blank).contains(Field::Name));
        let rack = validate(NodeType::Rack, &blank);
        assert!(rack.contains(Field::Label));
        assert!(!rack.contains(Field::Name));
    }

    #[test]
    fn test_missing_parent_is_field_error_except_for_racks() {
        let shelf = NodeFields {
            label: "S".into(),
            ..NodeFields::new_active()
        };
        assert_eq!(
            validate(NodeType::Shelf, &shelf).get(Field::Parent),
            Some("Parent device is required")
        );
        assert!(validate(NodeType::Rack, &shelf).is_empty());
    }

    #[test]
    fn test_code_messages() {
        assert_eq!(validate_code("ABCDEFGHIJK"), Err(CodeError::TooLong));
        assert_eq!(validate_code("-FRZ"), Err(CodeError::BadLeadingCharacter));
        assert_eq!(validate_code("FR Z"), Err(CodeError::InvalidCharacters));
        assert_eq!(validate_code("FRZ_01-A"), Ok(()));
        assert_eq!(validate_code(""), Ok(()));
        assert_eq!(normalize_code(" frz01 "), "FRZ01");
    }

    proptest! {
        #[test]
        fn prop_well_formed_codes_validate(code in "[A-Z0-9][A-Z0-9_-]{0,9}") {
            prop_assert_eq!(validate_code(&code), Ok(()));
        }

        #[test]
        fn prop_codes_longer_than_limit_fail(code in "[A-Z0-9]{11,20}") {
            prop_assert_eq!(validate_code(&code), Err(CodeError::TooLong));
        }

        #[test]
        fn prop_any_integer_temperature_is_valid(t in -273i32..200) {
            let errors = validate(NodeType::Device, &device(&t.to_string()));
            prop_assert!(errors.is_empty());
        }
    }
}
