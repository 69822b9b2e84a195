use labstore_core::{Field, NodeFields, normalize_code};

/// Working copy of a node's form values next to the values it was opened with.
///
/// Edits only touch the working copy; a save commits by taking one snapshot of
/// it, so values typed while a write is in flight can never leak into that write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    original: NodeFields,
    current: NodeFields,
}

impl EditBuffer {
    pub fn new(original: NodeFields) -> Self {
        Self {
            current: original.clone(),
            original,
        }
    }

    pub fn original(&self) -> &NodeFields {
        &self.original
    }

    pub fn current(&self) -> &NodeFields {
        &self.current
    }

    /// Codes are normalized as they are typed.
    pub fn set_text(&mut self, field: Field, value: String) -> bool {
        let value = if field == Field::Code {
            normalize_code(&value)
        } else {
            value
        };
        self.current.set_text(field, value)
    }

    pub fn set_active(&mut self, active: bool) {
        self.current.active = active;
    }

    pub fn is_dirty(&self) -> bool {
        self.current != self.original
    }

    pub fn changed_fields(&self) -> Vec<Field> {
        let mut changed: Vec<Field> = [
            Field::Name,
            Field::Label,
            Field::Code,
            Field::Description,
            Field::DeviceType,
            Field::TemperatureSetting,
            Field::CapacityLimit,
            Field::PositionSchemaHint,
            Field::Parent,
        ]
        .into_iter()
        .filter(|field| self.current.text(*field) != self.original.text(*field))
        .collect();
        if self.current.active != self.original.active {
            changed.push(Field::Active);
        }
        changed.sort();
        changed
    }

    /// True when the parent currently selected differs from the original one.
    pub fn parent_changed(&self) -> bool {
        self.current.parent() != self.original.parent()
    }

    pub fn snapshot(&self) -> NodeFields {
        self.current.clone()
    }
}
