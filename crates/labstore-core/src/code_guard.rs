use serde::{Deserialize, Serialize};

/// True when a node that already had a code is about to get a different one.
///
/// Codes are printed on barcode labels, so only a change away from an existing
/// code can strand labels. Giving a code to a node that had none cannot.
pub fn has_diverged(original: &str, current: &str) -> bool {
    !original.is_empty() && original != current
}

/// Acknowledgment gate for code changes.
///
/// An acknowledgment covers exactly the code value it was given for. Editing
/// the code to another value needs a fresh one, and reverting to the original
/// discards it so the next change is gated again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAckGate {
    original: String,
    acknowledged_for: Option<String>,
}

impl CodeAckGate {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            acknowledged_for: None,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_diverged(&self, current: &str) -> bool {
        has_diverged(&self.original, current)
    }

    /// Must be called after every code edit.
    pub fn observe(&mut self, current: &str) {
        let still_covered = self.acknowledged_for.as_deref() == Some(current);
        if !self.is_diverged(current) || !still_covered {
            self.acknowledged_for = None;
        }
    }

    /// Sets or clears the acknowledgment for `current`. Returns whether an
    /// acknowledgment is now in effect; acknowledging an unchanged code is a no-op.
    pub fn acknowledge(&mut self, current: &str, acknowledged: bool) -> bool {
        if acknowledged && self.is_diverged(current) {
            self.acknowledged_for = Some(current.to_string());
            true
        } else {
            self.acknowledged_for = None;
            false
        }
    }

    pub fn is_acknowledged(&self, current: &str) -> bool {
        self.acknowledged_for.as_deref() == Some(current)
    }

    /// Whether the code no longer stands in the way of saving.
    pub fn is_satisfied(&self, current: &str) -> bool {
        !self.is_diverged(current) || self.is_acknowledged(current)
    }

    pub fn warning(&self, current: &str) -> Option<String> {
        self.is_diverged(current).then(|| {
            format!(
                "Changing the code will invalidate previously printed labels that reference {}.",
                self.original
            )
        })
    }
}
