use crate::EnumConversionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Freezer,
    Refrigerator,
    Cabinet,
    Other,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 4] = [
        DeviceKind::Freezer,
        DeviceKind::Refrigerator,
        DeviceKind::Cabinet,
        DeviceKind::Other,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DeviceKind::Freezer => "freezer",
            DeviceKind::Refrigerator => "refrigerator",
            DeviceKind::Cabinet => "cabinet",
            DeviceKind::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeviceKind::Freezer => "Freezer",
            DeviceKind::Refrigerator => "Refrigerator",
            DeviceKind::Cabinet => "Cabinet",
            DeviceKind::Other => "Other",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DeviceKind {
    type Err = EnumConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DeviceKind::ALL
            .into_iter()
            .find(|kind| kind.key() == needle)
            .ok_or_else(|| EnumConversionError::InvalidDeviceKind(s.to_string()))
    }
}
