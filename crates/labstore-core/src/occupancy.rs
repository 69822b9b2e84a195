use serde::{Deserialize, Serialize};
use std::fmt;

/// Default percentage at which a capacity warning is shown.
pub const DEFAULT_WARNING_PERCENT: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occupancy {
    pub occupied: u32,
    pub capacity: u32,
    pub ratio: f64,
    /// Rounded to the nearest whole percent. Exceeds 100 when over capacity.
    pub percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupancyBand {
    Normal,
    Elevated,
    Critical,
}

impl Occupancy {
    /// `None` when the node has no usable capacity (unset or zero); such nodes
    /// display as `N/A` rather than 0%.
    pub fn compute(occupied: u32, capacity: Option<u32>) -> Option<Self> {
        let capacity = capacity.filter(|c| *c > 0)?;
        let ratio = f64::from(occupied) / f64::from(capacity);
        Some(Self {
            occupied,
            capacity,
            ratio,
            percent: (ratio * 100.0).round() as u32,
        })
    }

    pub fn band(&self) -> OccupancyBand {
        match self.percent {
            0..70 => OccupancyBand::Normal,
            70..90 => OccupancyBand::Elevated,
            _ => OccupancyBand::Critical,
        }
    }

    pub fn is_over_capacity(&self) -> bool {
        self.occupied > self.capacity
    }

    /// Presentation-only flag; occupancy above the threshold is never blocked.
    pub fn exceeds(&self, warning_percent: u32) -> bool {
        self.percent >= warning_percent
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.occupied, self.capacity, self.percent)
    }
}

/// Display string for an optional occupancy, `N/A` when capacity is unknown.
pub fn describe(occupied: u32, capacity: Option<u32>) -> String {
    Occupancy::compute(occupied, capacity)
        .map(|o| o.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
