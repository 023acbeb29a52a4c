//! One instant of 3-axis acceleration or velocity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable (x, y, z) triple.
///
/// Serializes as a plain `[x, y, z]` array so recordings stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Sample {
    x: f64,
    y: f64,
    z: f64,
}

impl Sample {
    /// The origin.
    pub const ZERO: Sample = Sample {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// Components as an array, encoded 0/x, 1/y, 2/z.
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean magnitude.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Sample) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Largest absolute component.
    pub fn max_abs_component(&self) -> f64 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }

    /// Smallest absolute component.
    pub fn min_abs_component(&self) -> f64 {
        self.x.abs().min(self.y.abs()).min(self.z.abs())
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Sample {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Sample::new(x, y, z)
    }
}

impl From<Sample> for [f64; 3] {
    fn from(s: Sample) -> Self {
        s.to_array()
    }
}

impl From<(f64, f64, f64)> for Sample {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Sample::new(x, y, z)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_and_distance() {
        let s = Sample::new(3.0, 4.0, 0.0);
        assert_eq!(s.magnitude(), 5.0);
        assert_eq!(Sample::ZERO.distance(&s), 5.0);
        assert_eq!(s.distance(&s), 0.0);
    }

    #[test]
    fn abs_components() {
        let s = Sample::new(-2.0, 0.5, 1.0);
        assert_eq!(s.max_abs_component(), 2.0);
        assert_eq!(s.min_abs_component(), 0.5);
    }

    #[test]
    fn serializes_as_array() {
        let s = Sample::new(1.0, -2.0, 0.5);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "[1.0,-2.0,0.5]");
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn finiteness() {
        assert!(Sample::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Sample::new(f64::NAN, 2.0, 3.0).is_finite());
        assert!(!Sample::new(1.0, f64::INFINITY, 3.0).is_finite());
    }
}
