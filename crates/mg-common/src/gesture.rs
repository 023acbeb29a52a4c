//! Captured gestures: ordered, append-only sample sequences.

use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// One performance of a gesture.
///
/// Keeps the chronological sample sequence plus the largest and smallest
/// absolute per-axis magnitude seen across all samples. Both extremes are
/// maintained on append and can be overridden manually, which is how an
/// aggregate training gesture carries averaged extremes.
///
/// Serializes as a bare array of `[x, y, z]` samples; a manual override is
/// not part of the recording format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Sample>", into = "Vec<Sample>")]
pub struct Gesture {
    data: Vec<Sample>,
    max_abs: f64,
    min_abs: f64,
    manual_extremes: Option<(f64, f64)>,
}

impl Default for Gesture {
    fn default() -> Self {
        Self::new()
    }
}

impl Gesture {
    /// Create an empty gesture.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            max_abs: f64::MIN,
            min_abs: f64::MAX,
            manual_extremes: None,
        }
    }

    /// Build a gesture from samples in chronological order.
    pub fn from_samples<I: IntoIterator<Item = Sample>>(samples: I) -> Self {
        let mut gesture = Self::new();
        for sample in samples {
            gesture.add(sample);
        }
        gesture
    }

    /// Append a sample.
    pub fn add(&mut self, sample: Sample) {
        let hi = sample.max_abs_component();
        let lo = sample.min_abs_component();
        if hi > self.max_abs {
            self.max_abs = hi;
        }
        if lo < self.min_abs {
            self.min_abs = lo;
        }
        self.data.push(sample);
    }

    /// The most recently added sample.
    pub fn last(&self) -> Option<&Sample> {
        self.data.last()
    }

    /// Remove the oldest sample, if any.
    pub fn remove_first(&mut self) -> Option<Sample> {
        if self.data.is_empty() {
            return None;
        }
        let removed = self.data.remove(0);
        self.recompute_extremes();
        Some(removed)
    }

    /// Chronological samples.
    pub fn samples(&self) -> &[Sample] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Override both extremes. Later appends no longer affect the reported
    /// values.
    pub fn set_max_and_min_acceleration(&mut self, max: f64, min: f64) {
        self.manual_extremes = Some((max, min));
    }

    /// True if the extremes were set manually.
    pub fn has_manual_extremes(&self) -> bool {
        self.manual_extremes.is_some()
    }

    /// Largest absolute per-axis value across all samples.
    ///
    /// `f64::MIN` for an empty gesture without a manual override.
    pub fn max_acceleration(&self) -> f64 {
        match self.manual_extremes {
            Some((max, _)) => max,
            None => self.max_abs,
        }
    }

    /// Smallest absolute per-axis value across all samples.
    ///
    /// `f64::MAX` for an empty gesture without a manual override.
    pub fn min_acceleration(&self) -> f64 {
        match self.manual_extremes {
            Some((_, min)) => min,
            None => self.min_abs,
        }
    }

    /// Drop every sample and any manual override.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn recompute_extremes(&mut self) {
        self.max_abs = f64::MIN;
        self.min_abs = f64::MAX;
        for s in &self.data {
            self.max_abs = self.max_abs.max(s.max_abs_component());
            self.min_abs = self.min_abs.min(s.min_abs_component());
        }
    }
}

impl From<Vec<Sample>> for Gesture {
    fn from(samples: Vec<Sample>) -> Self {
        Gesture::from_samples(samples)
    }
}

impl From<Gesture> for Vec<Sample> {
    fn from(g: Gesture) -> Self {
        g.data
    }
}

impl FromIterator<Sample> for Gesture {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Gesture::from_samples(iter)
    }
}
