//! Directional-equivalence gate.

use mg_common::Sample;
use mg_config::recognizer::DEFAULT_DIRECTIONAL_SENSITIVITY;

use super::Filter;

/// Drops a sample when every axis is within `sensitivity` of the reference.
///
/// A sample that leaves the band on any axis passes and becomes the new
/// reference. The reference starts at the origin.
#[derive(Debug, Clone)]
pub struct DirectionalEquivalenceFilter {
    sensitivity: f64,
    reference: Sample,
}

impl DirectionalEquivalenceFilter {
    pub fn new(sensitivity: f64) -> Self {
        Self {
            sensitivity,
            reference: Sample::ZERO,
        }
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.sensitivity = sensitivity;
    }

    /// The last sample that passed.
    pub fn reference(&self) -> Sample {
        self.reference
    }

    fn outside_band(&self, value: f64, reference: f64) -> bool {
        value < reference - self.sensitivity || value > reference + self.sensitivity
    }
}

impl Default for DirectionalEquivalenceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTIONAL_SENSITIVITY)
    }
}

impl Filter for DirectionalEquivalenceFilter {
    fn name(&self) -> &'static str {
        "directional_equivalence"
    }

    fn filter_sample(&mut self, sample: Sample) -> Option<Sample> {
        let r = self.reference;
        if self.outside_band(sample.x(), r.x())
            || self.outside_band(sample.y(), r.y())
            || self.outside_band(sample.z(), r.z())
        {
            self.reference = sample;
            Some(sample)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.reference = Sample::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_near_origin_initially() {
        let mut f = DirectionalEquivalenceFilter::default();
        assert_eq!(f.filter(Some(Sample::new(0.2, -0.2, 0.1))), None);
    }

    #[test]
    fn one_axis_outside_band_passes_and_moves_reference() {
        let mut f = DirectionalEquivalenceFilter::default();
        let s = Sample::new(0.0, 0.0, 0.5);
        assert_eq!(f.filter(Some(s)), Some(s));
        assert_eq!(f.reference(), s);
        // Same direction again is a repeat.
        assert_eq!(f.filter(Some(Sample::new(0.1, 0.0, 0.6))), None);
        // Back to the origin is a change.
        assert!(f.filter(Some(Sample::ZERO)).is_some());
    }

    #[test]
    fn reset_returns_reference_to_origin() {
        let mut f = DirectionalEquivalenceFilter::new(0.2);
        f.filter(Some(Sample::new(1.0, 1.0, 1.0)));
        f.reset();
        assert_eq!(f.reference(), Sample::ZERO);
        assert_eq!(f.sensitivity(), 0.2);
    }
}
