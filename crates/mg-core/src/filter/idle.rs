//! Idle-state gate.

use mg_common::Sample;
use mg_config::recognizer::DEFAULT_IDLE_SENSITIVITY;

use super::Filter;

/// Drops samples whose Euclidean magnitude is at or below the sensitivity.
///
/// Sensors report small non-zero values at rest; this keeps them out of
/// the gesture buffer.
#[derive(Debug, Clone)]
pub struct IdleStateFilter {
    sensitivity: f64,
}

impl IdleStateFilter {
    pub fn new(sensitivity: f64) -> Self {
        Self { sensitivity }
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.sensitivity = sensitivity;
    }
}

impl Default for IdleStateFilter {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_SENSITIVITY)
    }
}

impl Filter for IdleStateFilter {
    fn name(&self) -> &'static str {
        "idle_state"
    }

    fn filter_sample(&mut self, sample: Sample) -> Option<Sample> {
        if sample.magnitude() > self.sensitivity {
            Some(sample)
        } else {
            None
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_at_or_below_threshold() {
        let mut f = IdleStateFilter::default();
        assert_eq!(f.filter(Some(Sample::new(0.05, 0.05, 0.0))), None);
        assert_eq!(f.filter(Some(Sample::new(0.1, 0.0, 0.0))), None);
        let moving = Sample::new(0.1, 0.1, 0.0);
        assert_eq!(f.filter(Some(moving)), Some(moving));
    }

    #[test]
    fn none_stays_none() {
        let mut f = IdleStateFilter::new(0.0);
        assert_eq!(f.filter(None), None);
    }

    #[test]
    fn sensitivity_is_adjustable() {
        let mut f = IdleStateFilter::default();
        f.set_sensitivity(2.0);
        assert_eq!(f.filter(Some(Sample::new(1.0, 1.0, 1.0))), None);
        assert_eq!(f.sensitivity(), 2.0);
    }
}
