//! Exponential moving-average filters.

use mg_common::Sample;
use mg_config::recognizer::{DEFAULT_HIGH_PASS_FACTOR, DEFAULT_LOW_PASS_FACTOR};

use super::Filter;

/// Running average `prev = v * factor + prev * (1 - factor)`, per axis.
#[derive(Debug, Clone, Copy)]
struct Smoother {
    factor: f64,
    prev: Sample,
}

impl Smoother {
    fn new(factor: f64) -> Self {
        Self {
            factor,
            prev: Sample::ZERO,
        }
    }

    fn update(&mut self, v: Sample) -> Sample {
        let f = self.factor;
        let p = self.prev;
        self.prev = Sample::new(
            v.x() * f + p.x() * (1.0 - f),
            v.y() * f + p.y() * (1.0 - f),
            v.z() * f + p.z() * (1.0 - f),
        );
        self.prev
    }
}

/// Subtracts the running average. Removes slow drift such as gravity.
#[derive(Debug, Clone)]
pub struct HighPassFilter {
    smoother: Smoother,
}

impl HighPassFilter {
    pub fn new(factor: f64) -> Self {
        Self {
            smoother: Smoother::new(factor),
        }
    }

    pub fn factor(&self) -> f64 {
        self.smoother.factor
    }
}

impl Default for HighPassFilter {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_PASS_FACTOR)
    }
}

impl Filter for HighPassFilter {
    fn name(&self) -> &'static str {
        "high_pass"
    }

    fn filter_sample(&mut self, sample: Sample) -> Option<Sample> {
        let avg = self.smoother.update(sample);
        Some(Sample::new(
            sample.x() - avg.x(),
            sample.y() - avg.y(),
            sample.z() - avg.z(),
        ))
    }

    fn reset(&mut self) {
        self.smoother.prev = Sample::ZERO;
    }
}

/// Emits the running average. Suppresses short spikes.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    smoother: Smoother,
}

impl LowPassFilter {
    pub fn new(factor: f64) -> Self {
        Self {
            smoother: Smoother::new(factor),
        }
    }

    pub fn factor(&self) -> f64 {
        self.smoother.factor
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_PASS_FACTOR)
    }
}

impl Filter for LowPassFilter {
    fn name(&self) -> &'static str {
        "low_pass"
    }

    fn filter_sample(&mut self, sample: Sample) -> Option<Sample> {
        Some(self.smoother.update(sample))
    }

    fn reset(&mut self) {
        self.smoother.prev = Sample::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Sample, b: Sample) -> bool {
        a.distance(&b) < 1e-12
    }

    #[test]
    fn low_pass_outputs_running_average() {
        let mut f = LowPassFilter::new(0.5);
        let out = f.filter(Some(Sample::new(2.0, 4.0, -2.0))).unwrap();
        assert!(close(out, Sample::new(1.0, 2.0, -1.0)));
        let out = f.filter(Some(Sample::new(2.0, 4.0, -2.0))).unwrap();
        assert!(close(out, Sample::new(1.5, 3.0, -1.5)));
    }

    #[test]
    fn high_pass_subtracts_running_average() {
        let mut f = HighPassFilter::new(0.1);
        let out = f.filter(Some(Sample::new(10.0, 0.0, 0.0))).unwrap();
        assert!(close(out, Sample::new(9.0, 0.0, 0.0)));
        let out = f.filter(Some(Sample::new(10.0, 0.0, 0.0))).unwrap();
        // prev = 1.0 * 0.9 + 10 * 0.1 = 1.9
        assert!(close(out, Sample::new(8.1, 0.0, 0.0)));
    }

    #[test]
    fn constant_input_decays_under_high_pass() {
        let mut f = HighPassFilter::default();
        let g = Sample::new(0.0, 0.0, 9.81);
        let mut last = f.filter(Some(g)).unwrap();
        for _ in 0..200 {
            last = f.filter(Some(g)).unwrap();
        }
        assert!(last.magnitude() < 1e-6);
    }

    #[test]
    fn reset_clears_average() {
        let mut f = LowPassFilter::default();
        f.filter(Some(Sample::new(5.0, 5.0, 5.0)));
        f.reset();
        let out = f.filter(Some(Sample::new(1.0, 0.0, 0.0))).unwrap();
        assert!(close(out, Sample::new(0.01, 0.0, 0.0)));
        assert_eq!(f.factor(), 0.01);
    }

    #[test]
    fn never_drops() {
        let mut hp = HighPassFilter::default();
        let mut lp = LowPassFilter::default();
        assert!(hp.filter(Some(Sample::ZERO)).is_some());
        assert!(lp.filter(Some(Sample::ZERO)).is_some());
        assert!(hp.filter(None).is_none());
    }
}
