//! Stateful per-sample filters and the ordered chain that runs them.
//!
//! A filter turns one sample into one sample or nothing. Once a stage drops
//! a sample, later stages see `None`; most of them pass it through, while
//! stateful observers such as [`MotionDetectFilter`] still update their
//! timers.

mod directional;
mod idle;
mod motion;
mod pass;

pub use directional::DirectionalEquivalenceFilter;
pub use idle::IdleStateFilter;
pub use motion::{Clock, ManualClock, MotionDetectFilter, SystemClock};
pub use pass::{HighPassFilter, LowPassFilter};

use std::sync::Arc;

use mg_common::Sample;
use mg_config::FilterSpec;

/// One stage of the filter chain.
pub trait Filter: Send {
    /// Stable kind name, matching the configuration tag.
    fn name(&self) -> &'static str;

    /// Process one possibly-dropped sample.
    fn filter(&mut self, sample: Option<Sample>) -> Option<Sample> {
        sample.and_then(|s| self.filter_sample(s))
    }

    /// Process a present sample. `None` drops it.
    fn filter_sample(&mut self, sample: Sample) -> Option<Sample>;

    /// Return internal state to its initial values. Tuning knobs are kept.
    fn reset(&mut self);

    /// Motion flag, for filters that track one.
    fn motion_status(&self) -> Option<bool> {
        None
    }
}

/// Build a filter from its configuration.
pub fn build_filter(spec: &FilterSpec, clock: Arc<dyn Clock>) -> Box<dyn Filter> {
    match *spec {
        FilterSpec::IdleState { sensitivity } => Box::new(IdleStateFilter::new(sensitivity)),
        FilterSpec::MotionDetect { motion_change_time } => {
            Box::new(MotionDetectFilter::new(motion_change_time, clock))
        }
        FilterSpec::DirectionalEquivalence { sensitivity } => {
            Box::new(DirectionalEquivalenceFilter::new(sensitivity))
        }
        FilterSpec::HighPass { factor } => Box::new(HighPassFilter::new(factor)),
        FilterSpec::LowPass { factor } => Box::new(LowPassFilter::new(factor)),
    }
}

/// Ordered sequence of filters.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from configuration, in order.
    pub fn from_specs(specs: &[FilterSpec], clock: Arc<dyn Clock>) -> Self {
        Self {
            filters: specs
                .iter()
                .map(|spec| build_filter(spec, Arc::clone(&clock)))
                .collect(),
        }
    }

    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Run one sample through every stage.
    pub fn process(&mut self, sample: Sample) -> Option<Sample> {
        self.filters
            .iter_mut()
            .fold(Some(sample), |acc, f| f.filter(acc))
    }

    /// Reset every filter's internal state.
    pub fn reset(&mut self) {
        for f in &mut self.filters {
            f.reset();
        }
    }

    /// Remove every filter.
    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Motion flag of the first stage that tracks one.
    pub fn motion_status(&self) -> Option<bool> {
        self.filters.iter().find_map(|f| f.motion_status())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_config::recognizer::default_filters;

    fn stock_chain(clock: &ManualClock) -> FilterChain {
        FilterChain::from_specs(&default_filters(), Arc::new(clock.clone()))
    }

    #[test]
    fn stock_chain_order() {
        let chain = stock_chain(&ManualClock::new(0));
        assert_eq!(
            chain.names(),
            vec!["idle_state", "motion_detect", "directional_equivalence"]
        );
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn empty_chain_passes_everything() {
        let mut chain = FilterChain::new();
        assert!(chain.is_empty());
        let s = Sample::new(0.0, 0.0, 0.0);
        assert_eq!(chain.process(s), Some(s));
        assert_eq!(chain.motion_status(), None);
    }

    #[test]
    fn idle_drop_still_reaches_motion_detect() {
        let clock = ManualClock::new(0);
        let mut chain = stock_chain(&clock);
        assert!(chain.process(Sample::new(1.0, 0.0, 0.0)).is_some());
        assert_eq!(chain.motion_status(), Some(true));

        clock.advance(200);
        // Dropped by the idle gate, but the motion window is still checked.
        assert_eq!(chain.process(Sample::new(0.01, 0.0, 0.0)), None);
        assert_eq!(chain.motion_status(), Some(false));
    }

    #[test]
    fn repeated_direction_is_dropped() {
        let clock = ManualClock::new(0);
        let mut chain = stock_chain(&clock);
        assert!(chain.process(Sample::new(1.0, 0.0, 0.0)).is_some());
        assert_eq!(chain.process(Sample::new(1.1, 0.1, 0.0)), None);
        assert!(chain.process(Sample::new(1.5, 0.0, 0.0)).is_some());
    }

    #[test]
    fn reset_restores_directional_reference() {
        let clock = ManualClock::new(0);
        let mut chain = stock_chain(&clock);
        let s = Sample::new(1.0, 0.0, 0.0);
        chain.process(s);
        assert_eq!(chain.process(s), None);
        chain.reset();
        assert_eq!(chain.process(s), Some(s));
    }

    #[test]
    fn clear_and_push() {
        let mut chain = stock_chain(&ManualClock::new(0));
        chain.clear();
        assert!(chain.is_empty());
        chain.push(Box::new(LowPassFilter::new(1.0)));
        let s = Sample::new(0.3, 0.2, 0.1);
        assert_eq!(chain.process(s), Some(s));
    }
}
