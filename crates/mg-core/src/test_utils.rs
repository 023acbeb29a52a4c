//! Unit-test helpers: synthetic gestures, trained models and processing
//! units on a manual clock.
//!
//! Integration tests cannot see `cfg(test)` items, so `tests/support`
//! carries its own generators.

use std::f64::consts::PI;
use std::sync::Arc;

use mg_common::{Gesture, Sample};
use mg_config::{ModelConfig, RecognizerConfig};

use crate::filter::ManualClock;
use crate::model::GestureModel;
use crate::processing::ProcessingUnit;

// ============================================================================
// Gestures
// ============================================================================

/// `n` samples around a full circle in the x-y plane with a z wobble.
pub fn circle(n: usize, scale: f64) -> Gesture {
    (1..=n)
        .map(|i| 2.0 * PI * i as f64 / n as f64)
        .map(|a| Sample::new(-a.sin() * scale, -a.cos() * scale, -a.sin() * scale))
        .collect()
}

/// `n` samples ramping along +x from `scale / n` to `scale`.
pub fn line(n: usize, scale: f64) -> Gesture {
    (1..=n)
        .map(|i| Sample::new(scale * i as f64 / n as f64, 0.0, 0.0))
        .collect()
}

// ============================================================================
// Models and units
// ============================================================================

/// A default-sized model trained on `examples`, named `name`.
pub fn trained_model(name: &str, examples: &[Gesture]) -> GestureModel {
    let mut model = match GestureModel::new(&ModelConfig::default()) {
        Ok(m) => m,
        Err(e) => panic!("default model config rejected: {e}"),
    };
    if let Err(e) = model.train(examples) {
        panic!("training {name} failed: {e}");
    }
    model.set_name(name);
    model
}

/// A processing unit on a manual clock with no filters, so every sample
/// reaches the buffer.
pub fn unfiltered_unit() -> (ProcessingUnit, ManualClock) {
    let clock = ManualClock::new(0);
    let config = RecognizerConfig {
        filters: Vec::new(),
        ..RecognizerConfig::default()
    };
    (ProcessingUnit::new(&config, Arc::new(clock.clone())), clock)
}

/// Feed every sample of `gesture` into `unit`, advancing `clock` by
/// `tick_ms` before each one.
pub fn feed(unit: &mut ProcessingUnit, clock: &ManualClock, gesture: &Gesture, tick_ms: u64) {
    for sample in gesture.samples() {
        clock.advance(tick_ms);
        unit.add_data(*sample);
    }
}
