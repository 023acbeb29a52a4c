//! Shared helpers for mg-core integration tests.
#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mg_common::{Gesture, Sample};
use mg_config::{ModelConfig, RecognizerConfig};
use mg_core::filter::ManualClock;
use mg_core::{GestureModel, ProcessingUnit};

pub fn circle(n: usize, scale: f64) -> Gesture {
    (1..=n)
        .map(|i| 2.0 * PI * i as f64 / n as f64)
        .map(|a| Sample::new(-a.sin() * scale, -a.cos() * scale, -a.sin() * scale))
        .collect()
}

pub fn line(n: usize, scale: f64) -> Gesture {
    (1..=n)
        .map(|i| Sample::new(scale * i as f64 / n as f64, 0.0, 0.0))
        .collect()
}

/// Tilted figure-eight; shares no direction pattern with [`circle`].
pub fn figure_eight(n: usize, scale: f64) -> Gesture {
    (1..=n)
        .map(|i| 2.0 * PI * i as f64 / n as f64)
        .map(|a| Sample::new(a.sin() * scale, (2.0 * a).sin() * scale, 0.5 * scale))
        .collect()
}

pub fn trained(name: &str, examples: &[Gesture]) -> GestureModel {
    let mut model = GestureModel::new(&ModelConfig::default()).expect("default model config");
    model.train(examples).expect("training succeeds");
    model.set_name(name);
    model
}

pub fn raw_config() -> RecognizerConfig {
    RecognizerConfig {
        filters: Vec::new(),
        ..RecognizerConfig::default()
    }
}

pub fn unit(config: &RecognizerConfig) -> (ProcessingUnit, ManualClock) {
    let clock = ManualClock::new(0);
    (ProcessingUnit::new(config, Arc::new(clock.clone())), clock)
}

pub fn feed(unit: &mut ProcessingUnit, clock: &ManualClock, gesture: &Gesture) -> usize {
    let mut buffered = 0;
    for sample in gesture.samples() {
        clock.advance(10);
        if unit.add_data(*sample) {
            buffered += 1;
        }
    }
    buffered
}

/// Write `gesture` as `x,y,z` lines under `dir`.
pub fn write_csv(dir: &Path, name: &str, gesture: &Gesture) -> PathBuf {
    let mut text = String::from("x,y,z\n");
    for s in gesture.samples() {
        text.push_str(&format!("{},{},{}\n", s.x(), s.y(), s.z()));
    }
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write csv");
    path
}

/// JSONL session script lines that capture `gesture` between two commands.
pub fn script_capture(out: &mut String, open: &str, close: &str, gesture: &Gesture) {
    out.push_str(&format!("{{\"cmd\":\"{open}\"}}\n"));
    for s in gesture.samples() {
        out.push_str(&format!("{{\"sample\":[{},{},{}]}}\n", s.x(), s.y(), s.z()));
    }
    out.push_str(&format!("{{\"cmd\":\"{close}\"}}\n"));
}
