//! Vector quantizer: k-means over fixed seed directions.
//!
//! Maps each continuous sample to the index of its nearest centroid in a
//! fixed codebook of [`CODEBOOK_SIZE`] points. The codebook is seeded once,
//! on first training, at fixed directions scaled by the gesture's radius:
//! eight around the x-z plane and six around the y-z plane. Later training
//! moves the existing centroids instead of reseeding.

use std::f64::consts::PI;

use mg_common::{Gesture, Sample};
use mg_config::recognizer::{CODEBOOK_SIZE, DEFAULT_KMEANS_MAX_ITERATIONS};
use thiserror::Error;

use crate::logging::event_names;

/// Quantizer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantizerError {
    #[error("quantizer codebook has not been trained")]
    NotTrained,

    #[error("cannot quantize or train on an empty gesture")]
    EmptyGesture,
}

impl From<QuantizerError> for mg_common::Error {
    fn from(err: QuantizerError) -> Self {
        match err {
            QuantizerError::NotTrained => mg_common::Error::NotTrained(err.to_string()),
            QuantizerError::EmptyGesture => mg_common::Error::EmptyGesture,
        }
    }
}

/// Outcome of one codebook training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeansReport {
    /// Assignment passes performed.
    pub iterations: usize,
    /// False if the iteration cap stopped the loop.
    pub converged: bool,
}

/// K-means vector quantizer with a fixed-size codebook.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantizer {
    states: usize,
    max_iterations: usize,
    radius: f64,
    codebook: [Sample; CODEBOOK_SIZE],
    trained: bool,
}

impl Quantizer {
    /// `states` is the HMM state count; observation sequences are padded
    /// to at least that length.
    pub fn new(states: usize) -> Self {
        Self::with_max_iterations(states, DEFAULT_KMEANS_MAX_ITERATIONS)
    }

    pub fn with_max_iterations(states: usize, max_iterations: usize) -> Self {
        Self {
            states,
            max_iterations: max_iterations.max(1),
            radius: 0.0,
            codebook: [Sample::ZERO; CODEBOOK_SIZE],
            trained: false,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn codebook(&self) -> &[Sample; CODEBOOK_SIZE] {
        &self.codebook
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn states(&self) -> usize {
        self.states
    }

    /// Install a codebook directly and mark the quantizer trained.
    pub fn set_up_manually(&mut self, codebook: [Sample; CODEBOOK_SIZE], radius: f64) {
        self.codebook = codebook;
        self.radius = radius;
        self.trained = true;
    }

    /// Fit the codebook to `gesture`.
    ///
    /// The radius is the mean of the gesture's largest and smallest absolute
    /// axis values. Iterates until the sample-to-centroid assignment stops
    /// changing or the iteration cap is reached; a centroid only moves when
    /// at least two samples are assigned to it.
    pub fn train_centroids(&mut self, gesture: &Gesture) -> Result<KMeansReport, QuantizerError> {
        if gesture.is_empty() {
            return Err(QuantizerError::EmptyGesture);
        }
        let data = gesture.samples();
        self.radius = (gesture.max_acceleration() + gesture.min_acceleration()) / 2.0;

        if !self.trained {
            self.codebook = seed_codebook(self.radius);
            self.trained = true;
        }

        let mut previous: Vec<usize> = Vec::new();
        let mut iterations = 0;
        let converged = loop {
            iterations += 1;
            let groups = self.assign(data);
            self.update_centroids(data, &groups);
            if groups == previous {
                break true;
            }
            if iterations >= self.max_iterations {
                break false;
            }
            previous = groups;
        };

        if converged {
            tracing::debug!(
                iterations,
                radius = self.radius,
                samples = data.len(),
                "codebook trained"
            );
        } else {
            tracing::warn!(
                target: event_names::KMEANS_ITERATION_CAP,
                iterations,
                samples = data.len(),
                "k-means stopped at the iteration cap; keeping last centroids"
            );
        }

        Ok(KMeansReport {
            iterations,
            converged,
        })
    }

    /// Symbol sequence for `gesture`, padded with its last symbol to at
    /// least the state count.
    pub fn observation_sequence(&self, gesture: &Gesture) -> Result<Vec<usize>, QuantizerError> {
        if !self.trained {
            return Err(QuantizerError::NotTrained);
        }
        let mut sequence = self.assign(gesture.samples());
        let last = *sequence.last().ok_or(QuantizerError::EmptyGesture)?;
        if sequence.len() < self.states {
            sequence.resize(self.states, last);
        }
        Ok(sequence)
    }

    /// Index of the nearest centroid. Ties go to the lowest index.
    pub fn nearest(&self, sample: &Sample) -> usize {
        let mut smallest = f64::MAX;
        let mut index = 0;
        for (i, centroid) in self.codebook.iter().enumerate() {
            let d = centroid.distance(sample);
            if d < smallest {
                smallest = d;
                index = i;
            }
        }
        index
    }

    fn assign(&self, data: &[Sample]) -> Vec<usize> {
        data.iter().map(|s| self.nearest(s)).collect()
    }

    fn update_centroids(&mut self, data: &[Sample], groups: &[usize]) {
        for (i, centroid) in self.codebook.iter_mut().enumerate() {
            let (mut sx, mut sy, mut sz) = (0.0, 0.0, 0.0);
            let mut count = 0usize;
            for (sample, _) in data.iter().zip(groups).filter(|(_, &g)| g == i) {
                sx += sample.x();
                sy += sample.y();
                sz += sample.z();
                count += 1;
            }
            if count > 1 {
                let n = count as f64;
                *centroid = Sample::new(sx / n, sy / n, sz / n);
            }
        }
    }
}

/// The fixed seed directions scaled by `r`.
fn seed_codebook(r: f64) -> [Sample; CODEBOOK_SIZE] {
    let q1 = PI / 4.0;
    let q3 = PI * 3.0 / 4.0;
    let q5 = PI * 5.0 / 4.0;
    let q7 = PI * 7.0 / 4.0;
    [
        // x-z plane
        Sample::new(r, 0.0, 0.0),
        Sample::new(q1.cos() * r, 0.0, q1.sin() * r),
        Sample::new(0.0, 0.0, r),
        Sample::new(q3.cos() * r, 0.0, q3.sin() * r),
        Sample::new(-r, 0.0, 0.0),
        Sample::new(q5.cos() * r, 0.0, q5.sin() * r),
        Sample::new(0.0, 0.0, -r),
        Sample::new(q7.cos() * r, 0.0, q7.sin() * r),
        // y-z plane
        Sample::new(0.0, r, 0.0),
        Sample::new(0.0, q1.cos() * r, q1.sin() * r),
        Sample::new(0.0, q3.cos() * r, q3.sin() * r),
        Sample::new(0.0, -r, 0.0),
        Sample::new(0.0, q5.cos() * r, q5.sin() * r),
        Sample::new(0.0, q7.cos() * r, q7.sin() * r),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle() -> Gesture {
        (1..=100)
            .map(|i| 2.0 * PI * i as f64 / 100.0)
            .map(|a| Sample::new(-a.sin(), -a.cos(), -a.sin()))
            .collect()
    }

    #[test]
    fn untrained_quantizer_refuses() {
        let q = Quantizer::new(8);
        assert_eq!(
            q.observation_sequence(&circle()),
            Err(QuantizerError::NotTrained)
        );
    }

    #[test]
    fn empty_gesture_refused() {
        let mut q = Quantizer::new(8);
        assert_eq!(
            q.train_centroids(&Gesture::new()),
            Err(QuantizerError::EmptyGesture)
        );
        q.train_centroids(&circle()).unwrap();
        assert_eq!(
            q.observation_sequence(&Gesture::new()),
            Err(QuantizerError::EmptyGesture)
        );
    }

    #[test]
    fn seeds_scale_with_radius() {
        let gesture = Gesture::from_samples([Sample::new(2.0, 2.0, 2.0), Sample::new(2.0, 2.0, 2.0)]);
        let mut q = Quantizer::new(1);
        q.train_centroids(&gesture).unwrap();
        assert_eq!(q.radius(), 2.0);
        // Both samples land on the same centroid, which moves onto them.
        let idx = q.nearest(&Sample::new(2.0, 2.0, 2.0));
        assert_eq!(q.codebook()[idx], Sample::new(2.0, 2.0, 2.0));
        // Seeds without samples stay where they were placed.
        assert_eq!(q.codebook()[4], Sample::new(-2.0, 0.0, 0.0));
        assert_eq!(q.codebook()[11], Sample::new(0.0, -2.0, 0.0));
    }

    #[test]
    fn circle_sequence_is_valid() {
        let gesture = circle();
        let mut q = Quantizer::new(8);
        let report = q.train_centroids(&gesture).unwrap();
        assert!(report.converged);

        let seq = q.observation_sequence(&gesture).unwrap();
        assert_eq!(seq.len(), 100);
        assert!(seq.iter().all(|&s| s < CODEBOOK_SIZE));
    }

    #[test]
    fn short_sequence_padded_with_last_symbol() {
        let gesture = Gesture::from_samples([Sample::new(1.0, 0.0, 0.0), Sample::new(0.0, 0.0, -1.0)]);
        let mut q = Quantizer::new(15);
        q.train_centroids(&gesture).unwrap();
        let seq = q.observation_sequence(&gesture).unwrap();
        assert_eq!(seq.len(), 15);
        assert_eq!(seq[0], 0);
        assert!(seq[1..].iter().all(|&s| s == 6));
    }

    #[test]
    fn retraining_converged_codebook_is_stable() {
        let gesture = circle();
        let mut q = Quantizer::new(8);
        q.train_centroids(&gesture).unwrap();
        let first = *q.codebook();
        q.train_centroids(&gesture).unwrap();
        assert_eq!(*q.codebook(), first);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let mut q = Quantizer::new(1);
        q.set_up_manually([Sample::ZERO; CODEBOOK_SIZE], 1.0);
        assert!(q.is_trained());
        assert_eq!(q.nearest(&Sample::new(5.0, 5.0, 5.0)), 0);
    }

    #[test]
    fn iteration_cap_stops_loop() {
        let mut q = Quantizer::with_max_iterations(4, 1);
        let report = q.train_centroids(&circle()).unwrap();
        assert_eq!(report.iterations, 1);
        assert!(!report.converged);
        assert!(q.is_trained());
    }
}
