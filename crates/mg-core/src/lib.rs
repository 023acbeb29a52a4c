//! Motion Gesture Recognition Core Library
//!
//! This library provides the recognition pipeline:
//! - Stateful sample filters and the filter chain
//! - K-means vector quantizer over fixed seed directions
//! - Left-to-right hidden Markov model with multi-sequence training
//! - Gesture models and the Bayesian classifier
//! - The capture/training/recognition processing unit
//! - Session records, recorded-gesture files and script replay
//! - Structured logging and exit codes for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod classifier;
pub mod events;
pub mod exit_codes;
pub mod filter;
pub mod hmm;
pub mod logging;
pub mod model;
pub mod processing;
pub mod quantizer;
pub mod recording;
pub mod replay;

#[cfg(test)]
mod test_utils;

pub use classifier::{Classification, Classifier, ClassifierError};
pub use filter::{Filter, FilterChain};
pub use hmm::HiddenMarkovModel;
pub use model::{GestureModel, ModelError, ModelSummary};
pub use processing::{
    ProcessingError, ProcessingState, ProcessingUnit, RecognitionEvent, RecognitionListener,
    RecognitionOutcome,
};
pub use quantizer::Quantizer;
