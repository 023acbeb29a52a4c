//! Motion gesture common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the mg crates:
//! - Motion samples and captured gestures
//! - Model and session identity types
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod gesture;
pub mod id;
pub mod output;
pub mod sample;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use gesture::Gesture;
pub use id::{ModelId, SessionId};
pub use output::OutputFormat;
pub use sample::Sample;
