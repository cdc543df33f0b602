//! Error types for frame assembly and the external classifier boundary.
//!
//! Neither error escapes the pipeline: a malformed hand turns the frame into
//! "no hands", and a classifier failure falls back to the rule-based label.

use thiserror::Error;

/// A raw hand that cannot be turned into a fixed 21-point [`Hand`](crate::Hand).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("hand has {got} landmarks, expected {expected}")]
    WrongLandmarkCount { got: usize, expected: usize },

    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// Failure reported by an [`ExternalClassifier`](crate::ExternalClassifier).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("classifier model unavailable: {0}")]
    Unavailable(String),

    #[error("classification timed out after {0} ms")]
    Timeout(u64),

    #[error("inference failed: {0}")]
    Inference(String),
}
