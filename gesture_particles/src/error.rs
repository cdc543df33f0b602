//! Application-level errors.

use std::path::PathBuf;

use thiserror::Error;

/// A landmark source that cannot deliver frames right now.  The detection
/// loop logs it and reports "no hands" until the source recovers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("landmark device unavailable: {0}")]
    Unavailable(String),

    #[error("landmark device access denied")]
    PermissionDenied,

    #[error("input channel closed")]
    Disconnected,
}

/// The only errors that reach `main`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("could not open window: {0}")]
    Window(String),

    #[error("could not read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
