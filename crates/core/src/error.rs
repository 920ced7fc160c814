//! Error types for the geoselect-core library.
//!
//! Only configuration, scene initialization and explicit analysis calls
//! produce errors. Gesture-level misses (no surface under a pixel, no feature
//! under the cursor, restoring from an empty registry) are reported through
//! `Option`/`bool` return values and never reach this type.

use thiserror::Error;

/// Errors that can occur within the geoselect-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The analysis endpoint URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid analysis endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The offending URL as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The scene could not be initialized; the selection engine is never built.
    #[error("Scene initialization failed: {0}")]
    SceneInit(String),

    /// The analysis request never produced an HTTP response.
    #[error("Analysis request failed: {0}")]
    AnalysisTransport(String),

    /// The analysis service answered with a non-success status.
    #[error("Analysis service returned {status}: {body}")]
    AnalysisStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The analysis service answered 2xx but flagged the result as unsuccessful.
    #[error("Analysis service rejected the request")]
    AnalysisRejected,

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An unclassified error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a scene initialization error with the given message.
    pub fn scene(msg: impl Into<String>) -> Self {
        Self::SceneInit(msg.into())
    }

    /// Creates an analysis transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::AnalysisTransport(msg.into())
    }

    /// Whether the failure is recoverable at the interaction level.
    ///
    /// Analysis failures are logged and absorbed; everything else is a setup problem.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AnalysisTransport(_) | Self::AnalysisStatus { .. } | Self::AnalysisRejected
        )
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
