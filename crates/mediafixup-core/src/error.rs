//! Error types for the fixup engine.
//!
//! Every failure a fixup can report is one variant of [`FixupError`]. The
//! orchestrator treats any error returned from a fixup as a nonzero status
//! and stops the run.

use crate::catalog::WatchReport;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the fixup engine.
#[derive(Debug, Error)]
pub enum FixupError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown fixup: {name}")]
    UnknownFixup { name: String },

    #[error("Invalid argument for fixup {fixup}: {message}")]
    InvalidArgument { fixup: String, message: String },

    // Catalog errors
    #[error("Cannot connect to the media server: {message}")]
    Connection { message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("{action}: {message} ({report})")]
    CatalogOperation {
        action: String,
        message: String,
        report: WatchReport,
    },

    #[error("Attempt to set the {field} field of {item} to {expected:?} did not stick, it is now {actual:?}")]
    VerificationMismatch {
        item: String,
        field: String,
        expected: String,
        actual: String,
    },

    // Media file errors
    #[error("Cannot map server file {server_path:?} using path mappings {mappings}")]
    UnmappedPath {
        server_path: String,
        mappings: String,
    },

    #[error("Cannot find local media file {path:?} for {item}")]
    MissingMediaFile { path: PathBuf, item: String },

    #[error("Cannot probe media file {path:?}: {message}")]
    Probe { path: PathBuf, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: Option<serde_yaml::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for fixup operations.
pub type Result<T> = std::result::Result<T, FixupError>;

impl From<std::io::Error> for FixupError {
    fn from(err: std::io::Error) -> Self {
        FixupError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_yaml::Error> for FixupError {
    fn from(err: serde_yaml::Error) -> Self {
        FixupError::Yaml {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for FixupError {
    fn from(err: serde_json::Error) -> Self {
        FixupError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for FixupError {
    fn from(err: reqwest::Error) -> Self {
        FixupError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl FixupError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        FixupError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an argument error for the named fixup.
    pub fn invalid_argument(fixup: &str, message: impl Into<String>) -> Self {
        FixupError::InvalidArgument {
            fixup: fixup.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error is raised before any connection to the server is
    /// attempted.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            FixupError::Config { .. }
                | FixupError::UnknownFixup { .. }
                | FixupError::InvalidArgument { .. }
        )
    }
}
