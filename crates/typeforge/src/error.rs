//! Error types for the typeforge library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for typeforge operations.
///
/// Expected outcomes of the pipeline (validation misses, retry exhaustion,
/// missing datasets, unknown cache domains) are reported as data, not as
/// errors. This enum covers caller mistakes and collaborator failures.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A generation request was rejected before any collaborator was called.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A semantic type definition violates its plugin's invariants.
    #[error("Invalid semantic type definition: {0}")]
    InvalidDefinition(String),

    /// The generative model collaborator failed or returned garbage.
    #[error("Model provider error: {0}")]
    Provider(String),

    /// The caller cancelled work before it started.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for typeforge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;
