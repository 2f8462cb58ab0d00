//! Error types for the delta model, session and export converters.
use thiserror::Error;

/// Failures while parsing or composing a content delta.
#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("Delta parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid delta op: {0}")]
    InvalidOp(String),

    #[error("Change reaches past end of document (length {doc_len}, needed {needed})")]
    OutOfRange { doc_len: usize, needed: usize },

    #[error("Delta is not a document (contains retain/delete ops)")]
    NotADocument,
}

/// Failures applying a local edit to the session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Document is not ready for edits ({0})")]
    NotReady(&'static str),

    #[error(transparent)]
    Delta(#[from] DeltaError),
}

/// Failures producing an export artifact.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid export options: {0}")]
    InvalidOptions(String),

    #[error("Layout failed: {0}")]
    Layout(String),

    #[error("Fetching export artifact failed: {0}")]
    Fetch(String),

    #[error("Invalid export artifact: {0}")]
    InvalidArtifact(String),

    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the initial fetch of a document failed. Fatal to the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    #[error("document not found")]
    NotFound,

    #[error("not authorized to open this document")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(String),

    #[error("document could not be read: {0}")]
    Invalid(String),
}
