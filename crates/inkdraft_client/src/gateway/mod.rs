//! Persistence gateway: the document store as seen by the editor.
//!
//! The store is last-writer-wins. The gateway carries no revision or ETag;
//! conditional writes would be added here.

mod http;

pub use http::HttpGateway;

use chrono::{DateTime, Utc};
use inkdraft_core::models::document::{Collaborator, Document, SaveDocumentRequest};
use inkdraft_core::{DeltaError, LoadFailure};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("document not found")]
    NotFound,

    #[error("not authorized")]
    Unauthorized,

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Delta(#[from] DeltaError),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// Classify a failed initial fetch for the session's error state.
    pub fn to_load_failure(&self) -> LoadFailure {
        match self {
            GatewayError::NotFound => LoadFailure::NotFound,
            GatewayError::Unauthorized => LoadFailure::Unauthorized,
            GatewayError::Transport(err) => LoadFailure::Network(err.to_string()),
            GatewayError::Status { .. } | GatewayError::InvalidUrl(_) => {
                LoadFailure::Network(self.to_string())
            }
            GatewayError::Decode(message) => LoadFailure::Invalid(message.clone()),
            GatewayError::Delta(err) => LoadFailure::Invalid(err.to_string()),
        }
    }
}

/// One row of the document list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Remote document store operations.
///
/// Futures are `Send` so the editor can hold an in-flight save across
/// `select!` iterations on a multi-threaded runtime.
pub trait PersistenceGateway: Send + Sync + 'static {
    /// Fetch one document with title/content defaults applied.
    fn fetch(&self, id: &str) -> impl Future<Output = Result<Document, GatewayError>> + Send;

    fn update(
        &self,
        id: &str,
        request: &SaveDocumentRequest,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Create a document and return its identifier.
    fn create(
        &self,
        request: &SaveDocumentRequest,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn list(&self) -> impl Future<Output = Result<Vec<DocumentSummary>, GatewayError>> + Send;

    /// Server-rendered DOCX bytes for the stored document.
    fn download_docx(&self, id: &str)
        -> impl Future<Output = Result<Vec<u8>, GatewayError>> + Send;

    fn invite(
        &self,
        id: &str,
        emails: &[String],
    ) -> impl Future<Output = Result<Vec<Collaborator>, GatewayError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failure_mapping() {
        assert_eq!(GatewayError::NotFound.to_load_failure(), LoadFailure::NotFound);
        assert_eq!(
            GatewayError::Unauthorized.to_load_failure(),
            LoadFailure::Unauthorized
        );
        assert!(matches!(
            GatewayError::Status {
                status: 502,
                message: "bad gateway".to_string()
            }
            .to_load_failure(),
            LoadFailure::Network(message) if message.contains("502")
        ));
        assert!(matches!(
            GatewayError::Decode("missing data".to_string()).to_load_failure(),
            LoadFailure::Invalid(_)
        ));
        assert!(matches!(
            GatewayError::Delta(DeltaError::NotADocument).to_load_failure(),
            LoadFailure::Invalid(_)
        ));
    }
}
