//! Data models for documents, collaborators and the store's JSON envelopes.

/// Document, collaborator and request/response payloads.
pub mod document;
