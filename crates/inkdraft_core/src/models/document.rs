//! Document models and the wire shapes used by the document store.

use crate::constants::DEFAULT_DOCUMENT_TITLE;
use crate::delta::Delta;
use crate::error::DeltaError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access level granted to a collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Read,
    Edit,
}

/// Whether a collaborator has accepted their invitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub email: String,
    #[serde(default)]
    pub permission: Permission,
    #[serde(default)]
    pub status: InvitationStatus,
}

/// A document as held by one editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: Delta,
    pub created_at: Option<DateTime<Utc>>,
    pub collaborators: Vec<Collaborator>,
}

/// Store representation of a document; `content` is the serialized delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
}

/// Body of create and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDocumentRequest {
    pub title: String,
    pub content: String,
}

/// Body of a collaborator invitation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRequest {
    pub emails: Vec<String>,
}

/// `{ "data": ... }` wrapper used by read and list responses.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Create response; the store answers `{ "document": ... }`, some
/// deployments `{ "data": ... }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatedEnvelope {
    #[serde(default)]
    pub document: Option<DocumentRecord>,
    #[serde(default)]
    pub data: Option<DocumentRecord>,
}

impl CreatedEnvelope {
    /// Identifier of the created document, if the response carried one.
    pub fn created_id(self) -> Option<String> {
        self.document.or(self.data).and_then(|record| record.id)
    }
}

/// Collaborator response: `{ "collaborators": [...] }` or `{ "data": [...] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollaboratorsEnvelope {
    #[serde(default)]
    pub collaborators: Option<Vec<Collaborator>>,
    #[serde(default)]
    pub data: Option<Vec<Collaborator>>,
}

impl CollaboratorsEnvelope {
    pub fn into_list(self) -> Vec<Collaborator> {
        self.collaborators.or(self.data).unwrap_or_default()
    }
}

/// Replace a blank title with [`DEFAULT_DOCUMENT_TITLE`].
pub fn normalize_title(title: &str) -> String {
    if title.trim().is_empty() {
        DEFAULT_DOCUMENT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

impl Document {
    /// Build a session document from a store record, applying defaults.
    ///
    /// `fallback_id` is used when the record omits its identifier (the read
    /// endpoint addresses the document by id already).
    ///
    /// # Errors
    /// Returns [`DeltaError`] when non-empty content is not a valid delta.
    pub fn from_record(record: DocumentRecord, fallback_id: &str) -> Result<Self, DeltaError> {
        let content = Delta::parse_or_default(record.content.as_deref())?;
        Ok(Self {
            id: record.id.unwrap_or_else(|| fallback_id.to_string()),
            title: normalize_title(record.title.as_deref().unwrap_or_default()),
            content,
            created_at: record.created_at,
            collaborators: record.collaborators,
        })
    }
}

impl SaveDocumentRequest {
    /// Build a save body with the title normalized and empty content replaced
    /// by the default document.
    pub fn new(title: &str, content: &Delta) -> Result<Self, DeltaError> {
        let content = if content.is_empty() {
            Delta::default_document().to_json()?
        } else {
            content.to_json()?
        };
        Ok(Self {
            title: normalize_title(title),
            content,
        })
    }
}
