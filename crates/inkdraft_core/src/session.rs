//! Document session: owns one document for the lifetime of an editing visit.
//!
//! State flows `Loading → Ready ⇄ Saving`, or `Loading → Error` when the
//! initial fetch fails. Edits are accepted in `Ready` and `Saving`; a save
//! never blocks them. Every accepted edit bumps the revision, and the
//! session is dirty while the newest revision is not yet persisted.

use crate::delta::Delta;
use crate::error::{DeltaError, LoadFailure, SessionError};
use crate::models::document::{Collaborator, Document, SaveDocumentRequest};
use chrono::{DateTime, Utc};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Ready,
    Saving,
    Error,
}

impl SessionState {
    pub fn accepts_edits(self) -> bool {
        matches!(self, SessionState::Ready | SessionState::Saving)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Saving => "saving",
            SessionState::Error => "error",
        }
    }
}

/// A local edit coming from the rendering surface or the title field.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Title(String),
    /// Replacement document content.
    Content(Delta),
    /// Change delta composed onto the current content.
    Change(Delta),
}

/// Owned copy of the session's title and content at one revision.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub title: String,
    pub content: Delta,
    pub revision: u64,
}

impl DocumentSnapshot {
    /// Store payload for this snapshot, with title/content defaults applied.
    pub fn save_request(&self) -> Result<SaveDocumentRequest, DeltaError> {
        SaveDocumentRequest::new(&self.title, &self.content)
    }
}

#[derive(Debug)]
pub struct DocumentSession {
    id: String,
    state: SessionState,
    title: String,
    content: Delta,
    created_at: Option<DateTime<Utc>>,
    collaborators: Vec<Collaborator>,
    revision: u64,
    persisted_revision: u64,
    load_failure: Option<LoadFailure>,
}

impl DocumentSession {
    /// A session for `id` waiting for its initial fetch.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Loading,
            title: String::new(),
            content: Delta::default_document(),
            created_at: None,
            collaborators: Vec::new(),
            revision: 0,
            persisted_revision: 0,
            load_failure: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &Delta {
        &self.content
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn collaborators(&self) -> &[Collaborator] {
        &self.collaborators
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision > self.persisted_revision
    }

    pub fn load_failure(&self) -> Option<&LoadFailure> {
        self.load_failure.as_ref()
    }

    /// `Loading → Ready` with the fetched (already normalized) document.
    pub fn loaded(&mut self, document: Document) {
        if self.state != SessionState::Loading {
            warn!(doc_id = %self.id, state = self.state.label(), "ignoring late document load");
            return;
        }
        self.title = document.title;
        self.content = document.content;
        self.created_at = document.created_at;
        self.collaborators = document.collaborators;
        self.state = SessionState::Ready;
    }

    /// `Loading → Error`. There is no automatic retry.
    pub fn load_failed(&mut self, failure: LoadFailure) {
        if self.state != SessionState::Loading {
            return;
        }
        self.load_failure = Some(failure);
        self.state = SessionState::Error;
    }

    /// Apply a local edit and return the snapshot the autosave should persist.
    ///
    /// # Errors
    /// [`SessionError::NotReady`] while loading or after a failed load;
    /// [`SessionError::Delta`] when a content edit is not applicable, in
    /// which case the content is left untouched.
    pub fn mutate(&mut self, edit: Edit) -> Result<DocumentSnapshot, SessionError> {
        if !self.state.accepts_edits() {
            return Err(SessionError::NotReady(self.state.label()));
        }
        match edit {
            Edit::Title(title) => self.title = title,
            Edit::Content(content) => {
                if !content.is_document() {
                    return Err(DeltaError::NotADocument.into());
                }
                self.content = content;
            }
            Edit::Change(change) => self.content = self.content.compose(&change)?,
        }
        self.revision += 1;
        Ok(self.current_snapshot())
    }

    fn current_snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            revision: self.revision,
        }
    }

    /// Snapshot for export; `None` until the document has loaded.
    pub fn snapshot(&self) -> Option<DocumentSnapshot> {
        self.state
            .accepts_edits()
            .then(|| self.current_snapshot())
    }

    /// `Ready → Saving` for an in-flight persist.
    pub fn begin_save(&mut self) {
        if self.state == SessionState::Ready {
            self.state = SessionState::Saving;
        }
    }

    /// `Saving → Ready`; on success the saved revision counts as persisted.
    pub fn finish_save(&mut self, revision: u64, succeeded: bool) {
        if self.state == SessionState::Saving {
            self.state = SessionState::Ready;
        }
        if succeeded {
            self.persisted_revision = self.persisted_revision.max(revision);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::Attributes;

    fn ready_session() -> DocumentSession {
        let mut session = DocumentSession::new("doc-1");
        session.loaded(Document {
            id: "doc-1".to_string(),
            title: "Draft".to_string(),
            content: Delta::from_plain_text("hello"),
            created_at: None,
            collaborators: Vec::new(),
        });
        session
    }

    #[test]
    fn edits_are_rejected_until_loaded() {
        let mut session = DocumentSession::new("doc-1");
        assert_eq!(session.state(), SessionState::Loading);
        assert!(matches!(
            session.mutate(Edit::Title("x".to_string())),
            Err(SessionError::NotReady("loading"))
        ));
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn failed_load_is_terminal() {
        let mut session = DocumentSession::new("doc-1");
        session.load_failed(LoadFailure::NotFound);
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.load_failure(), Some(&LoadFailure::NotFound));

        session.loaded(ready_session_document());
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.mutate(Edit::Title("x".to_string())).is_err());
    }

    fn ready_session_document() -> Document {
        Document {
            id: "doc-1".to_string(),
            title: "late".to_string(),
            content: Delta::default_document(),
            created_at: None,
            collaborators: Vec::new(),
        }
    }

    #[test]
    fn mutate_bumps_revision_and_marks_dirty() {
        let mut session = ready_session();
        assert!(!session.is_dirty());

        let snapshot = session
            .mutate(Edit::Title("Final".to_string()))
            .expect("title edit");
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.title, "Final");
        assert!(session.is_dirty());

        let mut change = Delta::new();
        change.retain(5, Attributes::new()).insert("!", Attributes::new());
        let snapshot = session.mutate(Edit::Change(change)).expect("change");
        assert_eq!(snapshot.revision, 2);
        assert_eq!(snapshot.content.plain_text(), "hello!\n");
    }

    #[test]
    fn invalid_change_leaves_content_untouched() {
        let mut session = ready_session();
        let mut change = Delta::new();
        change.retain(100, Attributes::new());
        assert!(matches!(
            session.mutate(Edit::Change(change)),
            Err(SessionError::Delta(DeltaError::OutOfRange { .. }))
        ));

        let mut not_document = Delta::new();
        not_document.delete(1);
        assert!(session.mutate(Edit::Content(not_document)).is_err());

        assert_eq!(session.content(), &Delta::from_plain_text("hello"));
        assert_eq!(session.revision(), 0);
    }

    #[test]
    fn save_cycle_tracks_persisted_revision() {
        let mut session = ready_session();
        let first = session.mutate(Edit::Title("a".to_string())).expect("edit");
        session.begin_save();
        assert_eq!(session.state(), SessionState::Saving);

        // Edits keep flowing while the save is in flight.
        session.mutate(Edit::Title("ab".to_string())).expect("edit while saving");
        session.finish_save(first.revision, true);
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.is_dirty());

        session.begin_save();
        session.finish_save(2, false);
        assert!(session.is_dirty());
        assert_eq!(session.title(), "ab");

        session.begin_save();
        session.finish_save(2, true);
        assert!(!session.is_dirty());
    }

    #[test]
    fn snapshot_save_request_applies_title_default() {
        let mut session = ready_session();
        let snapshot = session.mutate(Edit::Title("   ".to_string())).expect("edit");
        let request = snapshot.save_request().expect("request");
        assert_eq!(request.title, crate::constants::DEFAULT_DOCUMENT_TITLE);
        assert_eq!(session.title(), "   ");
    }
}
