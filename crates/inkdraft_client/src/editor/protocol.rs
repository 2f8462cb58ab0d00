//! Command and status types exchanged with the editor task.

use super::EditorError;
use inkdraft_core::{DocumentSnapshot, Edit, SessionState};
use tokio::sync::oneshot;

/// Commands sent by front-ends to the editor task.
#[derive(Debug)]
pub enum EditorCmd {
    /// Apply a local edit; `reply` (if any) receives the new revision.
    Mutate {
        edit: Edit,
        reply: Option<oneshot::Sender<Result<u64, EditorError>>>,
    },
    /// Save the pending snapshot without waiting out the quiet period.
    FlushNow,
    /// Current title/content for export.
    Snapshot {
        reply: oneshot::Sender<Option<DocumentSnapshot>>,
    },
    /// Flush pending saves and stop the task.
    Shutdown {
        reply: oneshot::Sender<ShutdownReport>,
    },
}

/// Observable session state published after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub title: String,
    pub revision: u64,
    pub dirty: bool,
}

impl SessionStatus {
    pub(super) fn loading() -> Self {
        Self {
            state: SessionState::Loading,
            title: String::new(),
            revision: 0,
            dirty: false,
        }
    }
}

/// Outcome of the shutdown flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// No save pending and none in flight when the task stopped.
    pub settled: bool,
    /// Local edits that never reached the store.
    pub dirty: bool,
    pub revision: u64,
}
