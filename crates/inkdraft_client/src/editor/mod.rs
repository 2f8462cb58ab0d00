//! Editor task wiring.
//!
//! Each open document gets one tokio task that owns its
//! [`DocumentSession`](inkdraft_core::DocumentSession) and
//! [`AutosaveScheduler`](inkdraft_core::AutosaveScheduler). Front-ends talk to
//! it through an [`EditorHandle`]: commands go in over an unbounded channel,
//! [`Notification`]s come back on `evt_rx`, and the latest [`SessionStatus`]
//! is observable without a round trip.

mod protocol;
mod worker;

pub use protocol::{EditorCmd, SessionStatus, ShutdownReport};

use crate::gateway::PersistenceGateway;
use crate::surface::{connect_surface, RenderingSurface};
use crossbeam_channel::{unbounded, Receiver, Sender};
use inkdraft_core::constants::{DEFAULT_AUTO_SAVE_INTERVAL_MS, SHUTDOWN_SAVE_FLUSH_TIMEOUT};
use inkdraft_core::{
    AutosaveScheduler, Config, Delta, DocumentSession, DocumentSnapshot, Edit, Notification,
    SessionError, SessionState,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use worker::EditorWorker;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("editor task is no longer running")]
    Closed,

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorOptions {
    /// Quiet period before an autosave fires.
    pub quiet_period: Duration,
    /// Upper bound on the shutdown flush.
    pub shutdown_timeout: Duration,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(DEFAULT_AUTO_SAVE_INTERVAL_MS),
            shutdown_timeout: SHUTDOWN_SAVE_FLUSH_TIMEOUT,
        }
    }
}

impl EditorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            quiet_period: config.auto_save_delay(),
            ..Self::default()
        }
    }
}

/// Cloneable command sender, handed to rendering surfaces.
#[derive(Debug, Clone)]
pub struct EditorSender {
    cmd_tx: mpsc::UnboundedSender<EditorCmd>,
}

impl EditorSender {
    /// Queue an edit without waiting for it to apply.
    pub fn mutate(&self, edit: Edit) -> Result<(), EditorError> {
        self.send(EditorCmd::Mutate { edit, reply: None })
    }

    pub fn flush_now(&self) -> Result<(), EditorError> {
        self.send(EditorCmd::FlushNow)
    }

    fn send(&self, cmd: EditorCmd) -> Result<(), EditorError> {
        self.cmd_tx.send(cmd).map_err(|_| EditorError::Closed)
    }
}

/// Handle for one running editor task.
pub struct EditorHandle {
    sender: EditorSender,
    status_rx: watch::Receiver<SessionStatus>,
    evt_tx: Sender<Notification>,
    pub evt_rx: Receiver<Notification>,
    task: JoinHandle<()>,
}

/// Spawn the editor task for `doc_id` on the current tokio runtime.
///
/// The task fetches the document first; edits sent before the load finishes
/// queue up and apply once it has.
///
/// # Panics
/// Panics when called outside a tokio runtime.
pub fn spawn_editor<G: PersistenceGateway>(
    gateway: Arc<G>,
    doc_id: impl Into<String>,
    options: EditorOptions,
) -> EditorHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (evt_tx, evt_rx) = unbounded();
    let (status_tx, status_rx) = watch::channel(SessionStatus::loading());

    let worker = EditorWorker {
        gateway,
        session: DocumentSession::new(doc_id),
        scheduler: AutosaveScheduler::new(options.quiet_period),
        evt_tx: evt_tx.clone(),
        status_tx,
        shutdown_timeout: options.shutdown_timeout,
        in_flight: None,
    };
    let task = tokio::spawn(worker.run(cmd_rx));

    EditorHandle {
        sender: EditorSender { cmd_tx },
        status_rx,
        evt_tx,
        evt_rx,
        task,
    }
}

impl EditorHandle {
    pub fn sender(&self) -> EditorSender {
        self.sender.clone()
    }

    /// Sender onto this editor's notification stream, for the export pipeline.
    pub fn notifier(&self) -> Sender<Notification> {
        self.evt_tx.clone()
    }

    pub fn mutate(&self, edit: Edit) -> Result<(), EditorError> {
        self.sender.mutate(edit)
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<(), EditorError> {
        self.mutate(Edit::Title(title.into()))
    }

    /// Apply an edit and wait for the resulting revision.
    pub async fn apply(&self, edit: Edit) -> Result<u64, EditorError> {
        let (reply, rx) = oneshot::channel();
        self.sender.send(EditorCmd::Mutate {
            edit,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| EditorError::Closed)?
    }

    pub fn flush_now(&self) -> Result<(), EditorError> {
        self.sender.flush_now()
    }

    /// Title and content as of now; `None` before the document has loaded.
    pub async fn snapshot(&self) -> Result<Option<DocumentSnapshot>, EditorError> {
        let (reply, rx) = oneshot::channel();
        self.sender.send(EditorCmd::Snapshot { reply })?;
        rx.await.map_err(|_| EditorError::Closed)
    }

    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.status_rx.borrow().state
    }

    /// Wait for the initial fetch to finish; returns `Ready` or `Error`.
    pub async fn wait_loaded(&self) -> Result<SessionState, EditorError> {
        let mut status_rx = self.status_rx.clone();
        let status = status_rx
            .wait_for(|status| status.state != SessionState::Loading)
            .await
            .map_err(|_| EditorError::Closed)?;
        Ok(status.state)
    }

    /// Load the current content into `surface` and forward its changes here.
    pub async fn attach_surface<S>(&self, surface: &mut S) -> Result<(), EditorError>
    where
        S: RenderingSurface + ?Sized,
    {
        if self.wait_loaded().await? == SessionState::Error {
            return Err(EditorError::Session(SessionError::NotReady("error")));
        }
        let content = self
            .snapshot()
            .await?
            .map(|snapshot| snapshot.content)
            .unwrap_or_else(Delta::default_document);
        surface.set_content(content);
        connect_surface(surface, self.sender());
        Ok(())
    }

    /// Flush pending saves and stop the task.
    pub async fn shutdown(self) -> Result<ShutdownReport, EditorError> {
        let (reply, rx) = oneshot::channel();
        self.sender.send(EditorCmd::Shutdown { reply })?;
        let report = rx.await.map_err(|_| EditorError::Closed)?;
        let _ = self.task.await;
        Ok(report)
    }
}
