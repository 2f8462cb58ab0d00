//! The editor task: one session, one scheduler, at most one in-flight save.

use super::protocol::{EditorCmd, SessionStatus, ShutdownReport};
use super::EditorError;
use crate::gateway::{GatewayError, PersistenceGateway};
use crossbeam_channel::Sender;
use inkdraft_core::{AutosaveScheduler, DocumentSession, Notification, SessionState};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type SaveOutcome = (u64, Result<(), GatewayError>);
type SaveFuture = Pin<Box<dyn Future<Output = SaveOutcome> + Send>>;

pub(super) struct EditorWorker<G> {
    pub(super) gateway: Arc<G>,
    pub(super) session: DocumentSession,
    pub(super) scheduler: AutosaveScheduler,
    pub(super) evt_tx: Sender<Notification>,
    pub(super) status_tx: watch::Sender<SessionStatus>,
    pub(super) shutdown_timeout: Duration,
    pub(super) in_flight: Option<SaveFuture>,
}

async fn wait_in_flight(slot: &mut Option<SaveFuture>) -> SaveOutcome {
    match slot.as_mut() {
        Some(save) => save.await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

impl<G: PersistenceGateway> EditorWorker<G> {
    pub(super) async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<EditorCmd>) {
        self.load().await;
        loop {
            self.dispatch_due();
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(EditorCmd::Shutdown { reply }) => {
                        let report = self.shutdown().await;
                        let _ = reply.send(report);
                        return;
                    }
                    Some(cmd) => self.handle(cmd),
                    None => {
                        debug!(doc_id = %self.session.id(), "all editor handles dropped");
                        self.shutdown().await;
                        return;
                    }
                },
                (revision, result) = wait_in_flight(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.save_finished(revision, result);
                }
                _ = sleep_until_deadline(self.scheduler.next_deadline()) => {}
            }
        }
    }

    async fn load(&mut self) {
        let doc_id = self.session.id().to_string();
        match self.gateway.fetch(&doc_id).await {
            Ok(document) => {
                info!(doc_id = %doc_id, title = %document.title, "document loaded");
                self.session.loaded(document);
            }
            Err(err) => {
                let failure = err.to_load_failure();
                warn!(doc_id = %doc_id, error = %err, "document load failed");
                self.session.load_failed(failure.clone());
                let _ = self.evt_tx.send(Notification::LoadFailed { doc_id, failure });
            }
        }
        self.publish_status();
    }

    fn publish_status(&self) {
        let status = SessionStatus {
            state: self.session.state(),
            title: self.session.title().to_string(),
            revision: self.session.revision(),
            dirty: self.session.is_dirty(),
        };
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    fn handle(&mut self, cmd: EditorCmd) {
        match cmd {
            EditorCmd::Mutate { edit, reply } => {
                let result = match self.session.mutate(edit) {
                    Ok(snapshot) => {
                        let revision = snapshot.revision;
                        self.scheduler.notify(now(), snapshot);
                        Ok(revision)
                    }
                    Err(err) => {
                        warn!(doc_id = %self.session.id(), error = %err, "edit rejected");
                        Err(EditorError::Session(err))
                    }
                };
                self.publish_status();
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            EditorCmd::FlushNow => {
                if !self.scheduler.flush_now() {
                    debug!(doc_id = %self.session.id(), "flush requested with nothing pending");
                }
            }
            EditorCmd::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            EditorCmd::Shutdown { .. } => {}
        }
    }

    /// Start the due save, if any and if nothing is in flight.
    fn dispatch_due(&mut self) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(snapshot) = self.scheduler.poll(now()) else {
            return;
        };
        let request = match snapshot.save_request() {
            Ok(request) => request,
            Err(err) => {
                self.save_finished(snapshot.revision, Err(GatewayError::Delta(err)));
                return;
            }
        };
        debug!(doc_id = %snapshot.id, revision = snapshot.revision, "saving document");
        self.session.begin_save();
        self.publish_status();
        let gateway = Arc::clone(&self.gateway);
        self.in_flight = Some(Box::pin(async move {
            let result = gateway.update(&snapshot.id, &request).await;
            (snapshot.revision, result)
        }));
    }

    fn save_finished(&mut self, revision: u64, result: Result<(), GatewayError>) {
        self.scheduler.complete(revision);
        let doc_id = self.session.id().to_string();
        let notification = match result {
            Ok(()) => {
                self.session.finish_save(revision, true);
                info!(doc_id = %doc_id, revision, "document saved");
                Notification::Saved { doc_id, revision }
            }
            Err(err) => {
                self.session.finish_save(revision, false);
                warn!(doc_id = %doc_id, revision, error = %err, "document save failed");
                Notification::SaveFailed {
                    doc_id,
                    revision,
                    message: err.to_string(),
                }
            }
        };
        let _ = self.evt_tx.send(notification);
        self.publish_status();
    }

    /// Flush the pending snapshot and wait for saves to settle, bounded by
    /// the shutdown timeout.
    async fn shutdown(&mut self) -> ShutdownReport {
        let deadline = Instant::now() + self.shutdown_timeout;
        self.scheduler.flush_now();
        loop {
            self.dispatch_due();
            if self.in_flight.is_none() {
                break;
            }
            match tokio::time::timeout_at(deadline, wait_in_flight(&mut self.in_flight)).await {
                Ok((revision, result)) => {
                    self.in_flight = None;
                    self.save_finished(revision, result);
                    self.scheduler.flush_now();
                }
                Err(_) => break,
            }
        }

        let settled = self.in_flight.is_none() && !self.scheduler.has_pending();
        let report = ShutdownReport {
            settled,
            dirty: self.session.is_dirty(),
            revision: self.session.revision(),
        };
        if !report.settled || (report.dirty && self.session.state() != SessionState::Error) {
            warn!(
                doc_id = %self.session.id(),
                save_in_flight = self.in_flight.is_some(),
                pending = self.scheduler.has_pending(),
                dirty = report.dirty,
                timeout_ms = self.shutdown_timeout.as_millis(),
                "Shutdown flush exited with pending unsaved state."
            );
        } else {
            debug!(doc_id = %self.session.id(), revision = report.revision, "editor stopped");
        }
        report
    }
}
