//! Export pipeline: turns a session snapshot into a file on disk.
//!
//! Exports work from an owned [`DocumentSnapshot`], so they never touch the
//! editor task and can run while a save is in flight. Each run reports
//! exactly one `Exported` or `ExportFailed` notification.

use crate::gateway::PersistenceGateway;
use crossbeam_channel::Sender;
use inkdraft_core::export::print::{snapshot_to_pdf, PrintOptions};
use inkdraft_core::export::{artifact_file_name, verify_docx, ExportFormat};
use inkdraft_core::render::{to_html, RenderedDocument};
use inkdraft_core::{DocumentSnapshot, ExportError, Notification};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ExportPipeline<G> {
    gateway: Arc<G>,
    notifier: Sender<Notification>,
    out_dir: PathBuf,
    print: PrintOptions,
}

impl<G: PersistenceGateway> ExportPipeline<G> {
    pub fn new(gateway: Arc<G>, notifier: Sender<Notification>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            notifier,
            out_dir: out_dir.into(),
            print: PrintOptions::default(),
        }
    }

    pub fn with_print_options(mut self, print: PrintOptions) -> Self {
        self.print = print;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Produce `<title>.<ext>` in the output directory.
    pub async fn export(
        &self,
        format: ExportFormat,
        snapshot: &DocumentSnapshot,
    ) -> Result<PathBuf, ExportError> {
        let result = self.produce(format, snapshot).await;
        let notification = match &result {
            Ok(path) => {
                info!(doc_id = %snapshot.id, format = %format, path = %path.display(), "export written");
                Notification::Exported {
                    format,
                    path: path.clone(),
                }
            }
            Err(err) => {
                warn!(doc_id = %snapshot.id, format = %format, error = %err, "export failed");
                Notification::ExportFailed {
                    format,
                    message: err.to_string(),
                }
            }
        };
        let _ = self.notifier.send(notification);
        result
    }

    async fn render(
        &self,
        format: ExportFormat,
        snapshot: &DocumentSnapshot,
    ) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Pdf => {
                let snapshot = snapshot.clone();
                let options = self.print.clone();
                tokio::task::spawn_blocking(move || snapshot_to_pdf(&snapshot, &options))
                    .await
                    .map_err(|err| ExportError::Layout(format!("render task failed: {}", err)))?
            }
            ExportFormat::Docx => {
                let bytes = self
                    .gateway
                    .download_docx(&snapshot.id)
                    .await
                    .map_err(|err| ExportError::Fetch(err.to_string()))?;
                verify_docx(&bytes)?;
                Ok(bytes)
            }
            ExportFormat::Html => {
                let rendered = RenderedDocument::from_delta(&snapshot.content);
                Ok(to_html(&rendered, &snapshot.title).into_bytes())
            }
        }
    }

    async fn produce(
        &self,
        format: ExportFormat,
        snapshot: &DocumentSnapshot,
    ) -> Result<PathBuf, ExportError> {
        let bytes = self.render(format, snapshot).await?;
        tokio::fs::create_dir_all(&self.out_dir).await?;
        let path = self
            .out_dir
            .join(artifact_file_name(&snapshot.title, format));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}
