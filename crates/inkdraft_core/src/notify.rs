//! Typed outcomes for the notification surface and a short-lived toast queue.
//!
//! Every save and export produces exactly one [`Notification`]. Front-ends
//! decide how to present them; [`ToastQueue`] is the transient variant used
//! by interactive surfaces.

use crate::constants::{TOAST_LIMIT, TOAST_TTL};
use crate::export::ExportFormat;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub use crate::error::LoadFailure;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    LoadFailed {
        doc_id: String,
        failure: LoadFailure,
    },
    Saved {
        doc_id: String,
        revision: u64,
    },
    SaveFailed {
        doc_id: String,
        revision: u64,
        message: String,
    },
    Exported {
        format: ExportFormat,
        path: PathBuf,
    },
    ExportFailed {
        format: ExportFormat,
        message: String,
    },
}

impl Notification {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notification::LoadFailed { .. }
                | Notification::SaveFailed { .. }
                | Notification::ExportFailed { .. }
        )
    }

    /// User-facing one-line message.
    pub fn text(&self) -> String {
        match self {
            Notification::LoadFailed { failure, .. } => {
                format!("Failed to load document: {}", failure)
            }
            Notification::Saved { .. } => "Document saved successfully".to_string(),
            Notification::SaveFailed { message, .. } => {
                format!("Failed to save document: {}", message)
            }
            Notification::Exported { format, path } => {
                format!("Exported {} to {}", format.label(), path.display())
            }
            Notification::ExportFailed { format, message } => {
                format!("{} export failed: {}", format.label(), message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    pub is_error: bool,
    pub expires_at: Instant,
}

/// Bounded queue of transient messages; repeating the newest message
/// extends it instead of stacking a duplicate.
#[derive(Debug)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    ttl: Duration,
    limit: usize,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(TOAST_TTL, TOAST_LIMIT)
    }
}

impl ToastQueue {
    pub fn new(ttl: Duration, limit: usize) -> Self {
        Self {
            toasts: VecDeque::new(),
            ttl,
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, now: Instant, notification: &Notification) {
        let text = notification.text();
        if let Some(last) = self.toasts.back_mut() {
            if last.text == text {
                last.expires_at = now + self.ttl;
                return;
            }
        }
        self.toasts.push_back(Toast {
            text,
            is_error: notification.is_error(),
            expires_at: now + self.ttl,
        });
        while self.toasts.len() > self.limit {
            self.toasts.pop_front();
        }
    }

    /// Drop toasts whose time is up.
    pub fn expire(&mut self, now: Instant) {
        self.toasts.retain(|toast| toast.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
