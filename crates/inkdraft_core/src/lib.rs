//! Core domain library for inkdraft (delta model, session, autosave, export).

/// Autosave scheduling (trailing-edge debounce with a single in-flight save).
pub mod autosave;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Rich-text delta model.
pub mod delta;
/// Process-global environment helpers used by config tests.
pub mod env;
/// Domain error types.
pub mod error;
/// Export converters (print format) and artifact naming.
pub mod export;
/// Document and collaborator models plus wire envelopes.
pub mod models;
/// Typed outcomes for the notification surface.
pub mod notify;
/// Rendered block/run tree and HTML markup.
pub mod render;
/// Per-visit document session state machine.
pub mod session;

pub use autosave::AutosaveScheduler;
pub use config::Config;
pub use constants::*;
pub use delta::{Attributes, Delta, Insert, Op};
pub use error::{DeltaError, ExportError, SessionError};
pub use models::document::{Collaborator, Document, InvitationStatus, Permission};
pub use export::ExportFormat;
pub use notify::{LoadFailure, Notification, ToastQueue};
pub use session::{DocumentSession, DocumentSnapshot, Edit, SessionState};
