//! Root crate facade for the inkdraft editor runtime and export pipeline.

pub use inkdraft_client::{
    connect_surface, editor, gateway, spawn_editor, surface, BufferSurface, DocumentSummary,
    EditorError, EditorHandle, EditorOptions, EditorSender, ExportPipeline, GatewayError,
    HttpGateway, PersistenceGateway, RenderingSurface, SessionStatus, ShutdownReport,
};
pub use inkdraft_core::{
    autosave, config, delta, error, export, models, notify, render, session, AutosaveScheduler,
    Config, Delta, DeltaError, Document, DocumentSession, DocumentSnapshot, Edit, ExportError,
    ExportFormat, LoadFailure, Notification, SessionError, SessionState, ToastQueue,
};
