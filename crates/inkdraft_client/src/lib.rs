//! Runtime side of inkdraft: the document store gateway, the editor actor
//! that drives autosave, rendering-surface wiring and the export pipeline.

pub mod editor;
pub mod export;
pub mod gateway;
pub mod surface;

pub use editor::{
    spawn_editor, EditorError, EditorHandle, EditorOptions, EditorSender, SessionStatus,
    ShutdownReport,
};
pub use export::ExportPipeline;
pub use gateway::{DocumentSummary, GatewayError, HttpGateway, PersistenceGateway};
pub use surface::{connect_surface, BufferSurface, RenderingSurface};
