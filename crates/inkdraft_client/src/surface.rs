//! Rendering surface seam.
//!
//! A surface owns the live document model shown to the user. The editor
//! learns about changes only through `on_change`; loading content into the
//! surface with `set_content` does not echo back as an edit.

use crate::editor::EditorSender;
use inkdraft_core::{Delta, DeltaError, Edit};
use tracing::debug;

/// Called with each change delta the user makes.
pub type ChangeCallback = Box<dyn FnMut(&Delta) + Send>;

pub trait RenderingSurface: Send {
    /// Full current content.
    fn content(&self) -> Delta;

    /// Replace the content without firing change callbacks.
    fn set_content(&mut self, content: Delta);

    fn on_change(&mut self, callback: ChangeCallback);
}

/// In-memory surface; `apply` stands in for user input.
pub struct BufferSurface {
    content: Delta,
    callbacks: Vec<ChangeCallback>,
}

impl BufferSurface {
    pub fn new() -> Self {
        Self {
            content: Delta::default_document(),
            callbacks: Vec::new(),
        }
    }

    /// Compose a user change onto the content and notify listeners.
    ///
    /// # Errors
    /// Returns [`DeltaError`] when the change does not fit the content; the
    /// content is unchanged and no callback fires.
    pub fn apply(&mut self, change: &Delta) -> Result<(), DeltaError> {
        self.content = self.content.compose(change)?;
        for callback in &mut self.callbacks {
            callback(change);
        }
        Ok(())
    }
}

impl Default for BufferSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingSurface for BufferSurface {
    fn content(&self) -> Delta {
        self.content.clone()
    }

    fn set_content(&mut self, content: Delta) {
        self.content = content;
    }

    fn on_change(&mut self, callback: ChangeCallback) {
        self.callbacks.push(callback);
    }
}

/// Forward every change on `surface` to the editor as [`Edit::Change`].
pub fn connect_surface<S>(surface: &mut S, editor: EditorSender)
where
    S: RenderingSurface + ?Sized,
{
    surface.on_change(Box::new(move |change| {
        if editor.mutate(Edit::Change(change.clone())).is_err() {
            debug!("editor closed; dropping surface change");
        }
    }));
}
