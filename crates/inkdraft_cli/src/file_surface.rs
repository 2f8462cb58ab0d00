//! Plain-text file as a rendering surface.
//!
//! The file shows the document's plain text. Each poll diffs the file against
//! the last seen text and reports the difference as one change delta, so
//! formatting outside the edited span survives.

use anyhow::{Context, Result};
use inkdraft_client::surface::ChangeCallback;
use inkdraft_client::RenderingSurface;
use inkdraft_core::{Attributes, Delta};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Change turning `old` into `new` as retain / insert / delete around the
/// longest common prefix and suffix; `None` when the texts match.
pub fn text_change(old: &str, new: &str) -> Option<Delta> {
    if old == new {
        return None;
    }
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();
    let prefix = old_chars
        .iter()
        .zip(&new_chars)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
    let suffix = old_chars
        .iter()
        .rev()
        .zip(new_chars.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let deleted = old_chars.len() - prefix - suffix;
    let inserted: String = new_chars[prefix..new_chars.len() - suffix].iter().collect();
    let mut change = Delta::new();
    if prefix > 0 {
        change.retain(prefix, Attributes::new());
    }
    if !inserted.is_empty() {
        change.insert(inserted, Attributes::new());
    }
    if deleted > 0 {
        change.delete(deleted);
    }
    Some(change)
}

pub struct FileSurface {
    path: PathBuf,
    content: Delta,
    text: String,
    callbacks: Vec<ChangeCallback>,
}

impl FileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let content = Delta::default_document();
        Self {
            path: path.into(),
            text: content.plain_text(),
            content,
            callbacks: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and report any edit to listeners.
    ///
    /// A missing file is treated as unchanged. Returns whether a change was
    /// reported.
    pub fn poll(&mut self) -> Result<bool> {
        let mut text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }
        let Some(change) = text_change(&self.text, &text) else {
            return Ok(false);
        };
        self.content = self
            .content
            .compose(&change)
            .context("applying file edit to document")?;
        self.text = text;
        for callback in &mut self.callbacks {
            callback(&change);
        }
        Ok(true)
    }
}

impl RenderingSurface for FileSurface {
    fn content(&self) -> Delta {
        self.content.clone()
    }

    fn set_content(&mut self, content: Delta) {
        self.text = content.plain_text();
        self.content = content;
        if let Err(err) = std::fs::write(&self.path, &self.text) {
            warn!(path = %self.path.display(), error = %err, "could not write document to file");
        }
    }

    fn on_change(&mut self, callback: ChangeCallback) {
        self.callbacks.push(callback);
    }
}
