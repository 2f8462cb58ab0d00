//! Print-format converter: paginates a rendered document and writes a PDF.
//!
//! Layout is approximate. Headings get a size per level, lists get markers,
//! code uses the monospace family, and explicit page breaks always start a
//! new page. Text uses the PDF standard fonts. Images given as `data:` URLs
//! are re-encoded as JPEG at [`PrintOptions::image_quality`] and scaled to
//! fit the text column.

mod layout;
mod metrics;
mod pdf;
mod raster;

pub use layout::{paginate, Page, PlacedItem};
pub use metrics::Font;
pub use raster::{decode_image, RasterImage};

use crate::error::ExportError;
use crate::render::RenderedDocument;
use crate::session::DocumentSnapshot;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Portrait width and height in points.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

impl FromStr for PageSize {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            other => Err(ExportError::InvalidOptions(format!(
                "unknown page size '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(36.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margins: Margins,
    /// JPEG quality factor in (0, 1] for embedded images.
    pub image_quality: f32,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            image_quality: 0.95,
        }
    }
}

impl PrintOptions {
    /// Page width and height in points after orientation.
    pub fn page_dimensions(&self) -> (f32, f32) {
        let (width, height) = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => (width, height),
            Orientation::Landscape => (height, width),
        }
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if !(self.image_quality > 0.0 && self.image_quality <= 1.0) {
            return Err(ExportError::InvalidOptions(format!(
                "image quality must be in (0, 1], got {}",
                self.image_quality
            )));
        }
        let Margins {
            top,
            right,
            bottom,
            left,
        } = self.margins;
        if [top, right, bottom, left]
            .iter()
            .any(|value| !value.is_finite() || *value < 0.0)
        {
            return Err(ExportError::InvalidOptions(
                "margins must be non-negative".to_string(),
            ));
        }
        let (width, height) = self.page_dimensions();
        if width - left - right < 72.0 || height - top - bottom < 72.0 {
            return Err(ExportError::InvalidOptions(
                "margins leave less than one inch of printable area".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lay out and serialize `document` as a PDF.
///
/// # Errors
/// [`ExportError::InvalidOptions`] for bad options, [`ExportError::Layout`]
/// when content cannot be placed on the page.
pub fn export_pdf(
    document: &RenderedDocument,
    title: &str,
    options: &PrintOptions,
) -> Result<Vec<u8>, ExportError> {
    options.validate()?;
    let pages = paginate(document, options)?;
    Ok(pdf::write_pdf(&pages, title, options))
}

/// Render a session snapshot straight to PDF bytes.
pub fn snapshot_to_pdf(
    snapshot: &DocumentSnapshot,
    options: &PrintOptions,
) -> Result<Vec<u8>, ExportError> {
    let rendered = RenderedDocument::from_delta(&snapshot.content);
    export_pdf(&rendered, &snapshot.title, options)
}

#[cfg(test)]
mod tests;
