//! Greedy line breaking and pagination of a rendered document.

use super::metrics::Font;
use super::raster::{decode_image, RasterImage};
use super::PrintOptions;
use crate::error::ExportError;
use crate::render::{Align, Block, BlockKind, RenderedDocument, Rgb, Run, RunStyle};
use std::sync::Arc;

const LINE_HEIGHT: f32 = 1.35;
const LIST_INDENT: f32 = 18.0;
const QUOTE_INDENT: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 10.0;
const PLACEHOLDER_GRAY: Rgb = Rgb {
    r: 0x80,
    g: 0x80,
    b: 0x80,
};

/// One thing drawn on a page, in PDF user space (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub enum PlacedItem {
    Text {
        x: f32,
        y: f32,
        text: String,
        font: Font,
        size: f32,
        color: Rgb,
    },
    /// Horizontal rule for underline and strike-through.
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
        color: Rgb,
    },
    /// Image with its lower-left corner at (`x`, `y`).
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: Arc<RasterImage>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<PlacedItem>,
}

impl Page {
    /// All text on the page in placement order, space separated.
    pub fn text(&self) -> String {
        self.items
            .iter()
            .filter_map(|item| match item {
                PlacedItem::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    text: String,
    font: Font,
    color: Rgb,
    underline: bool,
    strike: bool,
    width: f32,
}

impl Fragment {
    fn same_style(&self, other: &Fragment) -> bool {
        self.font == other.font
            && self.color == other.color
            && self.underline == other.underline
            && self.strike == other.strike
    }
}

/// An image scaled to fit the text column.
#[derive(Debug)]
struct ImageBox {
    image: Arc<RasterImage>,
    width: f32,
    height: f32,
}

impl ImageBox {
    fn fit(image: RasterImage, max_width: f32, max_height: f32) -> Self {
        let (width, height) = image.natural_size();
        let scale = (max_width / width).min(max_height / height).min(1.0);
        Self {
            image: Arc::new(image),
            width: width * scale,
            height: height * scale,
        }
    }
}

#[derive(Debug, Default)]
struct Line {
    fragments: Vec<Fragment>,
    width: f32,
    image: Option<ImageBox>,
}

impl Line {
    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn push(&mut self, fragment: Fragment) {
        self.width += fragment.width;
        if let Some(last) = self.fragments.last_mut() {
            if last.same_style(&fragment) {
                last.text.push_str(&fragment.text);
                last.width += fragment.width;
                return;
            }
        }
        self.fragments.push(fragment);
    }

    fn trim_end(&mut self, size: f32) {
        while let Some(last) = self.fragments.last_mut() {
            let trimmed = last.text.trim_end().len();
            if trimmed == last.text.len() {
                break;
            }
            last.text.truncate(trimmed);
            let width = last.font.text_width(&last.text, size);
            self.width -= last.width - width;
            last.width = width;
            if last.text.is_empty() {
                self.fragments.pop();
            }
        }
    }
}

/// Block-level typography.
struct BlockStyle {
    size: f32,
    bold: bool,
    monospace: bool,
    preserve_space: bool,
    left: f32,
    space_after: f32,
}

fn block_style(block: &Block) -> BlockStyle {
    let nesting = f32::from(block.indent) * LIST_INDENT;
    let (size, bold) = match block.kind {
        BlockKind::Heading(1) => (24.0, true),
        BlockKind::Heading(2) => (18.0, true),
        BlockKind::Heading(3) => (14.0, true),
        BlockKind::Heading(_) => (12.0, true),
        BlockKind::CodeBlock => (CODE_SIZE, false),
        _ => (BODY_SIZE, false),
    };
    let left = match block.kind {
        BlockKind::ListItem { .. } => nesting + LIST_INDENT,
        BlockKind::Blockquote => nesting + QUOTE_INDENT,
        _ => nesting,
    };
    let code = block.kind == BlockKind::CodeBlock;
    BlockStyle {
        size,
        bold,
        monospace: code,
        preserve_space: code,
        left,
        space_after: match block.kind {
            BlockKind::ListItem { .. } | BlockKind::CodeBlock => size * 0.2,
            _ => size * 0.5,
        },
    }
}

/// Split a run into alternating whitespace / word tokens.
fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut previous: Option<bool> = None;
    for (index, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        if previous.is_some_and(|was_space| was_space != space) {
            out.push(&text[start..index]);
            start = index;
        }
        previous = Some(space);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

fn fragment(text: &str, font: Font, size: f32, color: Rgb, style: &RunStyle) -> Fragment {
    Fragment {
        text: text.to_string(),
        font,
        color,
        underline: style.underline || style.link.is_some(),
        strike: style.strike,
        width: font.text_width(text, size),
    }
}

/// Image embeds that decode get a line of their own; the rest fall back
/// to a grey `[image]` placeholder.
fn break_lines(
    block: &Block,
    style: &BlockStyle,
    available: f32,
    max_height: f32,
    image_quality: f32,
) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::default();
    for run in &block.runs {
        let (text, run_style, color) = match run {
            Run::Text { text, style: run_style } => (
                text.as_str(),
                run_style.clone(),
                run_style.color.unwrap_or(Rgb::BLACK),
            ),
            Run::Image { source } => {
                if let Some(image) = decode_image(source, image_quality) {
                    if !current.is_empty() {
                        if !style.preserve_space {
                            current.trim_end(style.size);
                        }
                        lines.push(std::mem::take(&mut current));
                    }
                    let image = ImageBox::fit(image, available, max_height);
                    lines.push(Line {
                        width: image.width,
                        image: Some(image),
                        ..Line::default()
                    });
                    continue;
                }
                (
                    "[image]",
                    RunStyle {
                        italic: true,
                        ..RunStyle::default()
                    },
                    PLACEHOLDER_GRAY,
                )
            }
        };
        let font = Font::select(
            style.bold || run_style.bold,
            run_style.italic,
            style.monospace || run_style.code,
        );
        for token in tokens(text) {
            let is_space = token.starts_with(char::is_whitespace);
            if is_space && current.is_empty() && !style.preserve_space {
                continue;
            }
            let piece = fragment(token, font, style.size, color, &run_style);
            if current.width + piece.width <= available {
                current.push(piece);
                continue;
            }
            if is_space && !style.preserve_space {
                lines.push(std::mem::take(&mut current));
                continue;
            }
            if !current.is_empty() {
                if !style.preserve_space {
                    current.trim_end(style.size);
                }
                lines.push(std::mem::take(&mut current));
            }
            if piece.width <= available {
                current.push(piece);
                continue;
            }
            // Longer than a whole line: break between characters.
            let mut buffer = [0u8; 4];
            for ch in token.chars() {
                let glyph = fragment(ch.encode_utf8(&mut buffer), font, style.size, color, &run_style);
                if !current.is_empty() && current.width + glyph.width > available {
                    lines.push(std::mem::take(&mut current));
                }
                current.push(glyph);
            }
        }
    }
    if !current.is_empty() {
        if !style.preserve_space {
            current.trim_end(style.size);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(Line::default());
    }
    lines
}

struct Paginator {
    page_height: f32,
    top: f32,
    bottom: f32,
    pages: Vec<Page>,
    current: Page,
    cursor: f32,
}

impl Paginator {
    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = self.page_height - self.top;
    }

    fn at_page_top(&self) -> bool {
        self.cursor >= self.page_height - self.top
    }

    /// Reserve `height` points and return the top edge of the reserved band.
    ///
    /// Breaks to a new page once the band would cross the bottom margin,
    /// whether or not anything visible was drawn above it.
    fn reserve(&mut self, height: f32) -> f32 {
        if self.cursor - height < self.bottom && !self.at_page_top() {
            self.new_page();
        }
        let top = self.cursor;
        self.cursor -= height;
        top
    }

    /// Vertical space after a block. May run past the bottom margin; the
    /// next `reserve` then starts a new page.
    fn gap(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.current);
        self.pages
    }
}

fn align_offset(align: Align, available: f32, width: f32) -> f32 {
    match align {
        Align::Center => (available - width) / 2.0,
        Align::Right => available - width,
        Align::Left | Align::Justify => 0.0,
    }
}

fn list_marker(kind: BlockKind) -> Option<String> {
    match kind {
        BlockKind::ListItem {
            ordered: true,
            number,
        } => Some(format!("{}.", number)),
        BlockKind::ListItem { ordered: false, .. } => Some("•".to_string()),
        _ => None,
    }
}

/// Lay out `document` into pages for the given options.
///
/// Always returns at least one page.
pub fn paginate(document: &RenderedDocument, options: &PrintOptions) -> Result<Vec<Page>, ExportError> {
    let (page_width, page_height) = options.page_dimensions();
    let margins = options.margins;
    let content_width = page_width - margins.left - margins.right;
    let content_height = page_height - margins.top - margins.bottom;
    let mut paginator = Paginator {
        page_height,
        top: margins.top,
        bottom: margins.bottom,
        pages: Vec::new(),
        current: Page::default(),
        cursor: page_height - margins.top,
    };

    for block in &document.blocks {
        if block.kind == BlockKind::PageBreak {
            paginator.new_page();
            continue;
        }
        let style = block_style(block);
        let line_height = style.size * LINE_HEIGHT;
        if line_height > content_height {
            return Err(ExportError::Layout(format!(
                "a {}pt line does not fit in {:.1}pt of page height",
                style.size, content_height
            )));
        }
        let left = margins.left + style.left;
        let available = content_width - style.left;
        if available < style.size {
            return Err(ExportError::Layout(format!(
                "indent leaves {:.1}pt for text",
                available
            )));
        }
        let mut marker = list_marker(block.kind);
        let lines = break_lines(
            block,
            &style,
            available,
            content_height,
            options.image_quality,
        );

        for line in lines {
            let height = line.image.as_ref().map_or(line_height, |image| image.height);
            let top = paginator.reserve(height);
            let baseline = top - style.size;
            if let Some(marker) = marker.take() {
                let font = Font::select(false, false, false);
                let width = font.text_width(&marker, style.size);
                paginator.current.items.push(PlacedItem::Text {
                    x: left - width - 6.0,
                    y: baseline,
                    text: marker,
                    font,
                    size: style.size,
                    color: Rgb::BLACK,
                });
            }
            let mut x = left + align_offset(block.align, available, line.width);
            if let Some(image) = line.image {
                paginator.current.items.push(PlacedItem::Image {
                    x,
                    y: top - image.height,
                    width: image.width,
                    height: image.height,
                    image: image.image,
                });
                continue;
            }
            for fragment in line.fragments {
                if fragment.underline {
                    paginator.current.items.push(PlacedItem::Rule {
                        x1: x,
                        x2: x + fragment.width,
                        y: baseline - style.size * 0.12,
                        thickness: style.size * 0.05,
                        color: fragment.color,
                    });
                }
                if fragment.strike {
                    paginator.current.items.push(PlacedItem::Rule {
                        x1: x,
                        x2: x + fragment.width,
                        y: baseline + style.size * 0.28,
                        thickness: style.size * 0.05,
                        color: fragment.color,
                    });
                }
                let advance = fragment.width;
                paginator.current.items.push(PlacedItem::Text {
                    x,
                    y: baseline,
                    text: fragment.text,
                    font: fragment.font,
                    size: style.size,
                    color: fragment.color,
                });
                x += advance;
            }
        }
        paginator.gap(style.space_after);
    }
    Ok(paginator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_alternate_words_and_spaces() {
        assert_eq!(tokens("hi  there x"), vec!["hi", "  ", "there", " ", "x"]);
        assert_eq!(tokens("   "), vec!["   "]);
        assert!(tokens("").is_empty());
    }
}
