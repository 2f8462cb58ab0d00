//! Rendered snapshot of a document: blocks of styled runs.
//!
//! Block formatting (heading, list, alignment, code) lives on the newline
//! that ends each line; inline formatting lives on the text runs. Both
//! export converters work from this tree rather than the raw delta.

mod html;

pub use html::to_html;

use crate::delta::{Attributes, Delta, Insert, Op};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Parse `#rgb`, `#rrggbb` or `rgb(r, g, b)`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            let expanded: String = match hex.len() {
                3 => hex.chars().flat_map(|ch| [ch, ch]).collect(),
                6 => hex.to_string(),
                _ => return None,
            };
            let channel = |index: usize| u8::from_str_radix(expanded.get(index..index + 2)?, 16).ok();
            return Some(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
            });
        }
        let inner = value.strip_prefix("rgb(")?.strip_suffix(')')?;
        let mut parts = inner.split(',').map(|part| part.trim().parse::<u8>().ok());
        let rgb = Self {
            r: parts.next()??,
            g: parts.next()??,
            b: parts.next()??,
        };
        parts.next().is_none().then_some(rgb)
    }

    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Inline formatting of a text run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
    pub color: Option<Rgb>,
    pub background: Option<Rgb>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Run {
    Text { text: String, style: RunStyle },
    Image { source: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    /// Heading level 1..=6.
    Heading(u8),
    /// `number` is the position within a run of ordered items (0 for bullets).
    ListItem { ordered: bool, number: u32 },
    CodeBlock,
    Blockquote,
    PageBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub align: Align,
    pub indent: u8,
    pub runs: Vec<Run>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Concatenated text of the block's runs.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .filter_map(|run| match run {
                Run::Text { text, .. } => Some(text.as_str()),
                Run::Image { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    pub blocks: Vec<Block>,
}

fn truthy(attributes: &Attributes, key: &str) -> bool {
    match attributes.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(value)) => !value.is_empty(),
        Some(_) => true,
    }
}

fn string_attr<'a>(attributes: &'a Attributes, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(Value::as_str)
}

fn run_style(attributes: &Attributes) -> RunStyle {
    RunStyle {
        bold: truthy(attributes, "bold"),
        italic: truthy(attributes, "italic"),
        underline: truthy(attributes, "underline"),
        strike: truthy(attributes, "strike"),
        code: truthy(attributes, "code"),
        color: string_attr(attributes, "color").and_then(Rgb::parse),
        background: string_attr(attributes, "background").and_then(Rgb::parse),
        link: string_attr(attributes, "link").map(str::to_string),
    }
}

fn block_align(attributes: &Attributes) -> Align {
    match string_attr(attributes, "align") {
        Some("center") => Align::Center,
        Some("right") => Align::Right,
        Some("justify") => Align::Justify,
        _ => Align::Left,
    }
}

struct Renderer {
    blocks: Vec<Block>,
    line: Vec<Run>,
    /// Ordered-list counters indexed by indent level.
    counters: Vec<u32>,
    after_page_break: bool,
}

impl Renderer {
    fn block_kind(&mut self, attributes: &Attributes, indent: u8) -> BlockKind {
        let level = usize::from(indent);
        if let Some(header) = attributes.get("header").and_then(Value::as_u64) {
            self.counters.clear();
            return BlockKind::Heading(header.clamp(1, 6) as u8);
        }
        if let Some(list) = string_attr(attributes, "list") {
            self.counters.truncate(level + 1);
            self.counters.resize(level + 1, 0);
            if list == "ordered" {
                self.counters[level] += 1;
                return BlockKind::ListItem {
                    ordered: true,
                    number: self.counters[level],
                };
            }
            self.counters[level] = 0;
            return BlockKind::ListItem {
                ordered: false,
                number: 0,
            };
        }
        self.counters.clear();
        if truthy(attributes, "code-block") {
            BlockKind::CodeBlock
        } else if truthy(attributes, "blockquote") {
            BlockKind::Blockquote
        } else {
            BlockKind::Paragraph
        }
    }

    fn finish_line(&mut self, attributes: &Attributes) {
        let runs = std::mem::take(&mut self.line);
        // The newline that terminates a page-break embed is not a line of its own.
        if std::mem::replace(&mut self.after_page_break, false)
            && runs.is_empty()
            && attributes.is_empty()
        {
            return;
        }
        let indent = attributes
            .get("indent")
            .and_then(Value::as_u64)
            .map(|value| value.min(8) as u8)
            .unwrap_or(0);
        let kind = self.block_kind(attributes, indent);
        self.blocks.push(Block {
            kind,
            align: block_align(attributes),
            indent,
            runs,
        });
    }

    fn page_break(&mut self) {
        if !self.line.is_empty() {
            self.finish_line(&Attributes::new());
        }
        self.counters.clear();
        self.blocks.push(Block {
            kind: BlockKind::PageBreak,
            align: Align::Left,
            indent: 0,
            runs: Vec::new(),
        });
        self.after_page_break = true;
    }
}

impl RenderedDocument {
    /// Render a document delta. Retain/delete ops and unknown embeds are skipped.
    pub fn from_delta(delta: &Delta) -> Self {
        let mut renderer = Renderer {
            blocks: Vec::new(),
            line: Vec::new(),
            counters: Vec::new(),
            after_page_break: false,
        };
        for op in delta.ops() {
            let Op::Insert { value, attributes } = op else {
                continue;
            };
            match value {
                Insert::Text(text) => {
                    for (index, segment) in text.split('\n').enumerate() {
                        if index > 0 {
                            renderer.finish_line(attributes);
                        }
                        if !segment.is_empty() {
                            renderer.line.push(Run::Text {
                                text: segment.to_string(),
                                style: run_style(attributes),
                            });
                            renderer.after_page_break = false;
                        }
                    }
                }
                Insert::Embed(_) if value.is_page_break() => renderer.page_break(),
                Insert::Embed(embed) => {
                    if let Some(source) = embed.get("image").and_then(Value::as_str) {
                        renderer.line.push(Run::Image {
                            source: source.to_string(),
                        });
                        renderer.after_page_break = false;
                    }
                }
            }
        }
        if !renderer.line.is_empty() {
            renderer.finish_line(&Attributes::new());
        }
        Self {
            blocks: renderer.blocks,
        }
    }

    pub fn page_break_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| block.kind == BlockKind::PageBreak)
            .count()
    }
}
