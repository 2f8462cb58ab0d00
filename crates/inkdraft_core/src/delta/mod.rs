//! Rich-text delta: an ordered list of insert/retain/delete operations.
//!
//! A *document* delta contains only inserts; applying it to an empty
//! document yields the content. A *change* delta may also retain and delete
//! and is applied to a document with [`Delta::compose`].
//!
//! Lengths are counted in Unicode scalar values; an embed has length 1.
//! The textual form is the JSON object `{"ops":[...]}` and parsing it back
//! reproduces the exact op sequence.

mod compose;

use crate::error::DeltaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Formatting key → value. A `null` value on a retain removes the key.
pub type Attributes = BTreeMap<String, Value>;

/// Stand-in for non-text embeds in [`Delta::plain_text`].
pub const OBJECT_REPLACEMENT: char = '\u{fffc}';

/// Embed key marking an explicit page break.
pub const PAGE_BREAK_EMBED: &str = "page-break";

/// Inserted payload: a run of text or a single embed object (image, page break).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Insert {
    Text(String),
    Embed(Map<String, Value>),
}

impl Insert {
    fn len(&self) -> usize {
        match self {
            Insert::Text(text) => text.chars().count(),
            Insert::Embed(_) => 1,
        }
    }

    /// True for the `{"page-break": ...}` embed.
    pub fn is_page_break(&self) -> bool {
        matches!(self, Insert::Embed(map) if map.contains_key(PAGE_BREAK_EMBED))
    }
}

/// One delta operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOp", into = "RawOp")]
pub enum Op {
    Insert {
        value: Insert,
        attributes: Attributes,
    },
    Retain {
        len: usize,
        attributes: Attributes,
    },
    Delete {
        len: usize,
    },
}

impl Op {
    pub fn len(&self) -> usize {
        match self {
            Op::Insert { value, .. } => value.len(),
            Op::Retain { len, .. } | Op::Delete { len } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Op::Insert { attributes, .. } | Op::Retain { attributes, .. } => Some(attributes),
            Op::Delete { .. } => None,
        }
    }
}

/// Wire shape of an op: exactly one of `insert`/`retain`/`delete`.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    insert: Option<Insert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retain: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delete: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<Attributes>,
}

fn op_len(kind: &str, value: u64) -> Result<usize, DeltaError> {
    match usize::try_from(value) {
        Ok(len) if len > 0 => Ok(len),
        _ => Err(DeltaError::InvalidOp(format!(
            "{} length must be positive, got {}",
            kind, value
        ))),
    }
}

impl TryFrom<RawOp> for Op {
    type Error = DeltaError;

    fn try_from(raw: RawOp) -> Result<Self, Self::Error> {
        let attributes = raw.attributes.unwrap_or_default();
        match (raw.insert, raw.retain, raw.delete) {
            (Some(value), None, None) => {
                if value.len() == 0 {
                    return Err(DeltaError::InvalidOp("empty text insert".to_string()));
                }
                Ok(Op::Insert { value, attributes })
            }
            (None, Some(len), None) => Ok(Op::Retain {
                len: op_len("retain", len)?,
                attributes,
            }),
            (None, None, Some(len)) => {
                if !attributes.is_empty() {
                    return Err(DeltaError::InvalidOp(
                        "delete cannot carry attributes".to_string(),
                    ));
                }
                Ok(Op::Delete {
                    len: op_len("delete", len)?,
                })
            }
            _ => Err(DeltaError::InvalidOp(
                "op must have exactly one of insert, retain, delete".to_string(),
            )),
        }
    }
}

impl From<Op> for RawOp {
    fn from(op: Op) -> Self {
        let non_empty = |attributes: Attributes| (!attributes.is_empty()).then_some(attributes);
        match op {
            Op::Insert { value, attributes } => RawOp {
                insert: Some(value),
                retain: None,
                delete: None,
                attributes: non_empty(attributes),
            },
            Op::Retain { len, attributes } => RawOp {
                insert: None,
                retain: Some(len as u64),
                delete: None,
                attributes: non_empty(attributes),
            },
            Op::Delete { len } => RawOp {
                insert: None,
                retain: None,
                delete: Some(len as u64),
                attributes: None,
            },
        }
    }
}

/// Ordered sequence of delta operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    ops: Vec<Op>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a delta by pushing each op, which normalizes the sequence.
    pub fn from_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        let mut delta = Self::new();
        for op in ops {
            delta.push(op);
        }
        delta
    }

    /// The single-newline document used when content is absent.
    pub fn default_document() -> Self {
        let mut delta = Self::new();
        delta.insert("\n", Attributes::new());
        delta
    }

    /// A document holding `text` as unformatted content, newline-terminated.
    pub fn from_plain_text(text: &str) -> Self {
        let mut delta = Self::new();
        delta.insert(text, Attributes::new());
        if !text.ends_with('\n') {
            delta.insert("\n", Attributes::new());
        }
        delta
    }

    /// Parse the textual `{"ops":[...]}` form.
    pub fn parse(raw: &str) -> Result<Self, DeltaError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Parse stored content, substituting the default document when the
    /// value is missing, blank, or has no ops.
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self, DeltaError> {
        let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
            return Ok(Self::default_document());
        };
        let delta = Self::parse(raw)?;
        if delta.ops.is_empty() {
            return Ok(Self::default_document());
        }
        Ok(delta)
    }

    /// Serialize to the textual `{"ops":[...]}` form.
    pub fn to_json(&self) -> Result<String, DeltaError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when every op is an insert.
    pub fn is_document(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Op::Insert { .. }))
    }

    /// Total inserted length (the document length for a document delta).
    pub fn document_len(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Insert { .. }))
            .map(Op::len)
            .sum()
    }

    /// Text content with formatting stripped.
    ///
    /// Page breaks become form feeds and other embeds U+FFFC, so for a
    /// document the char count equals [`document_len`](Self::document_len).
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for op in &self.ops {
            match op {
                Op::Insert {
                    value: Insert::Text(text),
                    ..
                } => out.push_str(text),
                Op::Insert { value, .. } if value.is_page_break() => out.push('\u{c}'),
                Op::Insert { .. } => out.push(OBJECT_REPLACEMENT),
                _ => {}
            }
        }
        out
    }

    pub fn insert(&mut self, text: impl Into<String>, attributes: Attributes) -> &mut Self {
        self.push(Op::Insert {
            value: Insert::Text(text.into()),
            attributes,
        })
    }

    pub fn insert_embed(&mut self, embed: Map<String, Value>, attributes: Attributes) -> &mut Self {
        self.push(Op::Insert {
            value: Insert::Embed(embed),
            attributes,
        })
    }

    pub fn retain(&mut self, len: usize, attributes: Attributes) -> &mut Self {
        self.push(Op::Retain { len, attributes })
    }

    pub fn delete(&mut self, len: usize) -> &mut Self {
        self.push(Op::Delete { len })
    }

    /// Append an op, keeping the sequence canonical.
    ///
    /// Zero-length ops are dropped; neighbouring deletes, retains with equal
    /// attributes and text inserts with equal attributes merge; an insert
    /// following a delete is placed before it.
    pub fn push(&mut self, op: Op) -> &mut Self {
        if op.is_empty() {
            return self;
        }
        let mut index = self.ops.len();
        if let Some(last) = self.ops.last_mut() {
            if let (Op::Delete { len: merged }, Op::Delete { len }) = (&mut *last, &op) {
                *merged = merged.saturating_add(*len);
                return self;
            }
            if matches!(last, Op::Delete { .. }) && matches!(op, Op::Insert { .. }) {
                index -= 1;
            }
        }
        if index > 0 {
            match (&mut self.ops[index - 1], &op) {
                (
                    Op::Insert {
                        value: Insert::Text(existing),
                        attributes: existing_attrs,
                    },
                    Op::Insert {
                        value: Insert::Text(text),
                        attributes,
                    },
                ) if *existing_attrs == *attributes => {
                    existing.push_str(text);
                    return self;
                }
                (
                    Op::Retain {
                        len: existing,
                        attributes: existing_attrs,
                    },
                    Op::Retain { len, attributes },
                ) if *existing_attrs == *attributes => {
                    *existing = existing.saturating_add(*len);
                    return self;
                }
                _ => {}
            }
        }
        self.ops.insert(index, op);
        self
    }
}
