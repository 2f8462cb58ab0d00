//! Applying a change delta to a document delta.

use super::{Attributes, Delta, Insert, Op};
use crate::error::DeltaError;

/// Walks a document's ops, handing out pieces of at most a requested length.
struct OpCursor<'a> {
    ops: &'a [Op],
    index: usize,
    offset: usize,
}

impl<'a> OpCursor<'a> {
    fn new(ops: &'a [Op]) -> Self {
        Self {
            ops,
            index: 0,
            offset: 0,
        }
    }

    fn take(&mut self, max: usize) -> Option<Op> {
        let op = self.ops.get(self.index)?;
        let remaining = op.len() - self.offset;
        let count = remaining.min(max);
        let piece = match op {
            Op::Insert {
                value: Insert::Text(text),
                attributes,
            } => Op::Insert {
                value: Insert::Text(text.chars().skip(self.offset).take(count).collect()),
                attributes: attributes.clone(),
            },
            Op::Insert { .. } => op.clone(),
            Op::Retain { attributes, .. } => Op::Retain {
                len: count,
                attributes: attributes.clone(),
            },
            Op::Delete { .. } => Op::Delete { len: count },
        };
        if count == remaining {
            self.index += 1;
            self.offset = 0;
        } else {
            self.offset += count;
        }
        Some(piece)
    }
}

fn merge_attributes(target: &mut Attributes, change: &Attributes) {
    for (key, value) in change {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

impl Delta {
    /// Apply `change` to this document and return the resulting document.
    ///
    /// Inserts are copied, retains keep content (merging any attributes onto
    /// it), deletes drop content. Content past the last op of `change` is
    /// kept as if retained.
    ///
    /// # Errors
    /// [`DeltaError::NotADocument`] when `self` contains retain/delete ops and
    /// [`DeltaError::OutOfRange`] when `change` reaches past the end.
    pub fn compose(&self, change: &Delta) -> Result<Delta, DeltaError> {
        if !self.is_document() {
            return Err(DeltaError::NotADocument);
        }
        let doc_len = self.document_len();
        let mut cursor = OpCursor::new(&self.ops);
        let mut consumed = 0usize;
        let mut out = Delta::new();

        for op in change.ops() {
            let (len, retained_attrs) = match op {
                Op::Insert { .. } => {
                    out.push(op.clone());
                    continue;
                }
                Op::Retain { len, attributes } => (*len, Some(attributes)),
                Op::Delete { len } => (*len, None),
            };
            let mut remaining = len;
            while remaining > 0 {
                let mut piece = cursor.take(remaining).ok_or(DeltaError::OutOfRange {
                    doc_len,
                    needed: consumed.saturating_add(len),
                })?;
                remaining -= piece.len();
                if let Some(change_attrs) = retained_attrs {
                    if let Op::Insert { attributes, .. } = &mut piece {
                        merge_attributes(attributes, change_attrs);
                    }
                    out.push(piece);
                }
            }
            consumed = consumed.saturating_add(len);
        }

        while let Some(rest) = cursor.take(usize::MAX) {
            out.push(rest);
        }
        Ok(out)
    }
}
