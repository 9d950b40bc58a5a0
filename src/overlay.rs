//! Pending replacements over an immutable original text.
//!
//! Edits are kept sorted by `(byte_start, byte_end)`; equal keys stay in
//! registration order, so insertions at one offset come out in the order
//! they were made. Because the stored set is pairwise disjoint, a new edit
//! only has to be checked against its two sorted neighbours.

use crate::edit::Edit;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("edit [{start}, {end}) overlaps existing edit [{existing_start}, {existing_end})")]
    Overlap {
        start: usize,
        end: usize,
        existing_start: usize,
        existing_end: usize,
    },

    #[error("invalid range [{start}, {end}) in text of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },
}

#[derive(Debug, Clone)]
pub struct TextOverlay<'a> {
    original: &'a str,
    edits: Vec<Edit>,
}

impl<'a> TextOverlay<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            edits: Vec::new(),
        }
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Register a replacement of `[start, end)` with `text`.
    pub fn overwrite(
        &mut self,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<(), OverlayError> {
        if start > end || end > self.original.len() {
            return Err(OverlayError::InvalidRange {
                start,
                end,
                len: self.original.len(),
            });
        }
        for offset in [start, end] {
            if !self.original.is_char_boundary(offset) {
                return Err(OverlayError::NotCharBoundary { offset });
            }
        }

        let edit = Edit::new(start, end, text);
        let idx = self
            .edits
            .partition_point(|e| (e.byte_start, e.byte_end) <= (start, end));

        let neighbours = idx.checked_sub(1).into_iter().chain([idx]);
        for i in neighbours {
            if let Some(existing) = self.edits.get(i) {
                if existing.overlaps(&edit) {
                    return Err(OverlayError::Overlap {
                        start,
                        end,
                        existing_start: existing.byte_start,
                        existing_end: existing.byte_end,
                    });
                }
            }
        }

        self.edits.insert(idx, edit);
        Ok(())
    }

    /// Registered edits in ascending start order.
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// The original text with every edit applied. Text outside edit spans is
    /// copied verbatim.
    pub fn finalize(&self) -> String {
        let added: usize = self.edits.iter().map(|e| e.new_text.len()).sum();
        let mut out = String::with_capacity(self.original.len() + added);

        let mut cursor = 0;
        for edit in &self.edits {
            out.push_str(&self.original[cursor..edit.byte_start]);
            out.push_str(&edit.new_text);
            cursor = edit.byte_end;
        }
        out.push_str(&self.original[cursor..]);

        out
    }
}
