//! Overlapping-window text chunker.
//!
//! Splits normalized document text into target-length segments with a
//! configurable overlap between neighbours. Segments are produced lazily
//! by [`Segments`], a plain iterator, so a large document is never
//! materialized as a whole list during indexing.
//!
//! # Algorithm
//!
//! 1. Normalize the text: CR removed, trailing spaces and tabs stripped
//!    before each newline, runs of three or more newlines collapsed to two.
//! 2. Walk a cursor from 0. Each segment spans
//!    `[cursor, min(len, cursor + target))`.
//! 3. Advance the cursor to `end - overlap`, clamped to 0. The segment
//!    that reaches the end of the text stops the walk; it may be shorter
//!    than `target`.
//!
//! Forward progress requires `overlap < target`, so [`Segments::new`]
//! rejects any other configuration instead of looping forever. All byte
//! offsets are snapped to UTF-8 char boundaries.

use crate::error::ServiceError;

/// One chunk-sized piece of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Zero-based page. Always 0 for plain text; reserved for paginated
    /// formats.
    pub page: u32,
    /// Position of the segment within the document, strictly increasing
    /// from 0.
    pub order: u32,
    pub text: String,
}

/// Lazy, finite iterator over the segments of one document.
///
/// Restartable by construction: building a new `Segments` (or cloning one
/// before draining it) replays the same sequence.
#[derive(Debug, Clone)]
pub struct Segments {
    text: String,
    target: usize,
    overlap: usize,
    cursor: usize,
    order: u32,
}

impl Segments {
    /// Normalize `text` and set up the walk.
    ///
    /// Fails fast when `target` is zero or `overlap >= target` — those
    /// configurations cannot make forward progress.
    pub fn new(text: &str, target: usize, overlap: usize) -> Result<Self, ServiceError> {
        if target == 0 || overlap >= target {
            return Err(ServiceError::validation(format!(
                "chunk overlap ({overlap}) must be smaller than the target length ({target})"
            )));
        }
        Ok(Self {
            text: normalize(text),
            target,
            overlap,
            cursor: 0,
            order: 0,
        })
    }
}

impl Iterator for Segments {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if self.cursor >= self.text.len() {
            return None;
        }

        let mut end = floor_char_boundary(&self.text, self.cursor + self.target);
        if end <= self.cursor {
            // a single char wider than the target still has to advance
            end = self.text[self.cursor..]
                .chars()
                .next()
                .map(|c| self.cursor + c.len_utf8())
                .unwrap_or(self.text.len());
        }

        let segment = Segment {
            page: 0,
            order: self.order,
            text: self.text[self.cursor..end].to_string(),
        };
        self.order += 1;

        if end >= self.text.len() {
            self.cursor = self.text.len();
        } else {
            let next = floor_char_boundary(&self.text, end.saturating_sub(self.overlap));
            // boundary snapping must not eat the whole step
            self.cursor = if next > self.cursor { next } else { end };
        }

        Some(segment)
    }
}

/// Normalize line endings and whitespace ahead of chunking: CR removed,
/// spaces and tabs stripped when they directly precede a newline, and
/// runs of three or more newlines collapsed to two.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank = String::new();
    let mut newlines = 0usize;

    for ch in text.chars() {
        match ch {
            '\r' => {}
            ' ' | '\t' => blank.push(ch),
            '\n' => {
                blank.clear();
                newlines += 1;
            }
            _ => {
                for _ in 0..newlines.min(2) {
                    out.push('\n');
                }
                newlines = 0;
                out.push_str(&blank);
                blank.clear();
                out.push(ch);
            }
        }
    }
    for _ in 0..newlines.min(2) {
        out.push('\n');
    }
    out.push_str(&blank);
    out
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
