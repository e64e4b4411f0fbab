#![forbid(unsafe_code)]

//! Document and style-store interfaces, plus an in-memory implementation.
//!
//! Lexers never own text. They read bytes through [`Document`] and persist
//! their results through [`StyleStore`]: one style byte per document byte,
//! and one fold level plus one line-state word per line. Those three arrays
//! are the only state that survives between lexing calls.

use std::ops::Range;

use crate::fold::FoldLevel;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read-only view of the bytes being lexed, organized into lines.
///
/// Lines are delimited by `\n`, `\r\n`, or a bare `\r`; the terminator
/// belongs to the line it ends.
pub trait Document {
    /// Document length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte at `pos`, or `None` past the end.
    fn byte_at(&self, pos: usize) -> Option<u8>;

    /// Number of lines. An empty document has one (empty) line.
    fn line_count(&self) -> usize;

    /// Line containing `pos`. Positions at or past the end map to the last
    /// line.
    fn line_of(&self, pos: usize) -> usize;

    /// Offset of the first byte of `line`; [`len`](Self::len) for lines past
    /// the end.
    fn line_start(&self, line: usize) -> usize;
}

/// Per-byte style codes and per-line fold/state words.
pub trait StyleStore {
    /// Committed style of the byte at `pos` (0 past the end).
    fn style_at(&self, pos: usize) -> u8;

    /// Overwrite styles starting at `start`. Bytes past the end are dropped.
    fn set_styles(&mut self, start: usize, styles: &[u8]);

    /// Give every byte of `range` the same style.
    fn set_style_range(&mut self, range: Range<usize>, style: u8) {
        let len = range.end.saturating_sub(range.start);
        self.set_styles(range.start, &vec![style; len]);
    }

    fn fold_level(&self, line: usize) -> FoldLevel;

    fn set_fold_level(&mut self, line: usize, level: FoldLevel);

    /// Lexer-private word persisted for `line` (0 when never set).
    fn line_state(&self, line: usize) -> i32;

    fn set_line_state(&mut self, line: usize, state: i32);
}

/// Everything a lexer needs from its host.
pub trait LexTarget: Document + StyleStore {}

impl<T: Document + StyleStore + ?Sized> LexTarget for T {}

// ---------------------------------------------------------------------------
// TextBuffer
// ---------------------------------------------------------------------------

/// In-memory document with its style store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: Vec<u8>,
    styles: Vec<u8>,
    line_starts: Vec<usize>,
    fold_levels: Vec<FoldLevel>,
    line_states: Vec<i32>,
}

impl TextBuffer {
    pub fn new(text: impl Into<Vec<u8>>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        let lines = line_starts.len();
        Self {
            styles: vec![0; text.len()],
            text,
            line_starts,
            fold_levels: vec![FoldLevel::default(); lines],
            line_states: vec![0; lines],
        }
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// All committed styles, one per byte.
    pub fn styles(&self) -> &[u8] {
        &self.styles
    }

    /// Styles from `pos` to the end.
    pub fn styles_from(&self, pos: usize) -> &[u8] {
        &self.styles[pos.min(self.styles.len())..]
    }

    /// Fold levels, one per line.
    pub fn fold_levels(&self) -> &[FoldLevel] {
        &self.fold_levels
    }

    /// Line-state words, one per line.
    pub fn line_states(&self) -> &[i32] {
        &self.line_states
    }

    /// Forget styles at and after `pos`, as an editor does after an edit.
    ///
    /// Line states and fold levels of lines after the one containing `pos`
    /// are reset too; the line containing `pos` keeps its values because
    /// they describe its start.
    pub fn reset_styles_from(&mut self, pos: usize) {
        let pos = pos.min(self.text.len());
        self.styles[pos..].fill(0);
        let first_line = self.line_of(pos) + 1;
        if first_line < self.line_states.len() {
            self.line_states[first_line..].fill(0);
            self.fold_levels[first_line..].fill(FoldLevel::default());
        }
    }

    /// Replace `range` with `replacement`, shifting styles and per-line data.
    ///
    /// Inserted bytes start unstyled; per-line words of lines created by the
    /// edit start at their defaults.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &[u8]) {
        let start = range.start.min(self.text.len());
        let end = range.end.clamp(start, self.text.len());
        // A `\r` just before the edit can pair with a `\n` the edit brings
        // next to it, which moves the line boundary behind `start`.
        let anchor = if start > 0 && self.text[start - 1] == b'\r' {
            start - 1
        } else {
            start
        };
        let first_line = self.line_of(anchor);
        let old_last_line = self.line_of(end);

        self.text.splice(start..end, replacement.iter().copied());
        self.styles
            .splice(start..end, std::iter::repeat_n(0, replacement.len()));
        self.line_starts = compute_line_starts(&self.text);

        let new_last_line = self.line_of(start + replacement.len());
        let removed = (first_line + 1)..(old_last_line + 1);
        let added = new_last_line - first_line;
        self.fold_levels
            .splice(removed.clone(), std::iter::repeat_n(FoldLevel::default(), added));
        self.line_states.splice(removed, std::iter::repeat_n(0, added));
        debug_assert_eq!(self.fold_levels.len(), self.line_starts.len());
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

fn compute_line_starts(text: &[u8]) -> Vec<usize> {
    let mut starts = vec![0];
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            b'\r' if text.get(i + 1) == Some(&b'\n') => {
                starts.push(i + 2);
                i += 2;
                continue;
            }
            b'\r' | b'\n' => starts.push(i + 1),
            _ => {}
        }
        i += 1;
    }
    starts
}

impl Document for TextBuffer {
    fn len(&self) -> usize {
        self.text.len()
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.text.get(pos).copied()
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_of(&self, pos: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= pos)
            .saturating_sub(1)
    }

    fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len())
    }
}

impl StyleStore for TextBuffer {
    fn style_at(&self, pos: usize) -> u8 {
        self.styles.get(pos).copied().unwrap_or(0)
    }

    fn set_styles(&mut self, start: usize, styles: &[u8]) {
        if start >= self.styles.len() {
            return;
        }
        let end = (start + styles.len()).min(self.styles.len());
        self.styles[start..end].copy_from_slice(&styles[..end - start]);
    }

    fn fold_level(&self, line: usize) -> FoldLevel {
        self.fold_levels.get(line).copied().unwrap_or_default()
    }

    fn set_fold_level(&mut self, line: usize, level: FoldLevel) {
        if let Some(slot) = self.fold_levels.get_mut(line) {
            *slot = level;
        }
    }

    fn line_state(&self, line: usize) -> i32 {
        self.line_states.get(line).copied().unwrap_or(0)
    }

    fn set_line_state(&mut self, line: usize, state: i32) {
        if let Some(slot) = self.line_states.get_mut(line) {
            *slot = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_starts_handle_all_terminators() {
        let buf = TextBuffer::from("a\nb\r\nc\rd");
        assert_eq!(buf.line_count(), 4);
        assert_eq!(buf.line_start(0), 0);
        assert_eq!(buf.line_start(1), 2);
        assert_eq!(buf.line_start(2), 5);
        assert_eq!(buf.line_start(3), 7);
        assert_eq!(buf.line_start(9), buf.len());
    }

    #[test]
    fn line_of_maps_terminators_to_their_line() {
        let buf = TextBuffer::from("ab\r\ncd\n");
        assert_eq!(buf.line_of(0), 0);
        assert_eq!(buf.line_of(2), 0);
        assert_eq!(buf.line_of(3), 0);
        assert_eq!(buf.line_of(4), 1);
        assert_eq!(buf.line_of(7), 2);
        assert_eq!(buf.line_of(100), 2);
    }

    #[test]
    fn empty_document_has_one_line() {
        let buf = TextBuffer::from("");
        assert!(buf.is_empty());
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_of(0), 0);
        assert_eq!(buf.byte_at(0), None);
    }

    #[test]
    fn set_styles_clips_at_end() {
        let mut buf = TextBuffer::from("abc");
        buf.set_styles(1, &[7, 7, 7, 7]);
        assert_eq!(buf.styles(), &[0, 7, 7]);
        buf.set_styles(3, &[1]);
        assert_eq!(buf.styles(), &[0, 7, 7]);
    }

    #[test]
    fn style_range_and_tail() {
        let mut buf = TextBuffer::from("abcdef");
        buf.set_style_range(2..4, 5);
        assert_eq!(buf.styles(), &[0, 0, 5, 5, 0, 0]);
        assert_eq!(buf.styles_from(3), &[5, 0, 0]);
        assert!(buf.styles_from(99).is_empty());
    }

    #[test]
    fn reset_keeps_line_containing_edit() {
        let mut buf = TextBuffer::from("ab\ncd\nef");
        buf.set_styles(0, &[1; 8]);
        buf.set_line_state(1, 5);
        buf.set_line_state(2, 6);
        buf.reset_styles_from(4);
        assert_eq!(buf.styles(), &[1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(buf.line_state(1), 5);
        assert_eq!(buf.line_state(2), 0);
    }

    #[test]
    fn replace_range_shifts_lines() {
        let mut buf = TextBuffer::from("one\ntwo\nthree");
        buf.set_line_state(2, 9);
        buf.set_styles(0, &[3; 13]);
        buf.replace_range(4..7, b"2\nextra");
        assert_eq!(buf.text(), b"one\n2\nextra\nthree");
        assert_eq!(buf.line_count(), 4);
        assert_eq!(buf.line_state(3), 9);
        assert_eq!(buf.style_at(4), 0);
        assert_eq!(buf.style_at(0), 3);
        assert_eq!(buf.styles().len(), buf.len());
    }

    #[test]
    fn replace_range_joining_cr_and_lf() {
        let mut buf = TextBuffer::from("a\rX\nb");
        buf.set_line_state(0, 4);
        buf.set_line_state(2, 8);
        buf.replace_range(2..3, b"");
        assert_eq!(buf.text(), b"a\r\nb");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.fold_levels().len(), 2);
        assert_eq!(buf.line_state(0), 4);
        assert_eq!(buf.line_state(1), 8);

        buf.replace_range(2..2, b"Y");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line_state(2), 8);
    }
}
