#![forbid(unsafe_code)]

//! The accessor a lexer works through during one pass.
//!
//! `Styler` wraps the host's [`LexTarget`] with the segment model every
//! lexer relies on: a run starts at [`segment_start`](Styler::segment_start)
//! and is committed with [`colour_to`](Styler::colour_to), which styles
//! every byte from the segment start through the given position and moves
//! the segment start past it. Commits are buffered and written to the store
//! on [`flush`](Styler::flush) (and on drop). Reads through
//! [`style_at`](Styler::style_at) see buffered commits, so look-back
//! heuristics always observe what the current pass has produced.

use crate::chars::{is_eol, is_space_or_tab};
use crate::document::LexTarget;
use crate::fold::{FoldFlags, FoldLevel};
use crate::properties::Properties;

/// Buffered commits are written out once this many bytes accumulate.
const FLUSH_THRESHOLD: usize = 4000;

/// Per-pass accessor over a document and its style store.
pub struct Styler<'a> {
    target: &'a mut dyn LexTarget,
    props: &'a Properties,
    segment_start: usize,
    pending_start: usize,
    pending: Vec<u8>,
}

impl<'a> Styler<'a> {
    pub fn new(target: &'a mut dyn LexTarget, props: &'a Properties) -> Self {
        Self {
            target,
            props,
            segment_start: 0,
            pending_start: 0,
            pending: Vec::new(),
        }
    }

    // -- Document reads -----------------------------------------------------

    /// Document length in bytes.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Byte at `pos`, or a space past the end.
    #[inline]
    pub fn char_at(&self, pos: usize) -> u8 {
        self.safe_char_at(pos, b' ')
    }

    /// Byte at `pos`, or `default` past the end.
    #[inline]
    pub fn safe_char_at(&self, pos: usize, default: u8) -> u8 {
        self.target.byte_at(pos).unwrap_or(default)
    }

    /// Byte just before `pos`, or `default` at the document start.
    #[inline]
    pub fn char_before(&self, pos: usize, default: u8) -> u8 {
        match pos.checked_sub(1) {
            Some(p) => self.safe_char_at(p, default),
            None => default,
        }
    }

    /// Whether the document holds `literal` at `pos`.
    pub fn match_at(&self, pos: usize, literal: &[u8]) -> bool {
        literal
            .iter()
            .enumerate()
            .all(|(i, &b)| self.target.byte_at(pos + i) == Some(b))
    }

    /// Copy of `start..=end`, clipped to the document.
    pub fn text_range(&self, start: usize, end: usize) -> Vec<u8> {
        (start..=end)
            .map_while(|pos| self.target.byte_at(pos))
            .collect()
    }

    pub fn line_of(&self, pos: usize) -> usize {
        self.target.line_of(pos)
    }

    pub fn line_start(&self, line: usize) -> usize {
        self.target.line_start(line)
    }

    /// Offset of the terminator of `line` (or the document end).
    pub fn line_end(&self, line: usize) -> usize {
        let next = self.target.line_start(line + 1);
        let start = self.target.line_start(line);
        let mut end = next;
        while end > start && is_eol(self.char_at(end - 1)) {
            end -= 1;
        }
        end
    }

    pub fn line_count(&self) -> usize {
        self.target.line_count()
    }

    /// Indentation of `line` as a fold level: the column of the first
    /// visible byte (tabs advance to multiples of eight) above
    /// [`FoldLevel::BASE`], flagged white when the line is blank.
    pub fn indent_amount(&self, line: usize) -> FoldLevel {
        let mut pos = self.line_start(line);
        let end = self.len();
        let mut indent: i32 = 0;
        while pos < end && is_space_or_tab(self.char_at(pos)) {
            if self.char_at(pos) == b'\t' {
                indent = (indent / 8 + 1) * 8;
            } else {
                indent += 1;
            }
            pos += 1;
        }
        let flags = if pos >= end || is_eol(self.char_at(pos)) {
            FoldFlags::WHITE
        } else {
            FoldFlags::empty()
        };
        FoldLevel::new(indent, flags)
    }

    // -- Styles -------------------------------------------------------------

    /// Style at `pos`, including commits not yet flushed.
    pub fn style_at(&self, pos: usize) -> u8 {
        if pos >= self.pending_start && pos - self.pending_start < self.pending.len() {
            self.pending[pos - self.pending_start]
        } else {
            self.target.style_at(pos)
        }
    }

    /// Begin a pass at `pos`.
    pub fn start_at(&mut self, pos: usize) {
        self.flush();
        self.segment_start = pos;
    }

    /// Move the start of the uncommitted run to `pos`.
    pub fn start_segment(&mut self, pos: usize) {
        self.segment_start = pos;
    }

    /// First byte of the uncommitted run.
    pub fn segment_start(&self) -> usize {
        self.segment_start
    }

    /// Commit `segment_start..=end` with `style`.
    ///
    /// Ends before the segment start are ignored, so a run can never be
    /// restyled once committed.
    pub fn colour_to(&mut self, end: usize, style: u8) {
        let len = self.len();
        if len == 0 || end < self.segment_start || self.segment_start >= len {
            return;
        }
        let end = end.min(len - 1);
        if self.pending.is_empty() {
            self.pending_start = self.segment_start;
        } else if self.pending_start + self.pending.len() != self.segment_start {
            self.flush();
            self.pending_start = self.segment_start;
        }
        let count = end + 1 - self.segment_start;
        self.pending.extend(std::iter::repeat_n(style, count));
        self.segment_start = end + 1;
        if self.pending.len() >= FLUSH_THRESHOLD {
            self.flush();
        }
    }

    /// Write buffered commits to the store.
    pub fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.target.set_styles(self.pending_start, &self.pending);
            self.pending_start += self.pending.len();
            self.pending.clear();
        }
    }

    // -- Per-line words -----------------------------------------------------

    pub fn level_at(&self, line: usize) -> FoldLevel {
        self.target.fold_level(line)
    }

    pub fn set_level(&mut self, line: usize, level: FoldLevel) {
        self.target.set_fold_level(line, level);
    }

    pub fn line_state(&self, line: usize) -> i32 {
        self.target.line_state(line)
    }

    pub fn set_line_state(&mut self, line: usize, state: i32) {
        self.target.set_line_state(line, state);
    }

    // -- Configuration ------------------------------------------------------

    pub fn properties(&self) -> &Properties {
        self.props
    }

    pub fn property_int(&self, name: &str, default: i32) -> i32 {
        self.props.get_int(name, default)
    }
}

impl Drop for Styler<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}

impl std::fmt::Debug for Styler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Styler")
            .field("len", &self.len())
            .field("segment_start", &self.segment_start)
            .field("pending", &self.pending.len())
            .finish()
    }
}
