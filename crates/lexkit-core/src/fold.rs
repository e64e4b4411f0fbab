#![forbid(unsafe_code)]

//! Per-line fold levels.
//!
//! A fold level is persisted as a single integer: the low 12 bits hold the
//! nesting number offset by [`FoldLevel::BASE`], and the bits above carry
//! [`FoldFlags`]. Depths are always reported relative to `BASE`.

use bitflags::bitflags;

use crate::styler::Styler;

bitflags! {
    /// Flag bits stored above the level number.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FoldFlags: i32 {
        /// The line holds no visible characters.
        const WHITE = 0x1000;
        /// The line opens a foldable region.
        const HEADER = 0x2000;
    }
}

/// Fold level of one line: nesting number plus flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FoldLevel(i32);

impl Default for FoldLevel {
    fn default() -> Self {
        Self(Self::BASE)
    }
}

impl FoldLevel {
    /// Level number of a top-level line.
    pub const BASE: i32 = 0x400;
    /// Mask selecting the level number.
    pub const NUMBER_MASK: i32 = 0x0FFF;

    /// Level at `depth` below the top level with the given flags.
    pub fn new(depth: i32, flags: FoldFlags) -> Self {
        let number = (Self::BASE + depth).clamp(0, Self::NUMBER_MASK);
        Self(number | flags.bits())
    }

    /// Rebuild a level from its persisted integer.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The persisted integer.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Level number including the base offset.
    pub const fn number(self) -> i32 {
        self.0 & Self::NUMBER_MASK
    }

    /// Nesting depth relative to [`FoldLevel::BASE`].
    pub const fn depth(self) -> i32 {
        self.number() - Self::BASE
    }

    pub fn flags(self) -> FoldFlags {
        FoldFlags::from_bits_truncate(self.0 & !Self::NUMBER_MASK)
    }

    pub fn is_header(self) -> bool {
        self.flags().contains(FoldFlags::HEADER)
    }

    pub fn is_white(self) -> bool {
        self.flags().contains(FoldFlags::WHITE)
    }
}

// ---------------------------------------------------------------------------
// FoldAccumulator
// ---------------------------------------------------------------------------

/// Running fold state for a single forward pass.
///
/// Lexers call [`open`](Self::open)/[`close`](Self::close) as they meet
/// block delimiters, [`note_visible`](Self::note_visible) for every
/// non-blank character, and [`end_line`](Self::end_line) at each line end.
/// A line's recorded level is the depth at its start; a line whose depth
/// grows before its end is flagged as a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldAccumulator {
    line: usize,
    level_prev: i32,
    level_current: i32,
    visible_chars: usize,
    compact: bool,
}

impl FoldAccumulator {
    /// Start accumulating at the line containing `start`, continuing from
    /// the depth already stored for that line.
    pub fn resume(styler: &Styler<'_>, start: usize, compact: bool) -> Self {
        let line = styler.line_of(start);
        let level_prev = if start == 0 {
            0
        } else {
            styler.level_at(line).depth().max(0)
        };
        Self {
            line,
            level_prev,
            level_current: level_prev,
            visible_chars: 0,
            compact,
        }
    }

    /// Line currently being accumulated.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Depth at the current scan position.
    pub fn current(&self) -> i32 {
        self.level_current
    }

    /// Depth at the start of the current line.
    pub fn previous(&self) -> i32 {
        self.level_prev
    }

    pub fn open(&mut self) {
        self.level_current += 1;
    }

    /// Leave a block. The depth never drops below zero.
    pub fn close(&mut self) {
        if self.level_current > 0 {
            self.level_current -= 1;
        }
    }

    /// Shift the running depth by `delta`, clamped at zero.
    pub fn adjust(&mut self, delta: i32) {
        self.level_current = (self.level_current + delta).max(0);
    }

    pub fn note_visible(&mut self) {
        self.visible_chars += 1;
    }

    pub fn has_visible(&self) -> bool {
        self.visible_chars > 0
    }

    /// The level this line would be written with right now.
    pub fn pending_level(&self) -> FoldLevel {
        let mut flags = FoldFlags::empty();
        if self.visible_chars == 0 && self.compact {
            flags |= FoldFlags::WHITE;
        }
        if self.level_current > self.level_prev && self.visible_chars > 0 {
            flags |= FoldFlags::HEADER;
        }
        FoldLevel::new(self.level_prev, flags)
    }

    /// Record the finished line and move to the next one.
    pub fn end_line(&mut self, styler: &mut Styler<'_>) {
        let level = self.pending_level();
        if level != styler.level_at(self.line) {
            styler.set_level(self.line, level);
        }
        self.line += 1;
        self.level_prev = self.level_current;
        self.visible_chars = 0;
    }

    /// Write the depth the next line starts at, keeping whatever flags it
    /// already carries.
    pub fn finish(&self, styler: &mut Styler<'_>) {
        let flags = styler.level_at(self.line).flags();
        styler.set_level(self.line, FoldLevel::new(self.level_prev, flags));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_round_trips_through_raw() {
        let level = FoldLevel::new(3, FoldFlags::HEADER);
        assert_eq!(level.raw(), 0x403 | 0x2000);
        assert_eq!(FoldLevel::from_raw(level.raw()), level);
        assert_eq!(level.depth(), 3);
        assert!(level.is_header());
        assert!(!level.is_white());
    }

    #[test]
    fn default_is_top_level() {
        let level = FoldLevel::default();
        assert_eq!(level.depth(), 0);
        assert_eq!(level.flags(), FoldFlags::empty());
    }

    #[test]
    fn flags_ignore_number_bits() {
        let level = FoldLevel::from_raw(0x0405 | 0x1000);
        assert_eq!(level.flags(), FoldFlags::WHITE);
        assert_eq!(level.number(), 0x405);
    }
}
