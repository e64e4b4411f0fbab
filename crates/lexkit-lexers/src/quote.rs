#![forbid(unsafe_code)]

//! Delimiter tracking for quote-like literals.

use lexkit_core::chars::opposite;

/// What a byte did to an open quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStep {
    /// The byte re-opened a bracket pair.
    Nested,
    /// The byte closed an inner bracket pair.
    Unnested,
    /// The byte closed the literal.
    Closed,
    /// Ordinary content.
    Content,
}

/// The delimiter pair of the literal being scanned.
///
/// `up` opens and `down` closes. For bracket pairs (`(`, `[`, `{`, `<`) a
/// repeated `up` nests and only the matching `down` at depth zero closes;
/// when both are the same byte the first `down` closes. `rep` counts how
/// many delimited sections remain for operators such as `s{..}{..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuoteContext {
    pub count: i32,
    pub up: u8,
    pub down: u8,
    pub rep: i32,
}

impl QuoteContext {
    pub const fn new() -> Self {
        Self {
            count: 0,
            up: 0,
            down: 0,
            rep: 1,
        }
    }

    /// Forget the delimiter and expect `rep` sections.
    pub fn reset(&mut self, rep: i32) {
        *self = Self {
            rep,
            ..Self::new()
        };
    }

    /// Open with `up` as the delimiter.
    pub fn open(&mut self, up: u8) {
        self.count += 1;
        self.up = up;
        self.down = opposite(up);
    }

    /// Whether a delimiter has been chosen.
    pub fn is_open(&self) -> bool {
        self.down != 0
    }

    /// Whether the delimiters form a distinct bracket pair.
    pub fn is_bracketed(&self) -> bool {
        self.up != self.down
    }

    /// Account for `ch`. Closing is checked before nesting, so identical
    /// delimiters close on first sight.
    pub fn track(&mut self, ch: u8) -> QuoteStep {
        if ch == self.down {
            self.count -= 1;
            if self.count == 0 {
                QuoteStep::Closed
            } else {
                QuoteStep::Unnested
            }
        } else if ch == self.up {
            self.count += 1;
            QuoteStep::Nested
        } else {
            QuoteStep::Content
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_offset(open: u8, body: &[u8]) -> Option<usize> {
        let mut quote = QuoteContext::new();
        quote.open(open);
        body.iter()
            .position(|&ch| quote.track(ch) == QuoteStep::Closed)
    }

    #[test]
    fn brackets_nest() {
        assert_eq!(close_offset(b'{', b"a{b{c}d}e}f}"), Some(9));
        assert_eq!(close_offset(b'(', b"(()"), None);
    }

    #[test]
    fn identical_delimiters_close_immediately() {
        assert_eq!(close_offset(b'|', b"ab|cd|"), Some(2));
        let mut quote = QuoteContext::new();
        quote.open(b'/');
        assert!(!quote.is_bracketed());
    }

    #[test]
    fn reset_keeps_repetition() {
        let mut quote = QuoteContext::new();
        quote.open(b'<');
        quote.reset(2);
        assert_eq!(quote, QuoteContext { rep: 2, ..QuoteContext::new() });
        assert!(!quote.is_open());
    }
}
