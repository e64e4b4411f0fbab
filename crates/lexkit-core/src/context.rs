#![forbid(unsafe_code)]

//! A forward cursor for lexers written in the terminate/dispatch style.
//!
//! `StyleContext` tracks the current byte, its neighbours, line boundaries,
//! and the state of the run being accumulated. Switching state commits the
//! run so far with the old state; [`change_state`](StyleContext::change_state)
//! relabels the uncommitted run instead.

use crate::styler::Styler;

/// Cursor over `start..start + length` of a [`Styler`].
pub struct StyleContext<'s, 'a> {
    styler: &'s mut Styler<'a>,
    end_pos: usize,
    line_start_next: usize,
    pub current_pos: usize,
    pub current_line: usize,
    pub state: u8,
    pub ch_prev: u8,
    pub ch: u8,
    pub ch_next: u8,
    pub at_line_start: bool,
    pub at_line_end: bool,
}

impl<'s, 'a> StyleContext<'s, 'a> {
    pub fn new(start: usize, length: usize, init_state: u8, styler: &'s mut Styler<'a>) -> Self {
        styler.start_at(start);
        styler.start_segment(start);
        let mut end_pos = start + length;
        // Let the final byte of the document be seen as a line end.
        if end_pos == styler.len() {
            end_pos += 1;
        }
        let current_line = styler.line_of(start);
        let line_start_next = styler.line_start(current_line + 1);
        let at_line_start = styler.line_start(current_line) == start;
        let ch = styler.char_at(start);
        let mut ctx = Self {
            styler,
            end_pos,
            line_start_next,
            current_pos: start,
            current_line,
            state: init_state,
            ch_prev: 0,
            ch,
            ch_next: b' ',
            at_line_start,
            at_line_end: false,
        };
        ctx.read_next();
        ctx
    }

    fn read_next(&mut self) {
        self.ch_next = self.styler.char_at(self.current_pos + 1);
        self.at_line_end = (self.ch == b'\r' && self.ch_next != b'\n')
            || self.ch == b'\n'
            || self.current_pos >= self.end_pos;
    }

    /// Whether the cursor is still inside the requested range.
    pub fn more(&self) -> bool {
        self.current_pos < self.end_pos
    }

    pub fn forward(&mut self) {
        if self.current_pos < self.end_pos {
            self.at_line_start = self.at_line_end;
            if self.at_line_start {
                self.current_line += 1;
                self.line_start_next = self.styler.line_start(self.current_line + 1);
            }
            self.ch_prev = self.ch;
            self.current_pos += 1;
            self.ch = self.ch_next;
            self.read_next();
        } else {
            self.at_line_start = false;
            self.ch_prev = b' ';
            self.ch = b' ';
            self.ch_next = b' ';
            self.at_line_end = true;
        }
    }

    pub fn forward_n(&mut self, n: usize) {
        for _ in 0..n {
            self.forward();
        }
    }

    /// Commit the run up to the cursor and start a new one in `state`.
    pub fn set_state(&mut self, state: u8) {
        if let Some(end) = self.current_pos.checked_sub(1) {
            self.styler.colour_to(end, self.state);
        }
        self.state = state;
    }

    pub fn forward_set_state(&mut self, state: u8) {
        self.forward();
        self.set_state(state);
    }

    /// Relabel the uncommitted run.
    pub fn change_state(&mut self, state: u8) {
        self.state = state;
    }

    /// Commit whatever remains and flush.
    pub fn complete(&mut self) {
        if let Some(end) = self.current_pos.checked_sub(1) {
            self.styler.colour_to(end, self.state);
        }
        self.styler.flush();
    }

    /// Byte `n` positions past the cursor.
    pub fn relative(&self, n: usize) -> u8 {
        self.styler.char_at(self.current_pos + n)
    }

    /// Whether the document holds `literal` at the cursor.
    pub fn matches(&self, literal: &str) -> bool {
        self.styler.match_at(self.current_pos, literal.as_bytes())
    }

    /// Case-insensitive [`matches`](Self::matches); `literal` is lowercase.
    pub fn matches_ignore_case(&self, literal: &str) -> bool {
        literal
            .bytes()
            .enumerate()
            .all(|(i, b)| self.relative(i).to_ascii_lowercase() == b)
    }

    /// Length of the uncommitted run.
    pub fn length_current(&self) -> usize {
        self.current_pos - self.styler.segment_start()
    }

    /// Text of the uncommitted run.
    pub fn current_text(&self) -> Vec<u8> {
        let start = self.styler.segment_start();
        if self.current_pos <= start {
            return Vec::new();
        }
        self.styler.text_range(start, self.current_pos - 1)
    }

    pub fn current_lowered(&self) -> Vec<u8> {
        let mut text = self.current_text();
        text.make_ascii_lowercase();
        text
    }

    /// Start offset of the next line.
    pub fn line_start_next(&self) -> usize {
        self.line_start_next
    }

    /// Access the underlying styler for look-back queries.
    pub fn styler(&self) -> &Styler<'a> {
        &*self.styler
    }

    pub fn styler_mut(&mut self) -> &mut Styler<'a> {
        &mut *self.styler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextBuffer;
    use crate::properties::Properties;

    #[test]
    fn walks_bytes_and_line_flags() {
        let mut buf = TextBuffer::from("ab\ncd");
        let props = Properties::new();
        let mut styler = Styler::new(&mut buf, &props);
        let mut ctx = StyleContext::new(0, 5, 0, &mut styler);
        assert!(ctx.at_line_start);
        assert_eq!((ctx.ch, ctx.ch_next), (b'a', b'b'));
        ctx.forward_n(2);
        assert_eq!(ctx.ch, b'\n');
        assert!(ctx.at_line_end);
        ctx.forward();
        assert!(ctx.at_line_start);
        assert_eq!(ctx.current_line, 1);
        assert_eq!(ctx.ch_prev, b'\n');
        ctx.forward_n(2);
        assert!(ctx.more());
        ctx.forward();
        assert!(!ctx.more());
    }

    #[test]
    fn set_and_change_state_commit_runs() {
        let mut buf = TextBuffer::from("abcd");
        let props = Properties::new();
        {
            let mut styler = Styler::new(&mut buf, &props);
            let mut ctx = StyleContext::new(0, 4, 1, &mut styler);
            ctx.forward();
            ctx.set_state(2);
            ctx.forward();
            ctx.change_state(3);
            ctx.forward_set_state(4);
            assert_eq!(ctx.current_text(), Vec::<u8>::new());
            ctx.forward();
            ctx.complete();
        }
        assert_eq!(buf.styles(), &[1, 3, 3, 4]);
    }

    #[test]
    fn match_helpers() {
        let mut buf = TextBuffer::from("URL(x)");
        let props = Properties::new();
        let mut styler = Styler::new(&mut buf, &props);
        let ctx = StyleContext::new(0, 6, 0, &mut styler);
        assert!(ctx.matches_ignore_case("url("));
        assert!(!ctx.matches("url("));
        assert!(ctx.matches("URL"));
    }
}
