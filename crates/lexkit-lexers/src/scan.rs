#![forbid(unsafe_code)]

//! Look-back and look-ahead helpers shared by the hand-written lexers.

use lexkit_core::Styler;
use lexkit_core::chars::{is_eol, is_space_or_tab};

/// Last non-newline byte before `line`, or `None` when `line` is the first
/// line. Blank lines in between are skipped.
pub fn prev_non_newline_pos(styler: &Styler<'_>, line: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let line_start = styler.line_start(line);
    let mut pos = line_start.checked_sub(1)?;
    while pos > 0 && is_eol(styler.char_at(pos)) {
        pos -= 1;
    }
    Some(pos)
}

/// First position in `start..end` that is not a space or tab, else `end`.
pub fn skip_whitespace(styler: &Styler<'_>, start: usize, end: usize) -> usize {
    (start..end)
        .find(|&pos| !is_space_or_tab(styler.char_at(pos)))
        .unwrap_or(end)
}

/// Whether `literal` sits at `pos` and ends strictly before `limit`.
pub fn is_match(styler: &Styler<'_>, limit: usize, pos: usize, literal: &[u8]) -> bool {
    pos + literal.len() < limit && styler.match_at(pos, literal)
}

/// Whether `pos` is the first byte of a line.
pub fn is_line_start(styler: &Styler<'_>, pos: usize) -> bool {
    match pos.checked_sub(1) {
        None => true,
        Some(prev) => match styler.char_at(prev) {
            b'\n' => true,
            b'\r' => styler.safe_char_at(pos, 0) != b'\n',
            _ => false,
        },
    }
}

/// Text of `start..=end`, or an empty word when it exceeds `max_len`.
pub fn bounded_word(styler: &Styler<'_>, start: usize, end: usize, max_len: usize) -> Vec<u8> {
    if end < start || end - start + 1 >= max_len {
        return Vec::new();
    }
    styler.text_range(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexkit_core::{Properties, TextBuffer};

    #[test]
    fn prev_non_newline_skips_blank_lines() {
        let mut buf = TextBuffer::from("ab\n\n\ncd");
        let props = Properties::new();
        let styler = Styler::new(&mut buf, &props);
        assert_eq!(prev_non_newline_pos(&styler, 3), Some(1));
        assert_eq!(prev_non_newline_pos(&styler, 0), None);
    }

    #[test]
    fn line_start_detection_handles_crlf() {
        let mut buf = TextBuffer::from("a\r\nb\rc");
        let props = Properties::new();
        let styler = Styler::new(&mut buf, &props);
        assert!(is_line_start(&styler, 0));
        assert!(!is_line_start(&styler, 2));
        assert!(is_line_start(&styler, 3));
        assert!(is_line_start(&styler, 5));
    }

    #[test]
    fn match_respects_limit() {
        let mut buf = TextBuffer::from("=end\n");
        let props = Properties::new();
        let styler = Styler::new(&mut buf, &props);
        assert!(is_match(&styler, 5, 0, b"=end"));
        assert!(!is_match(&styler, 4, 0, b"=end"));
        assert_eq!(skip_whitespace(&styler, 0, 3), 0);
        assert_eq!(bounded_word(&styler, 1, 3, 200), b"end".to_vec());
        assert!(bounded_word(&styler, 0, 3, 4).is_empty());
    }
}
