#![forbid(unsafe_code)]

//! CoffeeScript lexer and indentation folder.
//!
//! Written in the terminate/dispatch style over a [`StyleContext`]: each
//! step first decides whether the current run ends, then, in the default
//! state, what the next run is. A `/` starts a regex when the previous
//! significant byte is an operator that cannot end an expression, or when
//! it follows `return`.

use lexkit_core::chars::{is_high_bit, is_space, is_space_or_tab};
use lexkit_core::{FoldFlags, FoldLevel, KeywordSets, Lexer, StyleContext, Styler};

pub const KEYWORDS: &str = "and break by catch class continue debugger delete do else extends false \
    finally for if in instanceof is isnt loop new no not null of off on or own return super switch \
    then this throw true try typeof undefined unless until when while yes";

pub const SECONDARY_KEYWORDS: &str = "arguments constructor prototype require module exports";

pub const GLOBAL_CLASSES: &str = "Array Boolean Date Error Function JSON Math Number Object Promise \
    RegExp String console document window";

/// Style codes written by the CoffeeScript lexer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoffeeStyle {
    #[default]
    Default = 0,
    Comment = 1,
    CommentLine = 2,
    CommentDoc = 3,
    Number = 4,
    Word = 5,
    String = 6,
    Character = 7,
    Operator = 10,
    Identifier = 11,
    Verbatim = 13,
    Regex = 14,
    Word2 = 16,
    GlobalClass = 19,
    /// `###` block comment while open; committed as [`Comment`](Self::Comment).
    CommentBlock = 22,
    /// `///` regex while open; committed as [`Regex`](Self::Regex).
    VerboseRegex = 23,
    /// `#` comment inside a `///` regex.
    VerboseRegexComment = 24,
}

impl CoffeeStyle {
    const ALL: [Self; 17] = [
        Self::Default,
        Self::Comment,
        Self::CommentLine,
        Self::CommentDoc,
        Self::Number,
        Self::Word,
        Self::String,
        Self::Character,
        Self::Operator,
        Self::Identifier,
        Self::Verbatim,
        Self::Regex,
        Self::Word2,
        Self::GlobalClass,
        Self::CommentBlock,
        Self::VerboseRegex,
        Self::VerboseRegexComment,
    ];

    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as u8 == code)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Styles skipped when looking back for the byte before a `/`.
    pub const fn is_space_equivalent(self) -> bool {
        matches!(
            self,
            Self::Default
                | Self::Comment
                | Self::CommentLine
                | Self::CommentDoc
                | Self::Word
                | Self::Regex
                | Self::CommentBlock
                | Self::VerboseRegex
                | Self::VerboseRegexComment
        )
    }
}

fn style_of(styler: &Styler<'_>, pos: usize) -> CoffeeStyle {
    CoffeeStyle::from_u8(styler.style_at(pos)).unwrap_or_default()
}

fn is_operator(ch: u8) -> bool {
    b"%^&*()-+=|{}[]:;<>,/?!.~".contains(&ch)
}

fn ok_before_regex(ch: u8) -> bool {
    b"([{=,:;!%^&*|?~+-".contains(&ch)
}

#[derive(Debug, Clone, Copy)]
struct WordChars {
    dollars: bool,
}

impl WordChars {
    fn is_start(self, ch: u8) -> bool {
        is_high_bit(ch) || ch.is_ascii_alphabetic() || ch == b'_' || (self.dollars && ch == b'$')
    }

    fn is_word(self, ch: u8) -> bool {
        is_high_bit(ch) || ch.is_ascii_alphanumeric() || ch == b'.' || ch == b'_' || (self.dollars && ch == b'$')
    }
}

/// Where to restart and the operator byte that preceded the restart
/// point, if any.
///
/// Steps back over whitespace, comments, keywords and regexes to the last
/// other token before `start`, then to the first byte of that token.
fn synchronize_doc_start(styler: &Styler<'_>, start: usize) -> (usize, u8) {
    let Some(last) = last_significant(styler, start) else {
        return (0, b' ');
    };
    let style = style_of(styler, last);
    let mut run_start = last;
    while run_start > 0 && style_of(styler, run_start - 1) == style {
        run_start -= 1;
    }
    let prev_operator = last_significant(styler, run_start)
        .filter(|&pos| style_of(styler, pos) == CoffeeStyle::Operator)
        .map_or(b' ', |pos| styler.char_at(pos));
    (run_start, prev_operator)
}

fn last_significant(styler: &Styler<'_>, before: usize) -> Option<usize> {
    (0..before)
        .rev()
        .find(|&pos| !style_of(styler, pos).is_space_equivalent())
}

/// Whether the last `+` or `-` before the cursor is doubled, making the
/// `/` that follows a division after a postfix operator.
fn follows_postfix_operator(styler: &Styler<'_>, pos: usize) -> bool {
    (1..pos)
        .rev()
        .map(|p| (p, styler.char_at(p)))
        .find(|&(_, ch)| ch == b'+' || ch == b'-')
        .is_some_and(|(p, ch)| styler.char_at(p - 1) == ch)
}

/// Whether the cursor follows `return`, on the same line.
fn follows_return_keyword(styler: &Styler<'_>, pos: usize) -> bool {
    let line_start = styler.line_start(styler.line_of(pos));
    let mut end = pos;
    while end > line_start + 1 && is_space_or_tab(styler.char_at(end - 1)) {
        end -= 1;
    }
    end >= line_start + "return".len() && styler.match_at(end - "return".len(), b"return")
}

struct Scan<'c, 's, 'a> {
    ctx: StyleContext<'s, 'a>,
    keywords: &'c KeywordSets,
    words: WordChars,
    prev_non_white: u8,
}

impl<'c, 's, 'a> Scan<'c, 's, 'a> {
    fn state(&self) -> CoffeeStyle {
        CoffeeStyle::from_u8(self.ctx.state).unwrap_or_default()
    }

    fn set_state(&mut self, style: CoffeeStyle) {
        self.ctx.set_state(style.code());
    }

    fn forward_set_state(&mut self, style: CoffeeStyle) {
        self.ctx.forward_set_state(style.code());
    }

    fn change_state(&mut self, style: CoffeeStyle) {
        self.ctx.change_state(style.code());
    }

    fn run(&mut self) {
        while self.ctx.more() {
            self.step();
            self.ctx.forward();
        }
        // Open block constructs are committed in their final styles.
        match self.state() {
            CoffeeStyle::CommentBlock => self.change_state(CoffeeStyle::Comment),
            CoffeeStyle::VerboseRegex => self.change_state(CoffeeStyle::Regex),
            CoffeeStyle::VerboseRegexComment => self.change_state(CoffeeStyle::CommentLine),
            _ => {}
        }
        self.ctx.complete();
    }

    fn step(&mut self) {
        // Line continuation.
        if self.ctx.ch == b'\\' && matches!(self.ctx.ch_next, b'\n' | b'\r') {
            self.ctx.forward();
            if self.ctx.ch == b'\r' && self.ctx.ch_next == b'\n' {
                self.ctx.forward();
            }
            return;
        }

        self.terminate();
        if self.state() == CoffeeStyle::Default {
            self.dispatch();
        }

        if !is_space(self.ctx.ch) && !self.state().is_space_equivalent() {
            self.prev_non_white = self.ctx.ch;
        }
    }

    /// End the current run if the cursor is past it.
    fn terminate(&mut self) {
        use CoffeeStyle as S;
        let ch = self.ctx.ch;
        match self.state() {
            S::Operator => self.set_state(S::Default),
            S::Number => {
                // Hex digits and suffixes ride along.
                if !self.words.is_word(ch) {
                    self.set_state(S::Default);
                }
            }
            S::Identifier => {
                if !self.words.is_word(ch) || ch == b'.' || ch == b'$' {
                    self.classify_identifier();
                    self.set_state(S::Default);
                }
            }
            S::Comment | S::CommentDoc => {
                if self.ctx.matches("*/") {
                    self.ctx.forward();
                    self.forward_set_state(S::Default);
                }
            }
            S::CommentLine => {
                if self.ctx.at_line_start {
                    self.set_state(S::Default);
                }
            }
            S::String | S::Character => {
                let quote = if self.state() == S::String { b'"' } else { b'\'' };
                if ch == b'\\' {
                    if matches!(self.ctx.ch_next, b'"' | b'\'' | b'\\') {
                        self.ctx.forward();
                    }
                } else if ch == quote {
                    self.forward_set_state(S::Default);
                }
            }
            S::Regex => {
                if self.ctx.at_line_start {
                    self.set_state(S::Default);
                } else if ch == b'/' {
                    self.ctx.forward();
                    while self.ctx.ch.is_ascii_lowercase() {
                        self.ctx.forward();
                    }
                    self.set_state(S::Default);
                } else if ch == b'\\' && matches!(self.ctx.ch_next, b'\\' | b'/') {
                    self.ctx.forward();
                }
            }
            S::Verbatim => {
                if ch == b'"' {
                    if self.ctx.ch_next == b'"' {
                        self.ctx.forward();
                    } else {
                        self.forward_set_state(S::Default);
                    }
                }
            }
            S::CommentBlock => {
                if self.ctx.matches("###") {
                    self.change_state(S::Comment);
                    self.ctx.forward_n(2);
                    self.forward_set_state(S::Default);
                } else if ch == b'\\' {
                    self.ctx.forward();
                }
            }
            S::VerboseRegex => {
                if self.ctx.matches("///") {
                    self.ctx.forward_n(2);
                    self.change_state(S::Regex);
                    self.forward_set_state(S::Default);
                } else if ch == b'#' {
                    self.change_state(S::Regex);
                    self.set_state(S::VerboseRegexComment);
                } else if ch == b'\\' {
                    self.ctx.forward();
                }
            }
            S::VerboseRegexComment => {
                if self.ctx.at_line_start {
                    self.change_state(S::Comment);
                    self.set_state(S::VerboseRegex);
                }
            }
            S::Default | S::Word | S::Word2 | S::GlobalClass => {}
        }
    }

    fn classify_identifier(&mut self) {
        let word = self.ctx.current_text();
        if self.keywords.get(0).contains(&word) {
            self.change_state(CoffeeStyle::Word);
        } else if self.keywords.get(1).contains(&word) {
            self.change_state(CoffeeStyle::Word2);
        } else if self.keywords.get(2).contains(&word) {
            self.change_state(CoffeeStyle::GlobalClass);
        }
    }

    /// Pick the run that starts at the cursor.
    fn dispatch(&mut self) {
        use CoffeeStyle as S;
        let ch = self.ctx.ch;
        if ch == b'@' && self.ctx.ch_next == b'"' {
            self.set_state(S::Verbatim);
            self.ctx.forward();
        } else if ch.is_ascii_digit() || (ch == b'.' && self.ctx.ch_next.is_ascii_digit()) {
            self.set_state(S::Number);
        } else if self.words.is_start(ch) || ch == b'@' || ch == b'$' {
            self.set_state(S::Identifier);
        } else if self.ctx.matches("/*") {
            let doc = self.ctx.matches("/**") || self.ctx.matches("/*!");
            self.set_state(if doc { S::CommentDoc } else { S::Comment });
            // The `*` must not close the comment it opens.
            self.ctx.forward();
        } else if self.ctx.matches("///") {
            self.set_state(S::VerboseRegex);
        } else if ch == b'/' && self.regex_allowed() {
            self.set_state(S::Regex);
        } else if ch == b'"' {
            self.set_state(S::String);
        } else if ch == b'\'' {
            self.set_state(S::Character);
        } else if ch == b'#' {
            self.set_state(if self.ctx.matches("###") { S::CommentBlock } else { S::CommentLine });
        } else if is_operator(ch) {
            self.set_state(S::Operator);
        }
    }

    fn regex_allowed(&self) -> bool {
        let pos = self.ctx.current_pos;
        let styler = self.ctx.styler();
        let after_operator = ok_before_regex(self.prev_non_white) || follows_return_keyword(styler, pos);
        let postfix = matches!(self.prev_non_white, b'+' | b'-') && follows_postfix_operator(styler, pos);
        after_operator && !postfix
    }
}

/// Whether `line` starts, after indentation, with a comment.
fn is_comment_line(styler: &Styler<'_>, line: usize) -> bool {
    let start = styler.line_start(line);
    let eol = styler.line_start(line + 1).saturating_sub(1);
    for pos in start..eol {
        match styler.char_at(pos) {
            b'#' => return true,
            b'/' if pos + 1 < eol && styler.char_at(pos + 1) == b'*' => return true,
            ch if is_space_or_tab(ch) => {}
            _ => return false,
        }
    }
    false
}

fn indent_raw(styler: &Styler<'_>, line: usize) -> i32 {
    styler.indent_amount(line).raw()
}

/// Indentation folding. Blank lines take the level of what surrounds them.
/// With `fold.coffeescript.comment` set, a run of comment lines becomes
/// its own fold under its first line; otherwise comments are folded into
/// the surrounding code.
pub fn fold_coffeescript(start: usize, length: usize, styler: &mut Styler<'_>) {
    if styler.is_empty() {
        return;
    }
    let white = FoldFlags::WHITE.bits();
    let header = FoldFlags::HEADER.bits();
    let number = |raw: i32| raw & FoldLevel::NUMBER_MASK;

    let max_lines = styler.line_of((start + length).saturating_sub(1));
    let doc_lines = styler.line_of(styler.len() - 1);
    let fold_comment = styler.property_int("fold.coffeescript.comment", 0) != 0;
    let compact = styler.property_int("fold.compact", 1) != 0;

    // Back up to a line with visible code so blank lines before the range
    // can be levelled too.
    let mut line = styler.line_of(start);
    let mut indent_current = indent_raw(styler, line);
    while line > 0 {
        line -= 1;
        indent_current = indent_raw(styler, line);
        if indent_current & white == 0 && !is_comment_line(styler, line) {
            break;
        }
    }
    let mut indent_current_level = number(indent_current);
    let mut prev_comment = line >= 1 && fold_comment && is_comment_line(styler, line - 1);

    while line <= doc_lines && (line <= max_lines || prev_comment) {
        let mut level = indent_current;
        let mut line_next = line + 1;
        let mut indent_next = if line_next <= doc_lines {
            indent_raw(styler, line_next)
        } else {
            indent_current
        };
        let comment = fold_comment && is_comment_line(styler, line);
        let comment_start = comment
            && !prev_comment
            && line_next <= doc_lines
            && is_comment_line(styler, line_next)
            && level > FoldLevel::BASE;
        let comment_continue = comment && prev_comment;
        if !comment {
            indent_current_level = number(indent_current);
        }
        if indent_next & white != 0 {
            indent_next = white | indent_current_level;
        }
        if comment_start {
            level |= header;
        } else if comment_continue {
            level += 1;
        }

        // Skip blank lines, and comment lines unless they fold themselves,
        // to find the indentation that decides this line's header flag.
        while line_next < doc_lines
            && (indent_next & white != 0 || (!fold_comment && is_comment_line(styler, line_next)))
        {
            line_next += 1;
            indent_next = indent_raw(styler, line_next);
        }

        let level_after = number(indent_next);
        let level_before = indent_current_level.max(level_after);
        let mut skip_level = level_after;
        for skip in (line + 1..line_next).rev() {
            let skip_indent = indent_raw(styler, skip);
            let raw = if compact {
                if number(skip_indent) > level_after {
                    skip_level = level_before;
                }
                skip_level | (skip_indent & white)
            } else {
                if number(skip_indent) > level_after
                    && skip_indent & white == 0
                    && !is_comment_line(styler, skip)
                {
                    skip_level = level_before;
                }
                skip_level
            };
            styler.set_level(skip, FoldLevel::from_raw(raw));
        }

        if !comment && indent_current & white == 0 && number(indent_current) < number(indent_next) {
            level |= header;
        }
        prev_comment = comment_start || comment_continue;
        styler.set_level(line, FoldLevel::from_raw(level));
        indent_current = indent_next;
        line = line_next;
    }
}

/// The CoffeeScript lexer. Keyword lists: keywords, secondary keywords,
/// global classes. `lexer.cpp.allow.dollars` (default on) admits `$` in
/// identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoffeeScriptLexer;

impl CoffeeScriptLexer {
    pub fn default_keywords() -> KeywordSets {
        KeywordSets::from_strs(&[KEYWORDS, SECONDARY_KEYWORDS, GLOBAL_CLASSES])
    }
}

impl Lexer for CoffeeScriptLexer {
    fn name(&self) -> &'static str {
        "coffeescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["coffee", "cson"]
    }

    fn word_list_descriptions(&self) -> &'static [&'static str] {
        &["Keywords", "Secondary keywords", "Global classes"]
    }

    fn lex(&self, start: usize, length: usize, _init_style: u8, keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = (start + length).min(styler.len());
        let (sync_start, prev_non_white) = synchronize_doc_start(styler, start);
        if sync_start != start {
            lexkit_core::trace!(requested = start, resumed = sync_start, "coffeescript resync");
        }
        let _span = lexkit_core::debug_span!("coffeescript", start, length, resumed = sync_start).entered();
        if end <= sync_start {
            return;
        }
        let words = WordChars {
            dollars: styler.property_int("lexer.cpp.allow.dollars", 1) != 0,
        };
        let ctx = StyleContext::new(sync_start, end - sync_start, CoffeeStyle::Default.code(), styler);
        let mut scan = Scan {
            ctx,
            keywords,
            words,
            prev_non_white,
        };
        scan.run();
    }

    fn fold(&self, start: usize, length: usize, _init_style: u8, _keywords: &KeywordSets, styler: &mut Styler<'_>) {
        fold_coffeescript(start, length, styler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexkit_core::{Properties, TextBuffer};

    fn lex_with(text: &str, props: &Properties) -> TextBuffer {
        let mut buf = TextBuffer::from(text);
        CoffeeScriptLexer.colourise_document(&mut buf, props, &CoffeeScriptLexer::default_keywords());
        buf
    }

    fn lex(text: &str) -> TextBuffer {
        lex_with(text, &Properties::new())
    }

    fn styles_of(buf: &TextBuffer, range: std::ops::Range<usize>) -> Vec<CoffeeStyle> {
        buf.styles()[range]
            .iter()
            .map(|&s| CoffeeStyle::from_u8(s).unwrap())
            .collect()
    }

    fn all(style: CoffeeStyle, n: usize) -> Vec<CoffeeStyle> {
        vec![style; n]
    }

    #[test]
    fn regex_after_assignment() {
        let buf = lex("x = /ab/g\n");
        assert_eq!(styles_of(&buf, 0..1), vec![CoffeeStyle::Identifier]);
        assert_eq!(styles_of(&buf, 2..3), vec![CoffeeStyle::Operator]);
        assert_eq!(styles_of(&buf, 4..9), all(CoffeeStyle::Regex, 5));
    }

    #[test]
    fn division_after_identifier() {
        let buf = lex("a = b / 2\n");
        assert_eq!(styles_of(&buf, 6..7), vec![CoffeeStyle::Operator]);
        assert_eq!(styles_of(&buf, 8..9), vec![CoffeeStyle::Number]);
    }

    #[test]
    fn regex_after_return() {
        let buf = lex("return /x/\n");
        assert_eq!(styles_of(&buf, 0..6), all(CoffeeStyle::Word, 6));
        assert_eq!(styles_of(&buf, 7..10), all(CoffeeStyle::Regex, 3));
    }

    #[test]
    fn division_after_postfix_increment() {
        let buf = lex("i++ / 2\n");
        assert_eq!(styles_of(&buf, 4..5), vec![CoffeeStyle::Operator]);
    }

    #[test]
    fn line_and_block_comments() {
        let buf = lex("# hi\nx\n");
        assert_eq!(styles_of(&buf, 0..5), all(CoffeeStyle::CommentLine, 5));
        assert_eq!(styles_of(&buf, 5..6), vec![CoffeeStyle::Identifier]);
        let buf = lex("###\nc\n###\nx");
        assert_eq!(styles_of(&buf, 0..9), all(CoffeeStyle::Comment, 9));
        assert_eq!(styles_of(&buf, 10..11), vec![CoffeeStyle::Identifier]);
    }

    #[test]
    fn verbose_regex_with_comment() {
        let buf = lex("///a # c\nb///\n");
        assert_eq!(styles_of(&buf, 0..5), all(CoffeeStyle::Regex, 5));
        assert_eq!(styles_of(&buf, 5..9), all(CoffeeStyle::Comment, 4));
        assert_eq!(styles_of(&buf, 9..13), all(CoffeeStyle::Regex, 4));
    }

    #[test]
    fn verbatim_string_doubles_quotes() {
        let buf = lex("@\"x\"\"y\"\n");
        assert_eq!(styles_of(&buf, 0..7), all(CoffeeStyle::Verbatim, 7));
    }

    #[test]
    fn keyword_lists() {
        let buf = lex("if Math then foo\n");
        assert_eq!(styles_of(&buf, 0..2), all(CoffeeStyle::Word, 2));
        assert_eq!(styles_of(&buf, 3..7), all(CoffeeStyle::GlobalClass, 4));
        assert_eq!(styles_of(&buf, 13..16), all(CoffeeStyle::Identifier, 3));
    }

    #[test]
    fn dollars_can_be_disallowed() {
        let buf = lex("$x 1$\n");
        assert_eq!(styles_of(&buf, 0..2), all(CoffeeStyle::Identifier, 2));
        assert_eq!(styles_of(&buf, 3..5), all(CoffeeStyle::Number, 2));
        let props = Properties::from_pairs([("lexer.cpp.allow.dollars", "0")]);
        let buf = lex_with("$x 1$\n", &props);
        assert_eq!(styles_of(&buf, 3..4), vec![CoffeeStyle::Number]);
        assert_eq!(styles_of(&buf, 4..5), vec![CoffeeStyle::Identifier]);
    }

    #[test]
    fn folds_on_indentation() {
        let buf = lex("class A\n  foo: ->\n    1\n  bar: 2\n");
        let levels = buf.fold_levels();
        let depths: Vec<i32> = levels.iter().take(4).map(|l| l.depth()).collect();
        assert_eq!(depths, vec![0, 2, 4, 2]);
        assert!(levels[0].is_header());
        assert!(levels[1].is_header());
        assert!(!levels[2].is_header());
    }

    #[test]
    fn comment_blocks_fold_when_enabled() {
        let text = "x\n  # a\n  # b\ny\n";
        let off = lex(text);
        assert!(!off.fold_levels()[1].is_header());

        let props = Properties::from_pairs([("fold.coffeescript.comment", "1")]);
        let on = lex_with(text, &props);
        let levels = on.fold_levels();
        assert!(levels[1].is_header());
        assert_eq!(levels[2].depth(), levels[1].depth() + 1);
        assert_eq!(levels[3].depth(), 0);
    }

    #[test]
    fn resumes_before_last_token() {
        let text = "a = 1\nb = /x/\nc = d / 2\ne = [1, /y/]\n";
        let full = lex(text);
        for resume_at in [text.find("c =").unwrap(), text.find("/y/").unwrap()] {
            let mut buf = full.clone();
            buf.reset_styles_from(resume_at);
            CoffeeScriptLexer.colourise_range(
                &mut buf,
                &Properties::new(),
                &CoffeeScriptLexer::default_keywords(),
                resume_at,
                text.len() - resume_at,
            );
            assert_eq!(buf.styles(), full.styles(), "resume at {resume_at}");
            assert_eq!(buf.fold_levels(), full.fold_levels(), "resume at {resume_at}");
        }
    }
}
