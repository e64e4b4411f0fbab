#![forbid(unsafe_code)]

//! Tcl lexer.
//!
//! Tcl has almost no lexical structure: braces quote, `"` quotes unless a
//! brace got there first, and whether `#` starts a comment depends on
//! being at the start of a command. The scanner tracks a best guess at
//! command starts, an escape flag flipped by each backslash, and brace
//! depth inside strings and comments. A `"` inside a braced body opens a
//! string that never closes; when an unbalanced `}` inside such a string
//! shows the enclosing body ending, the quote is restyled as a literal and
//! scanning restarts just after it.
//!
//! Fold levels are computed inline while styling.

use lexkit_core::chars::{is_high_bit, is_space};
use lexkit_core::{FoldAccumulator, KeywordSets, Lexer, Styler};

/// Default contents of keyword list 0.
pub const KEYWORDS: &str = "after append array auto_execok auto_import auto_load auto_mkindex \
    auto_qualify auto_reset bgerror binary break catch cd chan clock close concat continue \
    dict encoding eof error eval exec exit expr fblocked fconfigure fcopy file fileevent \
    flush for foreach format gets glob global if incr info interp join lappend lassign \
    lindex linsert list llength load lrange lrepeat lreplace lreverse lsearch lset lsort \
    namespace open package pid proc puts pwd read regexp regsub rename return scan seek \
    set socket source split string subst switch tell time trace unknown unset update \
    uplevel upvar variable vwait while";

/// Default contents of keyword list 1: Tk commands.
pub const TK_KEYWORDS: &str = "bell bind bindtags button canvas checkbutton clipboard destroy \
    entry event focus font frame grab grid image label labelframe listbox lower menu \
    menubutton message option pack panedwindow place radiobutton raise scale scrollbar \
    selection spinbox text tk tk_messageBox tkwait toplevel winfo wm";

/// Longest prefix of a word compared against the keyword lists.
const MAX_KEYWORD_LEN: usize = 40;
const STYLE_MASK: u8 = 31;
/// Lines to step back before looking for a resume point.
const MIN_LINES_UP: usize = 3;

/// Style codes written by the Tcl lexer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TclStyle {
    #[default]
    Default = 0,
    Number = 1,
    Word = 2,
    Comment = 3,
    String = 4,
    Literal = 6,
    Operator = 7,
    Identifier = 8,
    Variable = 10,
    Stdin = 12,
    Stdout = 13,
    Stderr = 14,
    Word2 = 15,
}

impl TclStyle {
    const ALL: [Self; 13] = [
        Self::Default,
        Self::Number,
        Self::Word,
        Self::Comment,
        Self::String,
        Self::Literal,
        Self::Operator,
        Self::Identifier,
        Self::Variable,
        Self::Stdin,
        Self::Stdout,
        Self::Stderr,
        Self::Word2,
    ];

    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as u8 == code)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn is_stdio(self) -> bool {
        matches!(self, Self::Stdin | Self::Stdout | Self::Stderr)
    }
}

fn style_of(styler: &Styler<'_>, pos: usize) -> TclStyle {
    TclStyle::from_u8(styler.style_at(pos) & STYLE_MASK).unwrap_or_default()
}

fn is_tcl_operator(ch: u8) -> bool {
    b"(){}[];!%^&*-=+|<>?/".contains(&ch)
}

/// Word bytes; Tcl words may contain dots.
fn is_tcl_word_char(ch: u8) -> bool {
    is_high_bit(ch) || ch.is_ascii_alphanumeric() || ch == b'.' || ch == b'_'
}

fn is_tcl_word_start(ch: u8) -> bool {
    is_high_bit(ch) || ch.is_ascii_alphanumeric() || ch == b'_'
}

/// Back up at least three lines, then further to a line that starts with
/// a keyword or comment, possibly after indentation.
fn synchronize_doc_start(styler: &Styler<'_>, start: usize) -> (usize, TclStyle) {
    if style_of(styler, start).is_stdio() {
        return (start, TclStyle::Default);
    }
    let mut line = styler.line_of(start).saturating_sub(MIN_LINES_UP);
    while line > 0 {
        let line_start = styler.line_start(line);
        match style_of(styler, line_start) {
            style @ (TclStyle::Word | TclStyle::Comment) => return (line_start, style),
            TclStyle::Default => {
                let line_end = styler.line_start(line + 1);
                let indented_keyword = (line_start..line_end)
                    .take_while(|&pos| matches!(styler.char_at(pos), b' ' | b'\t'))
                    .map(|pos| style_of(styler, pos + 1))
                    .find(|&style| style != TclStyle::Default)
                    == Some(TclStyle::Word);
                if indented_keyword {
                    return (line_start, TclStyle::Default);
                }
            }
            _ => break,
        }
        line -= 1;
    }
    (0, TclStyle::Default)
}

struct Scan<'s, 'a> {
    styler: &'s mut Styler<'a>,
    keywords: &'s KeywordSets,
    end: usize,
    i: usize,
    ch_prev: u8,
    ch: u8,
    ch_next: u8,
    state: TclStyle,
    in_escape: bool,
    string_braces: i32,
    comment_braces: i32,
    /// Opening quote of the current string, while it can still be undone.
    last_quote: Option<usize>,
    /// Fold bookkeeping as it stood at `last_quote`.
    held_fold: Option<FoldAccumulator>,
    cmd_start: bool,
    var_braced: bool,
    multi_line_string: bool,
    fold: FoldAccumulator,
    redo: bool,
}

impl<'s, 'a> Scan<'s, 'a> {
    fn load(&mut self) {
        self.ch = self.styler.char_at(self.i);
        self.ch_next = self.styler.safe_char_at(self.i + 1, 0);
    }

    fn advance(&mut self) {
        self.i += 1;
        self.load();
    }

    fn colour_before(&mut self, style: TclStyle) {
        if let Some(end) = self.i.checked_sub(1) {
            self.styler.colour_to(end, style.code());
        }
    }

    fn colour_to(&mut self, end: usize, style: TclStyle) {
        self.styler.colour_to(end, style.code());
    }

    fn classify_word(&mut self, start: usize, end: usize) {
        let first = self.styler.char_at(start);
        let word = self.styler.text_range(start, end.min(start + MAX_KEYWORD_LEN - 1));
        let style = if first.is_ascii_digit() || first == b'.' {
            TclStyle::Number
        } else if self.keywords.get(0).contains(&word) {
            TclStyle::Word
        } else if self.keywords.get(1).contains(&word) {
            TclStyle::Word2
        } else {
            TclStyle::Identifier
        };
        self.colour_to(end, style);
    }

    fn run(&mut self) {
        while self.i < self.end {
            self.load();

            if style_of(self.styler, self.i).is_stdio() {
                self.colour_before(self.state);
                while self.i < self.end && style_of(self.styler, self.i).is_stdio() {
                    self.i += 1;
                }
                self.styler.start_segment(self.i);
                self.state = TclStyle::Default;
                self.ch_prev = b' ';
                continue;
            }

            if self.ch_prev == b'\\' {
                // Scanning always starts at a line start, so flipping is
                // enough to pair escapes up.
                self.in_escape = !self.in_escape;
            } else if self.in_escape && !(self.ch_prev == b'\r' && self.ch == b'\n') {
                self.in_escape = false;
            }

            if !self.redo {
                if (self.ch == b'\r' && self.ch_next != b'\n') || self.ch == b'\n' {
                    self.fold.end_line(self.styler);
                } else if !is_space(self.ch) {
                    self.fold.note_visible();
                }
            }
            self.redo = false;

            match self.state {
                TclStyle::Default => self.scan_default(),
                TclStyle::Word => {
                    if !is_tcl_word_char(self.ch_next) {
                        self.classify_word(self.styler.segment_start(), self.i);
                        self.state = TclStyle::Default;
                    }
                }
                TclStyle::Variable => self.scan_variable(),
                TclStyle::Comment => self.scan_comment(),
                TclStyle::String => {
                    if self.scan_string() {
                        continue;
                    }
                }
                _ => {}
            }

            let ch = self.ch;
            self.cmd_start = (!self.in_escape && b"\r\n;[".contains(&ch))
                || (self.cmd_start && b" \t[{".contains(&ch));
            self.ch_prev = ch;
            if !self.redo {
                self.i += 1;
            }
        }
        self.finish();
    }

    fn finish(&mut self) {
        let Some(last) = self.end.checked_sub(1) else {
            return;
        };
        if self.state == TclStyle::Word {
            self.classify_word(self.styler.segment_start(), last);
        } else {
            self.colour_to(last, self.state);
        }
        self.fold.finish(self.styler);
    }

    fn scan_default(&mut self) {
        let ch = self.ch;
        if ch == b'#' && self.cmd_start {
            self.colour_before(self.state);
            self.state = TclStyle::Comment;
            self.comment_braces = 0;
        } else if ch == b'"' && !self.in_escape {
            self.colour_before(self.state);
            self.multi_line_string = false;
            self.state = TclStyle::String;
            self.string_braces = 0;
            self.last_quote = Some(self.i);
            self.held_fold = Some(self.fold.clone());
        } else if ch == b'$' {
            self.colour_before(self.state);
            if self.ch_next == b'{' {
                self.var_braced = true;
                self.advance();
                self.state = TclStyle::Variable;
            } else if is_tcl_word_char(self.ch_next) {
                self.var_braced = false;
                self.state = TclStyle::Variable;
            } else {
                self.colour_to(self.i, TclStyle::Operator);
            }
        } else if is_tcl_operator(ch) || ch == b':' {
            if ch == b'-' && self.ch_next.is_ascii_alphabetic() {
                // An `-option` word.
                self.colour_before(self.state);
                self.state = TclStyle::Word;
            } else {
                self.colour_before(self.state);
                self.colour_to(self.i, TclStyle::Operator);
                if !self.in_escape {
                    match ch {
                        b'{' | b'[' => {
                            self.fold.open();
                            self.cmd_start = true;
                        }
                        b'}' | b']' => self.fold.close(),
                        _ => {}
                    }
                }
            }
        } else if is_tcl_word_start(ch) {
            self.colour_before(self.state);
            if is_tcl_word_char(self.ch_next) {
                self.state = TclStyle::Word;
            } else {
                self.classify_word(self.i, self.i);
            }
        }
    }

    /// `$name`, `$ns::name` and `${any text}`. A variable may be followed
    /// directly by another one, as in `$a$b`.
    fn scan_variable(&mut self) {
        if is_tcl_word_char(self.ch_next) {
            return;
        }
        if self.var_braced {
            if self.ch_next == b'}' {
                self.var_braced = false;
                self.colour_to(self.i + 1, TclStyle::Variable);
                self.state = TclStyle::Default;
                self.advance();
            }
        } else if self.ch_next == b':' && self.styler.safe_char_at(self.i + 2, 0) == b':' {
            // Step onto the first colon so the second is not taken for
            // the end of the name.
            self.advance();
        } else {
            self.colour_to(self.i, TclStyle::Variable);
            self.state = TclStyle::Default;
        }
    }

    fn scan_comment(&mut self) {
        if self.in_escape {
            // A backslash continues the comment, even over a newline.
            return;
        }
        match self.ch {
            b'\r' | b'\n' => {
                self.colour_before(TclStyle::Comment);
                self.state = TclStyle::Default;
            }
            b'{' => self.comment_braces += 1,
            b'}' => {
                self.comment_braces -= 1;
                if self.comment_braces < 0 && self.fold.current() > self.fold.previous() {
                    // The comment sits in a body this brace closes.
                    self.colour_before(TclStyle::Comment);
                    self.state = TclStyle::Default;
                    self.redo = true;
                }
            }
            _ => {}
        }
    }

    /// Returns true when the scan was rewound to just after the opening
    /// quote.
    fn scan_string(&mut self) -> bool {
        if self.in_escape {
            return false;
        }
        match self.ch {
            b'\r' | b'\n' => {
                self.multi_line_string = true;
                self.cmd_start = true;
            }
            b'"' => {
                self.colour_to(self.i, TclStyle::String);
                self.state = TclStyle::Default;
            }
            b'{' => self.string_braces += 1,
            b'}' => {
                self.string_braces -= 1;
                if self.string_braces < 0 && self.inside_brace() {
                    return self.restyle_quote_as_literal();
                }
            }
            _ => {}
        }
        false
    }

    fn inside_brace(&self) -> bool {
        if self.fold.current() > self.fold.previous() {
            return true;
        }
        let line = self.fold.line().saturating_sub(1);
        self.styler.level_at(line).depth() > 0
    }

    /// The string opened by a lone `"` inside a braced body. Style the
    /// quote as a literal and rescan from the byte after it.
    fn restyle_quote_as_literal(&mut self) -> bool {
        self.state = TclStyle::Default;
        let Some(quote) = self.last_quote.take() else {
            self.colour_before(TclStyle::Literal);
            self.colour_to(self.i, TclStyle::Operator);
            return false;
        };
        if self.multi_line_string {
            self.styler.start_segment(quote);
            self.multi_line_string = false;
        }
        self.colour_to(quote, TclStyle::Literal);
        lexkit_core::trace!(quote, at = self.i, "tcl quote restyled as literal");
        if let Some(fold) = self.held_fold.take() {
            self.fold = fold;
        }
        self.ch_prev = b'"';
        self.i = quote + 1;
        true
    }
}

/// The Tcl lexer. Keyword list 0 holds Tcl commands, list 1 extension
/// commands such as Tk's.
#[derive(Debug, Clone, Copy, Default)]
pub struct TclLexer;

impl TclLexer {
    pub fn default_keywords() -> KeywordSets {
        KeywordSets::from_strs(&[KEYWORDS, TK_KEYWORDS])
    }
}

impl Lexer for TclLexer {
    fn name(&self) -> &'static str {
        "tcl"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tcl", "tk", "exp"]
    }

    fn word_list_descriptions(&self) -> &'static [&'static str] {
        &["Tcl keywords", "Extension keywords"]
    }

    fn lex(&self, start: usize, length: usize, _init_style: u8, keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = (start + length).min(styler.len());
        let (sync_start, state) = synchronize_doc_start(styler, start);
        if sync_start != start {
            lexkit_core::trace!(requested = start, resumed = sync_start, state = ?state, "tcl resync");
        }
        let _span = lexkit_core::debug_span!("tcl", start, length, resumed = sync_start).entered();
        if end <= sync_start {
            return;
        }
        let compact = styler.property_int("fold.compact", 1) != 0;
        let fold = FoldAccumulator::resume(styler, sync_start, compact);
        styler.start_at(sync_start);
        styler.start_segment(sync_start);
        let mut scan = Scan {
            styler,
            keywords,
            end,
            i: sync_start,
            ch_prev: b' ',
            ch: b' ',
            ch_next: b' ',
            state,
            in_escape: false,
            string_braces: 0,
            comment_braces: 0,
            last_quote: None,
            held_fold: None,
            cmd_start: true,
            var_braced: false,
            multi_line_string: false,
            fold,
            redo: false,
        };
        scan.run();
    }

    fn fold(&self, _start: usize, _length: usize, _init_style: u8, _keywords: &KeywordSets, _styler: &mut Styler<'_>) {
        // Levels are written while lexing.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexkit_core::{Properties, TextBuffer};
    use tracing_test::traced_test;

    fn lex(text: &str) -> TextBuffer {
        let mut buf = TextBuffer::from(text);
        TclLexer.colourise_document(&mut buf, &Properties::new(), &TclLexer::default_keywords());
        buf
    }

    fn styles_of(buf: &TextBuffer, range: std::ops::Range<usize>) -> Vec<TclStyle> {
        buf.styles()[range]
            .iter()
            .map(|&s| TclStyle::from_u8(s).unwrap())
            .collect()
    }

    fn all(style: TclStyle, n: usize) -> Vec<TclStyle> {
        vec![style; n]
    }

    #[test]
    fn command_words() {
        let buf = lex("set x 1\n");
        assert_eq!(styles_of(&buf, 0..3), all(TclStyle::Word, 3));
        assert_eq!(styles_of(&buf, 4..5), vec![TclStyle::Identifier]);
        assert_eq!(styles_of(&buf, 6..7), vec![TclStyle::Number]);
    }

    #[test]
    fn second_keyword_list() {
        let buf = lex("pack .b\n");
        assert_eq!(styles_of(&buf, 0..4), all(TclStyle::Word2, 4));
    }

    #[test]
    fn comment_only_at_command_start() {
        let buf = lex("# note {\nputs a#b\n");
        assert_eq!(styles_of(&buf, 0..8), all(TclStyle::Comment, 8));
        assert_eq!(styles_of(&buf, 9..13), all(TclStyle::Word, 4));
        assert_eq!(styles_of(&buf, 15..16), vec![TclStyle::Default]);
    }

    #[test]
    fn namespaced_and_braced_variables() {
        let buf = lex("puts $a::b $c\n");
        assert_eq!(styles_of(&buf, 5..10), all(TclStyle::Variable, 5));
        assert_eq!(styles_of(&buf, 11..13), all(TclStyle::Variable, 2));
        let buf = lex("puts ${a b}\n");
        assert_eq!(styles_of(&buf, 5..11), all(TclStyle::Variable, 6));
    }

    #[test]
    fn option_word() {
        let buf = lex("lsort -integer $l");
        assert_eq!(styles_of(&buf, 6..14), all(TclStyle::Identifier, 8));
    }

    #[test]
    fn quoted_string() {
        let buf = lex("puts \"a b\"\n");
        assert_eq!(styles_of(&buf, 5..10), all(TclStyle::String, 5));
    }

    #[test]
    fn lone_quote_in_body_becomes_literal() {
        let text = "proc f {} {\n  puts \"\n}\n";
        let buf = lex(text);
        assert_eq!(styles_of(&buf, 19..20), vec![TclStyle::Literal]);
        assert_eq!(styles_of(&buf, 21..22), vec![TclStyle::Operator]);
        let depths: Vec<i32> = buf.fold_levels().iter().map(|l| l.depth()).collect();
        assert_eq!(&depths[..4], &[0, 1, 1, 0]);
        assert!(buf.fold_levels()[0].is_header());
    }

    #[test]
    #[traced_test]
    fn literal_rewind_is_traced() {
        lex("proc f {} {\n  puts \"\n}\n");
        assert!(logs_contain("tcl quote restyled as literal"));
    }

    #[test]
    fn resumes_from_keyword_line() {
        let text = "proc a {} {\n  set x 1\n}\nset y 2\nset z 3\nset w 4\nputs $w\n";
        let full = lex(text);
        let resume_at = text.find("puts").unwrap();
        let mut buf = full.clone();
        buf.reset_styles_from(resume_at);
        TclLexer.colourise_range(
            &mut buf,
            &Properties::new(),
            &TclLexer::default_keywords(),
            resume_at,
            text.len() - resume_at,
        );
        assert_eq!(buf.styles(), full.styles());
        assert_eq!(buf.fold_levels(), full.fold_levels());
    }
}
