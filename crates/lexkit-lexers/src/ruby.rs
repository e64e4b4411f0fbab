#![forbid(unsafe_code)]

//! Ruby lexer.
//!
//! A byte-at-a-time state machine. Every byte is first offered to the
//! active state, which either extends its run or commits it; the default
//! state then dispatches the byte into a new run. Context that survives a
//! line start (whether a regex may follow, the pending `class`/`module`/
//! `def` keyword) is persisted in the line-state word so a later pass can
//! resume at that line.
//!
//! Folding echoes block structure: brackets, block-opening keywords that
//! are not trailing modifiers, `end`, and `=begin`/`=end` documentation.

use lexkit_core::chars::{
    is_digit, is_eol, is_operator, is_safe_alnum, is_safe_alpha, is_space, is_space_or_tab,
    is_word_char, is_word_start,
};
use lexkit_core::{FoldAccumulator, KeywordSets, Lexer, Styler, WordList};
use smallvec::SmallVec;

use crate::heredoc::{HereDoc, HereDocPhase};
use crate::quote::{QuoteContext, QuoteStep};
use crate::scan::{bounded_word, is_line_start, is_match, prev_non_newline_pos, skip_whitespace};

/// Keywords handed to the lexer when the host supplies none.
pub const KEYWORDS: &str = "__FILE__ __LINE__ BEGIN END alias and begin break case class def \
    defined? do else elsif end ensure false for if in module next nil not or redo rescue \
    retry return self super then true undef unless until when while yield";

/// Depth of `#{...}` nesting tracked inside interpolating literals.
const INNER_EXPRESSION_MAX: usize = 5;
const MAX_KEYWORD_LEN: usize = 200;
/// Style codes are compared with the indicator bits masked off.
const STYLE_MASK: u8 = 63;

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// Style codes written by the Ruby lexer. Each also names a scanner state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RubyStyle {
    #[default]
    Default = 0,
    Error = 1,
    CommentLine = 2,
    Pod = 3,
    Number = 4,
    Word = 5,
    String = 6,
    Character = 7,
    ClassName = 8,
    DefName = 9,
    Operator = 10,
    Identifier = 11,
    Regex = 12,
    Global = 13,
    Symbol = 14,
    ModuleName = 15,
    InstanceVar = 16,
    ClassVar = 17,
    Backticks = 18,
    DataSection = 19,
    HereDelim = 20,
    HereQ = 21,
    HereQq = 22,
    HereQx = 23,
    StringQ = 24,
    StringQq = 25,
    StringQx = 26,
    StringQr = 27,
    StringQw = 28,
    WordDemoted = 29,
    Stdin = 30,
    Stdout = 31,
    Stderr = 40,
}

impl RubyStyle {
    const ALL: [Self; 33] = [
        Self::Default,
        Self::Error,
        Self::CommentLine,
        Self::Pod,
        Self::Number,
        Self::Word,
        Self::String,
        Self::Character,
        Self::ClassName,
        Self::DefName,
        Self::Operator,
        Self::Identifier,
        Self::Regex,
        Self::Global,
        Self::Symbol,
        Self::ModuleName,
        Self::InstanceVar,
        Self::ClassVar,
        Self::Backticks,
        Self::DataSection,
        Self::HereDelim,
        Self::HereQ,
        Self::HereQq,
        Self::HereQx,
        Self::StringQ,
        Self::StringQq,
        Self::StringQx,
        Self::StringQr,
        Self::StringQw,
        Self::WordDemoted,
        Self::Stdin,
        Self::Stdout,
        Self::Stderr,
    ];

    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as u8 == code)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Styles of interactive-shell transcripts.
    pub const fn is_stdio(self) -> bool {
        matches!(self, Self::Stdin | Self::Stdout | Self::Stderr)
    }

    /// Runs that must be closed explicitly and are flagged as errors when
    /// the document ends inside them.
    pub const fn needs_terminator(self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Character
                | Self::Backticks
                | Self::Regex
                | Self::HereQ
                | Self::StringQ
                | Self::StringQq
                | Self::StringQx
                | Self::StringQr
                | Self::StringQw
        )
    }
}

/// Style at `pos`; codes this lexer never writes read as [`RubyStyle::Error`].
fn style_of(styler: &Styler<'_>, pos: usize) -> RubyStyle {
    RubyStyle::from_u8(styler.style_at(pos) & STYLE_MASK).unwrap_or(RubyStyle::Error)
}

// ---------------------------------------------------------------------------
// Persisted line context
// ---------------------------------------------------------------------------

/// Keyword whose name-bearing successor gets a special style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NamingKeyword {
    #[default]
    None,
    Class,
    Module,
    Def,
}

impl NamingKeyword {
    fn of(word: &[u8]) -> Self {
        match word {
            b"class" => Self::Class,
            b"module" => Self::Module,
            b"def" => Self::Def,
            _ => Self::None,
        }
    }

    fn word(self) -> &'static [u8] {
        match self {
            Self::None => b"",
            Self::Class => b"class",
            Self::Module => b"module",
            Self::Def => b"def",
        }
    }
}

/// Scanner context at the start of a line.
///
/// Wire format of the line-state word: bit 0 is the regex preference, bits
/// 1-2 the pending naming keyword, and bit 8 marks the line as a point the
/// scanner may resume from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineCarry {
    resumable: bool,
    prefer_re: bool,
    naming: NamingKeyword,
}

impl LineCarry {
    const PREFER_RE: i32 = 0x1;
    const NAMING_SHIFT: i32 = 1;
    const NAMING_MASK: i32 = 0x3;
    const RESUMABLE: i32 = 0x100;

    const fn fresh() -> Self {
        Self {
            resumable: true,
            prefer_re: true,
            naming: NamingKeyword::None,
        }
    }

    fn pack(self) -> i32 {
        let mut word = (self.naming as i32) << Self::NAMING_SHIFT;
        if self.prefer_re {
            word |= Self::PREFER_RE;
        }
        if self.resumable {
            word |= Self::RESUMABLE;
        }
        word
    }

    fn unpack(word: i32) -> Self {
        let naming = match (word >> Self::NAMING_SHIFT) & Self::NAMING_MASK {
            1 => NamingKeyword::Class,
            2 => NamingKeyword::Module,
            3 => NamingKeyword::Def,
            _ => NamingKeyword::None,
        };
        Self {
            resumable: word & Self::RESUMABLE != 0,
            prefer_re: word & Self::PREFER_RE != 0,
            naming,
        }
    }
}

// ---------------------------------------------------------------------------
// Resynchronization
// ---------------------------------------------------------------------------

/// Walk back from `start` to a line the scanner can resume at.
///
/// A line qualifies when the byte ending the previous line is
/// default-styled, that line is not a `\` continuation and declares no
/// here-document, and the persisted context says the scanner was at top
/// level. Interactive-shell styles are accepted on sight.
fn synchronize_doc_start(styler: &Styler<'_>, start: usize) -> (usize, LineCarry) {
    let mut line = styler.line_of(start);
    let mut carry = LineCarry::fresh();
    while line > 0 {
        let Some(mut pos) = prev_non_newline_pos(styler, line) else {
            line = 0;
            break;
        };
        let style = style_of(styler, pos);
        if style.is_stdio() {
            break;
        } else if styler.char_at(pos) == b'\\' {
            // Continuation line.
        } else if style_of(styler, pos + 1) != RubyStyle::Default {
            // Inside a multi-line construct.
        } else if let Some(delim) = here_delim_on_line(styler, pos) {
            pos = delim;
        } else {
            let saved = LineCarry::unpack(styler.line_state(line));
            if saved.resumable {
                carry = saved;
                break;
            }
        }
        line = styler.line_of(pos);
    }
    if line == 0 {
        carry = LineCarry::fresh();
    }
    (styler.line_start(line), carry)
}

/// Position of a here-document delimiter on the line ending at `pos`.
fn here_delim_on_line(styler: &Styler<'_>, pos: usize) -> Option<usize> {
    if pos <= 1 {
        return None;
    }
    let mut cursor = pos - 1;
    while cursor > 0 {
        if is_eol(styler.char_at(cursor)) {
            return None;
        }
        if style_of(styler, cursor) == RubyStyle::HereDelim {
            return Some(cursor);
        }
        cursor -= 1;
    }
    None
}

// ---------------------------------------------------------------------------
// Keyword classification
// ---------------------------------------------------------------------------

/// Whether the word starting after `pos` is a method name: only spaces
/// separate it from a `.` operator.
fn follows_dot(styler: &Styler<'_>, pos: usize) -> bool {
    let mut pos = pos;
    while pos >= 1 {
        match style_of(styler, pos) {
            RubyStyle::Default => {
                if !is_space_or_tab(styler.char_at(pos)) {
                    return false;
                }
            }
            RubyStyle::Operator => return styler.char_at(pos) == b'.',
            _ => return false,
        }
        pos -= 1;
    }
    false
}

/// Keywords that can either lead a statement or trail one as a modifier.
fn keyword_is_ambiguous(word: &[u8]) -> bool {
    matches!(word, b"if" | b"do" | b"while" | b"unless" | b"until")
}

/// Text of the run of `word_style` bytes ending at `pos`.
fn prev_word(styler: &Styler<'_>, pos: usize, word_style: RubyStyle) -> Vec<u8> {
    let floor = pos.saturating_sub(MAX_KEYWORD_LEN);
    let mut start = pos;
    while start > floor && style_of(styler, start - 1) == word_style {
        start -= 1;
    }
    styler.text_range(start, pos)
}

/// Whether the ambiguous keyword `word` starting at `pos` trails a
/// statement on its line.
fn keyword_is_modifier(styler: &Styler<'_>, word: &[u8], pos: usize) -> bool {
    if word == b"do" {
        return keyword_do_starts_loop(styler, pos);
    }
    let line_start = styler.line_start(styler.line_of(pos));
    let mut cursor = pos;
    let mut found = None;
    while cursor > line_start {
        cursor -= 1;
        let style = style_of(styler, cursor);
        if style == RubyStyle::Default {
            if is_eol(styler.char_at(cursor)) {
                return false;
            }
        } else {
            found = Some(style);
            break;
        }
    }
    let Some(style) = found else {
        return false;
    };
    match style {
        RubyStyle::Default
        | RubyStyle::CommentLine
        | RubyStyle::Pod
        | RubyStyle::ClassName
        | RubyStyle::DefName
        | RubyStyle::ModuleName => false,
        RubyStyle::Operator => matches!(styler.char_at(cursor), b')' | b']' | b'}'),
        RubyStyle::Word if word == b"if" => {
            prev_word(styler, cursor, RubyStyle::Word).as_slice() != b"else"
        }
        _ => true,
    }
}

/// Whether a `do` at `pos` is the noise word of a `while`/`until`/`for`
/// on the same line.
fn keyword_do_starts_loop(styler: &Styler<'_>, pos: usize) -> bool {
    let line_start = styler.line_start(styler.line_of(pos));
    let mut cursor = pos;
    while cursor > line_start {
        cursor -= 1;
        match style_of(styler, cursor) {
            RubyStyle::Default => {
                if is_eol(styler.char_at(cursor)) {
                    return false;
                }
            }
            RubyStyle::Word => {
                let mut first = cursor;
                while first > line_start && style_of(styler, first - 1) == RubyStyle::Word {
                    first -= 1;
                }
                if matches!(
                    styler.text_range(first, cursor).as_slice(),
                    b"while" | b"until" | b"for"
                ) {
                    return true;
                }
                cursor = first;
            }
            RubyStyle::Operator if styler.char_at(cursor) == b';' => return false,
            _ => {}
        }
    }
    false
}

/// Kernel methods that commonly take a string or regex argument.
fn re_can_follow_identifier(word: &[u8]) -> bool {
    matches!(
        word,
        b"eval"
            | b"exec"
            | b"open"
            | b"p"
            | b"print"
            | b"printf"
            | b"puts"
            | b"require"
            | b"split"
            | b"sprintf"
            | b"system"
    )
}

/// Keywords after which an expression starts.
fn re_can_follow_keyword(word: &[u8]) -> bool {
    matches!(
        word,
        b"and"
            | b"begin"
            | b"break"
            | b"case"
            | b"do"
            | b"else"
            | b"elsif"
            | b"if"
            | b"next"
            | b"return"
            | b"when"
            | b"unless"
            | b"until"
            | b"not"
            | b"or"
    )
}

// ---------------------------------------------------------------------------
// Here-document heuristics
// ---------------------------------------------------------------------------

/// `<<` at `lt_pos` starts a here-document unless the line opens with
/// `undef`, `def`, or `alias`. Records the line's first word in
/// `prev_word`.
fn sure_this_is_heredoc(styler: &Styler<'_>, lt_pos: usize, prev_word: &mut Vec<u8>) -> bool {
    let line_start = styler.line_start(styler.line_of(lt_pos));
    let first = skip_whitespace(styler, line_start, lt_pos);
    if first >= lt_pos {
        return true;
    }
    let first_style = style_of(styler, first);
    if !matches!(
        first_style,
        RubyStyle::Word | RubyStyle::WordDemoted | RubyStyle::Identifier
    ) {
        return true;
    }
    let mut end = first;
    while end < lt_pos && style_of(styler, end) == first_style {
        end += 1;
    }
    *prev_word = styler.text_range(first, end - 1);
    !matches!(prev_word.as_slice(), b"undef" | b"def" | b"alias")
}

/// Whether the document at `pos` repeats `target_start..target_end`.
fn have_target_match(styler: &Styler<'_>, pos: usize, target_start: usize, target_end: usize) -> bool {
    let len = styler.len();
    let target_len = target_end - target_start;
    if len.saturating_sub(pos) < target_len {
        return false;
    }
    (0..target_len).all(|k| styler.char_at(target_start + k) == styler.char_at(pos + k))
}

/// Resolve `name <<target` where `name` is a plain identifier.
///
/// Ruby decides by whether `name` is a local variable; lacking a symbol
/// table, this looks ahead up to 50 lines for a line starting with the
/// target. Returns `true` when `<<` is certainly an operator.
fn sure_this_is_not_heredoc(styler: &Styler<'_>, lt_pos: usize) -> bool {
    const NOT_HEREDOC: bool = true;
    const LOOKS_LIKE_HEREDOC: bool = false;

    let len = styler.len();
    let line = styler.line_of(lt_pos);
    let line_start = styler.line_start(line);

    let mut pos = skip_whitespace(styler, line_start, lt_pos);
    if pos >= lt_pos {
        return NOT_HEREDOC;
    }
    let first_style = style_of(styler, pos);
    if first_style != RubyStyle::Identifier {
        return NOT_HEREDOC;
    }
    // Accept `a.b::c` chains.
    pos += 1;
    while pos <= lt_pos {
        let mut style = first_style;
        while pos <= lt_pos {
            style = style_of(styler, pos);
            if style != first_style {
                break;
            }
            pos += 1;
        }
        if pos < lt_pos && style == RubyStyle::Operator {
            match styler.char_at(pos) {
                b'.' => {}
                b':' => {
                    pos += 1;
                    if style_of(styler, pos) != RubyStyle::Operator || styler.char_at(pos) != b':' {
                        return NOT_HEREDOC;
                    }
                }
                _ => break,
            }
        } else {
            break;
        }
        pos += 1;
    }
    if skip_whitespace(styler, pos, lt_pos) != lt_pos {
        return NOT_HEREDOC;
    }
    let mut j = lt_pos + 1;
    if style_of(styler, j) != RubyStyle::Operator || styler.char_at(j) != b'<' {
        return NOT_HEREDOC;
    }
    let next_line_start = styler.line_start(line + 1);
    if next_line_start >= len {
        return NOT_HEREDOC;
    }
    j = skip_whitespace(styler, j + 1, next_line_start);
    if j >= len {
        return NOT_HEREDOC;
    }
    let allow_indent = styler.char_at(j) == b'-';
    if allow_indent {
        j += 1;
    }
    let target_quote = match styler.char_at(j) {
        q @ (b'\'' | b'"' | b'`') => {
            j += 1;
            Some(q)
        }
        _ => None,
    };
    if !is_safe_alnum(styler.char_at(j)) {
        return NOT_HEREDOC;
    }
    let target_start = j;
    let mut target_end = j;
    j += 1;
    while j < len {
        let ch = styler.char_at(j);
        if !is_safe_alnum(ch) {
            if target_quote.is_some_and(|q| q != ch) {
                return NOT_HEREDOC;
            }
            target_end = j;
            if target_quote.is_some() {
                j += 1;
            }
            j = skip_whitespace(styler, j, len);
            if j >= len {
                return NOT_HEREDOC;
            }
            let ch = styler.char_at(j);
            if ch == b'#' || is_eol(ch) {
                break;
            }
            return NOT_HEREDOC;
        }
        j += 1;
    }

    let last_line = styler.line_of(len.saturating_sub(1)).min(line + 50);
    for candidate in line + 1..=last_line {
        let start = styler.line_start(candidate);
        let at = if allow_indent {
            skip_whitespace(styler, start, len)
        } else {
            start
        };
        if have_target_match(styler, at, target_start, target_end) {
            return LOOKS_LIKE_HEREDOC;
        }
    }
    NOT_HEREDOC
}

/// Whether the indentable terminator `delimiter` starts at `pos` with only
/// blanks before it on its line.
fn looking_at_here_doc_delim(styler: &Styler<'_>, pos: usize, limit: usize, delimiter: &[u8]) -> bool {
    if !is_match(styler, limit, pos, delimiter) {
        return false;
    }
    let mut cursor = pos;
    while cursor > 1 {
        cursor -= 1;
        let ch = styler.char_at(cursor);
        if is_eol(ch) {
            return true;
        }
        if !is_space_or_tab(ch) {
            return false;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// `%` literal selectors and the states they open.
const Q_CHARS: &[u8] = b"qQrwWx";
const Q_STATES: [RubyStyle; 6] = [
    RubyStyle::StringQ,
    RubyStyle::StringQq,
    RubyStyle::StringQr,
    RubyStyle::StringQw,
    RubyStyle::StringQw,
    RubyStyle::StringQx,
];

/// A literal suspended while its `#{...}` expression is scanned.
#[derive(Debug, Clone, Copy)]
struct InnerExpression {
    state: RubyStyle,
    brace_count: i32,
    quote: QuoteContext,
}

struct Scan<'s, 'a> {
    styler: &'s mut Styler<'a>,
    keywords: &'s WordList,
    end: usize,
    i: usize,
    ch_prev: u8,
    ch: u8,
    ch_next: u8,
    ch_next2: u8,
    /// Re-examine the current byte in the default state.
    redo: bool,
    state: RubyStyle,
    prefer_re: bool,
    prev_word: Vec<u8>,
    quote: QuoteContext,
    here_doc: HereDoc,
    inner: SmallVec<[InnerExpression; INNER_EXPRESSION_MAX]>,
    brace_count: i32,
    is_real_number: bool,
    num_dots: u32,
    num_exponents: u32,
}

impl<'s, 'a> Scan<'s, 'a> {
    fn new(styler: &'s mut Styler<'a>, keywords: &'s WordList, start: usize, end: usize, carry: LineCarry) -> Self {
        let ch_prev = styler.char_before(start, b' ');
        Self {
            styler,
            keywords,
            end,
            i: start,
            ch_prev,
            ch: b' ',
            ch_next: b' ',
            ch_next2: b' ',
            redo: false,
            state: RubyStyle::Default,
            prefer_re: carry.prefer_re,
            prev_word: carry.naming.word().to_vec(),
            quote: QuoteContext::new(),
            here_doc: HereDoc::new(),
            inner: SmallVec::new(),
            brace_count: 0,
            is_real_number: true,
            num_dots: 0,
            num_exponents: 0,
        }
    }

    fn load(&mut self) {
        self.ch = self.styler.char_at(self.i);
        self.ch_next = self.styler.char_at(self.i + 1);
        self.ch_next2 = self.styler.char_at(self.i + 2);
    }

    fn advance(&mut self) {
        self.advance_by(1);
    }

    fn advance_by(&mut self, n: usize) {
        self.i += n;
        self.load();
    }

    /// Finish the current run and re-scan this byte from the default state.
    fn redo_char(&mut self) {
        self.redo = true;
        self.state = RubyStyle::Default;
    }

    /// Commit the run up to, not including, the current byte.
    fn colour_before(&mut self, style: RubyStyle) {
        if let Some(end) = self.i.checked_sub(1) {
            self.styler.colour_to(end, style.code());
        }
    }

    fn colour_to(&mut self, end: usize, style: RubyStyle) {
        self.styler.colour_to(end, style.code());
    }

    fn carry(&self) -> LineCarry {
        LineCarry {
            resumable: self.state == RubyStyle::Default
                && self.inner.is_empty()
                && !matches!(
                    self.here_doc.phase,
                    HereDocPhase::Delimiter | HereDocPhase::Body
                ),
            prefer_re: self.prefer_re,
            naming: NamingKeyword::of(&self.prev_word),
        }
    }

    fn run(&mut self) {
        while self.i < self.end {
            self.load();
            if is_line_start(self.styler, self.i) {
                let line = self.styler.line_of(self.i);
                let word = self.carry().pack();
                self.styler.set_line_state(line, word);
            }

            if self.here_doc.phase == HereDocPhase::Delimiter && is_eol(self.ch) {
                // The body starts on the next line.
                self.here_doc.phase = HereDocPhase::Body;
                self.colour_before(self.state);
                self.state = RubyStyle::HereQ;
            }

            match self.state {
                RubyStyle::Default => self.scan_default(),
                RubyStyle::Word => self.scan_word(),
                RubyStyle::Number => self.scan_number(),
                RubyStyle::CommentLine => {
                    if is_eol(self.ch) {
                        self.colour_before(self.state);
                        self.state = RubyStyle::Default;
                    }
                }
                RubyStyle::HereDelim => self.scan_here_delim(),
                RubyStyle::HereQ => self.scan_here_body(),
                RubyStyle::ClassVar | RubyStyle::InstanceVar => {
                    if !is_word_char(self.ch) {
                        self.colour_before(self.state);
                        self.redo_char();
                        self.prefer_re = false;
                    }
                }
                RubyStyle::Symbol => self.scan_symbol(),
                RubyStyle::Global => self.scan_global(),
                RubyStyle::Pod => {
                    if matches!(self.ch, b' ' | b'\t' | b'\n' | b'\r')
                        && self.i > 5
                        && is_eol(self.styler.char_at(self.i - 5))
                        && is_match(self.styler, self.end, self.i - 4, b"=end")
                    {
                        self.colour_before(self.state);
                        self.state = RubyStyle::Default;
                        self.prefer_re = false;
                    }
                }
                RubyStyle::Regex | RubyStyle::StringQr => self.scan_regex(),
                RubyStyle::StringQ
                | RubyStyle::StringQq
                | RubyStyle::StringQx
                | RubyStyle::StringQw
                | RubyStyle::String
                | RubyStyle::Character
                | RubyStyle::Backticks => self.scan_string(),
                RubyStyle::Error => {
                    if is_eol(self.ch) {
                        self.colour_before(RubyStyle::Error);
                        self.redo_char();
                    }
                }
                _ => {}
            }

            self.ch_prev = self.ch;
            if self.redo {
                self.redo = false;
            } else {
                self.i += 1;
            }
        }
        self.finish();
    }

    fn finish(&mut self) {
        let Some(last) = self.end.checked_sub(1) else {
            return;
        };
        if self.state == RubyStyle::Word {
            let start = self.styler.segment_start();
            let word = bounded_word(self.styler, start, last, MAX_KEYWORD_LEN);
            self.classify_word(start, last, &word);
        } else if self.end >= self.styler.len() && self.state.needs_terminator() {
            lexkit_core::debug!(
                state = ?self.state,
                from = self.styler.segment_start(),
                "unterminated literal at end of document"
            );
            self.colour_to(last, RubyStyle::Error);
        } else {
            self.colour_to(last, self.state);
        }
    }

    // -- Default dispatch ---------------------------------------------------

    fn scan_default(&mut self) {
        let ch = self.ch;
        if is_digit(ch) {
            self.colour_before(self.state);
            self.state = RubyStyle::Number;
            self.is_real_number = true;
            self.num_dots = 0;
            self.num_exponents = 0;
        } else if is_word_start(ch) {
            self.colour_before(self.state);
            self.state = RubyStyle::Word;
        } else if ch == b'#' {
            self.colour_before(self.state);
            self.state = RubyStyle::CommentLine;
        } else if ch == b'=' {
            let begins_pod = self.i == 0
                || (is_eol(self.ch_prev)
                    && self.styler.match_at(self.i + 1, b"begin")
                    && !is_word_char(self.styler.char_at(self.i + 6)));
            self.colour_before(self.state);
            if begins_pod {
                self.state = RubyStyle::Pod;
            } else {
                self.colour_to(self.i, RubyStyle::Operator);
                self.prefer_re = true;
            }
        } else if ch == b'"' {
            self.open_literal(RubyStyle::String);
        } else if ch == b'\'' {
            self.open_literal(RubyStyle::Character);
        } else if ch == b'`' {
            self.open_literal(RubyStyle::Backticks);
        } else if ch == b'@' {
            self.colour_before(self.state);
            if self.ch_next == b'@' {
                self.state = RubyStyle::ClassVar;
                self.advance();
            } else {
                self.state = RubyStyle::InstanceVar;
            }
        } else if ch == b'$' {
            self.colour_before(self.state);
            self.state = RubyStyle::Global;
        } else if ch == b'/' && self.prefer_re {
            self.open_literal(RubyStyle::Regex);
        } else if ch == b'<' && self.ch_next == b'<' && self.ch_next2 != b'=' {
            self.scan_shift_or_heredoc();
        } else if ch == b':' {
            self.scan_colon();
        } else if ch == b'%' {
            self.scan_percent();
        } else if ch == b'?' {
            self.colour_before(self.state);
            if is_space_or_tab(self.ch_next) || is_eol(self.ch_next) {
                self.colour_to(self.i, RubyStyle::Operator);
            } else {
                // A character literal such as ?a or ?\n.
                self.state = RubyStyle::Number;
                self.is_real_number = false;
            }
        } else if is_operator(ch) {
            self.scan_operator();
        } else if is_eol(ch) {
            if (ch == b'\r' || (ch == b'\n' && self.ch_prev != b'\r')) && self.ch_prev != b'\\' {
                self.prefer_re = true;
            }
        }
    }

    fn open_literal(&mut self, state: RubyStyle) {
        self.colour_before(self.state);
        self.state = state;
        self.quote.reset(1);
        self.quote.open(self.ch);
    }

    fn scan_shift_or_heredoc(&mut self) {
        self.colour_before(self.state);
        self.advance();
        self.colour_to(self.i, RubyStyle::Operator);
        let lt_pos = self.i - 1;
        let after = self.ch_next;
        if !(matches!(after, b'"' | b'\'' | b'`' | b'_' | b'-') || is_safe_alpha(after)) {
            // Ruby's own lexer never reads a here-document target here.
        } else if self.prefer_re {
            if sure_this_is_heredoc(self.styler, lt_pos, &mut self.prev_word) {
                self.state = RubyStyle::HereDelim;
                self.here_doc.introduce();
            }
        } else if !sure_this_is_not_heredoc(self.styler, lt_pos) {
            self.state = RubyStyle::HereDelim;
            self.here_doc.introduce();
        }
        self.prefer_re = self.state != RubyStyle::HereDelim;
    }

    fn scan_colon(&mut self) {
        self.colour_before(self.state);
        let next = self.ch_next;
        if next == b':' {
            self.colour_to(self.i + 1, RubyStyle::Operator);
            self.advance();
            self.state = RubyStyle::Default;
            self.prefer_re = false;
        } else if is_word_char(next) {
            self.state = RubyStyle::Symbol;
        } else if b"[*!~+-/%=<>&^|".contains(&next) {
            // Operator method names such as :[]=, :**, :<=>.
            let next2 = self.ch_next2;
            let mut colour = true;
            match next {
                b'[' => {
                    if next2 == b']' {
                        let n = if self.styler.char_at(self.i + 3) == b'=' { 3 } else { 2 };
                        self.advance_by(n);
                    } else {
                        colour = false;
                    }
                }
                b'*' => self.advance_by(if next2 == b'*' { 2 } else { 1 }),
                b'!' => self.advance_by(if matches!(next2, b'=' | b'~') { 2 } else { 1 }),
                b'<' => {
                    if next2 == b'<' {
                        self.advance_by(2);
                    } else if next2 == b'=' {
                        let n = if self.styler.char_at(self.i + 3) == b'>' { 3 } else { 2 };
                        self.advance_by(n);
                    } else {
                        self.advance();
                    }
                }
                _ => self.advance(),
            }
            if colour {
                self.colour_to(self.i, RubyStyle::Symbol);
                self.state = RubyStyle::Default;
            }
        } else if matches!(next, b' ' | b'\t' | b'\r' | b'\n') {
            self.colour_to(self.i, RubyStyle::Operator);
            self.state = RubyStyle::Default;
            self.prefer_re = true;
        } else if !self.prefer_re {
            self.colour_to(self.i, RubyStyle::Symbol);
            self.state = RubyStyle::Default;
        } else {
            self.colour_to(self.i, RubyStyle::Operator);
            self.state = RubyStyle::Default;
            self.prefer_re = true;
        }
    }

    fn scan_percent(&mut self) {
        self.colour_before(self.state);
        let mut have_string = false;
        let selector = Q_CHARS.iter().position(|&c| c == self.ch_next);
        match selector {
            Some(index) if !is_word_char(self.ch_next2) => {
                self.quote.reset(1);
                self.state = Q_STATES[index];
                self.quote.open(self.ch_next2);
                self.advance_by(2);
                have_string = true;
            }
            _ => {
                if self.prefer_re && !is_word_char(self.ch_next) {
                    self.state = RubyStyle::StringQq;
                    self.quote.reset(1);
                    self.quote.open(self.ch_next);
                    self.advance();
                    have_string = true;
                }
            }
        }
        if !have_string {
            self.colour_to(self.i, RubyStyle::Operator);
            self.prefer_re = true;
        }
    }

    fn scan_operator(&mut self) {
        let ch = self.ch;
        self.colour_before(self.state);
        self.colour_to(self.i, RubyStyle::Operator);
        // Closing an expression makes the ambiguous operators binary.
        if ch == b'{' {
            self.brace_count += 1;
            self.prefer_re = true;
        } else if ch == b'}' {
            self.brace_count -= 1;
            if self.brace_count < 0 && !self.inner.is_empty() {
                self.exit_inner_expression();
            } else {
                self.prefer_re = false;
            }
        } else {
            self.prefer_re = !b")}].".contains(&ch);
        }
    }

    // -- Interpolation ------------------------------------------------------

    fn enter_inner_expression(&mut self) {
        self.colour_before(self.state);
        self.colour_to(self.i + 1, RubyStyle::Operator);
        self.inner.push(InnerExpression {
            state: self.state,
            brace_count: self.brace_count,
            quote: self.quote,
        });
        self.state = RubyStyle::Default;
        self.brace_count = 0;
        self.prefer_re = true;
        self.advance();
    }

    fn exit_inner_expression(&mut self) {
        if let Some(outer) = self.inner.pop() {
            self.state = outer.state;
            self.brace_count = outer.brace_count;
            self.quote = outer.quote;
        }
    }

    fn can_interpolate(&self) -> bool {
        self.ch_next == b'{' && self.inner.len() < INNER_EXPRESSION_MAX
    }

    // -- Run states ---------------------------------------------------------

    fn scan_word(&mut self) {
        let ch = self.ch;
        if ch != b'.' && is_word_char(ch) {
            return;
        }
        let word_start = self.styler.segment_start();
        if ch == b'='
            && is_word_char(self.ch_prev)
            && matches!(self.ch_next, b'(' | b' ' | b'\t' | b'\n' | b'\r')
            && (self.prev_word == b"def"
                || word_start.checked_sub(1).is_some_and(|p| follows_dot(self.styler, p)))
        {
            // A setter name such as `name=` being defined or called.
        } else if matches!(ch, b'?' | b'!') && is_word_char(self.ch_prev) && !is_word_char(self.ch_next) {
            // Predicate and bang method names.
        } else if is_eol(ch)
            && self
                .i
                .checked_sub(7)
                .is_some_and(|p| is_match(self.styler, self.end, p, b"__END__"))
        {
            self.colour_to(self.i, RubyStyle::DataSection);
            self.state = RubyStyle::DataSection;
            self.prefer_re = false;
        } else {
            let end = self.i - 1;
            let word = bounded_word(self.styler, word_start, end, MAX_KEYWORD_LEN);
            let style = self.classify_word(word_start, end, &word);
            self.prefer_re = match style {
                RubyStyle::Word => re_can_follow_keyword(&word),
                RubyStyle::WordDemoted => true,
                RubyStyle::Identifier => re_can_follow_identifier(&word) || is_eol(ch),
                _ => false,
            };
            if ch == b'.' {
                // Possibly an operator method being redefined.
                self.prefer_re = false;
            }
            self.redo_char();
        }
    }

    /// Style `start..=end` as a keyword, a name after `class`/`module`/
    /// `def`, or an identifier.
    fn classify_word(&mut self, start: usize, end: usize, word: &[u8]) -> RubyStyle {
        let style = match self.prev_word.as_slice() {
            b"class" => RubyStyle::ClassName,
            b"module" => RubyStyle::ModuleName,
            b"def" => RubyStyle::DefName,
            _ => {
                let after_dot = start.checked_sub(1).is_some_and(|p| follows_dot(self.styler, p));
                if self.keywords.contains(word) && !after_dot {
                    if keyword_is_ambiguous(word) && keyword_is_modifier(self.styler, word, start) {
                        // Coloured as a keyword but never opens a fold.
                        RubyStyle::WordDemoted
                    } else {
                        RubyStyle::Word
                    }
                } else {
                    RubyStyle::Identifier
                }
            }
        };
        self.colour_to(end, style);
        self.prev_word.clear();
        if style == RubyStyle::Word {
            self.prev_word.extend_from_slice(word);
        }
        style
    }

    fn scan_number(&mut self) {
        let ch = self.ch;
        if !self.is_real_number {
            if ch != b'\\' {
                self.colour_to(self.i, self.state);
                self.state = RubyStyle::Default;
                self.prefer_re = false;
            } else if b"\\ntrfvaebs".contains(&self.ch_next) {
                // The escaped byte ends the literal next time round.
            } else if matches!(self.ch_next, b'C' | b'M') {
                if self.ch_next2 == b'-' {
                    // ?\C-x: move onto the byte after the dash.
                    self.advance_by(2);
                }
            } else if self.ch_next == b'c' {
                self.advance();
            } else {
                self.colour_to(self.i + 1, self.state);
                self.state = RubyStyle::Default;
                self.prefer_re = false;
                self.advance();
            }
            return;
        }
        let exponent = if matches!(ch, b'e' | b'E') {
            self.num_exponents += 1;
            self.num_exponents == 1
        } else {
            false
        };
        if exponent && (matches!(self.ch_next, b'+' | b'-') || is_digit(self.ch_next)) {
            self.advance();
        } else if is_word_char(ch) {
            // Digits, radix letters, and underscores.
        } else if ch == b'.' && self.num_dots == 0 {
            self.num_dots = 1;
        } else {
            self.colour_before(self.state);
            self.redo_char();
            self.prefer_re = false;
        }
    }

    fn scan_here_delim(&mut self) {
        let ch = self.ch;
        match self.here_doc.phase {
            HereDocPhase::Introduced => {
                self.here_doc.phase = HereDocPhase::Delimiter;
                let mut ch = ch;
                if ch == b'-' {
                    self.here_doc.indentable = true;
                    self.advance();
                    ch = self.ch;
                }
                if is_eol(ch) {
                    // No target after all.
                    self.state = RubyStyle::Default;
                    self.prefer_re = false;
                    self.here_doc.finish();
                } else {
                    self.here_doc.quote = ch;
                    if matches!(ch, b'\'' | b'"' | b'`') {
                        self.here_doc.quoted = true;
                    } else {
                        self.here_doc.quoted = false;
                        self.push_delimiter(ch);
                    }
                }
            }
            HereDocPhase::Delimiter => {
                if self.here_doc.quoted {
                    if ch == self.here_doc.quote {
                        self.colour_to(self.i, self.state);
                        self.state = RubyStyle::Default;
                        self.prefer_re = false;
                    } else {
                        if ch == b'\\' && !is_eol(self.ch_next) {
                            self.advance();
                        }
                        let ch = self.ch;
                        self.push_delimiter(ch);
                    }
                } else if is_word_char(ch) {
                    self.push_delimiter(ch);
                } else {
                    self.colour_before(self.state);
                    self.redo_char();
                    self.prefer_re = false;
                }
            }
            HereDocPhase::Idle | HereDocPhase::Body => {}
        }
    }

    fn push_delimiter(&mut self, ch: u8) {
        if self.here_doc.push(ch).is_err() || self.here_doc.is_full() {
            lexkit_core::debug!(pos = self.i, "here-document delimiter too long");
            self.colour_before(self.state);
            self.state = RubyStyle::Error;
            self.prefer_re = false;
            self.here_doc.finish();
        }
    }

    fn scan_here_body(&mut self) {
        let len = self.here_doc.delimiter().len();
        if len == 0 {
            // An empty target is met by the first empty line.
            if is_eol(self.ch_prev) && is_eol(self.ch) {
                self.colour_before(self.state);
                self.here_doc.finish();
                self.prefer_re = false;
                self.redo_char();
            }
            return;
        }
        if !self.here_doc.indentable {
            if is_eol(self.ch_prev) && is_match(self.styler, self.end, self.i, self.here_doc.delimiter()) {
                self.colour_before(self.state);
                self.advance_by(len - 1);
                if is_eol(self.ch_next) {
                    self.colour_to(self.i, RubyStyle::HereDelim);
                    self.state = RubyStyle::Default;
                    self.here_doc.finish();
                    self.prefer_re = false;
                }
            }
        } else if is_eol(self.ch_next)
            && (self.i + 1)
                .checked_sub(len)
                .is_some_and(|p| looking_at_here_doc_delim(self.styler, p, self.end, self.here_doc.delimiter()))
        {
            if let Some(body_end) = self.i.checked_sub(1 + len) {
                self.colour_to(body_end, self.state);
            }
            self.colour_to(self.i, RubyStyle::HereDelim);
            self.state = RubyStyle::Default;
            self.prefer_re = false;
            self.here_doc.finish();
        }
    }

    fn scan_symbol(&mut self) {
        if is_word_char(self.ch) {
            return;
        }
        if matches!(self.ch, b'!' | b'?' | b'=') {
            self.colour_to(self.i, self.state);
            self.state = RubyStyle::Default;
        } else {
            self.colour_before(self.state);
            self.redo_char();
        }
        self.prefer_re = false;
    }

    fn scan_global(&mut self) {
        if is_word_char(self.ch) {
            return;
        }
        if self.ch_prev == b'$' {
            // Punctuation globals such as $! and $-w.
            if self.ch == b'-' {
                self.advance();
            }
            self.colour_to(self.i, self.state);
            self.state = RubyStyle::Default;
        } else {
            self.colour_before(self.state);
            self.redo_char();
        }
        self.prefer_re = false;
    }

    fn scan_regex(&mut self) {
        let ch = self.ch;
        if ch == b'\\' && self.quote.up != b'\\' {
            self.advance();
            return;
        }
        match self.quote.track(ch) {
            QuoteStep::Closed => {
                // Trailing option letters.
                while is_safe_alpha(self.ch_next) {
                    self.advance();
                }
                self.colour_to(self.i, self.state);
                self.state = RubyStyle::Default;
                self.prefer_re = false;
            }
            QuoteStep::Nested | QuoteStep::Unnested => {}
            QuoteStep::Content => {
                if ch != b'#' {
                    return;
                }
                if self.can_interpolate() {
                    self.enter_inner_expression();
                } else {
                    self.scan_regex_comment();
                }
            }
        }
    }

    /// `#` inside a regex runs as a comment to the end of the line or up
    /// to the closing delimiter.
    fn scan_regex_comment(&mut self) {
        self.colour_before(self.state);
        let mut in_escape = false;
        loop {
            self.i += 1;
            if self.i >= self.end {
                break;
            }
            let ch = self.styler.char_at(self.i);
            if ch == b'\\' {
                in_escape = true;
            } else if is_eol(ch) {
                self.colour_before(RubyStyle::CommentLine);
                break;
            } else if in_escape {
                in_escape = false;
            } else if ch == self.quote.down {
                // Let the regex state close it and take the options.
                self.i -= 1;
                break;
            }
        }
        self.load();
    }

    fn scan_string(&mut self) {
        let ch = self.ch;
        if !self.quote.is_open() && !is_space(ch) {
            self.quote.open(ch);
            return;
        }
        if ch == b'\\' && self.quote.up != b'\\' {
            self.advance();
            return;
        }
        match self.quote.track(ch) {
            QuoteStep::Closed => {
                self.colour_to(self.i, self.state);
                self.state = RubyStyle::Default;
                self.prefer_re = false;
            }
            QuoteStep::Nested | QuoteStep::Unnested => {}
            QuoteStep::Content => {
                if ch == b'#'
                    && self.can_interpolate()
                    && !matches!(self.state, RubyStyle::Character | RubyStyle::StringQ)
                {
                    self.enter_inner_expression();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

fn fold_ruby(start: usize, length: usize, styler: &mut Styler<'_>) {
    let compact = styler.property_int("fold.compact", 1) != 0;
    let fold_comment = styler.property_int("fold.comment", 0) != 0;

    let end = (start + length).min(styler.len());
    let (start, _) = synchronize_doc_start(styler, start);
    let mut acc = FoldAccumulator::resume(styler, start, compact);
    let mut style_prev = if start <= 1 {
        RubyStyle::Default
    } else {
        style_of(styler, start - 1)
    };

    for i in start..end {
        let ch = styler.char_at(i);
        let ch_next = styler.safe_char_at(i + 1, 0);
        let style = style_of(styler, i);
        let style_next = style_of(styler, i + 1);
        let at_eol = (ch == b'\r' && ch_next != b'\n') || ch == b'\n';

        if style == RubyStyle::CommentLine {
            if fold_comment && style_prev != RubyStyle::CommentLine {
                if ch_next == b'{' {
                    acc.open();
                } else if ch_next == b'}' {
                    acc.close();
                }
            }
        } else if style == RubyStyle::Operator {
            if b"[{(".contains(&ch) {
                acc.open();
            } else if b")}]".contains(&ch) {
                acc.close();
            }
        } else if style == RubyStyle::Word && style_next != RubyStyle::Word {
            let word = prev_word(styler, i, RubyStyle::Word);
            match word.as_slice() {
                b"end" => acc.close(),
                b"if" | b"def" | b"class" | b"module" | b"begin" | b"case" | b"while"
                | b"unless" | b"until" | b"for" => acc.open(),
                b"do" if !keyword_do_starts_loop(styler, i) => acc.open(),
                _ => {}
            }
        } else if at_eol {
            let line_start = styler.line_start(acc.line());
            if style == RubyStyle::Pod {
                if line_start == 0 || style_of(styler, line_start - 1) != RubyStyle::Pod {
                    acc.open();
                }
            } else if style == RubyStyle::Default && style_of(styler, line_start) == RubyStyle::Pod {
                acc.close();
            }
        }

        if at_eol {
            acc.end_line(styler);
        } else if !is_space(ch) {
            acc.note_visible();
        }
        style_prev = style;
    }
    acc.finish(styler);
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// The Ruby lexer. Keyword list 0 holds the reserved words.
#[derive(Debug, Clone, Copy, Default)]
pub struct RubyLexer;

impl RubyLexer {
    /// Keyword sets with the standard reserved words.
    pub fn default_keywords() -> KeywordSets {
        KeywordSets::from_strs(&[KEYWORDS])
    }
}

impl Lexer for RubyLexer {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rb", "rbw", "rake", "gemspec", "ru"]
    }

    fn word_list_descriptions(&self) -> &'static [&'static str] {
        &["Keywords"]
    }

    fn lex(&self, start: usize, length: usize, _init_style: u8, keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = (start + length).min(styler.len());
        let (sync_start, carry) = synchronize_doc_start(styler, start);
        if sync_start != start {
            lexkit_core::trace!(requested = start, resumed = sync_start, "ruby resync");
        }
        let _span = lexkit_core::debug_span!("ruby", start, length, resumed = sync_start).entered();
        if end <= sync_start {
            return;
        }
        styler.start_at(sync_start);
        styler.start_segment(sync_start);
        let mut scan = Scan::new(styler, keywords.get(0), sync_start, end, carry);
        scan.run();
    }

    fn fold(&self, start: usize, length: usize, _init_style: u8, _keywords: &KeywordSets, styler: &mut Styler<'_>) {
        fold_ruby(start, length, styler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexkit_core::{Properties, TextBuffer};

    fn lex(text: &str) -> TextBuffer {
        let mut buf = TextBuffer::from(text);
        RubyLexer.colourise_document(&mut buf, &Properties::new(), &RubyLexer::default_keywords());
        buf
    }

    fn styles_of(buf: &TextBuffer, range: std::ops::Range<usize>) -> Vec<RubyStyle> {
        buf.styles()[range]
            .iter()
            .map(|&s| RubyStyle::from_u8(s).unwrap())
            .collect()
    }

    fn all(style: RubyStyle, n: usize) -> Vec<RubyStyle> {
        vec![style; n]
    }

    #[test]
    fn style_codes_round_trip() {
        for style in RubyStyle::ALL {
            assert_eq!(RubyStyle::from_u8(style.code()), Some(style));
        }
        assert_eq!(RubyStyle::from_u8(35), None);
    }

    #[test]
    fn line_carry_wire_format() {
        let carry = LineCarry {
            resumable: true,
            prefer_re: false,
            naming: NamingKeyword::Def,
        };
        assert_eq!(carry.pack(), 0x100 | (3 << 1));
        assert_eq!(LineCarry::unpack(carry.pack()), carry);
        assert!(!LineCarry::unpack(0).resumable);
    }

    #[test]
    fn division_after_identifier() {
        let buf = lex("a / b");
        assert_eq!(
            styles_of(&buf, 0..5),
            vec![
                RubyStyle::Identifier,
                RubyStyle::Default,
                RubyStyle::Operator,
                RubyStyle::Default,
                RubyStyle::Identifier,
            ]
        );
    }

    #[test]
    fn regex_after_return() {
        let buf = lex("return /x/\n");
        assert_eq!(styles_of(&buf, 0..6), all(RubyStyle::Word, 6));
        assert_eq!(styles_of(&buf, 7..10), all(RubyStyle::Regex, 3));
    }

    #[test]
    fn member_access_is_not_a_keyword() {
        let buf = lex("obj.class\nclass Foo\n");
        assert_eq!(styles_of(&buf, 4..9), all(RubyStyle::Identifier, 5));
        assert_eq!(styles_of(&buf, 10..15), all(RubyStyle::Word, 5));
        assert_eq!(styles_of(&buf, 16..19), all(RubyStyle::ClassName, 3));
    }

    #[test]
    fn trailing_if_is_demoted() {
        let buf = lex("x = 1 if y\nif y\nend\n");
        assert_eq!(styles_of(&buf, 6..8), all(RubyStyle::WordDemoted, 2));
        assert_eq!(styles_of(&buf, 11..13), all(RubyStyle::Word, 2));
    }

    #[test]
    fn heredoc_body_and_terminator() {
        let text = "x = <<EOF\nhello\nEOF\n";
        let buf = lex(text);
        assert_eq!(styles_of(&buf, 4..6), all(RubyStyle::Operator, 2));
        assert_eq!(styles_of(&buf, 6..9), all(RubyStyle::HereDelim, 3));
        assert_eq!(styles_of(&buf, 10..15), all(RubyStyle::HereQ, 5));
        assert_eq!(styles_of(&buf, 16..19), all(RubyStyle::HereDelim, 3));
        assert_eq!(styles_of(&buf, 19..20), all(RubyStyle::Default, 1));
    }

    #[test]
    fn indentable_heredoc() {
        let buf = lex("x = <<-EOS\n  body\n  EOS\ny\n");
        let text = "x = <<-EOS\n  body\n  EOS\ny\n";
        let close = text.rfind("EOS").unwrap();
        assert_eq!(styles_of(&buf, close..close + 3), all(RubyStyle::HereDelim, 3));
        assert_eq!(styles_of(&buf, 13..17), all(RubyStyle::HereQ, 4));
        assert_eq!(styles_of(&buf, 24..25), vec![RubyStyle::Identifier]);
    }

    #[test]
    fn shift_on_variable_is_an_operator() {
        let buf = lex("a = []\na <<b\nputs a\n");
        // No line starts with `b`, so `<<` is an append.
        assert_eq!(styles_of(&buf, 9..11), all(RubyStyle::Operator, 2));
        assert_eq!(styles_of(&buf, 11..12), vec![RubyStyle::Identifier]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let buf = lex("\"abc");
        assert_eq!(styles_of(&buf, 0..4), all(RubyStyle::Error, 4));
    }

    #[test]
    fn quote_like_literal_nests() {
        let text = "%q{a{b}c} d";
        let buf = lex(text);
        assert_eq!(styles_of(&buf, 0..9), all(RubyStyle::StringQ, 9));
        assert_eq!(styles_of(&buf, 10..11), vec![RubyStyle::Identifier]);
    }

    #[test]
    fn interpolation_suspends_the_string() {
        let text = "\"a#{b + \"}\"}c\" d";
        let buf = lex(text);
        assert_eq!(styles_of(&buf, 0..2), all(RubyStyle::String, 2));
        assert_eq!(styles_of(&buf, 2..4), all(RubyStyle::Operator, 2));
        assert_eq!(styles_of(&buf, 4..5), vec![RubyStyle::Identifier]);
        assert_eq!(styles_of(&buf, 8..11), all(RubyStyle::String, 3));
        assert_eq!(styles_of(&buf, 11..12), vec![RubyStyle::Operator]);
        assert_eq!(styles_of(&buf, 12..14), all(RubyStyle::String, 2));
        assert_eq!(styles_of(&buf, 15..16), vec![RubyStyle::Identifier]);
    }

    #[test]
    fn pod_block() {
        let text = "=begin\ndoc\n=end\nx\n";
        let buf = lex(text);
        assert_eq!(styles_of(&buf, 0..15), all(RubyStyle::Pod, 15));
        assert_eq!(styles_of(&buf, 16..17), vec![RubyStyle::Identifier]);
    }

    #[test]
    fn symbols_globals_and_variables() {
        let buf = lex("@a @@b $c $! :sym :[]= x");
        assert_eq!(styles_of(&buf, 0..2), all(RubyStyle::InstanceVar, 2));
        assert_eq!(styles_of(&buf, 3..6), all(RubyStyle::ClassVar, 3));
        assert_eq!(styles_of(&buf, 7..9), all(RubyStyle::Global, 2));
        assert_eq!(styles_of(&buf, 10..12), all(RubyStyle::Global, 2));
        assert_eq!(styles_of(&buf, 13..17), all(RubyStyle::Symbol, 4));
        assert_eq!(styles_of(&buf, 18..22), all(RubyStyle::Symbol, 4));
    }

    #[test]
    fn data_section_runs_to_the_end() {
        let buf = lex("x\n__END__\nanything \"here\n");
        assert_eq!(styles_of(&buf, 2..25), all(RubyStyle::DataSection, 23));
    }

    #[test]
    fn resumes_from_a_later_line() {
        let text = "def foo\n  x = a / b\n  return /re/\nend\n";
        let full = lex(text);
        let mut buf = TextBuffer::from(text);
        let props = Properties::new();
        let keywords = RubyLexer::default_keywords();
        RubyLexer.colourise_range(&mut buf, &props, &keywords, 0, 20);
        RubyLexer.colourise_range(&mut buf, &props, &keywords, 20, text.len() - 20);
        assert_eq!(buf.styles(), full.styles());
    }

    #[test]
    fn def_name_survives_resync() {
        // `def` at the end of a line names the method on the next one.
        let text = "x = 1\ndef\nfoo\n";
        let full = lex(text);
        assert_eq!(styles_of(&full, 10..13), all(RubyStyle::DefName, 3));
        assert_ne!(full.line_states()[2], 0);
        let mut buf = full.clone();
        buf.reset_styles_from(10);
        RubyLexer.colourise_range(&mut buf, &Properties::new(), &RubyLexer::default_keywords(), 10, text.len() - 10);
        assert_eq!(buf.styles(), full.styles());
    }

    #[test]
    fn folds_blocks() {
        let buf = lex("class A\n  def f\n    [1,\n     2]\n  end\nend\n");
        let depths: Vec<i32> = buf.fold_levels().iter().map(|l| l.depth()).collect();
        assert_eq!(&depths[..7], &[0, 1, 2, 3, 2, 1, 0]);
        assert!(buf.fold_levels()[0].is_header());
        assert!(buf.fold_levels()[1].is_header());
        assert!(!buf.fold_levels()[4].is_header());
    }

    #[test]
    fn modifier_if_does_not_fold() {
        let buf = lex("x if y\nwhile z do\nend\n");
        let depths: Vec<i32> = buf.fold_levels().iter().map(|l| l.depth()).collect();
        assert_eq!(&depths[..4], &[0, 0, 1, 0]);
    }
}
