#![forbid(unsafe_code)]

//! Perl lexer.
//!
//! The scanner follows the same terminate-then-dispatch loop as the Ruby
//! lexer. Perl needs more context than Ruby to tell a hash subscript from a
//! block, so besides the regex preference it tracks whether an opening
//! brace starts a block, whether a binary operator may follow, and a stack
//! recording what each open brace turned out to be. A closing brace with
//! nothing on the stack is matched by counting committed braces backwards.
//!
//! Folding happens in one of two places. With the `fold` property set the
//! scanner maintains levels while it styles; otherwise the `fold` pass
//! derives them from the committed styles.

use lexkit_core::chars::{
    is_digit, is_eol, is_high_bit, is_space, is_space_or_tab, is_word_char,
};
use lexkit_core::{FoldAccumulator, KeywordSets, Lexer, Styler, WordList};
use smallvec::SmallVec;

use crate::heredoc::{HereDoc, HereDocPhase};
use crate::quote::QuoteContext;
use crate::scan::{is_line_start, is_match, prev_non_newline_pos};

/// Keywords handed to the lexer when the host supplies none.
pub const KEYWORDS: &str = "__FILE__ __LINE__ __PACKAGE__ __SUB__ AUTOLOAD BEGIN CHECK DESTROY \
    END INIT UNITCHECK abs accept alarm and atan2 bind binmode bless break caller chdir chmod \
    chomp chop chown chr chroot close closedir cmp connect continue cos crypt dbmclose \
    dbmopen default defined delete die do dump each else elsif endgrent endhostent \
    endnetent endprotoent endpwent endservent eof eq eval exec exists exit exp fcntl \
    fileno flock for foreach fork format formline ge getc getgrent getgrgid getgrnam \
    gethostbyaddr gethostbyname gethostent getlogin getnetbyaddr getnetbyname getnetent \
    getpeername getpgrp getppid getpriority getprotobyname getprotobynumber getprotoent \
    getpwent getpwnam getpwuid getservbyname getservbyport getservent getsockname \
    getsockopt given glob gmtime goto grep gt hex if import index int ioctl join keys \
    kill last lc lcfirst le length link listen local localtime lock log lstat lt map \
    mkdir msgctl msgget msgrcv msgsnd my ne next no not oct open opendir or ord our pack \
    package pipe pop pos print printf prototype push quotemeta rand read readdir \
    readline readlink readpipe recv redo ref rename require reset return reverse \
    rewinddir rindex rmdir say scalar seek seekdir select semctl semget semop send \
    setgrent sethostent setnetent setpgrp setpriority setprotoent setpwent setservent \
    setsockopt shift shmctl shmget shmread shmwrite shutdown sin sleep socket socketpair \
    sort splice split sprintf sqrt srand stat state study sub substr symlink syscall \
    sysopen sysread sysseek system syswrite tell telldir tie tied time times truncate uc \
    ucfirst umask undef unless unlink unpack unshift untie until use utime values vec \
    wait waitpid wantarray warn when while write xor";

/// Style codes are compared with the indicator bits masked off.
const STYLE_MASK: u8 = 63;
/// Longest prefix of a word compared against the keyword list.
const MAX_KEYWORD_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// Style codes written by the Perl lexer. Each also names a scanner state;
/// `Sub` and `SubArgs` are states only and never reach the style store.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PerlStyle {
    #[default]
    Default = 0,
    Error = 1,
    CommentLine = 2,
    Pod = 3,
    Number = 4,
    Word = 5,
    String = 6,
    Character = 7,
    Operator = 10,
    Identifier = 11,
    Scalar = 12,
    Array = 13,
    Hash = 14,
    SymbolTable = 15,
    VariableIndexer = 16,
    Regex = 17,
    RegSubst = 18,
    Backticks = 20,
    DataSection = 21,
    HereDelim = 22,
    HereQ = 23,
    StringQ = 26,
    StringQq = 27,
    StringQx = 28,
    StringQr = 29,
    StringQw = 30,
    Sub = 40,
    SubArgs = 41,
    Format = 42,
    UnknownField = 43,
    Stdin = 44,
    Stdout = 45,
    Stderr = 46,
}

impl PerlStyle {
    const ALL: [Self; 33] = [
        Self::Default,
        Self::Error,
        Self::CommentLine,
        Self::Pod,
        Self::Number,
        Self::Word,
        Self::String,
        Self::Character,
        Self::Operator,
        Self::Identifier,
        Self::Scalar,
        Self::Array,
        Self::Hash,
        Self::SymbolTable,
        Self::VariableIndexer,
        Self::Regex,
        Self::RegSubst,
        Self::Backticks,
        Self::DataSection,
        Self::HereDelim,
        Self::HereQ,
        Self::StringQ,
        Self::StringQq,
        Self::StringQx,
        Self::StringQr,
        Self::StringQw,
        Self::Sub,
        Self::SubArgs,
        Self::Format,
        Self::UnknownField,
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

    /// Runs flagged as errors when the document ends inside them.
    pub const fn needs_terminator(self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Character
                | Self::Backticks
                | Self::Regex
                | Self::RegSubst
                | Self::HereQ
                | Self::StringQ
                | Self::StringQq
                | Self::StringQx
                | Self::StringQr
                | Self::StringQw
        )
    }

    const fn is_variable(self) -> bool {
        matches!(
            self,
            Self::Scalar | Self::Array | Self::Hash | Self::SymbolTable
        )
    }

    /// Strings in which `$name` and `@name` are coloured as variables.
    const fn interpolates(self) -> bool {
        matches!(
            self,
            Self::String | Self::StringQq | Self::StringQx | Self::Backticks
        )
    }

    /// First styles of a line that mark it as a statement boundary.
    const fn starts_statement(self) -> bool {
        matches!(
            self,
            Self::CommentLine
                | Self::Number
                | Self::Word
                | Self::Operator
                | Self::Identifier
                | Self::Scalar
                | Self::Array
                | Self::Hash
                | Self::SymbolTable
                | Self::VariableIndexer
        )
    }
}

fn style_of(styler: &Styler<'_>, pos: usize) -> PerlStyle {
    PerlStyle::from_u8(styler.style_at(pos) & STYLE_MASK).unwrap_or(PerlStyle::Error)
}

// ---------------------------------------------------------------------------
// Persisted line context
// ---------------------------------------------------------------------------

/// Scanner context at the start of a line.
///
/// Wire format: bit 0 regex preference, bit 1 brace-starts-block, bit 2
/// binary-operator-expected, bit 8 resumable, bits 16-21 the state the line
/// starts in (default, POD or data section).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineCarry {
    resumable: bool,
    prefer_re: bool,
    brace_starts_block: bool,
    binary_op_expected: bool,
    state: PerlStyle,
}

impl LineCarry {
    const PREFER_RE: i32 = 0x1;
    const BRACE_STARTS_BLOCK: i32 = 0x2;
    const BINARY_OP_EXPECTED: i32 = 0x4;
    const RESUMABLE: i32 = 0x100;
    const STATE_SHIFT: i32 = 16;

    const fn fresh() -> Self {
        Self {
            resumable: true,
            prefer_re: true,
            brace_starts_block: true,
            binary_op_expected: false,
            state: PerlStyle::Default,
        }
    }

    fn pack(self) -> i32 {
        let mut word = i32::from(self.state.code()) << Self::STATE_SHIFT;
        for (set, bit) in [
            (self.prefer_re, Self::PREFER_RE),
            (self.brace_starts_block, Self::BRACE_STARTS_BLOCK),
            (self.binary_op_expected, Self::BINARY_OP_EXPECTED),
            (self.resumable, Self::RESUMABLE),
        ] {
            if set {
                word |= bit;
            }
        }
        word
    }

    fn unpack(word: i32) -> Self {
        let code = ((word >> Self::STATE_SHIFT) & i32::from(STYLE_MASK)) as u8;
        Self {
            resumable: word & Self::RESUMABLE != 0,
            prefer_re: word & Self::PREFER_RE != 0,
            brace_starts_block: word & Self::BRACE_STARTS_BLOCK != 0,
            binary_op_expected: word & Self::BINARY_OP_EXPECTED != 0,
            state: PerlStyle::from_u8(code).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resynchronization
// ---------------------------------------------------------------------------

/// Walk back from `start` to a line the scanner can resume at.
///
/// The newline ending the previous line must be default-styled and the
/// line's first styled token must look like the start of a statement; a
/// previous line ending inside POD or the data section is accepted on
/// sight, since both end the same way. In every case the context saved for
/// the line must say the scanner was at top level there.
fn synchronize_doc_start(styler: &Styler<'_>, start: usize) -> (usize, LineCarry) {
    let mut line = styler.line_of(start);
    while line > 0 {
        let Some(before_eol) = prev_non_newline_pos(styler, line) else {
            break;
        };
        let line_start = styler.line_start(line);
        if style_of(styler, before_eol).is_stdio() {
            return (line_start, LineCarry::fresh());
        }
        let saved = LineCarry::unpack(styler.line_state(line));
        let eol_style = style_of(styler, line_start - 1);
        match eol_style {
            PerlStyle::Default => {
                let line_end = styler.line_end(line);
                let first = (line_start..line_end)
                    .find(|&pos| style_of(styler, pos) != PerlStyle::Default)
                    .unwrap_or(line_end);
                if style_of(styler, first).starts_statement()
                    && saved.resumable
                    && saved.state == PerlStyle::Default
                {
                    return (line_start, saved);
                }
            }
            PerlStyle::Pod | PerlStyle::DataSection
                if saved.resumable && saved.state == eol_style =>
            {
                return (line_start, saved);
            }
            _ => {}
        }
        line -= 1;
    }
    (0, LineCarry::fresh())
}

// ---------------------------------------------------------------------------
// Context helpers
// ---------------------------------------------------------------------------

fn is_alpha_or_high(ch: u8) -> bool {
    is_high_bit(ch) || ch.is_ascii_alphabetic()
}

/// Operands of the `-X` file tests.
fn is_single_char_op(ch: u8) -> bool {
    b"rwxoRWXOezsfdlpSbctugkTBMAC".contains(&ch)
}

fn is_perl_operator(ch: u8) -> bool {
    b"%^&*\\()-+=|{}[]:;<>,/?!.~".contains(&ch)
}

fn is_end_var(ch: u8) -> bool {
    !is_word_char(ch) && !b"#$_'[{".contains(&ch)
}

/// Step backwards from `pos` while `pred` holds, returning the first
/// position where it fails or `None` past the document start.
fn back_over(styler: &Styler<'_>, mut pos: Option<usize>, pred: fn(u8) -> bool) -> Option<usize> {
    while let Some(p) = pos {
        if !pred(styler.char_at(p)) {
            break;
        }
        pos = p.checked_sub(1);
    }
    pos
}

/// Whether `=>` follows `start`, skipping blanks and comments.
fn is_fat_comma_next(styler: &Styler<'_>, start: usize, limit: usize) -> bool {
    let mut in_comment = false;
    for pos in start..limit {
        let ch = styler.char_at(pos);
        if in_comment {
            if is_eol(ch) {
                in_comment = false;
            }
        } else if ch == b'=' {
            if styler.char_at(pos + 1) == b'>' {
                return true;
            }
        } else if ch == b'#' {
            in_comment = true;
        } else if !is_space(ch) {
            break;
        }
    }
    false
}

/// Whether an optionally dashed word starting at `start` precedes `=>`.
fn is_word_before_fat_comma(styler: &Styler<'_>, start: usize, limit: usize) -> bool {
    let mut pos = start;
    if pos < limit && styler.char_at(pos) == b'-' {
        pos += 1;
    }
    while pos < limit && is_word_char(styler.char_at(pos)) {
        pos += 1;
    }
    is_fat_comma_next(styler, pos, limit)
}

/// Keywords after which a `/` starts a pattern.
fn re_can_follow_keyword(word: &[u8]) -> bool {
    matches!(
        word,
        b"while"
            | b"if"
            | b"unless"
            | b"until"
            | b"and"
            | b"or"
            | b"not"
            | b"xor"
            | b"split"
            | b"grep"
            | b"map"
            | b"print"
    )
}

/// Whether the `:` after `pos` closes a statement label rather than a
/// ternary: a lone word that follows a line start, `:`, `{` or `}`.
fn after_label(styler: &Styler<'_>, pos: usize) -> bool {
    let mut cursor = Some(pos);
    while let Some(p) = cursor {
        if !is_space_or_tab(styler.char_at(p)) {
            break;
        }
        if style_of(styler, p) != PerlStyle::Default {
            return false;
        }
        cursor = p.checked_sub(1);
    }
    let Some(word_end) = cursor else {
        return false;
    };
    let mut cursor = Some(word_end);
    while let Some(p) = cursor {
        if !matches!(style_of(styler, p), PerlStyle::Word | PerlStyle::Identifier) {
            break;
        }
        cursor = p.checked_sub(1);
    }
    if cursor == Some(word_end) {
        return false;
    }
    match back_over(styler, cursor, is_space_or_tab) {
        None => true,
        Some(p) => b"\n:{}".contains(&styler.char_at(p)),
    }
}

/// Whether the text ending at `index` is `{`-indexer, blanks and an
/// optionally dashed word: the left half of a `{bareword}` subscript.
fn follows_start_indexer(styler: &Styler<'_>, index: usize) -> bool {
    let mut cursor = back_over(styler, Some(index), is_space);
    cursor = back_over(styler, cursor, is_word_char);
    if let Some(p) = cursor
        && styler.char_at(p) == b'-'
    {
        cursor = p.checked_sub(1);
    }
    match back_over(styler, cursor, is_space) {
        Some(p) => {
            style_of(styler, p) == PerlStyle::VariableIndexer && styler.char_at(p) == b'{'
        }
        None => false,
    }
}

/// Matches `\s* -? \w+ \s* }` at `index`.
fn looking_at_bareword(styler: &Styler<'_>, index: usize, len: usize) -> bool {
    let mut pos = index;
    let mut ch = b' ';
    while pos < len {
        ch = styler.char_at(pos);
        if !is_space(ch) {
            break;
        }
        pos += 1;
    }
    if pos + 1 < len && ch == b'-' {
        pos += 1;
        ch = styler.char_at(pos);
    }
    if pos >= len || !is_word_char(ch) {
        return false;
    }
    pos += 1;
    while pos < len {
        ch = styler.char_at(pos);
        if !is_word_char(ch) {
            break;
        }
        pos += 1;
    }
    while is_space(ch) && pos + 1 < len {
        pos += 1;
        ch = styler.char_at(pos);
    }
    pos < len && ch == b'}'
}

/// Matches `\s* }` at `index`.
fn precedes_indexer(styler: &Styler<'_>, index: usize, limit: usize) -> bool {
    (index..limit)
        .map(|pos| styler.char_at(pos))
        .find(|&ch| !is_space(ch))
        == Some(b'}')
}

fn word_ends_here(ch_next: u8, ch_next2: u8, no_namespace_op: bool) -> bool {
    if ch_next == b'.' {
        true
    } else if ch_next == b':' && ch_next2 == b':' && no_namespace_op {
        false
    } else if is_word_char(ch_next) {
        false
    } else if ch_next != b'\'' {
        true
    } else {
        // Old-style package separator, `$pkg'member`.
        !is_word_char(ch_next2)
    }
}

/// Kind of the brace matching the `}` at `pos`, found by counting committed
/// block and indexer braces backwards. Unmatched braces read as operators.
fn matching_brace_style(styler: &Styler<'_>, pos: usize) -> PerlStyle {
    let mut extra_closers = 1i32;
    for p in (0..pos).rev() {
        let direction = match styler.char_at(p) {
            b'{' => -1,
            b'}' => 1,
            _ => continue,
        };
        let style = style_of(styler, p);
        if matches!(style, PerlStyle::Operator | PerlStyle::VariableIndexer) {
            extra_closers += direction;
            if extra_closers == 0 {
                return style;
            }
        }
    }
    lexkit_core::debug!(pos, "no opening brace found");
    PerlStyle::Operator
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

const Q_CHARS: &[u8] = b"qrwx";
const Q_STATES: [PerlStyle; 4] = [
    PerlStyle::StringQq,
    PerlStyle::StringQr,
    PerlStyle::StringQw,
    PerlStyle::StringQx,
];

fn q_state(ch: u8) -> PerlStyle {
    Q_CHARS
        .iter()
        .position(|&c| c == ch)
        .map_or(PerlStyle::StringQq, |idx| Q_STATES[idx])
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
    /// Re-examine the current byte without advancing.
    redo: bool,
    state: PerlStyle,
    /// State to return to when a comment ends.
    previous_state: PerlStyle,
    prefer_re: bool,
    brace_starts_block: bool,
    binary_op_expected: bool,
    /// Unclosed `[` and indexing `{` in the current variable expression.
    variable_nesting: u32,
    braces: SmallVec<[PerlStyle; 16]>,
    quote: QuoteContext,
    here_doc: HereDoc,
    num_base: u32,
    num_dots: u32,
    num_exponents: u32,
    no_namespace_op: bool,
    fold: Option<FoldAccumulator>,
    next_carry_line: usize,
    next_line_start: usize,
}

impl<'s, 'a> Scan<'s, 'a> {
    fn new(styler: &'s mut Styler<'a>, keywords: &'s WordList, start: usize, end: usize, carry: LineCarry) -> Self {
        let ch_prev = styler.char_before(start, b' ');
        let no_namespace_op = styler.property_int("double_colons_are_names", 0) != 0;
        let fold = (styler.property_int("fold", 0) != 0)
            .then(|| FoldAccumulator::resume(styler, start, true));
        let next_carry_line = styler.line_of(start);
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
            state: carry.state,
            previous_state: PerlStyle::Default,
            prefer_re: carry.prefer_re,
            brace_starts_block: carry.brace_starts_block,
            binary_op_expected: carry.binary_op_expected,
            variable_nesting: 0,
            braces: SmallVec::new(),
            quote: QuoteContext::new(),
            here_doc: HereDoc::new(),
            num_base: 10,
            num_dots: 0,
            num_exponents: 0,
            no_namespace_op,
            fold,
            next_carry_line,
            next_line_start: start,
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

    /// Scan the current byte again, in whatever state is now active.
    fn retreat(&mut self) {
        self.redo = true;
    }

    fn colour_before(&mut self, style: PerlStyle) {
        if let Some(end) = self.i.checked_sub(1) {
            self.styler.colour_to(end, style.code());
        }
    }

    fn colour_to(&mut self, end: usize, style: PerlStyle) {
        self.styler.colour_to(end, style.code());
    }

    fn fold_open(&mut self) {
        if let Some(acc) = self.fold.as_mut() {
            acc.open();
        }
    }

    fn fold_close(&mut self) {
        if let Some(acc) = self.fold.as_mut() {
            acc.close();
        }
    }

    fn carry(&self) -> LineCarry {
        LineCarry {
            resumable: matches!(
                self.state,
                PerlStyle::Default | PerlStyle::Pod | PerlStyle::DataSection
            ) && self.braces.is_empty()
                && self.variable_nesting == 0
                && !matches!(
                    self.here_doc.phase,
                    HereDocPhase::Delimiter | HereDocPhase::Body
                ),
            prefer_re: self.prefer_re,
            brace_starts_block: self.brace_starts_block,
            binary_op_expected: self.binary_op_expected,
            state: self.state,
        }
    }

    /// Bookkeeping when the scan reaches a new line. Lines the scan jumped
    /// over, or entered mid-way, are marked as unusable resume points.
    fn enter_line(&mut self) {
        let line = self.styler.line_of(self.i);
        while self.next_carry_line <= line {
            let at_start = self.next_carry_line == line && self.styler.line_start(line) == self.i;
            let word = if at_start { self.carry().pack() } else { 0 };
            self.styler.set_line_state(self.next_carry_line, word);
            self.next_carry_line += 1;
        }
        self.next_line_start = self.styler.line_start(self.next_carry_line);
        if let Some(acc) = self.fold.as_mut() {
            while acc.line() < line {
                acc.end_line(self.styler);
            }
        }
    }

    fn run(&mut self) {
        while self.i < self.end {
            self.load();
            if self.i >= self.next_line_start {
                self.enter_line();
            }
            if !is_space(self.ch)
                && let Some(acc) = self.fold.as_mut()
            {
                acc.note_visible();
            }

            if self.here_doc.phase == HereDocPhase::Delimiter && is_eol(self.ch) {
                self.start_here_body();
            }

            if style_of(self.styler, self.i).is_stdio() {
                self.skip_stdio();
                continue;
            }

            match self.state {
                PerlStyle::Default => self.scan_default(),
                PerlStyle::Word => self.scan_word(),
                PerlStyle::Number => self.scan_number(),
                PerlStyle::CommentLine => {
                    if is_eol(self.ch) {
                        self.colour_before(self.state);
                        self.state = self.previous_state;
                    }
                }
                PerlStyle::HereDelim => self.scan_here_delim(),
                PerlStyle::HereQ => {
                    if self.here_doc.phase == HereDocPhase::Body && is_line_start(self.styler, self.i) {
                        self.scan_here_body();
                    }
                }
                state if state.is_variable() => self.scan_variable(),
                PerlStyle::UnknownField => self.scan_unknown_field(),
                PerlStyle::Pod => {
                    if self.ch == b'='
                        && is_eol(self.ch_prev)
                        && is_match(self.styler, self.end, self.i, b"=cut")
                    {
                        self.advance_by(3);
                        self.colour_to(self.i, PerlStyle::Pod);
                        self.state = PerlStyle::CommentLine;
                        self.previous_state = PerlStyle::Default;
                        self.brace_starts_block = true;
                        self.fold_close();
                    }
                }
                PerlStyle::Regex | PerlStyle::StringQr => self.scan_regex(),
                PerlStyle::RegSubst => self.scan_substitution(),
                PerlStyle::StringQ
                | PerlStyle::StringQq
                | PerlStyle::StringQx
                | PerlStyle::StringQw
                | PerlStyle::String
                | PerlStyle::Character
                | PerlStyle::Backticks => self.scan_string(),
                PerlStyle::Sub => self.scan_sub(),
                PerlStyle::SubArgs => {
                    if self.ch == b')' {
                        self.colour_before(PerlStyle::Default);
                        self.colour_to(self.i, PerlStyle::Operator);
                        self.state = PerlStyle::Default;
                        self.fold_close();
                        self.brace_starts_block = true;
                    }
                }
                PerlStyle::Format => {
                    if self.ch == b'.' && is_eol(self.ch_prev) && is_eol(self.ch_next) {
                        self.colour_to(self.i, PerlStyle::Format);
                        self.state = PerlStyle::Default;
                    }
                }
                PerlStyle::Error => {
                    if is_eol(self.ch) {
                        self.colour_before(PerlStyle::Error);
                        self.state = PerlStyle::Default;
                        self.brace_starts_block = true;
                        self.retreat();
                    }
                }
                _ => {}
            }

            if self.redo {
                self.redo = false;
            } else {
                self.ch_prev = self.ch;
                self.i += 1;
            }
        }
        self.finish();
    }

    fn finish(&mut self) {
        let Some(last) = self.end.checked_sub(1) else {
            return;
        };
        match self.state {
            PerlStyle::Sub => self.state = PerlStyle::Identifier,
            PerlStyle::SubArgs => self.state = PerlStyle::Default,
            _ => {}
        }
        if self.end >= self.styler.len() && self.state.needs_terminator() {
            lexkit_core::debug!(
                state = ?self.state,
                from = self.styler.segment_start(),
                "unterminated literal at end of document"
            );
            self.colour_to(last, PerlStyle::Error);
        } else {
            self.colour_to(last, self.state);
        }
        if let Some(mut acc) = self.fold.take() {
            let line = self.styler.line_of(self.end);
            while acc.line() < line {
                acc.end_line(self.styler);
            }
            acc.finish(self.styler);
        }
    }

    fn skip_stdio(&mut self) {
        self.colour_before(self.state);
        while self.i < self.end && style_of(self.styler, self.i).is_stdio() {
            self.i += 1;
        }
        self.styler.start_segment(self.i);
        self.ch_prev = self.styler.char_before(self.i, b' ');
        self.state = PerlStyle::Default;
    }

    // -- Default dispatch ---------------------------------------------------

    fn scan_default(&mut self) {
        let ch = self.ch;
        if is_digit(ch) {
            self.colour_before(self.state);
            self.state = PerlStyle::Number;
            self.num_dots = 0;
            self.num_exponents = 0;
            self.num_base = 10;
            if ch == b'0' {
                match self.ch_next {
                    b'x' | b'X' => {
                        self.num_base = 16;
                        self.advance();
                    }
                    b'b' | b'B' => {
                        self.num_base = 2;
                        self.advance();
                    }
                    next if is_digit(next) || next == b'_' => self.num_base = 8,
                    _ => {}
                }
            }
        } else if is_word_char(ch) {
            self.start_word();
        } else if ch == b'#' {
            self.colour_before(self.state);
            self.previous_state = self.state;
            self.state = PerlStyle::CommentLine;
        } else if ch == b'"' {
            self.open_quote(PerlStyle::String);
        } else if ch == b'\'' {
            // `&'name` is an archaic package-qualified call.
            if self.ch_prev != b'&' {
                self.open_quote(PerlStyle::Character);
            }
        } else if ch == b'`' {
            self.open_quote(PerlStyle::Backticks);
        } else if matches!(ch, b'$' | b'%' | b'@') {
            self.scan_sigil();
        } else if ch == b'*' {
            self.scan_glob();
        } else if matches!(ch, b'/' | b'?') && self.prefer_re {
            self.open_quote(PerlStyle::Regex);
        } else if ch == b'<' {
            if self.ch_next == b'<' {
                self.scan_shift_or_heredoc();
            } else {
                self.colour_before(self.state);
                self.prefer_re = false;
                self.binary_op_expected = false;
                self.brace_starts_block = true;
                if self.ch_next == b'=' {
                    // `<=` or `<=>`.
                    let n = if self.ch_next2 == b'>' { 2 } else { 1 };
                    self.advance_by(n);
                }
                self.colour_to(self.i, PerlStyle::Operator);
            }
        } else if ch == b'=' && is_alpha_or_high(self.ch_next) && (self.i == 0 || is_eol(self.ch_prev)) {
            self.colour_before(self.state);
            self.state = PerlStyle::Pod;
            self.fold_open();
        } else if ch == b'-'
            && self.ch_prev != b'-'
            && !self.binary_op_expected
            && is_word_before_fat_comma(self.styler, self.i + 1, self.end)
        {
            self.colour_before(self.state);
            self.state = PerlStyle::Word;
            self.brace_starts_block = true;
        } else if ch == b'-' && self.ch_next == b'>' {
            self.colour_before(self.state);
            self.colour_to(self.i + 1, PerlStyle::Operator);
            self.advance();
            self.state = PerlStyle::UnknownField;
            self.brace_starts_block = false;
        } else if ch == b'-' && is_single_char_op(self.ch_next) && !is_word_char(self.ch_next2) {
            // File test such as `-e $path`.
            self.colour_before(self.state);
            self.colour_to(self.i + 1, PerlStyle::Word);
            self.prefer_re = false;
            self.binary_op_expected = false;
            self.brace_starts_block = true;
            self.advance();
        } else if ch == b'=' && self.ch_next == b'>' {
            self.colour_before(self.state);
            self.colour_to(self.i + 1, PerlStyle::Operator);
            self.prefer_re = false;
            self.binary_op_expected = false;
            self.brace_starts_block = false;
            self.advance();
        } else if ch == b':' && self.ch_next == b':' && self.no_namespace_op {
            self.prefer_re = true;
            self.binary_op_expected = true;
            self.brace_starts_block = true;
            self.colour_before(self.state);
            if is_word_char(self.ch_next2) {
                self.state = PerlStyle::Word;
            } else {
                self.colour_to(self.i + 1, PerlStyle::Identifier);
            }
            self.advance();
        } else if ch == b'.' {
            self.colour_before(self.state);
            if is_digit(self.ch_next) {
                self.state = PerlStyle::Number;
                self.num_dots = 1;
                self.num_exponents = 0;
                self.num_base = 10;
            } else {
                if self.ch_next == b'.' {
                    // Range or yada-yada.
                    let n = if self.ch_next2 == b'.' { 2 } else { 1 };
                    self.advance_by(n);
                }
                self.prefer_re = true;
                self.brace_starts_block = false;
                self.binary_op_expected = false;
                self.colour_to(self.i, PerlStyle::Operator);
            }
        } else if is_perl_operator(ch) {
            self.scan_operator();
        }
    }

    fn open_quote(&mut self, state: PerlStyle) {
        self.colour_before(self.state);
        self.state = state;
        self.quote.reset(1);
        self.quote.open(self.ch);
    }

    /// Enter `state` for a quote-like operator unless it is a hash key
    /// such as `s => 1`.
    fn quote_operator(&mut self, word_end: usize, state: PerlStyle, rep: i32) {
        if is_fat_comma_next(self.styler, word_end + 1, self.end) {
            self.colour_to(word_end, PerlStyle::StringQ);
            self.state = PerlStyle::Default;
        } else {
            self.state = state;
            self.quote.reset(rep);
        }
    }

    fn start_word(&mut self) {
        let (ch, next, next2) = (self.ch, self.ch_next, self.ch_next2);
        self.binary_op_expected = false;
        self.colour_before(self.state);
        if self.i > 0 && follows_start_indexer(self.styler, self.i - 1) {
            // A `{bareword}` subscript, which may still be a quote operator.
            self.prefer_re = false;
            if ch == b'q' {
                if !is_word_char(next) {
                    if precedes_indexer(self.styler, self.i + 1, self.end) {
                        self.colour_to(self.i, PerlStyle::String);
                    } else {
                        self.state = PerlStyle::StringQ;
                        self.quote.reset(1);
                    }
                } else if Q_CHARS.contains(&next) && !is_word_char(next2) {
                    if precedes_indexer(self.styler, self.i + 2, self.end) {
                        self.colour_to(self.i + 1, PerlStyle::String);
                    } else {
                        self.state = q_state(next);
                        self.quote.reset(1);
                    }
                    self.advance();
                } else {
                    self.state = PerlStyle::Word;
                }
            } else if !is_word_char(next) {
                self.colour_to(self.i, PerlStyle::String);
                self.brace_starts_block = true;
            } else {
                self.state = PerlStyle::Word;
            }
        } else if ch == b's' && !is_word_char(next) && !is_eol(next) {
            self.quote_operator(self.i, PerlStyle::RegSubst, 2);
        } else if ch == b'x' && !is_word_char(next) {
            // Repetition operator.
            if is_fat_comma_next(self.styler, self.i + 1, self.end) {
                self.colour_to(self.i, PerlStyle::StringQ);
            } else {
                self.colour_to(self.i, PerlStyle::Operator);
            }
        } else if ch == b'm' && !is_word_char(next) {
            self.quote_operator(self.i, PerlStyle::Regex, 1);
        } else if ch == b'q' && !is_word_char(next) {
            self.quote_operator(self.i, PerlStyle::StringQ, 1);
        } else if ch == b'y' && !is_word_char(next) {
            self.quote_operator(self.i, PerlStyle::RegSubst, 2);
        } else if ch == b't' && next == b'r' && !is_word_char(next2) {
            self.quote_operator(self.i + 1, PerlStyle::RegSubst, 2);
            self.advance();
        } else if ch == b'q' && Q_CHARS.contains(&next) && !is_word_char(next2) {
            self.quote_operator(self.i + 1, q_state(next), 1);
            self.advance();
        } else {
            self.prefer_re = false;
            if word_ends_here(next, next2, self.no_namespace_op) {
                let start = self.styler.segment_start();
                if self.classify_word(start, self.i) == PerlStyle::Word {
                    let word = self.styler.text_range(start, self.i);
                    self.prefer_re = re_can_follow_keyword(&word);
                } else {
                    self.binary_op_expected = true;
                }
                self.state = PerlStyle::Default;
            } else {
                self.state = PerlStyle::Word;
            }
        }
    }

    /// Colour `start..=end` as a number, `word =>` key, keyword or
    /// identifier, and report which.
    fn classify_word(&mut self, start: usize, end: usize) -> PerlStyle {
        let first = self.styler.char_at(start);
        let word = self
            .styler
            .text_range(start, end.min(start + MAX_KEYWORD_LEN - 1));
        let simple = word
            .iter()
            .enumerate()
            .all(|(idx, &c)| is_word_char(c) || (idx == 0 && c == b'-'));
        self.brace_starts_block = true;
        let style = if is_digit(first) || first == b'.' {
            PerlStyle::Number
        } else if simple && is_fat_comma_next(self.styler, end + 1, self.end) {
            PerlStyle::StringQ
        } else if self.keywords.contains(&word) {
            if matches!(word.as_slice(), b"bless" | b"return" | b"ref") {
                self.brace_starts_block = false;
            }
            PerlStyle::Word
        } else {
            PerlStyle::Identifier
        };
        self.colour_to(end, style);
        style
    }

    fn scan_sigil(&mut self) {
        let (ch, next, next2) = (self.ch, self.ch_next, self.ch_next2);
        self.prefer_re = false;
        self.binary_op_expected = true;
        self.colour_before(self.state);
        let variable = match ch {
            b'$' => PerlStyle::Scalar,
            b'%' => PerlStyle::Hash,
            _ => PerlStyle::Array,
        };
        if self.i + 1 == self.end {
            self.prefer_re = true;
            self.binary_op_expected = false;
            self.brace_starts_block = true;
            self.colour_to(self.i, PerlStyle::Operator);
        } else if next == b'{' && next2 == b'^' {
            // `${^NAME}`: the opening is an operator brace so the closing
            // brace pairs with it.
            self.fold_open();
            self.advance_by(2);
            self.colour_to(self.i, PerlStyle::Operator);
            self.state = variable;
            self.braces.push(PerlStyle::Operator);
        } else if is_word_char(next) || next == b'{' {
            self.state = variable;
        } else if next == b':' && next2 == b':' {
            self.advance();
            self.state = variable;
        } else if next == b'^' && is_word_char(next2) {
            // `$^W` and friends.
            self.advance_by(2);
            self.colour_to(self.i, variable);
        } else if ch == b'$' && next == b'#' {
            self.advance();
            self.state = PerlStyle::Scalar;
        } else if ch == b'$' && next == b'$' {
            if next2 == b'$' {
                // A chain of dereferences.
                self.advance_by(2);
                while self.ch_next == b'$' {
                    self.advance();
                }
                self.state = PerlStyle::Scalar;
            } else if is_alpha_or_high(next2) || next2 == b'_' {
                self.advance();
                self.state = PerlStyle::Scalar;
            } else {
                // `$$`, the process id.
                self.advance();
                self.colour_to(self.i, variable);
                self.state = PerlStyle::Default;
                self.brace_starts_block = true;
            }
        } else if ch == b'@' && next == b'$' {
            self.advance();
            self.state = PerlStyle::Array;
        } else if ch == b'%' && next == b'$' {
            self.advance();
            self.state = PerlStyle::Hash;
        } else if next.is_ascii_punctuation() {
            // Punctuation variables such as `$_` or `@-`.
            self.advance();
            self.colour_to(self.i, variable);
            self.brace_starts_block = false;
        } else {
            // Modulus or similar.
            self.advance();
            self.colour_to(self.i, PerlStyle::Operator);
            self.prefer_re = true;
            self.binary_op_expected = false;
            self.brace_starts_block = true;
        }
    }

    fn scan_glob(&mut self) {
        let (next, next2) = (self.ch_next, self.ch_next2);
        self.colour_before(self.state);
        if next == b'*' {
            self.advance();
            self.colour_to(self.i, PerlStyle::Operator);
            self.brace_starts_block = true;
        } else if is_alpha_or_high(next) || next == b'_' || next == b'{' {
            self.prefer_re = false;
            self.state = PerlStyle::SymbolTable;
        } else if next == b':' && next2 == b':' {
            self.prefer_re = false;
            self.advance();
            self.state = PerlStyle::SymbolTable;
        } else {
            self.binary_op_expected = false;
            self.colour_to(self.i, PerlStyle::Operator);
            self.brace_starts_block = true;
        }
    }

    fn scan_shift_or_heredoc(&mut self) {
        self.colour_before(self.state);
        self.advance();
        self.colour_to(self.i, PerlStyle::Operator);
        if self.could_be_heredoc() {
            self.state = PerlStyle::HereDelim;
            self.here_doc.introduce();
        }
    }

    /// Decide whether the `<<` ending at the current byte introduces a
    /// here-document. The byte after it must be able to start a delimiter
    /// and the text before it must be an operator, a word, or nothing.
    fn could_be_heredoc(&self) -> bool {
        let len = self.styler.len();
        let after = self.ch_next;
        let could_be = if matches!(after, b'\'' | b'"' | b'_' | b'`' | b'~') || is_alpha_or_high(after) {
            true
        } else {
            after == b' ' && self.heredoc_after_space(len)
        };
        if !could_be {
            return false;
        }

        let Some(mut cursor) = self.i.checked_sub(2) else {
            return true;
        };
        loop {
            let style = style_of(self.styler, cursor);
            let ch = self.styler.char_at(cursor);
            match style {
                PerlStyle::Default | PerlStyle::Operator | PerlStyle::VariableIndexer
                    if ch.is_ascii_whitespace() => {}
                PerlStyle::Default => return false,
                PerlStyle::Operator
                | PerlStyle::VariableIndexer
                | PerlStyle::Word
                | PerlStyle::Identifier
                | PerlStyle::HereDelim => return true,
                PerlStyle::Scalar => {
                    // `print $fh <<EOF` but not `$x <<EOF`.
                    let mut p = cursor;
                    while p > 0 && style_of(self.styler, p) == PerlStyle::Scalar {
                        p -= 1;
                    }
                    while p > 0 && self.styler.char_at(p) == b' ' {
                        p -= 1;
                    }
                    return matches!(
                        style_of(self.styler, p),
                        PerlStyle::Word | PerlStyle::Identifier
                    );
                }
                _ => return false,
            }
            match cursor.checked_sub(1) {
                Some(p) => cursor = p,
                None => return true,
            }
        }
    }

    /// `<< "END"` or `<< END`: look past the blanks for something that can
    /// only be a delimiter.
    fn heredoc_after_space(&self, len: usize) -> bool {
        let mut pos = self.i + 2;
        while pos < len {
            let ch = self.styler.char_at(pos);
            if ch == b' ' || ch == b'\t' {
                pos += 1;
                continue;
            }
            return match ch {
                b'\r' | b'\n' | b'@' | b'$' | b'(' => false,
                c if is_word_char(c) => false,
                b'-' | b'+' => true,
                b'"' | b'\'' => {
                    pos + 1 < len && {
                        let ch2 = self.styler.char_at(pos + 1);
                        !is_eol(ch2) && !is_digit(ch2)
                    }
                }
                _ => true,
            };
        }
        false
    }

    fn scan_operator(&mut self) {
        let ch = self.ch;
        self.prefer_re = !(ch == b')' || ch == b']' || (ch == b'}' && self.variable_nesting != 0));
        self.colour_before(self.state);
        let mut op_style = PerlStyle::Operator;
        match ch {
            b'[' => {
                op_style = PerlStyle::VariableIndexer;
                self.variable_nesting += 1;
                self.brace_starts_block = false;
                self.binary_op_expected = false;
                self.fold_open();
            }
            b'{' => {
                let mut look_for_bareword = false;
                if !self.brace_starts_block {
                    op_style = PerlStyle::VariableIndexer;
                    self.variable_nesting += 1;
                    look_for_bareword = self.variable_nesting == 1;
                }
                self.braces.push(op_style);
                self.fold_open();
                self.binary_op_expected = false;
                if look_for_bareword && looking_at_bareword(self.styler, self.i + 1, self.styler.len()) {
                    self.colour_to(self.i, PerlStyle::VariableIndexer);
                    self.colourise_bareword();
                }
            }
            b'(' => {
                self.binary_op_expected = false;
                self.fold_open();
                self.brace_starts_block = false;
            }
            b']' => {
                if self.variable_nesting > 0 {
                    op_style = PerlStyle::VariableIndexer;
                    self.variable_nesting -= 1;
                    self.binary_op_expected = true;
                    self.prefer_re = false;
                    self.brace_starts_block = false;
                    if self.ch_next == b'-' && self.ch_next2 == b'>' {
                        self.state = PerlStyle::UnknownField;
                    }
                } else {
                    self.binary_op_expected = false;
                }
                self.fold_close();
            }
            b'}' => {
                op_style = match self.braces.pop() {
                    Some(style) => style,
                    None => matching_brace_style(self.styler, self.i),
                };
                if op_style == PerlStyle::VariableIndexer {
                    self.variable_nesting = self.variable_nesting.saturating_sub(1);
                    self.binary_op_expected = true;
                    self.prefer_re = false;
                    if self.ch_next == b'-' && self.ch_next2 == b'>' {
                        self.state = PerlStyle::UnknownField;
                    }
                } else {
                    self.binary_op_expected = false;
                }
                self.fold_close();
                self.brace_starts_block = false;
            }
            b')' => {
                self.binary_op_expected = false;
                self.brace_starts_block = true;
                self.fold_close();
            }
            _ => {
                self.binary_op_expected = false;
                match ch {
                    b'=' | b',' | b'\\' | b'?' => self.brace_starts_block = false,
                    b'&' | b'|' => self.brace_starts_block = self.ch_prev != ch,
                    b':' => {
                        self.brace_starts_block = self
                            .i
                            .checked_sub(1)
                            .is_some_and(|pos| after_label(self.styler, pos));
                    }
                    b'+' | b'-' => {
                        if self.ch_next == ch {
                            self.binary_op_expected = true;
                            self.prefer_re = false;
                            self.brace_starts_block = true;
                            self.advance();
                        }
                    }
                    b'/' => {
                        // `//`, defined-or.
                        if self.ch_next == b'/' {
                            self.advance();
                        }
                        self.brace_starts_block = true;
                    }
                    _ => self.brace_starts_block = true,
                }
            }
        }
        self.colour_to(self.i, op_style);
    }

    /// Colour the `bareword }` following the indexer brace at the current
    /// byte and stop on the last blank before the `}`.
    fn colourise_bareword(&mut self) {
        let len = self.styler.len();
        let mut pos = self.i + 1;
        while pos < len && is_space(self.styler.char_at(pos)) {
            pos += 1;
        }
        self.colour_to(pos - 1, PerlStyle::Default);
        if pos < len && self.styler.char_at(pos) == b'-' {
            pos += 1;
        }
        while pos < len && is_word_char(self.styler.char_at(pos)) {
            pos += 1;
        }
        self.colour_to(pos - 1, PerlStyle::String);
        while pos < len && is_space(self.styler.char_at(pos)) {
            pos += 1;
        }
        self.colour_to(pos - 1, PerlStyle::Default);
        self.i = pos - 1;
        self.state = PerlStyle::Default;
        self.load();
    }

    // -- Words and numbers --------------------------------------------------

    fn scan_word(&mut self) {
        if self.ch == b':' && self.ch_next == b':' && self.no_namespace_op {
            if !is_word_char(self.ch_next2) {
                self.prefer_re = true;
                self.binary_op_expected = true;
                self.brace_starts_block = true;
                self.colour_to(self.i, PerlStyle::Identifier);
                self.state = PerlStyle::Default;
            }
            self.advance();
            return;
        }
        if !word_ends_here(self.ch_next, self.ch_next2, self.no_namespace_op) {
            return;
        }
        if (self.i + 1 == self.end || self.ch_next == b'}')
            && self.i > 0
            && follows_start_indexer(self.styler, self.i - 1)
        {
            self.colour_to(self.i, PerlStyle::String);
            self.state = PerlStyle::Default;
            return;
        }

        let start = self.styler.segment_start();
        if self.styler.char_at(start) == b'_'
            && (is_match(self.styler, self.end, start, b"__DATA__")
                || is_match(self.styler, self.end, start, b"__END__"))
        {
            self.colour_to(self.i, PerlStyle::DataSection);
            self.state = PerlStyle::DataSection;
            return;
        }
        if start + 5 == self.i
            && is_match(self.styler, self.end, start, b"format")
            && self.at_start_of_format()
        {
            self.state = PerlStyle::Format;
            return;
        }

        self.state = PerlStyle::Default;
        self.ch = b' ';
        if start + 2 == self.i && is_match(self.styler, self.end, start, b"sub") {
            let next_visible = (self.i + 1..self.end)
                .map(|pos| self.styler.char_at(pos))
                .find(|&c| !is_space(c));
            match next_visible {
                Some(c) if is_alpha_or_high(c) || b"_{;(".contains(&c) => {
                    self.colour_to(self.i, PerlStyle::Word);
                    self.state = PerlStyle::Sub;
                }
                Some(_) => self.colour_to(self.i, PerlStyle::Identifier),
                None => self.colour_to(self.i, PerlStyle::Word),
            }
            self.brace_starts_block = true;
        } else if self.classify_word(start, self.i) == PerlStyle::Word {
            let word = self.styler.text_range(start, self.i);
            self.prefer_re = re_can_follow_keyword(&word);
        } else {
            self.binary_op_expected = true;
            self.brace_starts_block = true;
        }
    }

    /// Match `format NAME =` with the current byte on the `t` of `format`.
    /// On success the pieces are coloured and the scan stands on the `=`.
    fn at_start_of_format(&mut self) -> bool {
        let pos = self.i;
        if pos + 3 >= self.end || !is_space_or_tab(self.styler.char_at(pos + 1)) {
            return false;
        }
        let mut test = pos + 1;
        while test < self.end && is_space_or_tab(self.styler.char_at(test)) {
            test += 1;
        }
        let blank_end = test - 1;
        let first = self.styler.char_at(test);
        if !(is_alpha_or_high(first) || first == b'_') {
            return false;
        }
        test += 1;
        while test < self.end && is_word_char(self.styler.char_at(test)) {
            test += 1;
        }
        let name_end = test - 1;
        while test < self.end && is_space_or_tab(self.styler.char_at(test)) {
            test += 1;
        }
        let gap_end = test - 1;
        if test >= self.end || self.styler.char_at(test) != b'=' {
            return false;
        }

        self.colour_to(pos, PerlStyle::Word);
        self.colour_to(blank_end, PerlStyle::Default);
        self.colour_to(name_end, PerlStyle::Identifier);
        self.colour_to(gap_end, PerlStyle::Default);
        self.colour_to(test, PerlStyle::Operator);
        self.i = test;
        self.load();
        true
    }

    fn scan_number(&mut self) {
        let ch = self.ch;
        let restyle = if is_digit(ch) || ch == b'_' {
            false
        } else if self.num_base == 10 {
            match ch {
                b'.' => {
                    self.num_dots += 1;
                    !(self.num_dots == 1 && self.num_exponents == 0 && self.ch_next != b'.')
                }
                b'e' | b'E' => {
                    self.num_exponents += 1;
                    self.num_exponents != 1
                }
                b'-' => !matches!(self.ch_prev, b'e' | b'E'),
                _ => true,
            }
        } else {
            !(self.num_base == 16 && ch.is_ascii_hexdigit())
        };
        if !restyle {
            return;
        }
        self.colour_before(PerlStyle::Number);
        if is_eol(ch) {
            // Nothing to re-examine.
        } else if ch == b'.' && self.ch_next != b'.' {
            // Keeps `0x3.4` from reading as two adjacent numbers.
            self.colour_to(self.i, PerlStyle::Operator);
        } else {
            self.retreat();
        }
        self.state = PerlStyle::Default;
        self.prefer_re = false;
        self.binary_op_expected = true;
        self.brace_starts_block = true;
    }

    // -- Here-documents -----------------------------------------------------

    /// The delimiter line ended: the body starts on the next line.
    fn start_here_body(&mut self) {
        let line_start = self.styler.line_start(self.styler.line_of(self.i));
        self.here_doc.has_semicolon = (line_start..self.i)
            .rev()
            .map(|pos| self.styler.char_at(pos))
            .find(|&c| !is_space_or_tab(c) && !is_eol(c))
            == Some(b';');
        if self.here_doc.quoted && self.state == PerlStyle::HereDelim {
            // The closing quote of the delimiter is missing.
            self.colour_before(PerlStyle::Error);
            self.here_doc.finish();
            self.state = PerlStyle::Default;
            return;
        }
        self.here_doc.phase = HereDocPhase::Body;
        self.colour_before(self.state);
        self.state = PerlStyle::HereQ;
    }

    fn scan_here_delim(&mut self) {
        let ch = self.ch;
        match self.here_doc.phase {
            HereDocPhase::Introduced => {
                if ch == b'~' && !self.here_doc.indentable {
                    self.here_doc.indentable = true;
                    return;
                }
                self.here_doc.phase = HereDocPhase::Delimiter;
                self.here_doc.quote = ch;
                self.here_doc.quoted = false;
                if matches!(ch, b'\'' | b'"' | b'`') {
                    self.here_doc.quoted = true;
                } else if is_word_char(ch) {
                    self.push_delimiter(ch);
                } else if is_space(ch) {
                    // `<< "END"`: the body ends at the first blank line.
                    self.colour_to(self.i, PerlStyle::HereDelim);
                    self.state = PerlStyle::Default;
                    self.brace_starts_block = true;
                }
            }
            HereDocPhase::Delimiter if self.here_doc.quoted => {
                if ch == self.here_doc.quote {
                    self.colour_to(self.i, PerlStyle::HereDelim);
                    self.state = PerlStyle::Default;
                    self.binary_op_expected = true;
                    self.brace_starts_block = true;
                } else {
                    if ch == b'\\' && self.ch_next == self.here_doc.quote {
                        self.advance();
                    }
                    self.push_delimiter(self.ch);
                }
            }
            HereDocPhase::Delimiter => {
                if is_word_char(ch) {
                    self.push_delimiter(ch);
                } else {
                    self.colour_before(PerlStyle::HereDelim);
                    self.state = PerlStyle::Default;
                    self.brace_starts_block = true;
                    self.retreat();
                }
            }
            _ => {}
        }
    }

    fn push_delimiter(&mut self, ch: u8) {
        if self.here_doc.push(ch).is_err() {
            lexkit_core::debug!(pos = self.i, "here-document delimiter too long");
            self.colour_before(PerlStyle::HereDelim);
            self.here_doc.finish();
            self.state = PerlStyle::Error;
            self.brace_starts_block = true;
        }
    }

    /// At the start of a body line: check for the terminator.
    fn scan_here_body(&mut self) {
        if self.here_doc.delimiter().is_empty() {
            if is_eol(self.ch) {
                self.colour_before(PerlStyle::HereQ);
                self.colour_to(self.i, PerlStyle::HereDelim);
                self.end_here_doc();
            }
            return;
        }
        let at = if self.here_doc.indentable {
            let mut pos = self.i;
            while pos < self.end && is_space_or_tab(self.styler.char_at(pos)) {
                pos += 1;
            }
            pos
        } else {
            self.i
        };
        if is_match(self.styler, self.end, at, self.here_doc.delimiter()) {
            self.colour_before(PerlStyle::HereQ);
            let len = self.here_doc.delimiter().len();
            self.i = at + len - 1;
            self.load();
            if is_eol(self.ch_next) {
                self.colour_to(self.i, PerlStyle::HereDelim);
                self.end_here_doc();
            }
        }
    }

    fn end_here_doc(&mut self) {
        self.state = PerlStyle::Default;
        self.prefer_re = self.here_doc.has_semicolon;
        self.here_doc.finish();
        self.brace_starts_block = true;
    }

    // -- Variables ----------------------------------------------------------

    fn scan_variable(&mut self) {
        let (ch, next, next2) = (self.ch, self.ch_next, self.ch_next2);
        if ch == b'{' || ch == b'[' {
            self.colour_before(self.state);
            self.colour_to(self.i, PerlStyle::VariableIndexer);
            self.variable_nesting += 1;
            self.binary_op_expected = false;
            self.fold_open();
            if ch == b'{' {
                self.braces.push(PerlStyle::VariableIndexer);
            }
            self.state = PerlStyle::Default;
            self.brace_starts_block = false;
            if looking_at_bareword(self.styler, self.i + 1, self.styler.len()) {
                self.colourise_bareword();
            }
        } else if next == b':' && next2 == b':' {
            let n = if self.no_namespace_op { 2 } else { 1 };
            self.advance_by(n);
        } else if ch == b'-' && next == b'>' {
            self.colour_before(self.state);
            self.colour_to(self.i + 1, PerlStyle::Operator);
            self.advance();
            self.state = PerlStyle::UnknownField;
            self.brace_starts_block = false;
        } else if is_space(next) || (is_end_var(next) && (next != b'-' || next2 != b'>')) {
            self.colour_to(self.i, self.state);
            self.state = PerlStyle::Default;
            self.binary_op_expected = true;
            self.brace_starts_block = !is_space(next);
            if ch == b'(' {
                self.fold_open();
            } else if b")]}".contains(&ch) {
                self.fold_close();
            }
        }
    }

    /// After `->`: a method name, a subscript or a call.
    fn scan_unknown_field(&mut self) {
        let ch = self.ch;
        if ch == b'{' || ch == b'[' {
            self.colour_to(self.i, PerlStyle::VariableIndexer);
            self.variable_nesting += 1;
            self.binary_op_expected = false;
            self.fold_open();
            if ch == b'{' {
                self.braces.push(PerlStyle::VariableIndexer);
            }
            self.state = PerlStyle::Default;
            self.brace_starts_block = false;
        } else if ch == b'(' {
            self.colour_to(self.i, PerlStyle::Operator);
            self.binary_op_expected = false;
            self.state = PerlStyle::Default;
            self.brace_starts_block = false;
            self.fold_open();
        } else if is_word_char(ch) {
            self.colour_before(PerlStyle::UnknownField);
            self.binary_op_expected = true;
            self.state = if is_word_char(self.ch_next) {
                PerlStyle::Word
            } else {
                PerlStyle::Default
            };
            self.brace_starts_block = false;
        } else if ch == b'-' && self.ch_next == b'>' {
            self.colour_to(self.i + 1, PerlStyle::Operator);
            self.advance();
            self.brace_starts_block = false;
        } else if is_space(ch) {
            self.colour_to(self.i, PerlStyle::Default);
            self.brace_starts_block = false;
        } else if matches!(ch, b'$' | b'%' | b'@') {
            self.colour_before(PerlStyle::Default);
            self.state = PerlStyle::Default;
            self.retreat();
        } else {
            self.state = PerlStyle::Default;
            self.brace_starts_block = true;
            if b")]}".contains(&ch) {
                self.fold_close();
            }
        }
    }

    // -- Quote-like literals -------------------------------------------------

    /// Colour `$name` or `@name` inside an interpolating literal, then
    /// resume the literal at the byte after the name.
    fn interpolate_variable(&mut self) {
        self.colour_before(self.state);
        let style = if self.ch == b'$' {
            PerlStyle::Scalar
        } else {
            PerlStyle::Array
        };
        let mut pos = self.i + 1;
        while pos < self.end && is_word_char(self.styler.char_at(pos)) {
            pos += 1;
        }
        self.colour_to(pos - 1, style);
        self.i = pos;
        self.ch_prev = self.styler.char_at(pos - 1);
        self.retreat();
    }

    fn close_quote(&mut self) {
        self.colour_to(self.i, self.state);
        self.state = PerlStyle::Default;
        self.prefer_re = false;
        self.brace_starts_block = true;
        self.ch = b' ';
    }

    fn skip_escape(&mut self) {
        self.advance();
    }

    fn scan_regex(&mut self) {
        let ch = self.ch;
        if self.quote.up == 0 && !is_space(ch) {
            self.quote.open(ch);
        } else if ch == b'\\' && self.quote.up != b'\\' {
            self.skip_escape();
        } else if ch == self.quote.down {
            self.quote.count -= 1;
            if self.quote.count == 0 {
                self.quote.rep -= 1;
                if !self.quote.is_bracketed() {
                    self.quote.count += 1;
                }
            }
            if !is_alpha_or_high(self.ch_next) && self.quote.rep <= 0 {
                self.close_quote();
            }
        } else if ch == self.quote.up {
            self.quote.count += 1;
        } else if !is_alpha_or_high(self.ch_next) {
            // Trailing option letters end here.
            if self.quote.rep <= 0 {
                self.close_quote();
            }
        } else if matches!(ch, b'$' | b'@') && is_word_char(self.ch_next) {
            self.interpolate_variable();
        }
    }

    /// `s`, `tr` and `y`: two delimited parts, the second possibly with
    /// its own bracket pair.
    fn scan_substitution(&mut self) {
        let ch = self.ch;
        if self.quote.up == 0 && !is_space(ch) {
            self.quote.open(ch);
        } else if ch == b'\\' && self.quote.up != b'\\' {
            self.skip_escape();
        } else if self.quote.count == 0 && self.quote.rep == 1 {
            // Between `s{...}` and the second part.
            if ch != b'_' && is_word_char(ch) {
                self.close_quote();
            } else if !is_space(ch) {
                self.quote.open(ch);
            }
        } else if ch == self.quote.down {
            self.quote.count -= 1;
            if self.quote.count == 0 {
                self.quote.rep -= 1;
            }
            if !is_alpha_or_high(self.ch_next) && self.quote.rep <= 0 {
                self.close_quote();
            }
            if !self.quote.is_bracketed() {
                self.quote.count += 1;
            }
        } else if ch == self.quote.up {
            self.quote.count += 1;
        } else if !is_alpha_or_high(self.ch_next) {
            if self.quote.rep <= 0 {
                self.close_quote();
            }
        } else if matches!(ch, b'$' | b'@') && self.quote.rep == 2 && is_word_char(self.ch_next) {
            self.interpolate_variable();
        }
    }

    fn scan_string(&mut self) {
        let ch = self.ch;
        if self.quote.down == 0 && !is_space(ch) {
            self.quote.open(ch);
        } else if ch == b'\\' && self.quote.up != b'\\' {
            self.skip_escape();
        } else if ch == self.quote.down {
            self.quote.count -= 1;
            if self.quote.count == 0 {
                self.quote.rep -= 1;
                if self.quote.rep <= 0 {
                    self.colour_to(self.i, self.state);
                    self.state = PerlStyle::Default;
                    self.brace_starts_block = true;
                }
                if !self.quote.is_bracketed() {
                    self.quote.count += 1;
                }
                self.prefer_re = false;
            }
        } else if ch == self.quote.up {
            self.quote.count += 1;
        } else if matches!(ch, b'$' | b'@') && self.state.interpolates() && is_word_char(self.ch_next) {
            self.interpolate_variable();
        }
    }

    // -- Subroutines ---------------------------------------------------------

    fn scan_sub(&mut self) {
        match self.ch {
            b'(' | b'{' | b';' => {
                self.colour_before(PerlStyle::Identifier);
                self.colour_to(self.i, PerlStyle::Operator);
                match self.ch {
                    b'(' => {
                        self.state = PerlStyle::SubArgs;
                        self.brace_starts_block = true;
                        self.fold_open();
                    }
                    b'{' => {
                        self.fold_open();
                        self.brace_starts_block = false;
                        self.braces.push(PerlStyle::Operator);
                        self.state = PerlStyle::Default;
                    }
                    _ => {
                        self.brace_starts_block = true;
                        self.state = PerlStyle::Default;
                    }
                }
            }
            b'#' => {
                self.colour_before(PerlStyle::Identifier);
                self.previous_state = PerlStyle::Sub;
                self.state = PerlStyle::CommentLine;
                self.brace_starts_block = true;
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

fn fold_perl(start: usize, length: usize, styler: &mut Styler<'_>) {
    let fold_comment = styler.property_int("fold.comment", 0) != 0;
    let compact = styler.property_int("fold.compact", 1) != 0;
    let end = (start + length).min(styler.len());
    let (start, _) = synchronize_doc_start(styler, start);
    let mut acc = FoldAccumulator::resume(styler, start, compact);
    let len = styler.len();

    for i in start..end {
        let ch = styler.char_at(i);
        let ch_next = styler.safe_char_at(i + 1, 0);
        let style = style_of(styler, i);
        let at_eol = (ch == b'\r' && ch_next != b'\n') || ch == b'\n';

        match style {
            PerlStyle::CommentLine if fold_comment && ch == b'#' => match ch_next {
                b'{' => acc.open(),
                b'}' => acc.close(),
                _ => {}
            },
            PerlStyle::Operator | PerlStyle::VariableIndexer => {
                if b"{[(".contains(&ch) {
                    acc.open();
                } else if b")]}".contains(&ch) {
                    acc.close();
                }
            }
            PerlStyle::Pod if ch == b'=' => {
                let line = acc.line();
                if line == 0 || style_of(styler, styler.line_start(line - 1)) != PerlStyle::Pod {
                    acc.open();
                } else {
                    let next_line = styler.line_start(line + 1);
                    if next_line < len && style_of(styler, next_line) != PerlStyle::Pod {
                        acc.close();
                    }
                }
            }
            _ => {}
        }

        if at_eol {
            acc.end_line(styler);
        } else if !is_space(ch) {
            acc.note_visible();
        }
    }
    acc.finish(styler);
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// The Perl lexer. Keyword list 0 holds the reserved words and builtins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerlLexer;

impl PerlLexer {
    pub fn default_keywords() -> KeywordSets {
        KeywordSets::from_strs(&[KEYWORDS])
    }
}

impl Lexer for PerlLexer {
    fn name(&self) -> &'static str {
        "perl"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pl", "pm", "pod", "t", "cgi"]
    }

    fn word_list_descriptions(&self) -> &'static [&'static str] {
        &["Keywords"]
    }

    fn lex(&self, start: usize, length: usize, _init_style: u8, keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = (start + length).min(styler.len());
        let (sync_start, carry) = synchronize_doc_start(styler, start);
        if sync_start != start {
            lexkit_core::trace!(requested = start, resumed = sync_start, state = ?carry.state, "perl resync");
        }
        let _span = lexkit_core::debug_span!("perl", start, length, resumed = sync_start).entered();
        if end <= sync_start {
            return;
        }
        styler.start_at(sync_start);
        styler.start_segment(sync_start);
        let mut scan = Scan::new(styler, keywords.get(0), sync_start, end, carry);
        scan.run();
    }

    fn fold(&self, start: usize, length: usize, _init_style: u8, _keywords: &KeywordSets, styler: &mut Styler<'_>) {
        // Levels were already written while lexing.
        if styler.property_int("fold", 0) != 0 {
            return;
        }
        fold_perl(start, length, styler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexkit_core::{Properties, TextBuffer};

    fn lex_with(text: &str, props: &Properties) -> TextBuffer {
        let mut buf = TextBuffer::from(text);
        PerlLexer.colourise_document(&mut buf, props, &PerlLexer::default_keywords());
        buf
    }

    fn lex(text: &str) -> TextBuffer {
        lex_with(text, &Properties::new())
    }

    fn styles_of(buf: &TextBuffer, range: std::ops::Range<usize>) -> Vec<PerlStyle> {
        buf.styles()[range]
            .iter()
            .map(|&s| PerlStyle::from_u8(s).unwrap())
            .collect()
    }

    fn all(style: PerlStyle, n: usize) -> Vec<PerlStyle> {
        vec![style; n]
    }

    fn depths(buf: &TextBuffer) -> Vec<i32> {
        buf.fold_levels().iter().map(|l| l.depth()).collect()
    }

    #[test]
    fn style_codes_round_trip() {
        for style in PerlStyle::ALL {
            assert_eq!(PerlStyle::from_u8(style.code()), Some(style));
        }
        assert_eq!(PerlStyle::from_u8(8), None);
    }

    #[test]
    fn line_carry_wire_format() {
        let carry = LineCarry {
            resumable: true,
            prefer_re: false,
            brace_starts_block: true,
            binary_op_expected: true,
            state: PerlStyle::Pod,
        };
        assert_eq!(carry.pack(), 0x100 | 0x2 | 0x4 | (3 << 16));
        assert_eq!(LineCarry::unpack(carry.pack()), carry);
        assert!(!LineCarry::unpack(0).resumable);
    }

    #[test]
    fn division_after_scalar() {
        let buf = lex("$a / $b");
        assert_eq!(
            styles_of(&buf, 0..7),
            vec![
                PerlStyle::Scalar,
                PerlStyle::Scalar,
                PerlStyle::Default,
                PerlStyle::Operator,
                PerlStyle::Default,
                PerlStyle::Scalar,
                PerlStyle::Scalar,
            ]
        );
    }

    #[test]
    fn pattern_after_keyword() {
        let buf = lex("split /,/, $s");
        assert_eq!(styles_of(&buf, 0..5), all(PerlStyle::Word, 5));
        assert_eq!(styles_of(&buf, 6..9), all(PerlStyle::Regex, 3));
    }

    #[test]
    fn quote_like_literal_nests() {
        let buf = lex("q{a{b}c} z");
        assert_eq!(styles_of(&buf, 0..8), all(PerlStyle::StringQ, 8));
        assert_eq!(styles_of(&buf, 9..10), vec![PerlStyle::Identifier]);
    }

    #[test]
    fn substitution_with_bracketed_parts() {
        let buf = lex("s{a}{b}g;");
        assert_eq!(styles_of(&buf, 0..8), all(PerlStyle::RegSubst, 8));
        assert_eq!(styles_of(&buf, 8..9), vec![PerlStyle::Operator]);
    }

    #[test]
    fn transliteration() {
        let buf = lex("tr/a-z/A-Z/;");
        assert_eq!(styles_of(&buf, 0..11), all(PerlStyle::RegSubst, 11));
    }

    #[test]
    fn fat_comma_keys_are_strings() {
        let buf = lex("(foo => 1, -bar => 2)");
        assert_eq!(styles_of(&buf, 1..4), all(PerlStyle::StringQ, 3));
        assert_eq!(styles_of(&buf, 5..7), all(PerlStyle::Operator, 2));
        assert_eq!(styles_of(&buf, 11..15), all(PerlStyle::StringQ, 4));
    }

    #[test]
    fn bareword_subscript() {
        let buf = lex("$h{key}");
        assert_eq!(styles_of(&buf, 0..2), all(PerlStyle::Scalar, 2));
        assert_eq!(styles_of(&buf, 2..3), vec![PerlStyle::VariableIndexer]);
        assert_eq!(styles_of(&buf, 3..6), all(PerlStyle::String, 3));
        assert_eq!(styles_of(&buf, 6..7), vec![PerlStyle::VariableIndexer]);
    }

    #[test]
    fn heredoc_body_and_terminator() {
        let text = "print <<EOF;\nhello\nEOF\nz;\n";
        let buf = lex(text);
        assert_eq!(styles_of(&buf, 6..8), all(PerlStyle::Operator, 2));
        assert_eq!(styles_of(&buf, 8..11), all(PerlStyle::HereDelim, 3));
        assert_eq!(styles_of(&buf, 13..18), all(PerlStyle::HereQ, 5));
        assert_eq!(styles_of(&buf, 19..22), all(PerlStyle::HereDelim, 3));
        assert_eq!(styles_of(&buf, 23..24), vec![PerlStyle::Identifier]);
        assert!(!LineCarry::unpack(buf.line_states()[1]).resumable);
        assert!(LineCarry::unpack(buf.line_states()[3]).resumable);
    }

    #[test]
    fn indentable_heredoc() {
        let text = "my $s = <<~EOT;\n  body\n  EOT\nz;\n";
        let buf = lex(text);
        assert_eq!(styles_of(&buf, 10..14), all(PerlStyle::HereDelim, 4));
        assert_eq!(styles_of(&buf, 16..22), all(PerlStyle::HereQ, 6));
        assert_eq!(styles_of(&buf, 23..28), all(PerlStyle::HereDelim, 5));
        assert_eq!(styles_of(&buf, 29..30), vec![PerlStyle::Identifier]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let buf = lex("\"abc");
        assert_eq!(styles_of(&buf, 0..4), all(PerlStyle::Error, 4));
    }

    #[test]
    fn interpolated_scalar() {
        let buf = lex("\"a $b c\"");
        assert_eq!(styles_of(&buf, 0..3), all(PerlStyle::String, 3));
        assert_eq!(styles_of(&buf, 3..5), all(PerlStyle::Scalar, 2));
        assert_eq!(styles_of(&buf, 5..8), all(PerlStyle::String, 3));
    }

    #[test]
    fn pod_block() {
        let buf = lex("=pod\ntext\n=cut\nz;\n");
        assert_eq!(styles_of(&buf, 0..14), all(PerlStyle::Pod, 14));
        assert_eq!(styles_of(&buf, 15..16), vec![PerlStyle::Identifier]);
    }

    #[test]
    fn data_section_runs_to_the_end() {
        let text = "z;\n__END__\nfoo \"bar\n";
        let buf = lex(text);
        assert_eq!(styles_of(&buf, 3..text.len()), all(PerlStyle::DataSection, text.len() - 3));
    }

    #[test]
    fn sub_name_and_body() {
        let buf = lex("sub foo {\n  1;\n}\n");
        assert_eq!(styles_of(&buf, 0..3), all(PerlStyle::Word, 3));
        assert_eq!(styles_of(&buf, 4..7), all(PerlStyle::Identifier, 3));
        assert_eq!(styles_of(&buf, 8..9), vec![PerlStyle::Operator]);
        assert_eq!(styles_of(&buf, 15..16), vec![PerlStyle::Operator]);
    }

    #[test]
    fn file_test_operator() {
        let buf = lex("if (-e $f) {}");
        assert_eq!(styles_of(&buf, 4..6), all(PerlStyle::Word, 2));
    }

    #[test]
    fn format_block() {
        let buf = lex("format STDOUT =\n@<<<\n.\nz;\n");
        assert_eq!(styles_of(&buf, 0..6), all(PerlStyle::Word, 6));
        assert_eq!(styles_of(&buf, 7..13), all(PerlStyle::Identifier, 6));
        assert_eq!(styles_of(&buf, 14..15), vec![PerlStyle::Operator]);
        assert_eq!(styles_of(&buf, 16..22), all(PerlStyle::Format, 6));
        assert_eq!(styles_of(&buf, 23..24), vec![PerlStyle::Identifier]);
    }

    #[test]
    fn stray_brace_matches_by_counting_back() {
        let mut buf = lex("{ $h{k} }");
        let props = Properties::new();
        let styler = Styler::new(&mut buf, &props);
        assert_eq!(matching_brace_style(&styler, 8), PerlStyle::Operator);
        assert_eq!(matching_brace_style(&styler, 6), PerlStyle::VariableIndexer);
    }

    #[test]
    fn resumes_from_a_later_line() {
        let text = "my %h = (a => 1);\nif ($x / 2) {\n  print $h{key};\n}\n$y =~ s/a/b/g;\n";
        let full = lex(text);
        let mut buf = TextBuffer::from(text);
        let props = Properties::new();
        let keywords = PerlLexer::default_keywords();
        PerlLexer.colourise_range(&mut buf, &props, &keywords, 0, 20);
        PerlLexer.colourise_range(&mut buf, &props, &keywords, 20, text.len() - 20);
        assert_eq!(buf.styles(), full.styles());
    }

    #[test]
    fn resumes_inside_pod() {
        let text = "z;\n=pod\none\ntwo\n=cut\ny;\n";
        let full = lex(text);
        let mut buf = full.clone();
        buf.reset_styles_from(13);
        PerlLexer.colourise_range(&mut buf, &Properties::new(), &PerlLexer::default_keywords(), 13, text.len() - 13);
        assert_eq!(buf.styles(), full.styles());
    }

    #[test]
    fn inline_folding() {
        let props = Properties::from_pairs([("fold", "1")]);
        let buf = lex_with("sub foo {\n  1;\n}\n", &props);
        assert_eq!(&depths(&buf)[..4], &[0, 1, 1, 0]);
        assert!(buf.fold_levels()[0].is_header());
    }

    #[test]
    fn fold_pass_on_braces_and_pod() {
        let buf = lex("sub foo {\n  1;\n}\n");
        assert_eq!(&depths(&buf)[..4], &[0, 1, 1, 0]);
        let buf = lex("=pod\nx\n=cut\nz;\n");
        assert_eq!(&depths(&buf)[..4], &[0, 1, 1, 0]);
        assert!(buf.fold_levels()[0].is_header());
    }

    #[test]
    fn comment_markers_fold_when_enabled() {
        let props = Properties::from_pairs([("fold.comment", "1")]);
        let buf = lex_with("#{ region\nz;\n#} end\ny;\n", &props);
        assert_eq!(&depths(&buf)[..4], &[0, 1, 1, 0]);
    }
}
