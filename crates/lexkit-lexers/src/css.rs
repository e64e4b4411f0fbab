#![forbid(unsafe_code)]

//! CSS lexer with the Less and SCSS dialects.
//!
//! Styling runs on a [`StyleContext`]: each step first decides whether the
//! current run ends at this byte, then, if the context is back in the
//! default state, picks the run the byte starts. A small amount of
//! structural state (top level, selector, declaration name, property value)
//! tells selectors apart from declarations; Less and SCSS allow nesting, so
//! there the two stay ambiguous until a `:` or `;` decides.
//!
//! None of that state is persisted. A pass resumes at the nearest line whose
//! fold depth is zero, where the structure is back at the top level.

use lexkit_core::chars::{is_digit, is_eol, is_high_bit, is_space, is_space_or_tab};
use lexkit_core::{FoldAccumulator, KeywordSets, Lexer, StyleContext, Styler, WordList};

const CSS1_PROPERTIES: &str = "background background-attachment background-color background-image \
    background-position background-repeat border border-bottom border-bottom-width border-color \
    border-left border-left-width border-right border-right-width border-style border-top \
    border-top-width border-width clear color display float font font-family font-size font-style \
    font-variant font-weight height letter-spacing line-height list-style list-style-image \
    list-style-position list-style-type margin margin-bottom margin-left margin-right margin-top \
    padding padding-bottom padding-left padding-right padding-top text-align text-decoration \
    text-indent text-transform vertical-align white-space width word-spacing";

const PSEUDO_CLASSES: &str = "active after before checked default disabled empty enabled \
    first first-child first-letter first-line first-of-type focus hover indeterminate invalid \
    lang last-child last-of-type left link not nth-child nth-last-child nth-last-of-type \
    nth-of-type only-child only-of-type optional read-only read-write required right root \
    target valid visited";

const CSS2_PROPERTIES: &str = "border-bottom-color border-bottom-style border-collapse \
    border-left-color border-left-style border-right-color border-right-style border-spacing \
    border-top-color border-top-style bottom caption-side clip content counter-increment \
    counter-reset cursor direction empty-cells left max-height max-width min-height min-width \
    orphans outline outline-color outline-style outline-width overflow page-break-after \
    page-break-before page-break-inside position quotes right table-layout top unicode-bidi \
    visibility widows z-index";

const CSS3_PROPERTIES: &str = "align-content align-items align-self animation animation-delay \
    animation-duration animation-name background-clip background-origin background-size \
    border-image border-radius box-shadow box-sizing column-count column-gap columns flex \
    flex-basis flex-direction flex-flow flex-grow flex-shrink flex-wrap gap grid \
    grid-template-areas grid-template-columns grid-template-rows justify-content opacity \
    order resize text-overflow text-shadow transform transform-origin transition \
    transition-delay transition-duration transition-property word-wrap";

const PSEUDO_ELEMENTS: &str = "after before first-letter first-line marker placeholder selection";

const BROWSER_PROPERTIES: &str = "-moz-appearance -moz-border-radius -moz-box-shadow \
    -moz-transition -ms-filter -o-transition -webkit-appearance -webkit-border-radius \
    -webkit-box-shadow -webkit-transform -webkit-transition";

const BROWSER_PSEUDO_CLASSES: &str = "-moz-focusring -moz-placeholder -webkit-autofill";

const BROWSER_PSEUDO_ELEMENTS: &str = "-moz-selection -webkit-input-placeholder \
    -webkit-scrollbar -webkit-scrollbar-thumb -webkit-scrollbar-track";

/// Words longer than this are compared by their prefix.
const MAX_WORD_LEN: usize = 99;

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// Style codes written by the CSS lexer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CssStyle {
    #[default]
    Default = 0,
    Tag = 1,
    Class = 2,
    PseudoClass = 3,
    UnknownPseudoClass = 4,
    Operator = 5,
    Identifier = 6,
    UnknownIdentifier = 7,
    Value = 8,
    Comment = 9,
    Id = 10,
    Important = 11,
    Directive = 12,
    DoubleString = 13,
    SingleString = 14,
    Identifier2 = 15,
    Attribute = 16,
    Identifier3 = 17,
    PseudoElement = 18,
    ExtendedIdentifier = 19,
    ExtendedPseudoClass = 20,
    ExtendedPseudoElement = 21,
    Number = 24,
    StringEol = 25,
}

impl CssStyle {
    const ALL: [Self; 24] = [
        Self::Default,
        Self::Tag,
        Self::Class,
        Self::PseudoClass,
        Self::UnknownPseudoClass,
        Self::Operator,
        Self::Identifier,
        Self::UnknownIdentifier,
        Self::Value,
        Self::Comment,
        Self::Id,
        Self::Important,
        Self::Directive,
        Self::DoubleString,
        Self::SingleString,
        Self::Identifier2,
        Self::Attribute,
        Self::Identifier3,
        Self::PseudoElement,
        Self::ExtendedIdentifier,
        Self::ExtendedPseudoClass,
        Self::ExtendedPseudoElement,
        Self::Number,
        Self::StringEol,
    ];

    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as u8 == code)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

fn is_css_word_char(ch: u8) -> bool {
    is_high_bit(ch) || ch.is_ascii_alphanumeric() || ch == b'-' || ch == b'_'
}

fn is_css_alpha(ch: u8) -> bool {
    is_high_bit(ch) || ch.is_ascii_alphabetic() || ch == b'_'
}

/// Blanks including form feed.
fn is_css_blank(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\r' | b'\n' | 0x0c)
}

// ---------------------------------------------------------------------------
// Structural state
// ---------------------------------------------------------------------------

/// Which dialect the `lexer.css.*.language` properties select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Css,
    Less,
    Scss,
}

impl Dialect {
    fn from_styler(styler: &Styler<'_>) -> Self {
        if styler.property_int("lexer.css.less.language", 0) != 0 {
            Self::Less
        } else if styler.property_int("lexer.css.scss.language", 0) != 0 {
            Self::Scss
        } else {
            Self::Css
        }
    }

    fn nests(self) -> bool {
        self != Self::Css
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    TopLevel,
    Selector,
    DeclarationName,
    PropertyValue,
    /// Inside a nesting block, before anything says whether the text is a
    /// selector or a property name.
    SelectorOrProperty,
}

impl Region {
    fn from_bits(bits: i32) -> Self {
        match bits {
            1 => Self::Selector,
            2 => Self::DeclarationName,
            3 => Self::PropertyValue,
            4 => Self::SelectorOrProperty,
            _ => Self::TopLevel,
        }
    }
}

/// Progress through `! /* comment */ important`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportantPhase {
    AfterBang,
    InComment,
    InWhitespace,
    InWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentKind {
    Block,
    Line,
}

// ---------------------------------------------------------------------------
// Persisted line context
// ---------------------------------------------------------------------------

/// Scanner context at the start of a line.
///
/// Wire format: bits 0-2 the region, bit 3 an unterminated top-level
/// directive, bit 4 a pending Less `~"` escape, bit 5 inside a block
/// comment, bit 8 resumable, bits 16-30 the open declaration blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineCarry {
    resumable: bool,
    region: Region,
    in_top_level_directive: bool,
    less_escape: bool,
    in_comment: bool,
    open_declarations: u32,
}

impl LineCarry {
    const REGION_MASK: i32 = 0x7;
    const TOP_LEVEL_DIRECTIVE: i32 = 0x8;
    const LESS_ESCAPE: i32 = 0x10;
    const IN_COMMENT: i32 = 0x20;
    const RESUMABLE: i32 = 0x100;
    const OPEN_SHIFT: i32 = 16;
    const OPEN_MAX: u32 = 0x7fff;

    const fn fresh() -> Self {
        Self {
            resumable: true,
            region: Region::TopLevel,
            in_top_level_directive: false,
            less_escape: false,
            in_comment: false,
            open_declarations: 0,
        }
    }

    fn pack(self) -> i32 {
        let open = self.open_declarations.min(Self::OPEN_MAX) as i32;
        let mut word = (self.region as i32) | (open << Self::OPEN_SHIFT);
        for (set, bit) in [
            (self.in_top_level_directive, Self::TOP_LEVEL_DIRECTIVE),
            (self.less_escape, Self::LESS_ESCAPE),
            (self.in_comment, Self::IN_COMMENT),
            (self.resumable, Self::RESUMABLE),
        ] {
            if set {
                word |= bit;
            }
        }
        word
    }

    fn unpack(word: i32) -> Self {
        Self {
            resumable: word & Self::RESUMABLE != 0,
            region: Region::from_bits(word & Self::REGION_MASK),
            in_top_level_directive: word & Self::TOP_LEVEL_DIRECTIVE != 0,
            less_escape: word & Self::LESS_ESCAPE != 0,
            in_comment: word & Self::IN_COMMENT != 0,
            open_declarations: ((word >> Self::OPEN_SHIFT) as u32) & Self::OPEN_MAX,
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

struct Scan<'c, 's, 'a> {
    ctx: StyleContext<'s, 'a>,
    keywords: &'c KeywordSets,
    dialect: Dialect,
    region: Region,
    open_declarations: u32,
    important: ImportantPhase,
    /// Inside a Less `~"..."` escape.
    less_escape: bool,
    comment: CommentKind,
    /// The identifier being scanned is an SCSS `$variable`.
    scss_variable: bool,
    in_top_level_directive: bool,
    /// Examine the current byte again instead of moving on.
    hold: bool,
    next_carry_line: usize,
    next_line_start: usize,
}

impl<'c, 's, 'a> Scan<'c, 's, 'a> {
    fn state(&self) -> CssStyle {
        CssStyle::from_u8(self.ctx.state).unwrap_or_default()
    }

    fn set_state(&mut self, style: CssStyle) {
        self.ctx.set_state(style.code());
    }

    fn forward_set_state(&mut self, style: CssStyle) {
        self.ctx.forward_set_state(style.code());
    }

    fn change_state(&mut self, style: CssStyle) {
        self.ctx.change_state(style.code());
    }

    /// The run so far without leading punctuation such as `@`, `!` or `:`.
    fn current_word(&self) -> Vec<u8> {
        let mut text = self.ctx.current_text();
        let skip = text
            .iter()
            .position(|&c| is_css_word_char(c))
            .unwrap_or(text.len());
        text.drain(..skip);
        text.truncate(MAX_WORD_LEN);
        text
    }

    fn list(&self, index: usize) -> &'c WordList {
        self.keywords.get(index)
    }

    fn carry(&self) -> LineCarry {
        let state = self.state();
        let in_comment = state == CssStyle::Comment && self.comment == CommentKind::Block;
        LineCarry {
            resumable: (state == CssStyle::Default || in_comment)
                && self.open_declarations <= LineCarry::OPEN_MAX,
            region: self.region,
            in_top_level_directive: self.in_top_level_directive,
            less_escape: self.less_escape,
            in_comment,
            open_declarations: self.open_declarations,
        }
    }

    /// Save the context of each line the scan reaches. Lines jumped over,
    /// or entered mid-way, are marked as unusable resume points.
    fn enter_line(&mut self) {
        let pos = self.ctx.current_pos;
        let line = self.ctx.styler().line_of(pos);
        while self.next_carry_line <= line {
            let at_start = self.next_carry_line == line && self.ctx.styler().line_start(line) == pos;
            let word = if at_start { self.carry().pack() } else { 0 };
            self.ctx.styler_mut().set_line_state(self.next_carry_line, word);
            self.next_carry_line += 1;
        }
        self.next_line_start = self.ctx.styler().line_start(self.next_carry_line);
    }

    fn run(&mut self) {
        while self.ctx.more() {
            if self.ctx.current_pos >= self.next_line_start {
                self.enter_line();
            }
            let ch = self.ctx.ch;
            self.end_run(ch);
            if self.ctx.state == CssStyle::Default.code() && !is_css_blank(ch) {
                self.start_run();
            }
            if self.hold {
                self.hold = false;
            } else {
                self.ctx.forward();
            }
        }
        if matches!(self.state(), CssStyle::DoubleString | CssStyle::SingleString) {
            self.change_state(CssStyle::StringEol);
        }
        self.ctx.complete();
    }

    /// Property names are looked up in the CSS1, CSS2, CSS3 and browser
    /// lists, in that order.
    fn classify_property(&mut self, fallback: Option<CssStyle>) {
        let word = self.current_word();
        let style = [
            (0, CssStyle::Identifier),
            (2, CssStyle::Identifier2),
            (3, CssStyle::Identifier3),
            (5, CssStyle::ExtendedIdentifier),
        ]
        .into_iter()
        .find(|&(index, _)| self.list(index).contains(&word))
        .map(|(_, style)| style)
        .or(fallback);
        if let Some(style) = style {
            self.change_state(style);
        }
        self.set_state(CssStyle::Default);
    }

    // -- Ending runs --------------------------------------------------------

    fn end_run(&mut self, ch: u8) {
        match self.state() {
            CssStyle::Identifier => {
                if !is_css_word_char(ch) {
                    if self.scss_variable {
                        // SCSS `$name` is always a variable.
                        self.scss_variable = false;
                        self.set_state(CssStyle::Default);
                    } else {
                        self.classify_property(Some(CssStyle::UnknownIdentifier));
                    }
                }
            }
            CssStyle::PseudoClass => {
                if !is_css_word_char(ch) {
                    let word = self.current_word();
                    let style = [
                        (1, CssStyle::PseudoClass),
                        (4, CssStyle::PseudoElement),
                        (6, CssStyle::ExtendedPseudoClass),
                        (7, CssStyle::ExtendedPseudoElement),
                    ]
                    .into_iter()
                    .find(|&(index, _)| self.list(index).contains(&word))
                    .map_or(CssStyle::UnknownPseudoClass, |(_, style)| style);
                    self.change_state(style);
                    self.set_state(CssStyle::Default);
                }
            }
            CssStyle::Value => self.end_value(ch),
            CssStyle::Tag => {
                if !is_css_word_char(ch) {
                    if self.region == Region::SelectorOrProperty {
                        self.classify_property(Some(CssStyle::Identifier));
                    } else {
                        self.set_state(CssStyle::Default);
                    }
                }
            }
            CssStyle::Directive => {
                if !is_css_word_char(ch) {
                    let word = self.current_word();
                    if [&b"import"[..], b"charset", b"media"]
                        .iter()
                        .any(|d| word.eq_ignore_ascii_case(d))
                    {
                        self.in_top_level_directive = true;
                        self.region = Region::PropertyValue;
                    }
                    self.set_state(CssStyle::Default);
                }
            }
            CssStyle::Class | CssStyle::Id | CssStyle::Attribute | CssStyle::PseudoElement => {
                if !is_css_word_char(ch) {
                    self.set_state(CssStyle::Default);
                }
            }
            CssStyle::Important => self.end_important(ch),
            CssStyle::DoubleString | CssStyle::SingleString => {
                let quote = if self.state() == CssStyle::DoubleString { b'"' } else { b'\'' };
                if ch == b'\\' {
                    // A backslash before CRLF continues the string.
                    if self.ctx.ch_next == b'\r' && self.ctx.relative(2) == b'\n' {
                        self.ctx.forward();
                    }
                    self.ctx.forward();
                } else if is_eol(ch) || ch == 0x0c {
                    self.change_state(CssStyle::StringEol);
                    self.set_state(CssStyle::Default);
                } else if ch == quote {
                    self.forward_set_state(CssStyle::Default);
                }
            }
            CssStyle::Number => self.end_number(ch),
            CssStyle::Operator => self.set_state(CssStyle::Default),
            CssStyle::Comment => match self.comment {
                CommentKind::Block if ch == b'*' && self.ctx.ch_next == b'/' => {
                    self.ctx.forward();
                    self.forward_set_state(CssStyle::Default);
                }
                CommentKind::Line if is_eol(ch) => self.set_state(CssStyle::Default),
                _ => {}
            },
            _ => {}
        }
    }

    /// Hex colours and keyword values, plus the `url(...)` form.
    fn end_value(&mut self, ch: u8) {
        if is_css_word_char(ch) {
            return;
        }
        let mut lowered = self.ctx.current_lowered();
        lowered.truncate(5);
        if lowered == b"url" && ch == b'(' {
            match self.ctx.ch_next {
                b'"' => self.forward_set_state(CssStyle::DoubleString),
                b'\'' => self.forward_set_state(CssStyle::SingleString),
                _ => {}
            }
        } else if lowered.starts_with(b"url(") {
            if matches!(ch, b'\r' | b'\n' | 0x0c | b' ' | b'\t' | b')') {
                if ch == b')' {
                    self.ctx.forward();
                }
                self.set_state(CssStyle::Default);
            }
        } else {
            self.set_state(CssStyle::Default);
        }
    }

    fn end_important(&mut self, ch: u8) {
        if is_css_word_char(ch) {
            if self.important != ImportantPhase::InComment {
                if self.important == ImportantPhase::InWhitespace {
                    self.change_state(CssStyle::Default);
                    self.set_state(CssStyle::Important);
                }
                self.important = ImportantPhase::InWord;
            }
        } else if self.important == ImportantPhase::InWord {
            let word = self.current_word();
            if word.eq_ignore_ascii_case(b"important") {
                self.region = Region::PropertyValue;
            } else {
                self.change_state(CssStyle::Value);
            }
            self.set_state(CssStyle::Default);
        } else if self.important == ImportantPhase::InComment {
            if ch == b'*' && self.ctx.ch_next == b'/' {
                self.ctx.forward_n(2);
                self.change_state(CssStyle::Comment);
                self.set_state(CssStyle::Important);
                self.important = ImportantPhase::AfterBang;
                self.hold = true;
            }
        } else if is_css_blank(ch) {
            if self.important == ImportantPhase::AfterBang {
                self.set_state(CssStyle::Important);
            }
            self.important = ImportantPhase::InWhitespace;
        } else if ch == b'/' && self.ctx.ch_next == b'*' {
            if self.important == ImportantPhase::InWhitespace {
                self.change_state(CssStyle::Default);
            }
            self.set_state(CssStyle::Important);
            self.important = ImportantPhase::InComment;
            self.ctx.forward();
        } else if self.important == ImportantPhase::AfterBang {
            self.set_state(CssStyle::Default);
        }
    }

    fn end_number(&mut self, ch: u8) {
        if is_digit(ch) || ch == b'.' {
            return;
        }
        let pos = self.ctx.current_pos;
        let unit_ends = |len: usize| !is_css_word_char(self.ctx.styler().safe_char_at(pos + len, 0));
        let unit_len = if self.ctx.matches_ignore_case("grad") && unit_ends(4) {
            Some(4)
        } else if ["deg", "rad", "khz"].iter().any(|u| self.ctx.matches_ignore_case(u)) && unit_ends(3) {
            Some(3)
        } else if ["em", "ex", "px", "cm", "mm", "in", "pt", "pc", "ms", "hz"]
            .iter()
            .any(|u| self.ctx.matches_ignore_case(u))
            && unit_ends(2)
        {
            Some(2)
        } else if matches!(ch, b'%' | b's' | b'S') && !is_css_word_char(self.ctx.ch_next) {
            Some(1)
        } else {
            None
        };
        match unit_len {
            Some(len) => {
                self.ctx.forward_n(len - 1);
                self.forward_set_state(CssStyle::Default);
            }
            None => self.set_state(CssStyle::Default),
        }
    }

    // -- Starting runs ------------------------------------------------------

    fn start_run(&mut self) {
        let next = self.ctx.ch_next;
        match self.ctx.ch {
            b'!' => {
                if self.region == Region::PropertyValue {
                    self.set_state(CssStyle::Important);
                    self.important = ImportantPhase::AfterBang;
                } else {
                    self.set_state(CssStyle::Operator);
                }
            }
            b'"' => {
                if self.dialect == Dialect::Less && self.less_escape {
                    self.set_state(CssStyle::Operator);
                    self.less_escape = false;
                } else {
                    self.set_state(CssStyle::DoubleString);
                }
            }
            b'\'' => self.set_state(CssStyle::SingleString),
            b'#' => {
                if self.region == Region::PropertyValue {
                    self.set_state(CssStyle::Value);
                } else {
                    self.region = Region::Selector;
                    self.set_state(CssStyle::Operator);
                    if is_css_word_char(next) {
                        self.forward_set_state(CssStyle::Id);
                    }
                }
            }
            b'$' => {
                if self.dialect == Dialect::Scss {
                    self.scss_variable = true;
                    self.set_state(CssStyle::Identifier);
                }
            }
            b'.' => {
                if self.region == Region::PropertyValue && is_digit(next) {
                    self.set_state(CssStyle::Number);
                } else {
                    self.set_state(CssStyle::Operator);
                    if matches!(
                        self.region,
                        Region::TopLevel | Region::Selector | Region::SelectorOrProperty
                    ) && is_css_word_char(next)
                    {
                        self.forward_set_state(CssStyle::Class);
                        self.region = Region::Selector;
                    }
                }
            }
            b'&' if self.dialect == Dialect::Less
                && next == b':'
                && self.region == Region::SelectorOrProperty
                && {
                    let next2 = self.ctx.relative(2);
                    next2 == b':' || is_css_word_char(next2)
                } =>
            {
                // `&:hover` and `&::after` inside a Less block.
                let double = self.ctx.relative(2) == b':';
                self.set_state(CssStyle::Operator);
                self.ctx.forward();
                if double {
                    self.ctx.forward();
                    self.forward_set_state(CssStyle::PseudoElement);
                } else {
                    self.forward_set_state(CssStyle::PseudoClass);
                }
                self.region = Region::Selector;
            }
            b'&' | b'^' | b'|' => {
                if self.dialect.nests() {
                    self.set_state(CssStyle::Operator);
                }
            }
            b'%' | b'*' | b'+' | b',' | b'<' | b'=' | b'>' | b'?' | b']' | b'(' => {
                self.set_state(CssStyle::Operator);
            }
            b'/' => {
                if next == b'*' {
                    self.comment = CommentKind::Block;
                    self.set_state(CssStyle::Comment);
                } else if self.dialect == Dialect::Less && next == b'/' {
                    self.comment = CommentKind::Line;
                    self.set_state(CssStyle::Comment);
                } else {
                    self.set_state(CssStyle::Operator);
                }
            }
            b'{' => {
                match self.region {
                    Region::SelectorOrProperty => {}
                    Region::TopLevel | Region::Selector => {
                        self.region = if self.dialect.nests() {
                            Region::SelectorOrProperty
                        } else {
                            Region::DeclarationName
                        };
                        self.open_declarations += 1;
                    }
                    Region::PropertyValue => {
                        // `@media` and `@page` blocks, or SCSS nested
                        // properties such as `font: { family: serif; }`.
                        self.open_declarations += 1;
                        self.region = if self.dialect == Dialect::Scss {
                            Region::DeclarationName
                        } else {
                            Region::Selector
                        };
                    }
                    Region::DeclarationName => {}
                }
                self.set_state(CssStyle::Operator);
            }
            b':' => {
                if (is_css_word_char(next) || next == b':')
                    && matches!(self.region, Region::TopLevel | Region::Selector)
                {
                    self.set_state(CssStyle::Operator);
                    if next == b':' {
                        self.ctx.forward();
                        self.forward_set_state(CssStyle::PseudoElement);
                    } else {
                        self.forward_set_state(CssStyle::PseudoClass);
                    }
                    self.region = Region::Selector;
                } else {
                    if matches!(
                        self.region,
                        Region::DeclarationName | Region::SelectorOrProperty
                    ) {
                        self.region = Region::PropertyValue;
                    }
                    self.set_state(CssStyle::Operator);
                }
            }
            b';' => {
                if self.dialect.nests() {
                    self.region = Region::SelectorOrProperty;
                } else if self.in_top_level_directive {
                    self.region = Region::TopLevel;
                    self.in_top_level_directive = false;
                } else {
                    self.region = Region::DeclarationName;
                }
                self.set_state(CssStyle::Operator);
            }
            b'@' => {
                self.set_state(CssStyle::Operator);
                if is_css_word_char(next) {
                    self.forward_set_state(CssStyle::Directive);
                }
            }
            b'[' => {
                self.set_state(CssStyle::Operator);
                if matches!(self.region, Region::Selector | Region::SelectorOrProperty) {
                    if is_space_or_tab(next) {
                        self.forward_set_state(CssStyle::Default);
                        while self.ctx.more() && is_space_or_tab(self.ctx.ch_next) {
                            self.ctx.forward();
                        }
                    }
                    if is_css_alpha(self.ctx.ch_next) {
                        self.forward_set_state(CssStyle::Attribute);
                    }
                }
            }
            b'}' => {
                self.open_declarations = self.open_declarations.saturating_sub(1);
                self.region = if self.dialect.nests() && self.open_declarations > 0 {
                    Region::SelectorOrProperty
                } else {
                    Region::TopLevel
                };
                self.set_state(CssStyle::Operator);
            }
            b'~' => {
                if self.dialect == Dialect::Less {
                    self.set_state(CssStyle::Operator);
                    if next == b'"' {
                        self.ctx.forward();
                        self.less_escape = true;
                    }
                }
            }
            b'`' => {
                if self.dialect == Dialect::Less {
                    self.set_state(CssStyle::Operator);
                }
            }
            b'-' => {
                if self.region == Region::PropertyValue {
                    if is_digit(next) {
                        self.set_state(CssStyle::Number);
                    } else if is_css_word_char(next) {
                        self.set_state(CssStyle::Value);
                    } else {
                        self.set_state(CssStyle::Operator);
                    }
                } else {
                    self.set_state(CssStyle::Identifier);
                }
            }
            b')' => {
                let style = if self.closes_url() {
                    CssStyle::Value
                } else {
                    CssStyle::Operator
                };
                self.set_state(style);
            }
            ch if is_digit(ch) => self.set_state(CssStyle::Number),
            ch if is_css_alpha(ch) => {
                let style = match self.region {
                    Region::PropertyValue => CssStyle::Value,
                    Region::TopLevel => {
                        self.region = Region::Selector;
                        CssStyle::Tag
                    }
                    Region::Selector | Region::SelectorOrProperty => CssStyle::Tag,
                    Region::DeclarationName => CssStyle::Identifier,
                };
                self.set_state(style);
            }
            _ => {}
        }
    }

    /// Whether the nearest `(` within 200 bytes belongs to `url(`.
    fn closes_url(&self) -> bool {
        let pos = self.ctx.current_pos;
        let styler = self.ctx.styler();
        let stop = pos.saturating_sub(201).max(7);
        let Some(open) = (stop..pos).rev().find(|&p| styler.char_at(p) == b'(') else {
            return false;
        };
        styler.match_at(open - 3, b"url")
    }
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

fn fold_css(start: usize, length: usize, styler: &mut Styler<'_>) {
    let fold_comment = styler.property_int("fold.comment", 0) != 0;
    let compact = styler.property_int("fold.compact", 1) != 0;
    let end = (start + length).min(styler.len());
    let mut acc = FoldAccumulator::resume(styler, start, compact);
    let comment = CssStyle::Comment.code();
    let mut in_comment = start > 0 && styler.style_at(start - 1) == comment;

    for i in start..end {
        let ch = styler.char_at(i);
        let ch_next = styler.safe_char_at(i + 1, 0);
        let style = styler.style_at(i);
        if fold_comment {
            if !in_comment && style == comment {
                acc.open();
            } else if in_comment && style != comment {
                acc.close();
            }
            in_comment = style == comment;
        }
        if style == CssStyle::Operator.code() {
            match ch {
                b'{' => acc.open(),
                b'}' => acc.close(),
                _ => {}
            }
        }
        if (ch == b'\r' && ch_next != b'\n') || ch == b'\n' {
            acc.end_line(styler);
        }
        if !is_space(ch) {
            acc.note_visible();
        }
    }
    acc.finish(styler);
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// The CSS lexer. Less and SCSS are selected with the
/// `lexer.css.less.language` and `lexer.css.scss.language` properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssLexer;

impl CssLexer {
    pub fn default_keywords() -> KeywordSets {
        KeywordSets::from_strs(&[
            CSS1_PROPERTIES,
            PSEUDO_CLASSES,
            CSS2_PROPERTIES,
            CSS3_PROPERTIES,
            PSEUDO_ELEMENTS,
            BROWSER_PROPERTIES,
            BROWSER_PSEUDO_CLASSES,
            BROWSER_PSEUDO_ELEMENTS,
        ])
    }
}

/// Back up to a line outside every block whose saved context is usable.
/// The context restores what an unterminated `@import`, `@charset` or
/// `@media` left open, and a line starting inside a block comment resumes
/// in the comment.
fn synchronize_doc_start(styler: &Styler<'_>, start: usize) -> (usize, LineCarry) {
    let mut line = styler.line_of(start);
    while line > 0 {
        let saved = LineCarry::unpack(styler.line_state(line));
        if saved.resumable && styler.level_at(line).depth() == 0 {
            return (styler.line_start(line), saved);
        }
        line -= 1;
    }
    (0, LineCarry::fresh())
}

impl Lexer for CssLexer {
    fn name(&self) -> &'static str {
        "css"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["css", "less", "scss"]
    }

    fn word_list_descriptions(&self) -> &'static [&'static str] {
        &[
            "CSS1 Properties",
            "Pseudo-classes",
            "CSS2 Properties",
            "CSS3 Properties",
            "Pseudo-elements",
            "Browser-Specific CSS Properties",
            "Browser-Specific Pseudo-classes",
            "Browser-Specific Pseudo-elements",
        ]
    }

    fn lex(&self, start: usize, length: usize, _init_style: u8, keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = (start + length).min(styler.len());
        let (sync_start, carry) = synchronize_doc_start(styler, start);
        if sync_start != start {
            lexkit_core::trace!(requested = start, resumed = sync_start, "css resync");
        }
        let _span = lexkit_core::debug_span!("css", start, length, resumed = sync_start).entered();
        if end <= sync_start {
            return;
        }
        let dialect = Dialect::from_styler(styler);
        let state = if carry.in_comment {
            CssStyle::Comment
        } else {
            CssStyle::Default
        };
        let next_carry_line = styler.line_of(sync_start);
        let ctx = StyleContext::new(sync_start, end - sync_start, state.code(), styler);
        let mut scan = Scan {
            ctx,
            keywords,
            dialect,
            region: carry.region,
            open_declarations: carry.open_declarations,
            important: ImportantPhase::AfterBang,
            less_escape: carry.less_escape,
            comment: CommentKind::Block,
            scss_variable: false,
            in_top_level_directive: carry.in_top_level_directive,
            hold: false,
            next_carry_line,
            next_line_start: sync_start,
        };
        scan.run();
    }

    fn fold(&self, start: usize, length: usize, _init_style: u8, _keywords: &KeywordSets, styler: &mut Styler<'_>) {
        fold_css(start, length, styler);
    }
}
