#![forbid(unsafe_code)]

//! XML lexer with XSLT awareness.
//!
//! Every byte is styled by the role it plays in the markup: tag punctuation,
//! names, attribute values, references, comments, CDATA sections,
//! processing instructions and DOCTYPE declarations. On XSLT elements that
//! take XPath attributes (`xsl:if`, `xsl:value-of`, ...), the values of
//! `select`, `test` and friends are styled as XPath instead of plain
//! attribute text.

use lexkit_core::chars::is_high_bit;
use lexkit_core::{FoldAccumulator, KeywordSets, Lexer, Styler};

/// XSLT elements whose attributes may hold XPath. Sorted.
const XPATH_ELEMENTS: &[&[u8]] = &[
    b"xsl:apply-templates",
    b"xsl:copy-of",
    b"xsl:for-each",
    b"xsl:if",
    b"xsl:key",
    b"xsl:number",
    b"xsl:param",
    b"xsl:sort",
    b"xsl:template",
    b"xsl:value-of",
    b"xsl:variable",
    b"xsl:when",
    b"xsl:with-param",
];

/// Attributes of those elements that take XPath. Sorted.
const XPATH_ATTRIBUTES: &[&[u8]] = &[b"count", b"from", b"match", b"select", b"test", b"use", b"value"];

const MAX_ELEMENT_NAME: usize = 30;
const MAX_ATTRIBUTE_NAME: usize = 10;
const STYLE_MASK: u8 = 63;

/// Style codes written by the XML lexer. The lexer's states share these
/// codes: the style a run gets is the state it was scanned in.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum XmlStyle {
    #[default]
    Default = 0,
    StartTagOpen = 1,
    StartTagName = 2,
    StartTagClose = 3,
    StartTagEmptyClose = 4,
    StartTagAttrName = 5,
    StartTagAttrEquals = 6,
    StartTagAttrQuotOpen = 7,
    StartTagAttrQuotContent = 8,
    StartTagAttrQuotClose = 9,
    StartTagAttrAposOpen = 10,
    StartTagAttrAposContent = 11,
    StartTagAttrAposClose = 12,
    EndTagOpen = 13,
    EndTagName = 14,
    EndTagClose = 15,
    EntityRef = 17,
    CharRef = 18,
    DataChars = 19,
    DataNewline = 20,
    CdataSectOpen = 21,
    CdataSectContent = 22,
    CdataSectClose = 23,
    CommentOpen = 24,
    CommentContent = 25,
    CommentClose = 26,
    PiOpen = 27,
    PiContent = 28,
    PiClose = 29,
    XmlDeclOpen = 30,
    XmlDeclContent = 31,
    XmlDeclClose = 32,
    XPathTagName = 34,
    XPathAttrName = 35,
    XPathOpen = 36,
    XPathContentQuot = 37,
    XPathContentApos = 38,
    XPathClose = 39,
    StartTagWhiteSpace = 40,
    StartTagAttrUnquoted = 41,
    EndTagWhiteSpace = 42,
    DeclarationOpen = 43,
    DeclarationType = 44,
    DeclnWhiteSpace = 45,
    DeclnName = 46,
    DeclnClose = 47,
    DeclnQuotContent = 48,
    DeclnAposContent = 49,
    DeclnDataChars = 50,
}

impl XmlStyle {
    const ALL: [Self; 49] = [
        Self::Default,
        Self::StartTagOpen,
        Self::StartTagName,
        Self::StartTagClose,
        Self::StartTagEmptyClose,
        Self::StartTagAttrName,
        Self::StartTagAttrEquals,
        Self::StartTagAttrQuotOpen,
        Self::StartTagAttrQuotContent,
        Self::StartTagAttrQuotClose,
        Self::StartTagAttrAposOpen,
        Self::StartTagAttrAposContent,
        Self::StartTagAttrAposClose,
        Self::EndTagOpen,
        Self::EndTagName,
        Self::EndTagClose,
        Self::EntityRef,
        Self::CharRef,
        Self::DataChars,
        Self::DataNewline,
        Self::CdataSectOpen,
        Self::CdataSectContent,
        Self::CdataSectClose,
        Self::CommentOpen,
        Self::CommentContent,
        Self::CommentClose,
        Self::PiOpen,
        Self::PiContent,
        Self::PiClose,
        Self::XmlDeclOpen,
        Self::XmlDeclContent,
        Self::XmlDeclClose,
        Self::XPathTagName,
        Self::XPathAttrName,
        Self::XPathOpen,
        Self::XPathContentQuot,
        Self::XPathContentApos,
        Self::XPathClose,
        Self::StartTagWhiteSpace,
        Self::StartTagAttrUnquoted,
        Self::EndTagWhiteSpace,
        Self::DeclarationOpen,
        Self::DeclarationType,
        Self::DeclnWhiteSpace,
        Self::DeclnName,
        Self::DeclnClose,
        Self::DeclnQuotContent,
        Self::DeclnAposContent,
        Self::DeclnDataChars,
    ];

    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as u8 == code)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Character data between tags.
    pub const fn is_data(self) -> bool {
        matches!(self, Self::DataChars | Self::DataNewline)
    }

    /// States a `<` breaks out of to open a new tag.
    const fn yields_to_tag(self) -> bool {
        matches!(
            self,
            Self::Default
                | Self::StartTagOpen
                | Self::StartTagName
                | Self::StartTagClose
                | Self::StartTagEmptyClose
                | Self::StartTagWhiteSpace
                | Self::StartTagAttrName
                | Self::StartTagAttrEquals
                | Self::StartTagAttrQuotContent
                | Self::StartTagAttrAposContent
                | Self::StartTagAttrQuotClose
                | Self::StartTagAttrUnquoted
                | Self::EndTagName
                | Self::EndTagWhiteSpace
                | Self::EntityRef
                | Self::CharRef
                | Self::DataChars
                | Self::DataNewline
                | Self::DeclarationType
                | Self::DeclnName
                | Self::DeclnWhiteSpace
                | Self::DeclnClose
                | Self::DeclnDataChars
        )
    }

    /// States a `&` breaks out of to start a reference.
    const fn yields_to_reference(self) -> bool {
        matches!(
            self,
            Self::Default
                | Self::StartTagOpen
                | Self::StartTagName
                | Self::StartTagClose
                | Self::StartTagEmptyClose
                | Self::StartTagWhiteSpace
                | Self::StartTagAttrName
                | Self::StartTagAttrEquals
                | Self::StartTagAttrQuotClose
                | Self::EndTagName
                | Self::EndTagWhiteSpace
                | Self::EntityRef
                | Self::CharRef
                | Self::DataChars
                | Self::DataNewline
        )
    }
}

fn is_name_char(ch: u8) -> bool {
    is_high_bit(ch) || ch.is_ascii_alphanumeric() || matches!(ch, b'_' | b'-' | b':')
}

fn is_white(ch: u8) -> bool {
    ch == 0 || ch.is_ascii_whitespace() || ch == 0x0b
}

fn style_of(styler: &Styler<'_>, pos: usize) -> XmlStyle {
    XmlStyle::from_u8(styler.style_at(pos) & STYLE_MASK).unwrap_or_default()
}

/// Start of the nearest line, at or before the one holding `start`, that
/// follows character data. Anything else may sit inside a tag, comment or
/// section.
fn synchronize_doc_start(styler: &Styler<'_>, start: usize) -> usize {
    let mut line = styler.line_of(start);
    while line > 0 {
        let line_start = styler.line_start(line);
        if style_of(styler, line_start - 1).is_data() {
            return line_start;
        }
        line -= 1;
    }
    0
}

struct Scan<'s, 'a> {
    styler: &'s mut Styler<'a>,
    end: usize,
    i: usize,
    state: XmlStyle,
    fold: Option<FoldAccumulator>,
    redo: bool,
}

impl<'s, 'a> Scan<'s, 'a> {
    fn at(&self, pos: usize) -> u8 {
        self.styler.safe_char_at(pos, 0)
    }

    fn looking_at_newline(&self, ch: u8) -> bool {
        ch == b'\n' || (ch == b'\r' && self.at(self.i + 1) != b'\n')
    }

    fn colour_before(&mut self, style: XmlStyle) {
        if let Some(end) = self.i.checked_sub(1) {
            self.styler.colour_to(end, style.code());
        }
    }

    fn colour_to(&mut self, end: usize, style: XmlStyle) {
        self.styler.colour_to(end, style.code());
    }

    /// Scan the current byte again in the new state.
    fn hold(&mut self) {
        self.redo = true;
    }

    /// Rescan the current byte as data unless it ends the line.
    fn hold_as_data(&mut self, ch: u8) {
        if self.looking_at_newline(ch) {
            self.state = XmlStyle::DataNewline;
        } else {
            self.hold();
            self.state = XmlStyle::DataChars;
        }
    }

    fn open_fold(&mut self) {
        if self.i.checked_sub(1).map(|prev| self.at(prev)) != Some(b'/')
            && let Some(fold) = self.fold.as_mut()
        {
            fold.open();
        }
    }

    fn close_fold(&mut self) {
        if let Some(fold) = self.fold.as_mut() {
            fold.close();
        }
    }

    /// Whether the element name ending just before the cursor is an XSLT
    /// element that takes XPath attributes.
    fn is_xpath_element(&self) -> bool {
        let start = self.styler.segment_start();
        if start >= self.i || self.i - start >= MAX_ELEMENT_NAME {
            return false;
        }
        let name = self.styler.text_range(start, self.i - 1);
        XPATH_ELEMENTS.binary_search(&name.as_slice()).is_ok()
    }

    /// Whether the attribute name ending at `last` belongs to an XSLT
    /// element and takes XPath.
    fn is_xpath_attribute(&self, last: usize) -> bool {
        let attr_start = self.styler.segment_start();
        for pos in (1..attr_start.saturating_sub(1)).rev() {
            match style_of(self.styler, pos) {
                XmlStyle::XPathTagName => {
                    if last < attr_start || last - attr_start >= MAX_ATTRIBUTE_NAME {
                        return false;
                    }
                    let name = self.styler.text_range(attr_start, last);
                    return XPATH_ATTRIBUTES.binary_search(&name.as_slice()).is_ok();
                }
                XmlStyle::StartTagName => return false,
                _ => {}
            }
        }
        false
    }

    /// Whether the attribute name before the `=` at the cursor was styled
    /// as XPath.
    fn follows_xpath_attribute(&self) -> bool {
        for pos in (1..self.i.saturating_sub(1)).rev() {
            match style_of(self.styler, pos) {
                XmlStyle::XPathAttrName => return true,
                XmlStyle::StartTagAttrName => return false,
                _ => {}
            }
        }
        false
    }

    fn run(&mut self) {
        while self.i < self.end {
            let ch = self.styler.char_at(self.i);
            let redo = std::mem::take(&mut self.redo);

            if ch == b'<' && self.state.yields_to_tag() {
                self.colour_before(self.state);
                self.state = XmlStyle::StartTagOpen;
                self.i += 1;
                continue;
            }
            if ch == b'&' && self.state.yields_to_reference() {
                self.colour_before(self.state);
                if self.at(self.i + 1) == b'#' {
                    self.state = XmlStyle::CharRef;
                    self.i += 1;
                } else {
                    self.state = XmlStyle::EntityRef;
                }
                self.i += 1;
                continue;
            }

            if !redo {
                let newline = self.looking_at_newline(ch);
                if let Some(fold) = self.fold.as_mut() {
                    if newline {
                        fold.end_line(self.styler);
                    } else if !is_white(ch) {
                        fold.note_visible();
                    }
                }
            }

            self.step(ch);
            if !self.redo {
                self.i += 1;
            }
        }
        if let Some(last) = self.end.checked_sub(1) {
            self.colour_to(last, self.state);
        }
        if let Some(fold) = &self.fold {
            fold.finish(self.styler);
        }
    }

    fn step(&mut self, ch: u8) {
        use XmlStyle as S;
        match self.state {
            S::Default => {
                if self.looking_at_newline(ch) {
                    self.state = S::DataNewline;
                } else {
                    self.hold();
                    self.state = S::DataChars;
                }
            }
            S::StartTagOpen => self.tag_open(ch),
            S::StartTagName => {
                if !is_name_char(ch) {
                    let style = if self.is_xpath_element() { S::XPathTagName } else { S::StartTagName };
                    self.colour_before(style);
                    if is_white(ch) {
                        self.state = S::StartTagWhiteSpace;
                    } else {
                        self.after_tag_part(ch);
                    }
                }
            }
            S::StartTagClose | S::EndTagClose => {
                self.colour_before(self.state);
                self.hold_as_data(ch);
            }
            S::StartTagEmptyClose => {
                if ch == b'>' {
                    self.colour_to(self.i, self.state);
                } else {
                    self.colour_before(self.state);
                    self.hold_as_data(ch);
                }
            }
            S::StartTagWhiteSpace => {
                if !is_white(ch) {
                    self.colour_before(self.state);
                    if is_name_char(ch) {
                        self.state = S::StartTagAttrName;
                    } else {
                        self.after_tag_part(ch);
                    }
                }
            }
            S::StartTagAttrName => {
                if !is_name_char(ch) {
                    let xpath = self.is_xpath_attribute(self.i.saturating_sub(1));
                    self.state = if xpath { S::XPathAttrName } else { S::StartTagAttrName };
                    self.colour_before(self.state);
                    if is_white(ch) || ch == b'=' {
                        self.state = S::StartTagAttrEquals;
                    } else {
                        self.after_tag_part(ch);
                    }
                }
            }
            S::StartTagAttrEquals => {
                if !(is_white(ch) || ch == b'=') {
                    self.colour_before(self.state);
                    match ch {
                        b'\'' | b'"' if self.follows_xpath_attribute() => {
                            self.colour_to(self.i, S::XPathOpen);
                            self.state = if ch == b'\'' { S::XPathContentApos } else { S::XPathContentQuot };
                        }
                        b'/' | b'>' | b'\'' | b'"' => self.after_tag_part(ch),
                        // Old-style unquoted value.
                        _ => self.state = S::StartTagAttrUnquoted,
                    }
                }
            }
            S::StartTagAttrQuotOpen | S::StartTagAttrAposOpen => {
                self.colour_before(self.state);
                self.state = if self.state == S::StartTagAttrQuotOpen {
                    S::StartTagAttrQuotContent
                } else {
                    S::StartTagAttrAposContent
                };
            }
            S::StartTagAttrQuotContent => {
                if ch == b'"' {
                    self.colour_before(self.state);
                    self.state = S::StartTagAttrQuotClose;
                }
            }
            S::StartTagAttrAposContent => {
                if ch == b'\'' {
                    self.colour_before(self.state);
                    self.state = S::StartTagAttrAposClose;
                }
            }
            S::StartTagAttrQuotClose | S::StartTagAttrAposClose => {
                self.colour_before(self.state);
                if is_white(ch) {
                    self.state = S::StartTagWhiteSpace;
                } else if ch == b'/' || ch == b'>' {
                    self.after_tag_part(ch);
                } else {
                    self.state = S::StartTagWhiteSpace;
                    if !self.looking_at_newline(ch) {
                        self.hold();
                    }
                }
            }
            S::StartTagAttrUnquoted => {
                if ch == b'>' {
                    self.colour_before(self.state);
                    self.open_fold();
                    self.state = S::StartTagClose;
                } else if is_white(ch) {
                    self.colour_before(self.state);
                    self.state = S::StartTagWhiteSpace;
                }
            }
            S::EndTagOpen => {
                self.colour_before(self.state);
                self.state = S::EndTagName;
            }
            S::EndTagName => {
                if !is_name_char(ch) {
                    let style = if self.is_xpath_element() { S::XPathTagName } else { S::EndTagName };
                    self.colour_before(style);
                    if is_white(ch) {
                        self.state = S::EndTagWhiteSpace;
                    } else {
                        self.state = S::EndTagClose;
                        self.close_fold();
                    }
                }
            }
            S::EndTagWhiteSpace => {
                if !is_white(ch) {
                    self.colour_before(self.state);
                    if ch == b'>' {
                        self.state = S::EndTagClose;
                        self.close_fold();
                    } else {
                        self.state = S::DataChars;
                    }
                }
            }
            S::EntityRef | S::CharRef => {
                let stays = if self.state == S::EntityRef {
                    is_name_char(ch)
                } else {
                    ch.is_ascii_alphanumeric()
                };
                if !stays {
                    if ch == b';' {
                        self.colour_to(self.i, self.state);
                        self.state = S::DataChars;
                    } else {
                        self.colour_before(self.state);
                        self.hold_as_data(ch);
                    }
                }
            }
            S::DataNewline => {
                if ch != b'\r' && ch != b'\n' {
                    self.colour_before(self.state);
                    self.state = S::DataChars;
                }
            }
            S::DataChars => {
                if ch == b'\r' || ch == b'\n' {
                    self.colour_before(self.state);
                    self.state = S::DataNewline;
                }
            }
            S::CdataSectOpen => {
                self.colour_before(self.state);
                if ch == b']' {
                    self.hold();
                }
                self.state = S::CdataSectContent;
            }
            S::CdataSectContent => self.close_section(ch, b"]]>", S::CdataSectClose),
            S::CommentContent => self.close_section(ch, b"-->", S::CommentClose),
            S::PiContent => self.close_section(ch, b"?>", S::PiClose),
            S::XmlDeclContent => self.close_section(ch, b"?>", S::XmlDeclClose),
            S::XPathContentQuot | S::XPathContentApos => {
                let quote = if self.state == S::XPathContentQuot { b'"' } else { b'\'' };
                if ch == quote {
                    self.colour_before(self.state);
                    self.state = S::XPathClose;
                }
            }
            S::XPathClose => {
                self.colour_before(self.state);
                if !self.looking_at_newline(ch) {
                    self.hold();
                }
                self.state = S::StartTagWhiteSpace;
            }
            S::DeclarationType | S::DeclnName => {
                if !is_name_char(ch) {
                    self.colour_before(self.state);
                    self.declaration_part(ch, is_white(ch) || ch == b'%');
                }
            }
            S::DeclnWhiteSpace => {
                if !(is_white(ch) || ch == b'%') {
                    self.colour_before(self.state);
                    if is_name_char(ch) {
                        self.state = S::DeclnName;
                    } else {
                        self.declaration_part(ch, false);
                    }
                }
            }
            S::DeclnQuotContent | S::DeclnAposContent => {
                let quote = if self.state == S::DeclnQuotContent { b'"' } else { b'\'' };
                if ch == quote {
                    self.colour_to(self.i, self.state);
                    self.state = S::DeclnWhiteSpace;
                }
            }
            S::DeclnClose => {
                self.colour_before(self.state);
                if !self.looking_at_newline(ch) {
                    self.hold();
                }
                self.state = S::DeclnDataChars;
            }
            S::DeclnDataChars => self.declaration_data(ch),
            S::CdataSectClose
            | S::CommentOpen
            | S::CommentClose
            | S::PiOpen
            | S::PiClose
            | S::XmlDeclOpen
            | S::XmlDeclClose
            | S::XPathTagName
            | S::XPathAttrName
            | S::XPathOpen
            | S::DeclarationOpen => {
                // Only ever written as styles; a scan resumed in one of
                // them continues as data.
                self.colour_before(self.state);
                self.hold();
                self.state = S::DataChars;
            }
        }
    }

    /// The byte after `<`.
    fn tag_open(&mut self, ch: u8) {
        use XmlStyle as S;
        if is_name_char(ch) {
            self.colour_before(self.state);
            self.state = S::StartTagName;
            return;
        }
        if ch == b'/' {
            self.state = S::EndTagOpen;
            return;
        }
        let next = self.at(self.i + 1);
        let next2 = self.at(self.i + 2);
        match ch {
            b'!' if next == b'-' => {
                if next2 == b'-' {
                    self.colour_to(self.i + 2, S::CommentOpen);
                    self.i += 2;
                    self.state = S::CommentContent;
                } else {
                    self.colour_to(self.i + 1, S::DataChars);
                    self.i += 1;
                    self.state = S::DataChars;
                }
            }
            b'!' if next == b'[' => {
                if self.styler.match_at(self.i + 2, b"CDATA[") {
                    self.colour_to(self.i + 7, S::CdataSectOpen);
                    self.i += 7;
                    self.state = S::CdataSectContent;
                } else {
                    self.colour_to(self.i, S::DataChars);
                    self.i += 1;
                    self.state = S::DataChars;
                }
            }
            b'!' if is_name_char(next) => {
                self.colour_to(self.i, S::DeclarationOpen);
                self.state = S::DeclarationType;
            }
            b'!' => self.state = S::DataChars,
            b'?' => {
                if self.styler.match_at(self.i + 1, b"xml") && is_white(self.at(self.i + 4)) {
                    self.colour_to(self.i + 3, S::XmlDeclOpen);
                    self.i += 3;
                    self.state = S::XmlDeclContent;
                } else {
                    self.colour_to(self.i, S::PiOpen);
                    self.state = S::PiContent;
                }
            }
            _ if self.looking_at_newline(ch) => self.state = S::DataNewline,
            _ => {
                self.state = S::DataChars;
                self.hold();
            }
        }
    }

    /// Punctuation that may follow any part of a start tag.
    fn after_tag_part(&mut self, ch: u8) {
        use XmlStyle as S;
        match ch {
            b'/' => self.state = S::StartTagEmptyClose,
            b'>' => {
                self.open_fold();
                self.state = S::StartTagClose;
            }
            b'\'' => {
                self.colour_to(self.i, S::StartTagAttrAposOpen);
                self.state = S::StartTagAttrAposContent;
            }
            b'"' => {
                self.colour_to(self.i, S::StartTagAttrQuotOpen);
                self.state = S::StartTagAttrQuotContent;
            }
            _ => self.state = S::DataChars,
        }
    }

    /// End a comment, section or instruction at `close`.
    fn close_section(&mut self, ch: u8, close: &[u8], style: XmlStyle) {
        if ch == close[0] && self.styler.match_at(self.i, close) {
            self.colour_before(self.state);
            self.i += close.len() - 1;
            self.colour_to(self.i, style);
            self.state = XmlStyle::DataChars;
        }
    }

    /// The byte after a name or white space inside `<!...>`.
    fn declaration_part(&mut self, ch: u8, white: bool) {
        use XmlStyle as S;
        if white {
            self.state = S::DeclnWhiteSpace;
            return;
        }
        match ch {
            b'>' => self.state = S::DeclnClose,
            b'"' => self.state = S::DeclnQuotContent,
            b'\'' => self.state = S::DeclnAposContent,
            b']' => {
                if self.at(self.i + 1) == b'>' {
                    self.i += 1;
                    self.colour_to(self.i, S::DeclnDataChars);
                    self.state = S::DataChars;
                }
            }
            _ => {
                if !self.looking_at_newline(ch) {
                    self.hold();
                }
                self.state = S::DeclnDataChars;
            }
        }
    }

    /// Internal subset text of a DOCTYPE.
    fn declaration_data(&mut self, ch: u8) {
        use XmlStyle as S;
        let next = if is_name_char(ch) {
            S::DeclnName
        } else {
            match ch {
                b'>' => S::DeclnClose,
                b'"' => S::DeclnQuotContent,
                b'\'' => S::DeclnAposContent,
                b']' => {
                    if self.at(self.i + 1) == b'>' {
                        self.i += 1;
                        self.colour_to(self.i, S::DeclnDataChars);
                        self.state = S::DataChars;
                    }
                    return;
                }
                _ if is_white(ch) || ch == b'%' => S::DeclnWhiteSpace,
                _ => return,
            }
        };
        self.colour_before(self.state);
        self.state = next;
    }
}

/// The XML/XSLT lexer. Folds on start and end tags when the `fold`
/// property is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct XsltLexer;

impl Lexer for XsltLexer {
    fn name(&self) -> &'static str {
        "xslt"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xml", "xsl", "xslt"]
    }

    fn word_list_descriptions(&self) -> &'static [&'static str] {
        &[]
    }

    fn lex(&self, start: usize, length: usize, _init_style: u8, _keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = (start + length).min(styler.len());
        let sync_start = synchronize_doc_start(styler, start);
        if sync_start != start {
            lexkit_core::trace!(requested = start, resumed = sync_start, "xml resync");
        }
        let _span = lexkit_core::debug_span!("xslt", start, length, resumed = sync_start).entered();
        if end <= sync_start {
            return;
        }
        let fold = (styler.property_int("fold", 0) != 0).then(|| FoldAccumulator::resume(styler, sync_start, true));
        styler.start_at(sync_start);
        styler.start_segment(sync_start);
        let mut scan = Scan {
            styler,
            end,
            i: sync_start,
            state: XmlStyle::Default,
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

    fn lex_with(text: &str, props: &Properties) -> TextBuffer {
        let mut buf = TextBuffer::from(text);
        XsltLexer.colourise_document(&mut buf, props, &KeywordSets::default());
        buf
    }

    fn lex(text: &str) -> TextBuffer {
        lex_with(text, &Properties::new())
    }

    fn styles_of(buf: &TextBuffer, range: std::ops::Range<usize>) -> Vec<XmlStyle> {
        buf.styles()[range]
            .iter()
            .map(|&s| XmlStyle::from_u8(s).unwrap())
            .collect()
    }

    fn all(style: XmlStyle, n: usize) -> Vec<XmlStyle> {
        vec![style; n]
    }

    #[test]
    fn lookup_tables_are_sorted() {
        assert!(XPATH_ELEMENTS.windows(2).all(|w| w[0] < w[1]));
        assert!(XPATH_ATTRIBUTES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn element_with_attribute() {
        use XmlStyle as S;
        let buf = lex("<a href=\"x\">t</a>\n");
        assert_eq!(styles_of(&buf, 0..3), vec![S::StartTagOpen, S::StartTagName, S::StartTagWhiteSpace]);
        assert_eq!(styles_of(&buf, 3..7), all(S::StartTagAttrName, 4));
        assert_eq!(
            styles_of(&buf, 7..13),
            vec![
                S::StartTagAttrEquals,
                S::StartTagAttrQuotOpen,
                S::StartTagAttrQuotContent,
                S::StartTagAttrQuotClose,
                S::StartTagClose,
                S::DataChars,
            ]
        );
        assert_eq!(
            styles_of(&buf, 13..18),
            vec![S::EndTagOpen, S::EndTagOpen, S::EndTagName, S::EndTagClose, S::DataNewline]
        );
    }

    #[test]
    fn xpath_attribute_on_xslt_element() {
        use XmlStyle as S;
        let buf = lex("<xsl:if test=\"a\">");
        assert_eq!(styles_of(&buf, 1..7), all(S::XPathTagName, 6));
        assert_eq!(styles_of(&buf, 8..12), all(S::XPathAttrName, 4));
        assert_eq!(
            styles_of(&buf, 12..17),
            vec![S::StartTagAttrEquals, S::XPathOpen, S::XPathContentQuot, S::XPathClose, S::StartTagClose]
        );
    }

    #[test]
    fn plain_element_keeps_plain_attributes() {
        use XmlStyle as S;
        let buf = lex("<p test=\"a\"/>");
        assert_eq!(styles_of(&buf, 3..7), all(S::StartTagAttrName, 4));
        assert_eq!(styles_of(&buf, 9..10), vec![S::StartTagAttrQuotContent]);
        assert_eq!(styles_of(&buf, 11..13), all(S::StartTagEmptyClose, 2));
    }

    #[test]
    fn comment_and_cdata() {
        use XmlStyle as S;
        let buf = lex("<!-- c --><![CDATA[x]]>");
        assert_eq!(styles_of(&buf, 0..4), all(S::CommentOpen, 4));
        assert_eq!(styles_of(&buf, 4..7), all(S::CommentContent, 3));
        assert_eq!(styles_of(&buf, 7..10), all(S::CommentClose, 3));
        assert_eq!(styles_of(&buf, 10..19), all(S::CdataSectOpen, 9));
        assert_eq!(styles_of(&buf, 19..20), vec![S::CdataSectContent]);
        assert_eq!(styles_of(&buf, 20..23), all(S::CdataSectClose, 3));
    }

    #[test]
    fn entity_and_char_references() {
        use XmlStyle as S;
        let buf = lex("a&amp;b &#65;\n");
        assert_eq!(styles_of(&buf, 0..1), vec![S::DataChars]);
        assert_eq!(styles_of(&buf, 1..6), all(S::EntityRef, 5));
        assert_eq!(styles_of(&buf, 8..13), all(S::CharRef, 5));
    }

    #[test]
    fn doctype_declaration() {
        use XmlStyle as S;
        let buf = lex("<!DOCTYPE html>");
        assert_eq!(styles_of(&buf, 0..2), all(S::DeclarationOpen, 2));
        assert_eq!(styles_of(&buf, 2..9), all(S::DeclarationType, 7));
        assert_eq!(styles_of(&buf, 10..14), all(S::DeclnName, 4));
        assert_eq!(styles_of(&buf, 14..15), vec![S::DeclnClose]);
    }

    #[test]
    fn xml_declaration_and_processing_instruction() {
        use XmlStyle as S;
        let buf = lex("<?xml version=\"1.0\"?>\n<?pi x?>");
        assert_eq!(styles_of(&buf, 0..5), all(S::XmlDeclOpen, 5));
        assert_eq!(styles_of(&buf, 19..21), all(S::XmlDeclClose, 2));
        assert_eq!(styles_of(&buf, 22..24), all(S::PiOpen, 2));
        assert_eq!(styles_of(&buf, 28..30), all(S::PiClose, 2));
    }

    #[test]
    fn folds_on_elements() {
        let props = Properties::from_pairs([("fold", "1")]);
        let buf = lex_with("<a>\n<b/>\n</a>\n", &props);
        let depths: Vec<i32> = buf.fold_levels().iter().map(|l| l.depth()).collect();
        assert_eq!(&depths[..4], &[0, 1, 1, 0]);
        assert!(buf.fold_levels()[0].is_header());
    }

    #[test]
    fn resumes_after_data_line() {
        let text = "<root>\n  <!-- one\n  two -->\n  <item a='1'>text</item>\n</root>\n";
        let props = Properties::from_pairs([("fold", "1")]);
        let full = lex_with(text, &props);
        for resume_at in [text.find("two").unwrap(), text.find("<item").unwrap()] {
            let mut buf = full.clone();
            buf.reset_styles_from(resume_at);
            XsltLexer.colourise_range(&mut buf, &props, &KeywordSets::default(), resume_at, text.len() - resume_at);
            assert_eq!(buf.styles(), full.styles(), "resume at {resume_at}");
            assert_eq!(buf.fold_levels(), full.fold_levels(), "resume at {resume_at}");
        }
    }
}
