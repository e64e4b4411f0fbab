#![forbid(unsafe_code)]

//! A lexer bound to a buffer, its keywords, and its configuration.
//!
//! `Highlighter` plays the editor's role: it decides which range needs
//! styling after an edit and hands it to the lexer, which resynchronizes on
//! its own.

use std::ops::Range;
use std::sync::Arc;

use crate::document::{Document, TextBuffer};
use crate::keywords::KeywordSets;
use crate::lexer::Lexer;
use crate::properties::Properties;
use crate::styler::Styler;

pub struct Highlighter {
    lexer: Arc<dyn Lexer>,
    buffer: TextBuffer,
    keywords: KeywordSets,
    props: Properties,
}

impl Highlighter {
    pub fn new(lexer: Arc<dyn Lexer>, text: impl Into<Vec<u8>>) -> Self {
        Self {
            lexer,
            buffer: TextBuffer::new(text),
            keywords: KeywordSets::new(),
            props: Properties::new(),
        }
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: KeywordSets) -> Self {
        self.keywords = keywords;
        self
    }

    #[must_use]
    pub fn with_properties(mut self, props: Properties) -> Self {
        self.props = props;
        self
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn styles(&self) -> &[u8] {
        self.buffer.styles()
    }

    pub fn lexer(&self) -> &dyn Lexer {
        self.lexer.as_ref()
    }

    /// Lex and fold the whole buffer.
    pub fn colourise_all(&mut self) {
        self.lexer
            .colourise_document(&mut self.buffer, &self.props, &self.keywords);
    }

    /// Lex and fold `start..start + length`.
    pub fn colourise_range(&mut self, start: usize, length: usize) {
        self.lexer.colourise_range(
            &mut self.buffer,
            &self.props,
            &self.keywords,
            start,
            length,
        );
    }

    /// Recompute fold levels for the whole buffer from its current styles.
    pub fn fold_all(&mut self) {
        let len = self.buffer.len();
        let init_style = 0;
        let mut styler = Styler::new(&mut self.buffer, &self.props);
        self.lexer.fold(0, len, init_style, &self.keywords, &mut styler);
        styler.flush();
    }

    /// Re-lex from the start of the line containing `pos` to the end.
    pub fn colourise_from(&mut self, pos: usize) {
        let start = self.buffer.line_start(self.buffer.line_of(pos));
        let length = self.buffer.len() - start.min(self.buffer.len());
        self.colourise_range(start, length);
    }

    /// Apply an edit and restyle from the edited line onward.
    pub fn edit(&mut self, range: Range<usize>, replacement: &str) {
        let start = range.start;
        self.buffer.replace_range(range, replacement.as_bytes());
        self.buffer.reset_styles_from(start);
        self.colourise_from(start);
    }
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("lexer", &self.lexer.name())
            .field("len", &self.buffer.len())
            .finish()
    }
}
