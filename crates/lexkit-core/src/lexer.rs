#![forbid(unsafe_code)]

//! The lexer contract and a registry of lexers.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::document::{Document, LexTarget, StyleStore};
use crate::keywords::KeywordSets;
use crate::properties::Properties;
use crate::styler::Styler;

// ---------------------------------------------------------------------------
// Lexer trait
// ---------------------------------------------------------------------------

/// An incremental, resumable lexer for one language.
///
/// [`lex`](Self::lex) may be entered at any offset. Implementations walk
/// back from `start` to a position whose state they can recover from the
/// style store, then scan forward, committing styles through the
/// [`Styler`]. Running from that recovered position must reproduce exactly
/// the styling a scan from offset 0 would produce.
pub trait Lexer: Send + Sync {
    /// Human-readable name (e.g., "ruby", "perl").
    fn name(&self) -> &'static str;

    /// File extensions this lexer handles (without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Meaning of each keyword list index.
    fn word_list_descriptions(&self) -> &'static [&'static str];

    /// Number of low bits of each style byte the lexer uses.
    fn style_bits(&self) -> u8 {
        8
    }

    /// Style `start..start + length`. `init_style` is the style of the byte
    /// before `start` (0 at the document start).
    fn lex(
        &self,
        start: usize,
        length: usize,
        init_style: u8,
        keywords: &KeywordSets,
        styler: &mut Styler<'_>,
    );

    /// Compute fold levels for the lines covering `start..start + length`.
    fn fold(
        &self,
        start: usize,
        length: usize,
        init_style: u8,
        keywords: &KeywordSets,
        styler: &mut Styler<'_>,
    );

    /// Lex and fold `start..start + length` of `target`.
    fn colourise_range(
        &self,
        target: &mut dyn LexTarget,
        props: &Properties,
        keywords: &KeywordSets,
        start: usize,
        length: usize,
    ) {
        let len = target.len();
        let start = start.min(len);
        let length = length.min(len - start);
        let init_style = match start.checked_sub(1) {
            Some(prev) => target.style_at(prev),
            None => 0,
        };
        let mut styler = Styler::new(target, props);
        self.lex(start, length, init_style, keywords, &mut styler);
        styler.flush();
        self.fold(start, length, init_style, keywords, &mut styler);
        styler.flush();
    }

    /// Lex and fold a whole document.
    fn colourise_document(
        &self,
        target: &mut dyn LexTarget,
        props: &Properties,
        keywords: &KeywordSets,
    ) {
        let len = target.len();
        self.colourise_range(target, props, keywords, 0, len);
    }
}

// ---------------------------------------------------------------------------
// LexerRegistry
// ---------------------------------------------------------------------------

/// Registry for looking up lexers by file extension or name.
#[derive(Default, Clone)]
pub struct LexerRegistry {
    lexers: Vec<Arc<dyn Lexer>>,
    by_extension: FxHashMap<String, usize>,
    by_name: FxHashMap<String, usize>,
}

impl LexerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lexer. Later registrations for the same extension or name
    /// override earlier ones.
    pub fn register(&mut self, lexer: Arc<dyn Lexer>) {
        let index = self.lexers.len();
        self.by_name.insert(lexer.name().to_ascii_lowercase(), index);
        for ext in lexer.extensions() {
            let key = ext.trim_start_matches('.').to_ascii_lowercase();
            if !key.is_empty() {
                self.by_extension.insert(key, index);
            }
        }
        self.lexers.push(lexer);
    }

    /// Look up a lexer by file extension (case-insensitive, dot optional).
    pub fn for_extension(&self, ext: &str) -> Option<Arc<dyn Lexer>> {
        let key = ext.trim_start_matches('.').to_ascii_lowercase();
        let index = self.by_extension.get(&key)?;
        self.lexers.get(*index).cloned()
    }

    /// Look up a lexer by name (case-insensitive).
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Lexer>> {
        let index = self.by_name.get(&name.to_ascii_lowercase())?;
        self.lexers.get(*index).cloned()
    }

    pub fn len(&self) -> usize {
        self.lexers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexers.is_empty()
    }

    /// Names of all registered lexers, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.lexers.iter().map(|l| l.name()).collect()
    }
}

impl std::fmt::Debug for LexerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexerRegistry")
            .field("lexers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextBuffer;

    /// Styles every byte with its line number.
    struct LineNumberLexer;

    impl Lexer for LineNumberLexer {
        fn name(&self) -> &'static str {
            "LineNumber"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["ln", ".LNX"]
        }

        fn word_list_descriptions(&self) -> &'static [&'static str] {
            &[]
        }

        fn lex(&self, start: usize, length: usize, _: u8, _: &KeywordSets, styler: &mut Styler<'_>) {
            styler.start_at(start);
            styler.start_segment(start);
            for pos in start..start + length {
                let line = styler.line_of(pos);
                styler.colour_to(pos, line as u8);
            }
        }

        fn fold(&self, _: usize, _: usize, _: u8, _: &KeywordSets, _: &mut Styler<'_>) {}
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let mut registry = LexerRegistry::new();
        registry.register(Arc::new(LineNumberLexer));
        assert_eq!(registry.len(), 1);
        assert!(registry.by_name("linenumber").is_some());
        assert!(registry.for_extension(".LN").is_some());
        assert!(registry.for_extension("lnx").is_some());
        assert!(registry.for_extension("rb").is_none());
        assert_eq!(registry.names(), vec!["LineNumber"]);
    }

    #[test]
    fn colourise_document_covers_every_byte() {
        let mut buf = TextBuffer::from("a\nb\nc");
        LineNumberLexer.colourise_document(&mut buf, &Properties::new(), &KeywordSets::new());
        assert_eq!(buf.styles(), &[0, 0, 1, 1, 2]);
    }
}
