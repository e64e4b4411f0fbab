#![forbid(unsafe_code)]

//! lexkit public facade crate.
//!
//! Re-exports the core lexing types, the built-in lexers and the
//! table-driven template lexer, and offers a registry holding all of them
//! plus a prelude for day-to-day use.
//!
//! # Example
//! ```
//! use lexkit::prelude::*;
//!
//! let registry = lexkit::default_registry();
//! let mut hl = lexkit::highlighter_for(&registry, "rb", "def hi\nend\n")?;
//! hl.colourise_all();
//! assert_eq!(hl.styles()[0], RubyStyle::Word.code());
//! # Ok::<(), lexkit::Error>(())
//! ```

use std::fmt;
use std::sync::Arc;

// --- Core re-exports -------------------------------------------------------

pub use lexkit_core::{
    Document, FoldAccumulator, FoldFlags, FoldLevel, Highlighter, KeywordSets, LexTarget, Lexer, LexerRegistry,
    Properties, PropertyError, StyleContext, StyleStore, Styler, TextBuffer, WordList,
};

// --- Lexer re-exports ------------------------------------------------------

pub use lexkit_lexers::{
    CoffeeScriptLexer, CoffeeStyle, CssLexer, CssStyle, PerlLexer, PerlStyle, RubyLexer, RubyStyle, TclLexer,
    TclStyle, XmlStyle, XsltLexer, builtin_registry, default_keywords, register_all,
};

// --- Template re-exports ---------------------------------------------------

pub use lexkit_udl::{Family, TableError, TableErrorKind, UdlLexer, UdlLineState, UdlRegistry, UdlTable};

// --- Registries ------------------------------------------------------------

/// Every built-in lexer, plus a `udl` lexer with no tables loaded.
pub fn default_registry() -> LexerRegistry {
    registry_with_templates(Arc::new(UdlRegistry::new()))
}

/// Every built-in lexer, plus a `udl` lexer reading tables from `templates`.
pub fn registry_with_templates(templates: Arc<UdlRegistry>) -> LexerRegistry {
    let mut registry = builtin_registry();
    registry.register(Arc::new(UdlLexer::with_registry(templates)));
    registry
}

/// A [`Highlighter`] over `text` for the lexer registered under `language`
/// (a lexer name or a file extension), with that lexer's default keywords.
pub fn highlighter_for(registry: &LexerRegistry, language: &str, text: impl Into<Vec<u8>>) -> Result<Highlighter> {
    let lexer = registry
        .by_name(language)
        .or_else(|| registry.for_extension(language))
        .ok_or_else(|| Error::UnknownLanguage(language.to_owned()))?;
    let keywords = default_keywords(lexer.name()).unwrap_or_default();
    Ok(Highlighter::new(lexer, text).with_keywords(keywords))
}

/// A [`Highlighter`] running the template table for `language` from
/// `templates`.
pub fn template_highlighter(
    templates: &Arc<UdlRegistry>,
    language: &str,
    text: impl Into<Vec<u8>>,
) -> Result<Highlighter> {
    if !templates.contains(language) {
        return Err(Error::UnknownLanguage(language.to_owned()));
    }
    let lexer = Arc::new(UdlLexer::with_registry(Arc::clone(templates)));
    Ok(Highlighter::new(lexer, text).with_keywords(KeywordSets::from_strs(&[language])))
}

// --- Errors ---------------------------------------------------------------

/// Top-level error type for lexkit setup.
#[derive(Debug)]
pub enum Error {
    /// A template table failed to load.
    Table(TableError),
    /// Configuration input was malformed.
    Properties(PropertyError),
    /// No lexer or table is registered under this name.
    UnknownLanguage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(err) => write!(f, "{err}"),
            Self::Properties(err) => write!(f, "{err}"),
            Self::UnknownLanguage(name) => write!(f, "no lexer for {name:?}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Table(err) => Some(err),
            Self::Properties(err) => Some(err),
            Self::UnknownLanguage(_) => None,
        }
    }
}

impl From<TableError> for Error {
    fn from(err: TableError) -> Self {
        Self::Table(err)
    }
}

impl From<PropertyError> for Error {
    fn from(err: PropertyError) -> Self {
        Self::Properties(err)
    }
}

/// Standard result type for lexkit APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CoffeeStyle, CssStyle, Document, Error, FoldLevel, Highlighter, KeywordSets, Lexer, LexerRegistry, PerlStyle,
        Properties, Result, RubyStyle, TclStyle, TextBuffer, UdlRegistry, UdlTable, XmlStyle,
    };

    pub use crate::{core, lexers, udl};
}

pub use lexkit_core as core;
pub use lexkit_lexers as lexers;
pub use lexkit_udl as udl;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_holds_builtins_and_udl() {
        let registry = default_registry();
        assert_eq!(registry.len(), 7);
        assert!(registry.by_name("udl").is_some());
        assert_eq!(registry.for_extension("pl").map(|l| l.name()), Some("perl"));
    }

    #[test]
    fn unknown_language_is_an_error() {
        let err = highlighter_for(&default_registry(), "cobol", "x").unwrap_err();
        assert!(matches!(err, Error::UnknownLanguage(ref name) if name == "cobol"));
        assert_eq!(err.to_string(), "no lexer for \"cobol\"");
    }

    #[test]
    fn setup_errors_convert() {
        fn load(json: &str) -> Result<UdlTable> {
            Ok(UdlTable::from_json(json)?)
        }
        fn props(input: &str) -> Result<Properties> {
            Ok(Properties::parse_lines(input)?)
        }
        assert!(matches!(load("nope"), Err(Error::Table(_))));
        assert!(matches!(props("nope"), Err(Error::Properties(_))));
        let err = load("nope").unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
    }
}
