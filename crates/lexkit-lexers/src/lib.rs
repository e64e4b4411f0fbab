#![forbid(unsafe_code)]

//! Hand-written incremental lexers for lexkit.
//!
//! Each lexer implements [`lexkit_core::Lexer`] and can be entered at any
//! offset: it walks back to a point whose state it can recover from the
//! styles, fold levels and line state words already stored, and scans
//! forward from there.
//!
//! - [`RubyLexer`] - heredocs, `%` literals, `=begin` blocks, `__END__`
//! - [`PerlLexer`] - quote-like operators, heredocs, POD, formats
//! - [`CssLexer`] - CSS 1-3 with Less and SCSS dialects
//! - [`TclLexer`] - command-start comments, braced variables
//! - [`XsltLexer`] - XML with XPath-valued XSLT attributes
//! - [`CoffeeScriptLexer`] - block comments, verbose regexes, indentation folding
//!
//! # Example
//! ```
//! use lexkit_core::{Lexer, Properties, TextBuffer};
//! use lexkit_lexers::{RubyLexer, RubyStyle};
//!
//! let mut buf = TextBuffer::from("def hi\n  puts 'x'\nend\n");
//! RubyLexer.colourise_document(&mut buf, &Properties::new(), &RubyLexer::default_keywords());
//! assert_eq!(buf.styles()[0], RubyStyle::Word.code());
//! ```

pub mod coffeescript;
pub mod css;
pub mod heredoc;
pub mod perl;
pub mod quote;
pub mod ruby;
pub mod scan;
pub mod tcl;
pub mod xslt;

use std::sync::Arc;

use lexkit_core::{KeywordSets, LexerRegistry};

pub use coffeescript::{CoffeeScriptLexer, CoffeeStyle};
pub use css::{CssLexer, CssStyle};
pub use perl::{PerlLexer, PerlStyle};
pub use ruby::{RubyLexer, RubyStyle};
pub use tcl::{TclLexer, TclStyle};
pub use xslt::{XmlStyle, XsltLexer};

/// Add every built-in lexer to `registry`.
pub fn register_all(registry: &mut LexerRegistry) {
    registry.register(Arc::new(RubyLexer));
    registry.register(Arc::new(PerlLexer));
    registry.register(Arc::new(CssLexer));
    registry.register(Arc::new(TclLexer));
    registry.register(Arc::new(XsltLexer));
    registry.register(Arc::new(CoffeeScriptLexer));
}

/// A registry holding every built-in lexer.
pub fn builtin_registry() -> LexerRegistry {
    let mut registry = LexerRegistry::new();
    register_all(&mut registry);
    registry
}

/// The keyword lists a built-in lexer ships with, by lexer name.
pub fn default_keywords(name: &str) -> Option<KeywordSets> {
    let keywords = match name.to_ascii_lowercase().as_str() {
        "ruby" => RubyLexer::default_keywords(),
        "perl" => PerlLexer::default_keywords(),
        "css" => CssLexer::default_keywords(),
        "tcl" => TclLexer::default_keywords(),
        "xslt" => KeywordSets::default(),
        "coffeescript" => CoffeeScriptLexer::default_keywords(),
        _ => return None,
    };
    Some(keywords)
}
