#![forbid(unsafe_code)]

//! Core: document access, style storage, and incremental lexing primitives.
//!
//! Lexers read a [`Document`](document::Document) and write one style byte
//! per document byte plus per-line fold levels and state words into a
//! [`StyleStore`](document::StyleStore). Everything else about a lexing pass
//! is transient and rebuilt from those arrays on the next call.

pub mod chars;
pub mod context;
pub mod document;
pub mod fold;
pub mod keywords;
pub mod lexer;
pub mod logging;
pub mod properties;
pub mod session;
pub mod styler;

pub use context::StyleContext;
pub use document::{Document, LexTarget, StyleStore, TextBuffer};
pub use fold::{FoldAccumulator, FoldFlags, FoldLevel};
pub use keywords::{KeywordSets, WordList};
pub use lexer::{Lexer, LexerRegistry};
pub use properties::{Properties, PropertyError};
pub use session::Highlighter;
pub use styler::Styler;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace, trace_span, warn};
