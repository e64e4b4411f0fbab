#![forbid(unsafe_code)]

//! Table-driven lexing for multi-language template files.
//!
//! A [`UdlTable`] describes a template language (HTML with embedded
//! scripts, style sheets and directives) as one state machine whose states
//! are grouped into sub-language families. [`UdlLexer`] runs a table over a
//! document incrementally, recording a [`UdlLineState`] word at every line
//! end so a later pass can resume mid-document, and folds on the table's
//! flipper texts.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use lexkit_core::{KeywordSets, Lexer, Properties, TextBuffer};
//! use lexkit_udl::{UdlLexer, UdlTable};
//!
//! let json = r#"{
//!   "language": "Tiny",
//!   "families": {
//!     "markup": { "default_state": "TEXT", "default_style": 0, "styles": { "first": 0, "last": 1 } },
//!     "tpl": { "default_state": "TAG", "default_style": 2, "styles": { "first": 2, "last": 2 } }
//!   },
//!   "states": [
//!     { "name": "TEXT", "family": "markup",
//!       "transitions": [ { "match": { "string": "{{" }, "upto_style": 0, "new_state": "TAG" } ],
//!       "eof": { "upto_style": 0 } },
//!     { "name": "TAG", "family": "tpl",
//!       "transitions": [ { "match": { "string": "}}" }, "include_style": 2, "new_state": "TEXT" } ],
//!       "eof": { "include_style": 2 } }
//!   ]
//! }"#;
//! let lexer = UdlLexer::new(Arc::new(UdlTable::from_json(json)?));
//! let mut buf = TextBuffer::from("a {{b}} c");
//! lexer.colourise_document(&mut buf, &Properties::new(), &KeywordSets::new());
//! assert_eq!(buf.styles(), &[0, 0, 2, 2, 2, 2, 2, 0, 0]);
//! # Ok::<(), lexkit_udl::TableError>(())
//! ```

pub mod engine;
pub mod error;
mod fold;
pub mod line_state;
pub mod registry;
pub mod table;

pub use engine::{REDO_LIMIT, UdlLexer};
pub use error::{TableError, TableErrorKind};
pub use line_state::{UdlLineState, simple_hash};
pub use registry::UdlRegistry;
pub use table::{
    DelimiterSpec, Family, FamilySpec, FlipperSpec, LookBackAction, LookBackDefault, LookBackKindSpec, LookBackSpec,
    LookBackTestSpec, MatchSpec, StateId, StateSpec, StyleRange, TableSpec, TransitionSpec, UdlTable,
};
