//! Property tests for incremental table-driven lexing.
//!
//! Over documents assembled from fragments of the sample template
//! language:
//!
//! 1. Re-lexing from any line start, with everything before it kept from a
//!    full pass, reproduces the full pass's styles, line states and fold
//!    levels.
//! 2. Applying an edit through a [`Highlighter`] and restyling from the
//!    edited line gives the same styles as lexing the edited text fresh.
//! 3. Lexing never panics, whatever the bytes.

use std::sync::Arc;

use lexkit_core::{Document, Highlighter, KeywordSets, Lexer, Properties, TextBuffer};
use lexkit_udl::{UdlLexer, UdlTable};
use proptest::prelude::*;

const SAMPLE: &str = include_str!("data/minitpl.json");

// Documents stay well under the number of lines on which resuming inside
// a nested state is ruled out.
const FRAGMENTS: &[&str] = &[
    "<p>", "</p>", "<a href=\"x\">", "text", " ", "\n", "\n", "<% ", " %>", "x", "if ", "do", "end", "\"s\"",
    "q{z}", "q(a\nb)", "# c\n", "/re/", " / ", "2", "<!-- c -->", "<!--\n", "-->", "{", "}", "<b <% y %>>",
];

fn lexer() -> Arc<dyn Lexer> {
    Arc::new(UdlLexer::new(Arc::new(UdlTable::from_json(SAMPLE).unwrap())))
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..20).prop_map(|parts| parts.concat())
}

fn full_pass(lexer: &dyn Lexer, text: &str) -> TextBuffer {
    let mut buf = TextBuffer::from(text);
    lexer.colourise_document(&mut buf, &Properties::new(), &KeywordSets::new());
    buf
}

proptest! {
    #[test]
    fn resumes_at_any_line(text in document(), line_pick in any::<usize>()) {
        let lexer = lexer();
        let full = full_pass(lexer.as_ref(), &text);
        let line = line_pick % full.line_count();
        let start = full.line_start(line);

        let mut buf = full.clone();
        buf.reset_styles_from(start);
        lexer.colourise_range(&mut buf, &Properties::new(), &KeywordSets::new(), start, text.len() - start);

        prop_assert_eq!(buf.styles(), full.styles(), "styles differ resuming at line {} of {:?}", line, text);
        prop_assert_eq!(buf.line_states(), full.line_states(), "line states differ at line {} of {:?}", line, text);
        prop_assert_eq!(buf.fold_levels(), full.fold_levels(), "folds differ at line {} of {:?}", line, text);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn edits_restyle_like_a_fresh_pass(
        text in document(),
        at in any::<usize>(),
        insert in prop::sample::select(FRAGMENTS),
    ) {
        let at = at % (text.len() + 1);
        let mut edited = text.as_bytes().to_vec();
        edited.splice(at..at, insert.bytes());

        let mut live = Highlighter::new(lexer(), text.as_str());
        live.colourise_all();
        live.edit(at..at, insert);

        let mut fresh = Highlighter::new(lexer(), edited);
        fresh.colourise_all();

        prop_assert_eq!(live.buffer().text(), fresh.buffer().text());
        prop_assert_eq!(live.styles(), fresh.styles(), "styles differ after inserting {:?} at {} into {:?}", insert, at, text);
    }

    #[test]
    fn arbitrary_bytes_do_not_panic(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
        let lexer = lexer();
        let mut buf = TextBuffer::new(bytes.clone());
        lexer.colourise_document(&mut buf, &Properties::new(), &KeywordSets::new());
        prop_assert_eq!(buf.styles().len(), bytes.len());
        let mid = bytes.len() / 2;
        lexer.colourise_range(&mut buf, &Properties::new(), &KeywordSets::new(), mid, bytes.len() - mid);
    }
}
