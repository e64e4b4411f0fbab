//! Property tests for incremental lexing.
//!
//! For every built-in lexer, over documents assembled from fragments of
//! its language:
//!
//! 1. Re-lexing from any line start, with everything before it kept from a
//!    full pass, reproduces the full pass's styles and fold levels.
//! 2. Applying an edit through a [`Highlighter`] and restyling from the
//!    edited line gives the same styles as lexing the edited text fresh.
//! 3. Lexing never panics, whatever the bytes.

use std::sync::Arc;

use lexkit_core::{Document, Highlighter, KeywordSets, Lexer, Properties, TextBuffer};
use lexkit_lexers::{CoffeeScriptLexer, CssLexer, PerlLexer, RubyLexer, TclLexer, XsltLexer, default_keywords};
use proptest::prelude::*;

// ── Fragments ───────────────────────────────────────────────────────────

const RUBY: &[&str] = &[
    "def ", "end", "x", " = ", "1", "0x1f", "\"s #{x} t\"", "'q'", "# c", "\n", "\n", "<<EOS\nbody\nEOS\n",
    "%w(a b)", "/re/", " ", "if ", "@iv", ":sym", "=begin\nz\n=end\n", "(", ")", "{", "}", "x.y", "?a",
];

const PERL: &[&str] = &[
    "my ", "$x", " = ", "1", ";", "\n", "\n", "\"s $x\"", "'q'", "# c", "sub f {", "}", "qw(a b)", "s/a/b/g",
    "/re/", "<<EOS;\nbody\nEOS\n", "\n=pod\n\n=cut\n", "@a", "%h", " ", "=>", "print ", "(", ")",
];

const CSS: &[&str] = &[
    "a", " ", "{", "}", "color", ":", "red", ";", "/* c */", "\n", ".cls", "#id", "12px", "!important",
    "@import ", "\"s\"", ":hover", "url(x)", ",",
];

const TCL: &[&str] = &[
    "set ", "x", " ", "$x", "${a b}", "$a::b", "{", "}", "[", "]", "\"s\"", "\"", "# c", "\n", "\n", ";",
    "proc ", "-opt", "puts ", "12",
];

const XML: &[&str] = &[
    "<a>", "</a>", "<b x=\"1\"/>", "text", "&amp;", "&#65;", "<!-- c -->", "\n", "<![CDATA[z]]>",
    "<xsl:if test=\"a\">", "</xsl:if>", " ", "<?pi x?>", "<!DOCTYPE d>",
];

const COFFEE: &[&str] = &[
    "x", " = ", "1", "/re/", " / ", "\n", "\n", "  ", "# c", "###\nb\n###\n", "\"s\"", "'c'", "return ",
    "if ", "->", "i++", "///a # c\n///", "@\"v\"", "Math", "(", ")", "[", "]", ",",
];

fn document(fragments: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(fragments), 0..40).prop_map(|parts| parts.concat())
}

fn lexers() -> Vec<(Arc<dyn Lexer>, &'static [&'static str])> {
    vec![
        (Arc::new(RubyLexer), RUBY),
        (Arc::new(PerlLexer), PERL),
        (Arc::new(CssLexer), CSS),
        (Arc::new(TclLexer), TCL),
        (Arc::new(XsltLexer), XML),
        (Arc::new(CoffeeScriptLexer), COFFEE),
    ]
}

fn keywords_for(lexer: &dyn Lexer) -> KeywordSets {
    default_keywords(lexer.name()).unwrap_or_default()
}

fn fold_props() -> Properties {
    Properties::from_pairs([("fold", "1"), ("fold.comment", "1")])
}

fn full_pass(lexer: &dyn Lexer, text: &str, props: &Properties) -> TextBuffer {
    let mut buf = TextBuffer::from(text);
    lexer.colourise_document(&mut buf, props, &keywords_for(lexer));
    buf
}

fn check_resume(lexer: &dyn Lexer, text: &str, line_pick: usize) -> Result<(), TestCaseError> {
    let props = fold_props();
    let full = full_pass(lexer, text, &props);
    let line = line_pick % full.line_count();
    let start = full.line_start(line);

    let mut buf = full.clone();
    buf.reset_styles_from(start);
    lexer.colourise_range(&mut buf, &props, &keywords_for(lexer), start, text.len() - start);

    prop_assert_eq!(
        buf.styles(),
        full.styles(),
        "{} styles differ resuming at line {} of {:?}",
        lexer.name(),
        line,
        text
    );
    prop_assert_eq!(
        buf.fold_levels(),
        full.fold_levels(),
        "{} fold levels differ resuming at line {} of {:?}",
        lexer.name(),
        line,
        text
    );
    Ok(())
}

fn check_edit(lexer: Arc<dyn Lexer>, text: &str, at: usize, insert: &str) -> Result<(), TestCaseError> {
    let keywords = keywords_for(lexer.as_ref());
    let at = at % (text.len() + 1);
    let mut edited = text.as_bytes().to_vec();
    edited.splice(at..at, insert.bytes());

    let mut live = Highlighter::new(Arc::clone(&lexer), text).with_keywords(keywords.clone());
    live.colourise_all();
    live.edit(at..at, insert);

    let mut fresh = Highlighter::new(lexer, edited).with_keywords(keywords);
    fresh.colourise_all();

    prop_assert_eq!(live.buffer().text(), fresh.buffer().text());
    prop_assert_eq!(
        live.styles(),
        fresh.styles(),
        "{} styles differ after inserting {:?} at {} into {:?}",
        live.lexer().name(),
        insert,
        at,
        text
    );
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Resuming at a line start matches a full pass
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn ruby_resumes_at_any_line(text in document(RUBY), line in any::<usize>()) {
        check_resume(&RubyLexer, &text, line)?;
    }

    #[test]
    fn perl_resumes_at_any_line(text in document(PERL), line in any::<usize>()) {
        check_resume(&PerlLexer, &text, line)?;
    }

    #[test]
    fn css_resumes_at_any_line(text in document(CSS), line in any::<usize>()) {
        check_resume(&CssLexer, &text, line)?;
    }

    #[test]
    fn tcl_resumes_at_any_line(text in document(TCL), line in any::<usize>()) {
        check_resume(&TclLexer, &text, line)?;
    }

    #[test]
    fn xml_resumes_at_any_line(text in document(XML), line in any::<usize>()) {
        check_resume(&XsltLexer, &text, line)?;
    }

    #[test]
    fn coffeescript_resumes_at_any_line(text in document(COFFEE), line in any::<usize>()) {
        check_resume(&CoffeeScriptLexer, &text, line)?;
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Editing then restyling matches lexing the edited text
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn edits_restyle_like_a_fresh_pass(
        which in 0usize..6,
        seed in prop::collection::vec(any::<prop::sample::Index>(), 0..30),
        at in any::<usize>(),
        insert_pick in any::<prop::sample::Index>(),
    ) {
        let (lexer, fragments) = lexers().swap_remove(which);
        let text: String = seed.iter().map(|i| *i.get(fragments)).collect();
        let insert = *insert_pick.get(fragments);
        check_edit(lexer, &text, at, insert)?;
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Arbitrary bytes never panic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn arbitrary_bytes_do_not_panic(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
        let props = fold_props();
        for (lexer, _) in lexers() {
            let mut buf = TextBuffer::new(bytes.clone());
            lexer.colourise_document(&mut buf, &props, &keywords_for(lexer.as_ref()));
            prop_assert_eq!(buf.styles().len(), bytes.len());
        }
    }
}
