//! Property tests for bracket balance.
//!
//! 1. A bracketed quote-like literal opened at nesting depth N ends at the
//!    Nth matching close, not before.
//! 2. Over documents built from balanced blocks, every block opener is a
//!    fold header, the deepest line sits at the deepest nesting, and the
//!    final line is back at depth 0. This holds with and without inline
//!    folding (`fold=1`).

use lexkit_core::{KeywordSets, Lexer, Properties, TextBuffer};
use lexkit_lexers::{CssLexer, PerlLexer, PerlStyle, RubyLexer, RubyStyle, default_keywords};
use proptest::prelude::*;

fn lex(lexer: &dyn Lexer, text: &str, props: &Properties) -> TextBuffer {
    let keywords = default_keywords(lexer.name()).unwrap_or_else(KeywordSets::new);
    let mut buf = TextBuffer::from(text);
    lexer.colourise_document(&mut buf, props, &keywords);
    buf
}

/// `open` + `a{` repeated so the literal reaches `depth`, then as many
/// closes, then ` z`.
fn nested_literal(open: &str, depth: usize) -> String {
    format!("{open}{}b{} z", "a{".repeat(depth - 1), "}".repeat(depth))
}

// ── Fold fixtures ───────────────────────────────────────────────────────

/// A generated document: its text, how many blocks it opens, and the
/// deepest nesting reached.
#[derive(Debug, Clone)]
struct Blocks {
    text: String,
    opened: usize,
    deepest: i32,
}

const RUBY_LINES: &[&str] = &["x = 1\n", "puts y\n", "\n"];
const RUBY_BLOCKS: &[(&str, &str)] = &[("if x\n", "end\n"), ("def m\n", "end\n"), ("x = {\n", "}\n")];

const PERL_LINES: &[&str] = &["my $x = 1;\n", "print $x;\n", "\n"];
const PERL_BLOCKS: &[(&str, &str)] = &[("sub f {\n", "}\n"), ("if ($x) {\n", "}\n"), ("{\n", "}\n")];

const CSS_LINES: &[&str] = &["color: red;\n", "/* c */\n", "\n"];
const CSS_BLOCKS: &[(&str, &str)] = &[("a {\n", "}\n"), (".c, #d {\n", "}\n")];

fn blocks(lines: &'static [&'static str], wrappers: &'static [(&'static str, &'static str)]) -> impl Strategy<Value = Blocks> {
    let leaf = prop::sample::select(lines).prop_map(|line| Blocks {
        text: line.to_owned(),
        opened: 0,
        deepest: 0,
    });
    let tree = leaf.prop_recursive(5, 48, 4, move |inner| {
        (prop::sample::select(wrappers), prop::collection::vec(inner, 0..4)).prop_map(|((open, close), body)| {
            let mut text = open.to_owned();
            let mut opened = 1;
            let mut deepest = 0;
            for part in &body {
                text.push_str(&part.text);
                opened += part.opened;
                deepest = deepest.max(part.deepest);
            }
            text.push_str(close);
            Blocks {
                text,
                opened,
                deepest: deepest + 1,
            }
        })
    });
    prop::collection::vec(tree, 0..4).prop_map(|parts| Blocks {
        text: parts.iter().map(|p| p.text.as_str()).collect(),
        opened: parts.iter().map(|p| p.opened).sum(),
        deepest: parts.iter().map(|p| p.deepest).max().unwrap_or(0),
    })
}

fn check_fold_balance(lexer: &dyn Lexer, doc: &Blocks, inline: bool) -> Result<(), TestCaseError> {
    let props = if inline {
        Properties::from_pairs([("fold", "1")])
    } else {
        Properties::new()
    };
    let buf = lex(lexer, &doc.text, &props);
    let levels = buf.fold_levels();
    let headers = levels.iter().filter(|l| l.is_header()).count();
    let deepest = levels.iter().map(|l| l.depth()).max().unwrap_or(0);
    let last = levels.last().map_or(0, |l| l.depth());

    prop_assert_eq!(headers, doc.opened, "{} headers in {:?}", lexer.name(), doc.text);
    prop_assert_eq!(deepest, doc.deepest, "{} deepest level in {:?}", lexer.name(), doc.text);
    prop_assert_eq!(last, 0, "{} final level in {:?}", lexer.name(), doc.text);
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Quote-like literals close at the matching bracket
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn perl_q_closes_at_matching_brace(depth in 1usize..12) {
        let text = nested_literal("q{", depth);
        let buf = lex(&PerlLexer, &text, &Properties::new());
        let literal = text.len() - 2;
        prop_assert!(
            buf.styles()[..literal].iter().all(|&s| s == PerlStyle::StringQ.code()),
            "{:?} styled {:?}", text, buf.styles()
        );
        prop_assert_eq!(buf.styles()[literal], PerlStyle::Default.code());
        prop_assert_eq!(buf.styles()[literal + 1], PerlStyle::Identifier.code());
    }

    #[test]
    fn ruby_percent_q_closes_at_matching_brace(depth in 1usize..12) {
        let text = nested_literal("%q{", depth);
        let buf = lex(&RubyLexer, &text, &Properties::new());
        let literal = text.len() - 2;
        prop_assert!(
            buf.styles()[..literal].iter().all(|&s| s == RubyStyle::StringQ.code()),
            "{:?} styled {:?}", text, buf.styles()
        );
        prop_assert_eq!(buf.styles()[literal], RubyStyle::Default.code());
        prop_assert_eq!(buf.styles()[literal + 1], RubyStyle::Identifier.code());
    }

    #[test]
    fn perl_q_missing_a_close_runs_on(depth in 2usize..12) {
        // One close short: the literal swallows the trailing ` z` too.
        let text = format!("q{{{}b{} z\n", "a{".repeat(depth - 1), "}".repeat(depth - 1));
        let buf = lex(&PerlLexer, &text, &Properties::new());
        prop_assert!(buf.styles()[..text.len() - 1].iter().all(|&s| s != PerlStyle::Identifier.code()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Balanced blocks fold back to the top level
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn ruby_folds_balance(doc in blocks(RUBY_LINES, RUBY_BLOCKS), inline in any::<bool>()) {
        check_fold_balance(&RubyLexer, &doc, inline)?;
    }

    #[test]
    fn perl_folds_balance(doc in blocks(PERL_LINES, PERL_BLOCKS), inline in any::<bool>()) {
        check_fold_balance(&PerlLexer, &doc, inline)?;
    }

    #[test]
    fn css_folds_balance(doc in blocks(CSS_LINES, CSS_BLOCKS), inline in any::<bool>()) {
        check_fold_balance(&CssLexer, &doc, inline)?;
    }
}
