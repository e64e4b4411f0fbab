//! Host-side behaviour of the core types, driven through a small lexer.

use std::sync::Arc;

use lexkit_core::chars::{is_eol, is_word_char};
use lexkit_core::{
    Document, FoldAccumulator, Highlighter, KeywordSets, Lexer, LexerRegistry, Properties, Styler, TextBuffer,
};

/// Words get style 1 (2 when listed), braces 3, everything else 0.
/// Stateless per line; folds on braces.
struct Words;

impl Lexer for Words {
    fn name(&self) -> &'static str {
        "words"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["wd", "words"]
    }

    fn word_list_descriptions(&self) -> &'static [&'static str] {
        &["Keywords"]
    }

    fn style_bits(&self) -> u8 {
        2
    }

    fn lex(&self, start: usize, length: usize, _init_style: u8, keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = start + length;
        let mut pos = styler.line_start(styler.line_of(start));
        styler.start_at(pos);
        styler.start_segment(pos);
        while pos < end {
            let ch = styler.char_at(pos);
            if is_word_char(ch) {
                let mut word_end = pos;
                while word_end + 1 < end && is_word_char(styler.char_at(word_end + 1)) {
                    word_end += 1;
                }
                let style = if keywords.get(0).contains(&styler.text_range(pos, word_end)) {
                    2
                } else {
                    1
                };
                styler.colour_to(word_end, style);
                pos = word_end + 1;
            } else {
                styler.colour_to(pos, if ch == b'{' || ch == b'}' { 3 } else { 0 });
                pos += 1;
            }
        }
    }

    fn fold(&self, start: usize, length: usize, _init_style: u8, _keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = start + length;
        let line_start = styler.line_start(styler.line_of(start));
        let compact = styler.property_int("fold.compact", 1) != 0;
        let mut acc = FoldAccumulator::resume(styler, line_start, compact);
        for pos in line_start..end {
            let ch = styler.char_at(pos);
            match (ch, styler.style_at(pos)) {
                (b'{', 3) => acc.open(),
                (b'}', 3) => acc.close(),
                _ => {}
            }
            if !ch.is_ascii_whitespace() {
                acc.note_visible();
            }
            if is_eol(ch) && !(ch == b'\r' && styler.char_at(pos + 1) == b'\n') {
                acc.end_line(styler);
            }
        }
        acc.end_line(styler);
    }
}

fn highlighter(text: &str) -> Highlighter {
    Highlighter::new(Arc::new(Words), text).with_keywords(KeywordSets::from_strs(&["fn let"]))
}

#[test]
fn colourise_all_styles_every_byte() {
    let mut hl = highlighter("fn main {\n  let x\n}\n");
    hl.colourise_all();
    assert_eq!(&hl.styles()[..10], &[2, 2, 0, 1, 1, 1, 1, 0, 3, 0]);
    assert_eq!(hl.styles().len(), hl.buffer().len());
}

#[test]
fn edit_restyles_like_a_fresh_pass() {
    let mut hl = highlighter("a b\nc d\ne f\n");
    hl.colourise_all();
    hl.edit(4..5, "let");

    let mut fresh = highlighter("a b\nlet d\ne f\n");
    fresh.colourise_all();
    assert_eq!(hl.buffer().text(), fresh.buffer().text());
    assert_eq!(hl.styles(), fresh.styles());
    assert_eq!(hl.buffer().fold_levels(), fresh.buffer().fold_levels());
}

#[test]
fn fold_all_recomputes_levels_from_styles() {
    let mut hl = highlighter("x {\ny\n}\n");
    hl.colourise_all();
    let levels = hl.buffer().fold_levels().to_vec();
    assert!(levels[0].is_header());
    assert_eq!(levels[1].depth(), 1);
    assert_eq!(levels[2].depth(), 1);

    hl.fold_all();
    assert_eq!(hl.buffer().fold_levels(), levels.as_slice());
}

#[test]
fn colourise_from_restyles_the_tail_only() {
    let mut hl = highlighter("a\nb\nc\n");
    hl.colourise_all();
    let before = hl.styles().to_vec();
    hl.colourise_from(2);
    assert_eq!(hl.styles(), before.as_slice());
}

#[test]
fn registry_resolves_extensions_and_names() {
    let mut registry = LexerRegistry::new();
    assert!(registry.is_empty());
    registry.register(Arc::new(Words));
    assert_eq!(registry.for_extension(".WD").map(|l| l.name()), Some("words"));
    assert_eq!(registry.by_name("Words").map(|l| l.style_bits()), Some(2));
    assert!(registry.for_extension("rs").is_none());
    assert_eq!(registry.names(), vec!["words"]);
}

#[test]
fn properties_feed_lexers() {
    let props = Properties::parse_lines("# folding\nfold.compact = 0\n").unwrap();
    assert_eq!(props.get_int("fold.compact", 1), 0);
    assert!(Properties::parse_lines("no equals sign").is_err());

    let mut buf = TextBuffer::from("{\n\n}\n");
    Words.colourise_document(&mut buf, &props, &KeywordSets::new());
    assert!(!buf.fold_levels()[1].is_white());

    let mut compact = TextBuffer::from("{\n\n}\n");
    Words.colourise_document(&mut compact, &Properties::new(), &KeywordSets::new());
    assert!(compact.fold_levels()[1].is_white());
}
