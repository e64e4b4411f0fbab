//! End-to-end use of the facade: pick a lexer, style, edit, restyle.

use std::sync::Arc;

use lexkit::prelude::*;
use lexkit::{highlighter_for, registry_with_templates, template_highlighter};

const MINITPL: &str = include_str!("../../lexkit-udl/tests/data/minitpl.json");

fn templates() -> Arc<UdlRegistry> {
    let mut registry = UdlRegistry::new();
    registry.load_json(MINITPL).unwrap();
    Arc::new(registry)
}

#[test]
fn every_builtin_extension_highlights() {
    let registry = lexkit::default_registry();
    for (ext, text) in [
        ("rb", "def a\n  1\nend\n"),
        ("pl", "my $x = 1;\n"),
        ("css", "a { color: red; }\n"),
        ("tcl", "set x 1\n"),
        ("xsl", "<xsl:if test=\"a\"/>\n"),
        ("coffee", "x = 1\n"),
    ] {
        let mut hl = highlighter_for(&registry, ext, text).unwrap();
        hl.colourise_all();
        assert_eq!(hl.styles().len(), text.len(), "{ext}");
        assert!(hl.styles().iter().any(|&s| s != 0), "{ext} left everything default");
    }
}

#[test]
fn edits_keep_ruby_styles_consistent() {
    let registry = lexkit::default_registry();
    let mut hl = highlighter_for(&registry, "ruby", "x = 1\ny = 2\n").unwrap();
    hl.colourise_all();
    hl.edit(6..6, "s = <<EOS\nbody\nEOS\n");

    let mut fresh = highlighter_for(&registry, "ruby", "x = 1\ns = <<EOS\nbody\nEOS\ny = 2\n").unwrap();
    fresh.colourise_all();
    assert_eq!(hl.styles(), fresh.styles());
}

#[test]
fn template_tables_run_through_the_registry() {
    let templates = templates();
    let registry = registry_with_templates(Arc::clone(&templates));
    let udl = registry.by_name("udl").unwrap();

    let mut buf = TextBuffer::from("<p><% if x %></p>");
    udl.colourise_document(&mut buf, &Properties::new(), &KeywordSets::from_strs(&["MiniTemplate"]));
    assert_eq!(&buf.styles()[..3], &[1, 2, 6]);
    assert_eq!(&buf.styles()[6..8], &[43, 43]);
}

#[test]
fn template_edit_restyles_across_lines() {
    let templates = templates();
    let mut hl = template_highlighter(&templates, "MiniTemplate", "<p>\n<% x %>\n<i>\n").unwrap();
    hl.colourise_all();
    // Opening a string that spans the rest of the document.
    hl.edit(7..7, "q{");
    let styles_after = hl.styles().to_vec();

    let mut fresh = template_highlighter(&templates, "MiniTemplate", "<p>\n<% q{x %>\n<i>\n").unwrap();
    fresh.colourise_all();
    assert_eq!(styles_after, fresh.styles());
    assert!(styles_after[7..].iter().all(|&s| s == 44));
}

#[test]
fn unknown_template_language_is_an_error() {
    let err = template_highlighter(&templates(), "Nope", "x").unwrap_err();
    assert!(matches!(err, Error::UnknownLanguage(_)));
}
