//! Benchmarks for full and incremental lexing.
//!
//! Run with: cargo bench -p lexkit-lexers

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lexkit_core::{Highlighter, Lexer, Properties, TextBuffer};
use lexkit_lexers::{
    CoffeeScriptLexer, CssLexer, PerlLexer, RubyLexer, TclLexer, XsltLexer, default_keywords,
};

// =============================================================================
// Test Data
// =============================================================================

const RUBY_UNIT: &str = "class Greeter\n  def greet(name)\n    puts \"Hello, #{name}!\" # say it\n    \
    %w(a b c).each { |x| x =~ /x+/ }\n    <<~EOS\n      body #{name}\n    EOS\n  end\nend\n";

const PERL_UNIT: &str = "sub greet {\n    my ($name) = @_;\n    print \"Hello, $name\\n\";\n    \
    my @w = qw(a b c);\n    $name =~ s/x+/y/g;\n    return { key => $name };\n}\n";

const CSS_UNIT: &str = "a.link:hover, #main > p {\n  color: red;\n  margin: 0 12px !important;\n}\n\
    /* comment */\n@media screen { .x { width: 50%; } }\n";

const TCL_UNIT: &str = "proc greet {name} {\n    puts \"Hello, $name\"\n    set l [lsort -integer $::nums]\n    \
    # done\n}\n";

const XML_UNIT: &str = "<xsl:template match=\"/\">\n  <p class=\"x\">text &amp; more</p>\n  \
    <!-- note -->\n  <xsl:value-of select=\"name\"/>\n</xsl:template>\n";

const COFFEE_UNIT: &str = "class Greeter\n  greet: (name) ->\n    # say it\n    console.log \"Hello, #{name}\"\n    \
    return /x+/.test name\n";

fn repeated(unit: &str, copies: usize) -> String {
    unit.repeat(copies)
}

fn cases() -> Vec<(&'static str, Arc<dyn Lexer>, &'static str)> {
    vec![
        ("ruby", Arc::new(RubyLexer), RUBY_UNIT),
        ("perl", Arc::new(PerlLexer), PERL_UNIT),
        ("css", Arc::new(CssLexer), CSS_UNIT),
        ("tcl", Arc::new(TclLexer), TCL_UNIT),
        ("xslt", Arc::new(XsltLexer), XML_UNIT),
        ("coffeescript", Arc::new(CoffeeScriptLexer), COFFEE_UNIT),
    ]
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_full_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_document");
    let props = Properties::new();

    for (name, lexer, unit) in cases() {
        let text = repeated(unit, 200);
        let keywords = default_keywords(name).unwrap_or_default();
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| {
                let mut buf = TextBuffer::from(text.as_str());
                lexer.colourise_document(&mut buf, &props, &keywords);
                black_box(buf.styles().len())
            })
        });
    }

    group.finish();
}

fn bench_edit_near_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("edit_near_end");

    for (name, lexer, unit) in cases() {
        let text = repeated(unit, 200);
        let keywords = default_keywords(name).unwrap_or_default();
        let mut live = Highlighter::new(lexer, text.as_str()).with_keywords(keywords);
        live.colourise_all();
        let at = text.len() - unit.len() / 2;

        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                live.edit(at..at, " ");
                live.edit(at..at + 1, "");
                black_box(live.styles().len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_document, bench_edit_near_end);
criterion_main!(benches);
