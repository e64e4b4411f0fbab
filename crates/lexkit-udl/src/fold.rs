#![forbid(unsafe_code)]

//! Folding by flippers: texts that open or close a fold when they appear in
//! a given style.

use lexkit_core::chars::is_eol;
use lexkit_core::{FoldAccumulator, Styler};

use crate::table::{Flipper, UdlTable};

/// Net fold change of the bytes `start..end`.
pub(crate) fn line_fold_change(flippers: &[Flipper], styler: &Styler<'_>, start: usize, end: usize) -> i32 {
    let mut change = 0;
    let mut pos = start;
    while pos < end {
        let style = styler.style_at(pos);
        let first = flippers.partition_point(|f| f.style < style);
        let hit = flippers[first..]
            .iter()
            .take_while(|f| f.style == style)
            .find(|f| {
                pos + f.text.len() <= end
                    && styler.match_at(pos, &f.text)
                    && (pos..pos + f.text.len()).all(|p| styler.style_at(p) == style)
            });
        match hit {
            Some(flipper) => {
                change += flipper.direction;
                pos += flipper.text.len();
            }
            None => pos += 1,
        }
    }
    change
}

/// Fold the lines covering `start..start + length`.
pub(crate) fn fold_udl(table: &UdlTable, start: usize, length: usize, styler: &mut Styler<'_>) {
    let compact = styler.property_int("fold.compact", 1) != 0;
    let end = (start + length).min(styler.len());
    let first_line = styler.line_of(start);
    let last_line = styler.line_of(end);
    let mut acc = FoldAccumulator::resume(styler, styler.line_start(first_line), compact);

    for line in first_line..=last_line {
        let line_start = styler.line_start(line);
        let next = styler.line_start(line + 1);
        let change = line_fold_change(table.flippers(), styler, line_start, next);
        acc.adjust(change);
        if (line_start..next).any(|p| !matches!(styler.char_at(p), b' ' | b'\t') && !is_eol(styler.char_at(p))) {
            acc.note_visible();
        }
        acc.end_line(styler);
    }
    acc.finish(styler);
}
