#![forbid(unsafe_code)]

//! The table-driven lexer.
//!
//! A pass walks the text with one current state. At each position the
//! state's transitions are tried in order; the first whose pattern matches
//! (and whose look-back test, if it asks for one, passes) is taken. Taking
//! a transition may colour the pending run, move past the match, switch
//! state, push or pop a return state, arm a state to enter at the next line
//! end, and capture or consume a delimiter. When nothing matches the
//! position is skipped and stays in the pending run.
//!
//! At every line boundary the pass records a [`UdlLineState`] word for the
//! finished line; a later pass resumes from a line whose word it can trust.

use std::sync::Arc;

use lexkit_core::chars::opposite;
use lexkit_core::{KeywordSets, Lexer, Styler};
use regex::bytes::Regex;
use smallvec::SmallVec;

use crate::fold::fold_udl;
use crate::line_state::UdlLineState;
use crate::registry::UdlRegistry;
use crate::table::{
    DelimiterSpec, Family, LookBackAction, LookBackKind, Matcher, StackOp, StateId, Transition, UdlTable,
};

/// Consecutive passes over one position after which the engine forces its
/// way forward.
pub const REDO_LIMIT: usize = 1000;
/// Candidate lines on which a non-empty state stack rules out resuming.
const NESTED_LINES_TO_SKIP: usize = 24;
/// Longest run checked for keyword promotion.
const MAX_KEYWORD_LEN: usize = 100;
/// Longest run a look-back test examines.
const MAX_LOOKBACK_RUN: usize = 198;

// ---------------------------------------------------------------------------
// Resynchronization
// ---------------------------------------------------------------------------

/// Find a line start at or before `start` to resume from, and the state to
/// resume in.
///
/// Starting one line above `start` and moving up, a line qualifies when its
/// last byte carries the default style of the family its first byte belongs
/// to, and the word recorded for the line above it names a state, has no
/// pending delimiter and, for the first few candidates, no pushed states.
/// Without such a line the pass starts at the top in the markup family's
/// default state.
pub(crate) fn synchronize_doc_start(table: &UdlTable, styler: &Styler<'_>, start: usize) -> (usize, StateId) {
    let fallback = (0, table.start_state());
    let invoked_line = styler.line_of(start);
    if start == 0 || invoked_line < 2 {
        return fallback;
    }
    let mut nested_budget = NESTED_LINES_TO_SKIP;
    let mut candidate = invoked_line - 1;
    while candidate > 0 {
        let line_start = styler.line_start(candidate);
        let last_byte = styler.line_start(candidate + 1) - 1;
        let family = table.family_of_style(styler.style_at(line_start));
        if table.default_style(family) == Some(styler.style_at(last_byte)) {
            let prev = UdlLineState::from_word(styler.line_state(candidate - 1));
            if !prev.has_delimiter() {
                let check_nesting = nested_budget > 0;
                nested_budget = nested_budget.saturating_sub(1);
                let state = StateId::from_index(prev.state).filter(|id| table.state(*id).is_some());
                if let Some(state) = state
                    && !(check_nesting && prev.stack_depth > 0)
                {
                    return (line_start, state);
                }
            }
        }
        candidate -= 1;
    }
    fallback
}

// ---------------------------------------------------------------------------
// Pass
// ---------------------------------------------------------------------------

/// Bytes of the line regexes are matched against, terminator included.
#[derive(Debug, Default)]
struct LineText {
    line: Option<usize>,
    start: usize,
    bytes: Vec<u8>,
}

impl LineText {
    fn load(&mut self, styler: &Styler<'_>, pos: usize) {
        let line = styler.line_of(pos);
        if self.line != Some(line) {
            let next = styler.line_start(line + 1);
            self.line = Some(line);
            self.start = styler.line_start(line);
            self.bytes = if next > self.start {
                styler.text_range(self.start, next - 1)
            } else {
                Vec::new()
            };
        }
    }
}

/// A successful pattern match.
struct Hit {
    end: usize,
    /// Delimiter captured by the match, when the transition asks for one.
    delimiter: Option<Vec<u8>>,
}

struct Pass<'t, 's, 'a> {
    table: &'t UdlTable,
    styler: &'s mut Styler<'a>,
    state: StateId,
    stack: SmallVec<[StateId; 8]>,
    delimiter: Vec<u8>,
    /// State to enter once a transition crosses a line end.
    pending_eol: Option<StateId>,
    /// Whether the transition being acted on stays at its position.
    redo: bool,
    line: LineText,
}

impl<'t> Pass<'t, '_, '_> {
    fn family(&self) -> Family {
        self.table
            .state(self.state)
            .map_or(Family::Markup, |s| s.family)
    }

    fn run(mut self, start: usize, mut end: usize) {
        let table = self.table;
        let total = self.styler.len();
        self.styler.start_at(start);
        self.styler.start_segment(start);
        let mut recorded = self.styler.line_of(start).saturating_sub(1);
        let mut i = start;
        let mut stalls = 0usize;

        loop {
            let line = self.styler.line_of(i);
            if recorded < line {
                for finished in recorded..line {
                    self.record_line(finished, line, total, &mut end);
                }
                recorded = line;
            }
            if i >= end {
                break;
            }
            let Some(state) = table.state(self.state) else {
                break;
            };

            let mut chosen = None;
            for t in &state.transitions {
                if let Some(hit) = self.looking_at(t, i, end)
                    && self.look_back(t, i)
                {
                    if let Some(delimiter) = hit.delimiter {
                        self.delimiter = delimiter;
                    }
                    chosen = Some((t, hit.end));
                    break;
                }
            }
            let chosen = chosen.or_else(|| state.empty.as_ref().map(|t| (t, i)));

            match chosen {
                Some((t, new_pos)) => {
                    let before = i;
                    let forced = stalls >= REDO_LIMIT;
                    if forced {
                        lexkit_core::warn!(
                            pos = i,
                            line = self.styler.line_of(i) + 1,
                            pattern = %t.describe(),
                            "udl redo loop broken"
                        );
                    }
                    self.redo = t.redo && !forced;
                    self.act(t, &mut i, new_pos);
                    if forced && i == before {
                        i += 1;
                    }
                    stalls = if i == before { stalls + 1 } else { 0 };
                }
                None => {
                    i += 1;
                    stalls = 0;
                }
            }
        }

        if let Some(state) = table.state(self.state)
            && let Some(t) = &state.eof
        {
            self.redo = false;
            self.act(t, &mut i, end);
        }
    }

    /// Write the word for `finished`, a line the pass has moved past.
    ///
    /// A changed delimiter on the line just finished stretches the pass to
    /// the end of the current line so the change is seen downstream.
    fn record_line(&mut self, finished: usize, current: usize, total: usize, end: &mut usize) {
        let mut word = UdlLineState::new(usize::from(self.state.index()), self.stack.len());
        if !self.delimiter.is_empty() {
            word = word.with_delimiter(&self.delimiter);
            if finished + 1 == current && word.to_word() != self.styler.line_state(finished) {
                let next = self.styler.line_start(current + 1);
                if *end < next {
                    *end = next.min(total);
                }
            }
        }
        self.styler.set_line_state(finished, word.to_word());
    }

    // -- Matching -----------------------------------------------------------

    fn looking_at(&mut self, t: &Transition, pos: usize, end: usize) -> Option<Hit> {
        match &t.matcher {
            Matcher::Literal(literal) => self.literal_at(literal, pos, end).map(|end| Hit {
                end,
                delimiter: None,
            }),
            Matcher::Regex(re) => self.regex_at(re, t.set_delimiter, pos),
            Matcher::Delimiter => {
                if self.delimiter.is_empty() {
                    return None;
                }
                let hit_end = self.literal_at(&self.delimiter, pos, end)?;
                // Consumed even if the look-back test then rejects.
                if !t.keep_delimiter {
                    self.delimiter.clear();
                }
                Some(Hit {
                    end: hit_end,
                    delimiter: None,
                })
            }
            Matcher::Always => None,
        }
    }

    fn literal_at(&self, literal: &[u8], pos: usize, end: usize) -> Option<usize> {
        (end.saturating_sub(pos) >= literal.len() && self.styler.match_at(pos, literal))
            .then_some(pos + literal.len())
    }

    fn regex_at(&mut self, re: &Regex, capture: Option<DelimiterSpec>, pos: usize) -> Option<Hit> {
        self.line.load(&*self.styler, pos);
        let offset = pos - self.line.start;
        let Some(spec) = capture else {
            let found = re.find_at(&self.line.bytes, offset)?;
            return (found.start() == offset).then_some(Hit {
                end: pos + found.len(),
                delimiter: None,
            });
        };
        let caps = re.captures_at(&self.line.bytes, offset)?;
        let whole = caps.get(0)?;
        if whole.start() != offset {
            return None;
        }
        let delimiter = caps.get(spec.group).and_then(|group| match group.as_bytes() {
            bytes if !spec.opposite => Some(bytes.to_vec()),
            [open] => Some(vec![opposite(*open)]),
            bytes => {
                lexkit_core::debug!(pos, len = bytes.len(), "udl bracket delimiter must be one byte");
                None
            }
        });
        Some(Hit {
            end: pos + whole.len(),
            delimiter,
        })
    }

    /// Decide from the tokens before `pos` whether `t` may be taken.
    ///
    /// Walks back run by run (a run is a stretch of one style) while the
    /// styles stay in the current family. Each run is judged by the first
    /// test for its style that matches it, or by the style's default action.
    fn look_back(&mut self, t: &Transition, pos: usize) -> bool {
        if pos == 0 || !t.token_check {
            return true;
        }
        let table = self.table;
        let Some(info) = table.family(self.family()) else {
            return true;
        };
        // The tests read the styles of everything up to `pos`.
        self.colour(t.upto_style, t.no_keyword, pos);
        let Some(tests) = &info.lookback else {
            return true;
        };

        let mut p = pos - 1;
        while p > 0 {
            let style = self.styler.style_at(p);
            if !info.styles.contains(style) {
                return true;
            }
            let floor = p.saturating_sub(MAX_LOOKBACK_RUN);
            let mut run_start = p;
            while run_start > floor && self.styler.style_at(run_start - 1) == style {
                run_start -= 1;
            }
            let text = self.styler.text_range(run_start, p);

            let mut resume = run_start;
            let mut action = None;
            for test in tests.tests.iter().filter(|test| test.style == style) {
                action = match &test.kind {
                    LookBackKind::All => Some(test.action),
                    LookBackKind::Keywords(words) => words.contains(&text).then_some(test.action),
                    LookBackKind::Strings(strings) => strings.iter().find(|s| text.ends_with(s)).map(|s| {
                        resume = p + 1 - s.len();
                        test.action
                    }),
                };
                if action.is_some() {
                    break;
                }
            }
            match action.unwrap_or_else(|| tests.default_for(style)) {
                LookBackAction::Reject => return false,
                LookBackAction::Accept => return true,
                LookBackAction::Skip if resume == 0 => return true,
                LookBackAction::Skip => p = resume - 1,
            }
        }
        true
    }

    // -- Actions ------------------------------------------------------------

    /// Commit the pending run through `pos - 1` with `style`, promoting
    /// identifiers found in the family's keyword list.
    fn colour(&mut self, style: Option<u8>, no_keyword: bool, pos: usize) {
        let Some(mut style) = style else {
            return;
        };
        if pos == 0 {
            return;
        }
        let table = self.table;
        if !no_keyword
            && let Some(info) = table.family(self.family())
            && info.identifier_style == Some(style)
            && let Some(keyword_style) = info.keyword_style
        {
            let run_start = self.styler.segment_start();
            if pos > run_start
                && pos - run_start <= MAX_KEYWORD_LEN
                && info.keywords.contains(&self.styler.text_range(run_start, pos - 1))
            {
                style = keyword_style;
            }
        }
        self.styler.colour_to(pos - 1, style);
    }

    /// Take transition `t`, matched from `*i` to `new_pos`.
    fn act(&mut self, t: &Transition, i: &mut usize, new_pos: usize) {
        if !t.token_check && *i > 0 {
            self.colour(t.upto_style, t.no_keyword, *i);
        }
        self.colour(t.include_style, t.no_keyword, new_pos);

        let origin = *i;
        if !matches!(t.matcher, Matcher::Always) && !self.redo {
            *i = new_pos;
        }

        // An armed line-end state fires when this match ends the line.
        let mut fired = self.pending_eol;
        if fired.is_some() {
            let origin_line = self.styler.line_of(origin);
            let next_line_start = self.styler.line_start(origin_line + 1);
            if self.styler.line_of(new_pos) > origin_line
                || (origin + 1 >= next_line_start && new_pos >= next_line_start)
            {
                *i = next_line_start;
            } else {
                fired = None;
            }
        }

        if t.clear_delimiter {
            self.delimiter.clear();
        }
        if let Some(target) = t.eol_state {
            match self.pending_eol {
                None => self.pending_eol = Some(target),
                Some(armed) if armed != target => {
                    lexkit_core::debug!(
                        armed = armed.index(),
                        ignored = target.index(),
                        "udl line-end state already armed"
                    );
                }
                Some(_) => {}
            }
        }

        let mut next = None;
        if let Some(target) = fired {
            // Entering the line-end state drops any push this transition asked for.
            next = Some(target);
            self.pending_eol = None;
        } else {
            match t.stack {
                StackOp::Push(state) => self.stack.push(state),
                StackOp::Pop => next = self.stack.pop(),
                StackOp::None => {}
            }
        }
        if let Some(next) = next.or(t.new_state)
            && next != self.state
            && self.table.state(next).is_some()
        {
            let from = self.family();
            self.state = next;
            let to = self.family();
            if from != to {
                lexkit_core::trace!(at = origin, from = from.as_str(), to = to.as_str(), "udl family transition");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// UdlLexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum TableSource {
    Fixed(Arc<UdlTable>),
    Registry(Arc<UdlRegistry>),
}

/// A [`Lexer`] running a transition table.
///
/// Bound either to one table, or to a registry from which each call picks
/// the table named by the first word of keyword list 0. When no table can
/// be found the range is left in style 0.
#[derive(Debug, Clone)]
pub struct UdlLexer {
    source: TableSource,
}

impl UdlLexer {
    pub fn new(table: Arc<UdlTable>) -> Self {
        Self {
            source: TableSource::Fixed(table),
        }
    }

    pub fn with_registry(registry: Arc<UdlRegistry>) -> Self {
        Self {
            source: TableSource::Registry(registry),
        }
    }

    /// The table for a call with `keywords`, or the language id that could
    /// not be resolved.
    fn table_for(&self, keywords: &KeywordSets) -> Result<Arc<UdlTable>, String> {
        match &self.source {
            TableSource::Fixed(table) => Ok(Arc::clone(table)),
            TableSource::Registry(registry) => {
                let language = keywords
                    .get(0)
                    .first()
                    .map(|w| String::from_utf8_lossy(w).into_owned())
                    .unwrap_or_default();
                registry.get(&language).ok_or(language)
            }
        }
    }
}

impl Lexer for UdlLexer {
    fn name(&self) -> &'static str {
        "udl"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn word_list_descriptions(&self) -> &'static [&'static str] {
        &["Template language table"]
    }

    fn lex(&self, start: usize, length: usize, _init_style: u8, keywords: &KeywordSets, styler: &mut Styler<'_>) {
        let end = (start + length).min(styler.len());
        let table = match self.table_for(keywords) {
            Ok(table) => table,
            Err(_language) => {
                lexkit_core::warn!(language = %_language, "no udl table for language; leaving text unstyled");
                if end > start {
                    styler.start_at(start);
                    styler.start_segment(start);
                    styler.colour_to(end - 1, 0);
                }
                return;
            }
        };
        let (sync_start, state) = synchronize_doc_start(&table, styler, start);
        if sync_start != start {
            lexkit_core::trace!(
                requested = start,
                resumed = sync_start,
                state = table.state_name(state.index()).unwrap_or("?"),
                "udl resync"
            );
        }
        let _span =
            lexkit_core::debug_span!("udl", language = table.language(), start, length, resumed = sync_start).entered();
        if end <= sync_start {
            return;
        }
        Pass {
            table: &table,
            styler,
            state,
            stack: SmallVec::new(),
            delimiter: Vec::new(),
            pending_eol: None,
            redo: false,
            line: LineText::default(),
        }
        .run(sync_start, end);
    }

    fn fold(&self, start: usize, length: usize, _init_style: u8, keywords: &KeywordSets, styler: &mut Styler<'_>) {
        if let Ok(table) = self.table_for(keywords) {
            fold_udl(&table, start, length, styler);
        }
    }
}
