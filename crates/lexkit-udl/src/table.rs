#![forbid(unsafe_code)]

//! Transition tables: the JSON schema and its validated, compiled form.
//!
//! A table describes one template language as up to five sub-language
//! families sharing a single state machine. Every state belongs to one
//! family; each family owns a contiguous range of style codes, so the style
//! of a byte tells which family produced it.
//!
//! ```json
//! {
//!   "language": "Example",
//!   "families": {
//!     "markup": { "default_state": "IN_M_DEFAULT", "default_style": 0,
//!                 "styles": { "first": 0, "last": 9 } }
//!   },
//!   "states": [
//!     { "name": "IN_M_DEFAULT", "family": "markup",
//!       "transitions": [ { "match": { "string": "<" }, "upto_style": 0,
//!                          "include_style": 1, "new_state": "IN_M_TAG" } ] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use lexkit_core::WordList;
use regex::bytes::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableErrorKind};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Sub-language family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// The host markup (HTML, XML).
    Markup,
    /// Style sheets.
    Css,
    /// Client-side scripting.
    Csl,
    /// Server-side scripting.
    Ssl,
    /// Template directives.
    Tpl,
}

impl Family {
    pub const ALL: [Family; 5] = [Self::Markup, Self::Css, Self::Csl, Self::Ssl, Self::Tpl];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markup => "markup",
            Self::Css => "css",
            Self::Csl => "csl",
            Self::Ssl => "ssl",
            Self::Tpl => "tpl",
        }
    }
}

/// A whole table as written in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub language: String,
    pub families: BTreeMap<Family, FamilySpec>,
    pub states: Vec<StateSpec>,
}

/// Inclusive range of style codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRange {
    pub first: u8,
    pub last: u8,
}

impl StyleRange {
    pub fn contains(self, style: u8) -> bool {
        (self.first..=self.last).contains(&style)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilySpec {
    /// Name of the language this family lexes (for hosts; unused here).
    #[serde(default)]
    pub sublanguage: Option<String>,
    pub default_state: String,
    pub default_style: u8,
    pub styles: StyleRange,
    /// Identifier runs coloured with this style are checked against
    /// `keywords` and promoted to `keyword_style` on a hit.
    #[serde(default)]
    pub identifier_style: Option<u8>,
    #[serde(default)]
    pub keyword_style: Option<u8>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub lookback: Option<LookBackSpec>,
    #[serde(default)]
    pub flippers: Vec<FlipperSpec>,
}

/// What a look-back test concludes about the token it examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookBackAction {
    /// Move further back.
    Skip,
    /// Take the transition.
    Accept,
    /// Try the next transition instead.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LookBackSpec {
    #[serde(default)]
    pub tests: Vec<LookBackTestSpec>,
    /// Action for styles no test decides. Unlisted styles reject.
    #[serde(default)]
    pub defaults: Vec<LookBackDefault>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookBackTestSpec {
    pub style: u8,
    pub action: LookBackAction,
    #[serde(flatten)]
    pub kind: LookBackKindSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LookBackKindSpec {
    /// Every run of the style.
    All,
    /// Runs whose text is one of `words`.
    Keywords { words: Vec<String> },
    /// Runs ending with one of `strings`.
    Strings { strings: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookBackDefault {
    pub style: u8,
    pub action: LookBackAction,
}

/// Text that moves the fold level when found with `style`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipperSpec {
    pub text: String,
    pub style: u8,
    pub direction: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    pub family: Family,
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
    /// Taken once when the pass ends in this state.
    #[serde(default)]
    pub eof: Option<TransitionSpec>,
    /// Taken without consuming anything when no transition matches.
    #[serde(default)]
    pub empty: Option<TransitionSpec>,
}

/// How a transition recognizes its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSpec {
    String(String),
    /// Anchored at the current position, matched against the current line.
    Regex(String),
    /// The delimiter captured by an earlier `set_delimiter`.
    Delimiter,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionSpec {
    /// Absent for `eof` and `empty` transitions.
    #[serde(default, rename = "match")]
    pub pattern: Option<MatchSpec>,
    #[serde(default)]
    pub ignore_case: bool,
    /// Style for the pending run up to the match.
    #[serde(default)]
    pub upto_style: Option<u8>,
    /// Style for the pending run through the end of the match.
    #[serde(default)]
    pub include_style: Option<u8>,
    /// Examine the same position again in the new state.
    #[serde(default)]
    pub redo: bool,
    #[serde(default)]
    pub no_keyword: bool,
    /// Run the family's look-back tests before accepting the match.
    #[serde(default)]
    pub token_check: bool,
    #[serde(default)]
    pub new_state: Option<String>,
    #[serde(default)]
    pub push_state: Option<String>,
    #[serde(default)]
    pub pop_state: bool,
    /// State to enter once the pass crosses the end of the current line.
    #[serde(default)]
    pub eol_state: Option<String>,
    #[serde(default)]
    pub set_delimiter: Option<DelimiterSpec>,
    #[serde(default)]
    pub keep_delimiter: bool,
    #[serde(default)]
    pub clear_delimiter: bool,
}

/// Capture group of a regex match that becomes the pending delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterSpec {
    pub group: usize,
    /// Use the closing bracket of a one-byte opening bracket.
    #[serde(default)]
    pub opposite: bool,
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

/// Index of a state; 1-based so that 0 never names one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(u16);

impl StateId {
    pub fn from_index(index: u16) -> Option<Self> {
        (index != 0).then_some(Self(index))
    }

    pub fn index(self) -> u16 {
        self.0
    }
}

#[derive(Debug)]
pub(crate) enum Matcher {
    Literal(Box<[u8]>),
    Regex(Regex),
    Delimiter,
    /// Used by `eof` and `empty` transitions.
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StackOp {
    None,
    Push(StateId),
    Pop,
}

#[derive(Debug)]
pub(crate) struct Transition {
    pub(crate) matcher: Matcher,
    pub(crate) upto_style: Option<u8>,
    pub(crate) include_style: Option<u8>,
    pub(crate) redo: bool,
    pub(crate) no_keyword: bool,
    pub(crate) token_check: bool,
    pub(crate) new_state: Option<StateId>,
    pub(crate) stack: StackOp,
    pub(crate) eol_state: Option<StateId>,
    pub(crate) set_delimiter: Option<DelimiterSpec>,
    pub(crate) keep_delimiter: bool,
    pub(crate) clear_delimiter: bool,
}

impl Transition {
    /// Pattern text, for diagnostics.
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) fn describe(&self) -> String {
        match &self.matcher {
            Matcher::Literal(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Matcher::Regex(re) => re.as_str().to_owned(),
            Matcher::Delimiter => "<delimiter>".to_owned(),
            Matcher::Always => "<always>".to_owned(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct State {
    pub(crate) name: String,
    pub(crate) family: Family,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) eof: Option<Transition>,
    pub(crate) empty: Option<Transition>,
}

#[derive(Debug)]
pub(crate) enum LookBackKind {
    All,
    Keywords(WordList),
    Strings(Vec<Box<[u8]>>),
}

#[derive(Debug)]
pub(crate) struct LookBackTest {
    pub(crate) style: u8,
    pub(crate) action: LookBackAction,
    pub(crate) kind: LookBackKind,
}

#[derive(Debug)]
pub(crate) struct LookBackTests {
    pub(crate) tests: Vec<LookBackTest>,
    pub(crate) defaults: FxHashMap<u8, LookBackAction>,
}

impl LookBackTests {
    pub(crate) fn default_for(&self, style: u8) -> LookBackAction {
        self.defaults
            .get(&style)
            .copied()
            .unwrap_or(LookBackAction::Reject)
    }
}

#[derive(Debug)]
pub(crate) struct FamilyInfo {
    pub(crate) sublanguage: Option<String>,
    pub(crate) default_state: StateId,
    pub(crate) default_style: u8,
    pub(crate) styles: StyleRange,
    pub(crate) identifier_style: Option<u8>,
    pub(crate) keyword_style: Option<u8>,
    pub(crate) keywords: WordList,
    pub(crate) lookback: Option<LookBackTests>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Flipper {
    pub(crate) text: Box<[u8]>,
    pub(crate) style: u8,
    pub(crate) direction: i32,
}

/// A validated, ready-to-run transition table.
#[derive(Debug)]
pub struct UdlTable {
    language: String,
    families: [Option<FamilyInfo>; 5],
    states: Vec<State>,
    flippers: Vec<Flipper>,
}

impl UdlTable {
    /// Parse and validate a JSON table.
    pub fn from_json(input: &str) -> Result<Self, TableError> {
        let spec: TableSpec = serde_json::from_str(input)?;
        Self::validate(spec)
    }

    /// Check every cross-reference in `spec` and compile its patterns.
    pub fn validate(spec: TableSpec) -> Result<Self, TableError> {
        if spec.states.is_empty() {
            return Err(TableError::new(
                TableErrorKind::Empty,
                format!("{} defines no states", spec.language),
            ));
        }
        if spec.states.len() >= usize::from(u16::MAX) {
            return Err(TableError::new(
                TableErrorKind::BadPattern,
                format!("{} states is more than a table can index", spec.states.len()),
            ));
        }
        if !spec.families.contains_key(&Family::Markup) {
            return Err(TableError::new(
                TableErrorKind::UnknownFamily,
                "the markup family is required: every pass without a resume point starts there",
            ));
        }

        let mut ids: FxHashMap<&str, StateId> = FxHashMap::default();
        for (i, state) in spec.states.iter().enumerate() {
            let id = StateId(i as u16 + 1);
            if ids.insert(state.name.as_str(), id).is_some() {
                return Err(TableError::new(
                    TableErrorKind::DuplicateState,
                    format!("state {} is defined twice", state.name),
                ));
            }
        }
        let resolve = |name: &str, context: &str| -> Result<StateId, TableError> {
            ids.get(name).copied().ok_or_else(|| {
                TableError::new(
                    TableErrorKind::UnknownState,
                    format!("{context} refers to undefined state {name}"),
                )
            })
        };

        let mut families: [Option<FamilyInfo>; 5] = Default::default();
        let mut flippers = Vec::new();
        for (&family, fspec) in &spec.families {
            let default_state = resolve(&fspec.default_state, family.as_str())?;
            let lookback = fspec.lookback.as_ref().map(compile_lookback);
            flippers.extend(fspec.flippers.iter().filter(|f| f.direction != 0 && !f.text.is_empty()).map(
                |f| Flipper {
                    text: f.text.as_bytes().into(),
                    style: f.style,
                    direction: f.direction,
                },
            ));
            families[family.index()] = Some(FamilyInfo {
                sublanguage: fspec.sublanguage.clone(),
                default_state,
                default_style: fspec.default_style,
                styles: fspec.styles,
                identifier_style: fspec.identifier_style,
                keyword_style: fspec.keyword_style,
                keywords: WordList::from_words(&fspec.keywords.join(" ")),
                lookback,
            });
        }
        // By style, then longest text first among texts sharing a prefix.
        flippers.sort_by(|a, b| a.style.cmp(&b.style).then_with(|| b.text.cmp(&a.text)));

        let mut states = Vec::with_capacity(spec.states.len());
        for sspec in &spec.states {
            if families[sspec.family.index()].is_none() {
                return Err(TableError::new(
                    TableErrorKind::UnknownFamily,
                    format!(
                        "state {} belongs to family {}, which the table does not define",
                        sspec.name,
                        sspec.family.as_str()
                    ),
                ));
            }
            let compile = |t: &TransitionSpec, always: bool| compile_transition(t, always, &sspec.name, &resolve);
            states.push(State {
                name: sspec.name.clone(),
                family: sspec.family,
                transitions: sspec
                    .transitions
                    .iter()
                    .map(|t| compile(t, false))
                    .collect::<Result<_, _>>()?,
                eof: sspec.eof.as_ref().map(|t| compile(t, true)).transpose()?,
                empty: sspec.empty.as_ref().map(|t| compile(t, true)).transpose()?,
            });
        }

        Ok(Self {
            language: spec.language,
            families,
            states,
            flippers,
        })
    }

    /// The language id hosts look this table up by.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Index a state's name compiles to, as stored in line state words.
    pub fn state_index(&self, name: &str) -> Option<u16> {
        self.states
            .iter()
            .position(|s| s.name == name)
            .map(|i| i as u16 + 1)
    }

    /// Name of the state with `index`.
    pub fn state_name(&self, index: u16) -> Option<&str> {
        let id = StateId::from_index(index)?;
        self.state(id).map(|s| s.name.as_str())
    }

    /// Families the table defines.
    pub fn families(&self) -> impl Iterator<Item = Family> + '_ {
        Family::ALL
            .into_iter()
            .filter(|f| self.families[f.index()].is_some())
    }

    /// Sub-language name declared for `family`.
    pub fn sublanguage(&self, family: Family) -> Option<&str> {
        self.family(family)?.sublanguage.as_deref()
    }

    pub(crate) fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(usize::from(id.0) - 1)
    }

    pub(crate) fn family(&self, family: Family) -> Option<&FamilyInfo> {
        self.families[family.index()].as_ref()
    }

    /// Where a pass without a resume point starts.
    pub(crate) fn start_state(&self) -> StateId {
        self.family(Family::Markup)
            .map_or(StateId(1), |f| f.default_state)
    }

    /// Family whose style range holds `style`; markup when none does.
    pub fn family_of_style(&self, style: u8) -> Family {
        Family::ALL
            .into_iter()
            .find(|f| self.family(*f).is_some_and(|info| info.styles.contains(style)))
            .unwrap_or(Family::Markup)
    }

    /// Default style of `family`, if the table defines it.
    pub fn default_style(&self, family: Family) -> Option<u8> {
        self.family(family).map(|f| f.default_style)
    }

    pub(crate) fn flippers(&self) -> &[Flipper] {
        &self.flippers
    }
}

fn compile_lookback(spec: &LookBackSpec) -> LookBackTests {
    LookBackTests {
        tests: spec
            .tests
            .iter()
            .map(|t| LookBackTest {
                style: t.style,
                action: t.action,
                kind: match &t.kind {
                    LookBackKindSpec::All => LookBackKind::All,
                    LookBackKindSpec::Keywords { words } => {
                        LookBackKind::Keywords(WordList::from_words(&words.join(" ")))
                    }
                    LookBackKindSpec::Strings { strings } => LookBackKind::Strings(
                        strings
                            .iter()
                            .flat_map(|s| s.split_ascii_whitespace())
                            .map(|s| s.as_bytes().into())
                            .collect(),
                    ),
                },
            })
            .collect(),
        defaults: spec.defaults.iter().map(|d| (d.style, d.action)).collect(),
    }
}

fn compile_transition(
    spec: &TransitionSpec,
    always: bool,
    state: &str,
    resolve: &impl Fn(&str, &str) -> Result<StateId, TableError>,
) -> Result<Transition, TableError> {
    let bad = |message: String| TableError::new(TableErrorKind::BadPattern, message);
    let matcher = match (&spec.pattern, always) {
        (_, true) => Matcher::Always,
        (None, false) => return Err(bad(format!("a transition of {state} has no match"))),
        (Some(MatchSpec::String(s)), false) if s.is_empty() => {
            return Err(bad(format!("empty string match in {state}")));
        }
        (Some(MatchSpec::String(s)), false) => Matcher::Literal(s.as_bytes().into()),
        (Some(MatchSpec::Regex(pattern)), false) => Matcher::Regex(
            RegexBuilder::new(pattern)
                .case_insensitive(spec.ignore_case)
                .build()
                .map_err(|err| bad(format!("/{pattern}/ in {state}: {err}")))?,
        ),
        (Some(MatchSpec::Delimiter), false) => Matcher::Delimiter,
    };
    if let Some(delim) = spec.set_delimiter {
        match &matcher {
            Matcher::Regex(re) if delim.group < re.captures_len() => {}
            Matcher::Regex(re) => {
                return Err(bad(format!(
                    "/{}/ in {state} has no capture group {}",
                    re.as_str(),
                    delim.group
                )));
            }
            _ => return Err(bad(format!("set_delimiter in {state} needs a regex match"))),
        }
    }
    let context = format!("a transition of {state}");
    let new_state = spec
        .new_state
        .as_deref()
        .map(|name| resolve(name, &context))
        .transpose()?;
    let stack = match (&spec.push_state, spec.pop_state) {
        (Some(name), _) => StackOp::Push(resolve(name, &context)?),
        (None, true) => StackOp::Pop,
        (None, false) => StackOp::None,
    };
    let eol_state = spec
        .eol_state
        .as_deref()
        .map(|name| resolve(name, &context))
        .transpose()?;
    Ok(Transition {
        matcher,
        upto_style: spec.upto_style,
        include_style: spec.include_style,
        redo: spec.redo,
        no_keyword: spec.no_keyword,
        token_check: spec.token_check,
        new_state,
        stack,
        eol_state,
        set_delimiter: spec.set_delimiter,
        keep_delimiter: spec.keep_delimiter,
        clear_delimiter: spec.clear_delimiter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../tests/data/minitpl.json");

    fn minimal(states: &str) -> String {
        format!(
            r#"{{"language": "t",
                "families": {{"markup": {{"default_state": "A", "default_style": 0,
                                          "styles": {{"first": 0, "last": 9}}}}}},
                "states": {states}}}"#
        )
    }

    #[test]
    fn sample_table_loads() {
        let table = UdlTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.language(), "MiniTemplate");
        assert_eq!(table.families().collect::<Vec<_>>(), vec![Family::Markup, Family::Ssl]);
        assert_eq!(table.sublanguage(Family::Ssl), Some("Ruby"));
        assert_eq!(table.state_index("IN_M_DEFAULT"), Some(1));
        assert_eq!(table.state_name(1), Some("IN_M_DEFAULT"));
        assert_eq!(table.state_name(0), None);
        assert_eq!(table.family_of_style(44), Family::Ssl);
        assert_eq!(table.family_of_style(200), Family::Markup);
        assert_eq!(table.start_state(), StateId(1));
    }

    #[test]
    fn flippers_sort_by_style_then_longest_first() {
        let table = UdlTable::from_json(SAMPLE).unwrap();
        let keys: Vec<(u8, &[u8])> = table.flippers().iter().map(|f| (f.style, &*f.text)).collect();
        let mut sorted = keys.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)));
        assert_eq!(keys, sorted);
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = UdlTable::from_json("{ not json").unwrap_err();
        assert_eq!(err.kind, TableErrorKind::Json);
        assert!(err.to_string().contains("json"));
    }

    #[test]
    fn empty_state_list_is_rejected() {
        let err = UdlTable::from_json(&minimal("[]")).unwrap_err();
        assert_eq!(err.kind, TableErrorKind::Empty);
    }

    #[test]
    fn unknown_target_state_is_rejected() {
        let json = minimal(
            r#"[{"name": "A", "family": "markup",
                 "transitions": [{"match": {"string": "<"}, "new_state": "NOWHERE"}]}]"#,
        );
        let err = UdlTable::from_json(&json).unwrap_err();
        assert_eq!(err.kind, TableErrorKind::UnknownState);
        assert!(err.message.contains("NOWHERE"));
    }

    #[test]
    fn state_in_undefined_family_is_rejected() {
        let json = minimal(r#"[{"name": "A", "family": "markup"}, {"name": "B", "family": "css"}]"#);
        let err = UdlTable::from_json(&json).unwrap_err();
        assert_eq!(err.kind, TableErrorKind::UnknownFamily);
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let json = minimal(r#"[{"name": "A", "family": "markup"}, {"name": "A", "family": "markup"}]"#);
        assert_eq!(UdlTable::from_json(&json).unwrap_err().kind, TableErrorKind::DuplicateState);
    }

    #[test]
    fn bad_patterns_are_rejected() {
        for transition in [
            r#"{"match": {"regex": "(unclosed"}}"#,
            r#"{"match": {"string": ""}}"#,
            r#"{"match": {"regex": "q(.)"}, "set_delimiter": {"group": 2}}"#,
            r#"{"match": {"string": "q"}, "set_delimiter": {"group": 0}}"#,
            r#"{"upto_style": 1}"#,
        ] {
            let json = minimal(&format!(r#"[{{"name": "A", "family": "markup", "transitions": [{transition}]}}]"#));
            assert_eq!(
                UdlTable::from_json(&json).unwrap_err().kind,
                TableErrorKind::BadPattern,
                "{transition}"
            );
        }
    }

    #[test]
    fn schema_round_trips_through_serde() {
        let spec: TableSpec = serde_json::from_str(SAMPLE).unwrap();
        let again: TableSpec = serde_json::from_str(&serde_json::to_string(&spec).unwrap()).unwrap();
        assert_eq!(spec, again);
    }
}
