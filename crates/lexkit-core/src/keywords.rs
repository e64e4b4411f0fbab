#![forbid(unsafe_code)]

//! Keyword sets handed to lexers by their host.

/// An immutable set of words, queried at token boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordList {
    words: Vec<Box<[u8]>>,
    ignore_case: bool,
}

impl WordList {
    pub const fn empty() -> Self {
        Self {
            words: Vec::new(),
            ignore_case: false,
        }
    }

    /// Build a case-sensitive list from whitespace-separated words.
    pub fn from_words(words: &str) -> Self {
        Self::build(words.split_ascii_whitespace(), false)
    }

    /// Build a list whose lookups ignore ASCII case.
    pub fn from_words_ignore_case(words: &str) -> Self {
        Self::build(words.split_ascii_whitespace(), true)
    }

    fn build<'a>(words: impl Iterator<Item = &'a str>, ignore_case: bool) -> Self {
        let mut words: Vec<Box<[u8]>> = words
            .map(|w| {
                if ignore_case {
                    w.to_ascii_lowercase().into_bytes().into_boxed_slice()
                } else {
                    w.as_bytes().into()
                }
            })
            .collect();
        words.sort_unstable();
        words.dedup();
        Self { words, ignore_case }
    }

    pub fn contains(&self, word: &[u8]) -> bool {
        if self.ignore_case {
            let lowered = word.to_ascii_lowercase();
            self.words.binary_search_by(|w| (**w).cmp(&lowered[..])).is_ok()
        } else {
            self.words.binary_search_by(|w| (**w).cmp(word)).is_ok()
        }
    }

    pub fn contains_str(&self, word: &str) -> bool {
        self.contains(word.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// First word of the list in sorted order.
    pub fn first(&self) -> Option<&[u8]> {
        self.words.first().map(AsRef::as_ref)
    }
}

static EMPTY: WordList = WordList::empty();

/// Ordered keyword lists for one lexer invocation.
///
/// Each lexer documents what every index means through
/// [`Lexer::word_list_descriptions`](crate::lexer::Lexer::word_list_descriptions).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSets {
    lists: Vec<WordList>,
}

impl KeywordSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build case-sensitive lists, one per string.
    pub fn from_strs(lists: &[&str]) -> Self {
        Self {
            lists: lists.iter().map(|l| WordList::from_words(l)).collect(),
        }
    }

    pub fn push(&mut self, list: WordList) {
        self.lists.push(list);
    }

    pub fn set(&mut self, index: usize, list: WordList) {
        if index >= self.lists.len() {
            self.lists.resize_with(index + 1, WordList::default);
        }
        self.lists[index] = list;
    }

    /// List at `index`; an empty list when none was supplied.
    pub fn get(&self, index: usize) -> &WordList {
        self.lists.get(index).unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_exact() {
        let list = WordList::from_words("if else  end\nclass");
        assert_eq!(list.len(), 4);
        assert!(list.contains(b"if"));
        assert!(list.contains_str("class"));
        assert!(!list.contains(b"IF"));
        assert!(!list.contains(b"i"));
    }

    #[test]
    fn ignore_case_lists() {
        let list = WordList::from_words_ignore_case("Color margin");
        assert!(list.contains(b"COLOR"));
        assert!(list.contains(b"margin"));
    }

    #[test]
    fn missing_sets_are_empty() {
        let mut sets = KeywordSets::from_strs(&["a b"]);
        assert!(sets.get(0).contains(b"a"));
        assert!(sets.get(3).is_empty());
        sets.set(2, WordList::from_words("z"));
        assert_eq!(sets.len(), 3);
        assert!(sets.get(1).is_empty());
        assert!(sets.get(2).contains(b"z"));
    }
}
