#![forbid(unsafe_code)]

//! The per-line state word.
//!
//! At the end of every line the engine records where it stands so a later
//! pass can resume at the next line. The record is persisted as one `i32`
//! with this layout:
//!
//! ```text
//!  31   30..24        23..12           11..0
//! [ 0 | stack depth | delimiter hash | state ]
//! ```
//!
//! A zero delimiter hash means no delimiter was pending. The hash cannot
//! give the delimiter back, so lines carrying one are never used as resume
//! points; it only lets a pass notice that the delimiter changed.

const STATE_MASK: u32 = 0xFFF;
const DELIMITER_MASK: u32 = 0xFFF;
const DEPTH_MASK: u32 = 0x7F;
const DELIMITER_SHIFT: u32 = 12;
const DEPTH_SHIFT: u32 = 24;

/// Engine state at the end of a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UdlLineState {
    /// State index (12 bits). 0 never names a state.
    pub state: u16,
    /// Number of pushed states (7 bits).
    pub stack_depth: u8,
    /// Hash of the pending delimiter (12 bits), 0 when none.
    pub delimiter_hash: u16,
}

impl UdlLineState {
    /// Record `state` with `stack_depth` pushed states.
    ///
    /// A state index too large for its field is stored as `0xFFF` with the
    /// depth bumped, so the line is never trusted as a resume point. The
    /// depth saturates at `0x7F`.
    pub fn new(state: usize, stack_depth: usize) -> Self {
        let (state, stack_depth) = if state > STATE_MASK as usize {
            (STATE_MASK as usize, stack_depth + 1)
        } else {
            (state, stack_depth)
        };
        Self {
            state: state as u16,
            stack_depth: stack_depth.min(DEPTH_MASK as usize) as u8,
            delimiter_hash: 0,
        }
    }

    /// Mark `delimiter` as pending. Empty delimiters leave the hash at 0.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: &[u8]) -> Self {
        if !delimiter.is_empty() {
            let hash = simple_hash(DELIMITER_MASK, delimiter) & DELIMITER_MASK;
            self.delimiter_hash = hash.max(1) as u16;
        }
        self
    }

    pub fn has_delimiter(self) -> bool {
        self.delimiter_hash != 0
    }

    /// Pack into the persisted word.
    pub fn to_word(self) -> i32 {
        let word = (u32::from(self.stack_depth) & DEPTH_MASK) << DEPTH_SHIFT
            | (u32::from(self.delimiter_hash) & DELIMITER_MASK) << DELIMITER_SHIFT
            | (u32::from(self.state) & STATE_MASK);
        word as i32
    }

    /// Unpack a persisted word. Bits outside the three fields are ignored.
    pub fn from_word(word: i32) -> Self {
        let word = word as u32;
        Self {
            state: (word & STATE_MASK) as u16,
            stack_depth: ((word >> DEPTH_SHIFT) & DEPTH_MASK) as u8,
            delimiter_hash: ((word >> DELIMITER_SHIFT) & DELIMITER_MASK) as u16,
        }
    }
}

/// Cheap order-sensitive hash of `bytes`, folded to stay near `max_val`.
///
/// Bits above `max_val` are shifted down in pairs until the lowest one is
/// set and then merged back in; callers still mask the result.
pub fn simple_hash(max_val: u32, bytes: &[u8]) -> u32 {
    let mut h: u32 = 0;
    for &b in bytes {
        h = h.wrapping_add((h << 1) ^ u32::from(b));
        if h > max_val {
            let mut diff = h & !max_val;
            while diff != 0 && diff & 1 == 0 {
                diff >>= 2;
            }
            h = (h & max_val) | diff;
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn packs_fields_into_their_bit_ranges() {
        let word = UdlLineState {
            state: 0x123,
            stack_depth: 5,
            delimiter_hash: 0x456,
        }
        .to_word();
        assert_eq!(word, (5 << 24) | (0x456 << 12) | 0x123);
        assert_eq!(UdlLineState::from_word(word).state, 0x123);
        assert_eq!(UdlLineState::from_word(word).stack_depth, 5);
        assert_eq!(UdlLineState::from_word(word).delimiter_hash, 0x456);
    }

    #[test]
    fn oversized_state_saturates_and_bumps_depth() {
        let line = UdlLineState::new(0x1000, 0);
        assert_eq!(line.state, 0xFFF);
        assert_eq!(line.stack_depth, 1);
        assert_eq!(UdlLineState::new(3, 500).stack_depth, 0x7F);
    }

    #[test]
    fn hash_of_short_delimiters() {
        assert_eq!(simple_hash(0xFFF, b"}"), 125);
        assert_eq!(simple_hash(0xFFF, b"]]"), 324);
        assert_eq!(simple_hash(0xFFF, b""), 0);
    }

    #[test]
    fn pending_delimiter_always_sets_a_hash() {
        let line = UdlLineState::new(2, 0).with_delimiter(b"END_OF_THE_HEREDOC_BODY");
        assert!(line.has_delimiter());
        assert!(line.delimiter_hash <= 0xFFF);
        assert!(!UdlLineState::new(2, 0).with_delimiter(b"").has_delimiter());
    }

    proptest! {
        #[test]
        fn words_unpack_to_what_was_packed(state in 0u16..0x1000, depth in 0u8..0x80, hash in 0u16..0x1000) {
            let line = UdlLineState { state, stack_depth: depth, delimiter_hash: hash };
            prop_assert_eq!(UdlLineState::from_word(line.to_word()), line);
            prop_assert!(line.to_word() >= 0);
        }
    }
}
