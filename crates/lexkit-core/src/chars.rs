#![forbid(unsafe_code)]

//! Byte classification used by every lexer.
//!
//! Lexers work on raw bytes. Anything above 0x7F is treated as part of a
//! (possibly multi-byte) identifier, never as punctuation, so UTF-8 text
//! flows through word states untouched.

use bitflags::bitflags;

/// Line terminator byte (`\r` or `\n`).
#[inline]
pub const fn is_eol(ch: u8) -> bool {
    ch == b'\r' || ch == b'\n'
}

/// Byte outside the 7-bit ASCII range.
#[inline]
pub const fn is_high_bit(ch: u8) -> bool {
    ch > 0x7F
}

/// ASCII letter or underscore.
#[inline]
pub const fn is_safe_alpha(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

/// ASCII letter, digit, or underscore.
#[inline]
pub const fn is_safe_alnum(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

/// Identifier continuation byte, including high-bit bytes.
#[inline]
pub const fn is_word_char(ch: u8) -> bool {
    is_high_bit(ch) || is_safe_alnum(ch)
}

/// Identifier start byte, including high-bit bytes.
#[inline]
pub const fn is_word_start(ch: u8) -> bool {
    is_high_bit(ch) || is_safe_alpha(ch)
}

/// ASCII decimal digit.
#[inline]
pub const fn is_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

/// Space or horizontal tab.
#[inline]
pub const fn is_space_or_tab(ch: u8) -> bool {
    ch == b' ' || ch == b'\t'
}

/// Space, tab, or any of `\n \v \f \r`.
#[inline]
pub const fn is_space(ch: u8) -> bool {
    ch == b' ' || (ch >= 0x09 && ch <= 0x0D)
}

/// Generic operator punctuation shared by the C-family lexers.
#[inline]
pub const fn is_operator(ch: u8) -> bool {
    matches!(
        ch,
        b'%' | b'^'
            | b'&'
            | b'*'
            | b'('
            | b')'
            | b'-'
            | b'+'
            | b'='
            | b'|'
            | b'{'
            | b'}'
            | b'['
            | b']'
            | b':'
            | b';'
            | b'<'
            | b'>'
            | b','
            | b'/'
            | b'?'
            | b'!'
            | b'.'
            | b'~'
    )
}

/// Closing partner of a bracket-like delimiter; any other byte is its own
/// partner.
#[inline]
pub const fn opposite(ch: u8) -> u8 {
    match ch {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        b'<' => b'>',
        other => other,
    }
}

bitflags! {
    /// Character classes a [`CharSet`] can be seeded with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharClass: u8 {
        const LOWER = 0b0001;
        const UPPER = 0b0010;
        const DIGIT = 0b0100;
        /// Every byte above 0x7F.
        const HIGH  = 0b1000;
        const ALPHA = Self::LOWER.bits() | Self::UPPER.bits();
        const ALNUM = Self::ALPHA.bits() | Self::DIGIT.bits();
    }
}

/// A 256-entry byte membership set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CharSet {
    bits: [u64; 4],
}

impl CharSet {
    /// Build a set from character classes plus extra member bytes.
    pub const fn new(classes: CharClass, extra: &[u8]) -> Self {
        let mut set = Self { bits: [0; 4] };
        let mut ch: usize = 0;
        while ch < 256 {
            let b = ch as u8;
            let member = (classes.contains(CharClass::LOWER) && b.is_ascii_lowercase())
                || (classes.contains(CharClass::UPPER) && b.is_ascii_uppercase())
                || (classes.contains(CharClass::DIGIT) && b.is_ascii_digit())
                || (classes.contains(CharClass::HIGH) && b > 0x7F);
            if member {
                set.bits[ch / 64] |= 1 << (ch % 64);
            }
            ch += 1;
        }
        set.with(extra)
    }

    /// Set containing exactly `bytes`.
    pub const fn of(bytes: &[u8]) -> Self {
        Self::new(CharClass::empty(), bytes)
    }

    /// This set plus `extra`.
    pub const fn with(mut self, extra: &[u8]) -> Self {
        let mut i = 0;
        while i < extra.len() {
            let ch = extra[i] as usize;
            self.bits[ch / 64] |= 1 << (ch % 64);
            i += 1;
        }
        self
    }

    #[inline]
    pub const fn contains(&self, ch: u8) -> bool {
        let ch = ch as usize;
        self.bits[ch / 64] & (1 << (ch % 64)) != 0
    }
}

/// ASCII case-insensitive comparison of a byte slice against a literal.
#[inline]
pub fn eq_ignore_case(text: &[u8], literal: &str) -> bool {
    text.eq_ignore_ascii_case(literal.as_bytes())
}
