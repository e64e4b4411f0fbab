#![forbid(unsafe_code)]

//! Here-document bookkeeping shared by the Perl and Ruby lexers.

/// Longest delimiter a here-document may declare.
pub const MAX_DELIMITER_LEN: usize = 255;

/// Where the scanner is inside a here-document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HereDocPhase {
    /// No here-document in progress.
    #[default]
    Idle,
    /// `<<` was accepted; the next byte decides quoting and indentation.
    Introduced,
    /// Collecting the delimiter text.
    Delimiter,
    /// Inside the body, looking for the terminator line.
    Body,
}

/// A pending or active here-document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HereDoc {
    pub phase: HereDocPhase,
    /// Byte that followed `<<`.
    pub quote: u8,
    /// The delimiter was written inside quotes.
    pub quoted: bool,
    /// The terminator may be preceded by whitespace (`<<-`).
    pub indentable: bool,
    /// The introducing statement ended with `;` on the delimiter line.
    pub has_semicolon: bool,
    delimiter: Vec<u8>,
}

/// The delimiter outgrew [`MAX_DELIMITER_LEN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterOverflow;

impl HereDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a here-document after an accepted `<<`.
    pub fn introduce(&mut self) {
        self.phase = HereDocPhase::Introduced;
        self.quoted = false;
        self.indentable = false;
        self.has_semicolon = false;
        self.delimiter.clear();
    }

    /// Drop any here-document in progress.
    pub fn finish(&mut self) {
        self.phase = HereDocPhase::Idle;
        self.has_semicolon = false;
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// Append one delimiter byte.
    pub fn push(&mut self, ch: u8) -> Result<(), DelimiterOverflow> {
        if self.delimiter.len() >= MAX_DELIMITER_LEN {
            return Err(DelimiterOverflow);
        }
        self.delimiter.push(ch);
        Ok(())
    }

    /// Whether the delimiter reached its maximum length.
    pub fn is_full(&self) -> bool {
        self.delimiter.len() >= MAX_DELIMITER_LEN
    }

    pub fn is_active(&self) -> bool {
        self.phase != HereDocPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn introduce_clears_previous_delimiter() {
        let mut doc = HereDoc::new();
        doc.introduce();
        doc.push(b'E').unwrap();
        doc.indentable = true;
        doc.introduce();
        assert_eq!(doc.delimiter(), b"");
        assert!(!doc.indentable);
        assert_eq!(doc.phase, HereDocPhase::Introduced);
    }

    #[test]
    fn delimiter_is_bounded() {
        let mut doc = HereDoc::new();
        for _ in 0..MAX_DELIMITER_LEN {
            doc.push(b'x').unwrap();
        }
        assert!(doc.is_full());
        assert_eq!(doc.push(b'x'), Err(DelimiterOverflow));
        assert_eq!(doc.delimiter().len(), MAX_DELIMITER_LEN);
    }
}
