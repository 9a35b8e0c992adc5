#![forbid(unsafe_code)]

//! Character encodings and the incremental code-range scanner.
//!
//! The runtime tags every rope with one [`Encoding`]. Classification of raw
//! bytes into a [`CodeRange`] plus a character count is done by [`Scanner`],
//! which accepts input in arbitrary chunks so that a rope can be classified
//! leaf by leaf without first materializing its bytes.
//!
//! # Character counting for broken content
//! Each maximal ill-formed subsequence counts as one character: the same unit
//! a lossy decoder would replace with U+FFFD. In US-ASCII every byte >= 0x80
//! is one (broken) character. In UTF-16LE a lone surrogate or a dangling odd
//! byte is one (broken) character.
//!
//! # Example
//! ```
//! use frankenrope_core::{CodeRange, Encoding, encoding::Scanner};
//!
//! let mut scanner = Scanner::new(Encoding::Utf8);
//! scanner.feed(b"h\xC3");
//! scanner.feed(b"\xA9llo");
//! let result = scanner.finish();
//! assert_eq!(result.code_range, CodeRange::Valid);
//! assert_eq!(result.char_len, 5);
//! ```

use std::fmt;

use crate::code_range::CodeRange;

/// Character encoding attached to a rope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// 7-bit ASCII. Bytes >= 0x80 are invalid.
    UsAscii,
    /// Raw bytes (ASCII-8BIT). Every byte is one valid character.
    Binary,
    /// UTF-8.
    Utf8,
    /// ISO-8859-1 (Latin-1). Every byte is one valid character.
    Iso8859_1,
    /// UTF-16, little endian. Not ASCII-compatible.
    Utf16Le,
}

impl Encoding {
    /// All supported encodings.
    pub const ALL: [Encoding; 5] = [
        Encoding::UsAscii,
        Encoding::Binary,
        Encoding::Utf8,
        Encoding::Iso8859_1,
        Encoding::Utf16Le,
    ];

    /// Canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UsAscii => "US-ASCII",
            Self::Binary => "ASCII-8BIT",
            Self::Utf8 => "UTF-8",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::Utf16Le => "UTF-16LE",
        }
    }

    /// Parse a name or common alias (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|enc| enc.name().eq_ignore_ascii_case(value))
            .or_else(|| match value.to_ascii_lowercase().as_str() {
                "ascii" => Some(Self::UsAscii),
                "binary" => Some(Self::Binary),
                "utf8" => Some(Self::Utf8),
                "latin1" | "latin-1" => Some(Self::Iso8859_1),
                "utf16le" => Some(Self::Utf16Le),
                _ => None,
            })
    }

    /// Whether ASCII bytes mean ASCII characters in this encoding.
    #[inline]
    #[must_use]
    pub const fn is_ascii_compatible(self) -> bool {
        !matches!(self, Self::Utf16Le)
    }

    /// Encoding of the concatenation of two sequences, if one exists.
    ///
    /// Equal encodings are always compatible. Otherwise both must be
    /// ASCII-compatible and at least one side must be ASCII-only: an
    /// ASCII-only right side keeps the left encoding, an ASCII-only left side
    /// adopts the right one.
    #[must_use]
    pub fn compatible(
        left: Encoding,
        left_range: CodeRange,
        right: Encoding,
        right_range: CodeRange,
    ) -> Option<Encoding> {
        if left == right {
            return Some(left);
        }
        if !left.is_ascii_compatible() || !right.is_ascii_compatible() {
            return None;
        }
        if right_range == CodeRange::AsciiOnly {
            return Some(left);
        }
        if left_range == CodeRange::AsciiOnly {
            return Some(right);
        }
        None
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of classifying a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    /// Resolved classification (never [`CodeRange::Unknown`]).
    pub code_range: CodeRange,
    /// Number of characters, counting broken units per the module policy.
    pub char_len: usize,
}

/// Incremental classifier.
///
/// Feed chunks in order with [`Scanner::feed`], then call
/// [`Scanner::finish`]. Multi-byte sequences may straddle chunk boundaries.
#[derive(Debug, Clone)]
pub struct Scanner {
    encoding: Encoding,
    chars: usize,
    high_bytes: bool,
    broken: bool,
    // UTF-8: continuation bytes still expected, and the accepted range for the next one.
    need: u8,
    lower: u8,
    upper: u8,
    // UTF-16LE: first byte of an incomplete code unit, and a pending high surrogate.
    odd_byte: Option<u8>,
    high_surrogate: bool,
}

impl Scanner {
    /// Create a scanner for `encoding`.
    #[must_use]
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            chars: 0,
            high_bytes: false,
            broken: false,
            need: 0,
            lower: 0x80,
            upper: 0xBF,
            odd_byte: None,
            high_surrogate: false,
        }
    }

    /// Consume the next chunk of input.
    pub fn feed(&mut self, chunk: &[u8]) {
        match self.encoding {
            Encoding::Binary | Encoding::Iso8859_1 => {
                self.chars += chunk.len();
                if !self.high_bytes && !chunk.is_ascii() {
                    self.high_bytes = true;
                }
            }
            Encoding::UsAscii => {
                self.chars += chunk.len();
                if !chunk.is_ascii() {
                    self.high_bytes = true;
                    self.broken = true;
                }
            }
            Encoding::Utf8 => {
                if self.need == 0 && chunk.is_ascii() {
                    self.chars += chunk.len();
                    return;
                }
                for &byte in chunk {
                    self.feed_utf8(byte);
                }
            }
            Encoding::Utf16Le => {
                for &byte in chunk {
                    match self.odd_byte.take() {
                        Some(low) => self.feed_utf16_unit(u16::from(low) | (u16::from(byte) << 8)),
                        None => self.odd_byte = Some(byte),
                    }
                }
            }
        }
    }

    fn feed_utf8(&mut self, byte: u8) {
        if byte >= 0x80 {
            self.high_bytes = true;
        }
        if self.need > 0 {
            if (self.lower..=self.upper).contains(&byte) {
                self.need -= 1;
                self.lower = 0x80;
                self.upper = 0xBF;
                if self.need == 0 {
                    self.chars += 1;
                }
                return;
            }
            // The pending prefix is a maximal ill-formed subsequence; `byte`
            // starts afresh.
            self.chars += 1;
            self.broken = true;
            self.need = 0;
            self.lower = 0x80;
            self.upper = 0xBF;
        }
        let (need, lower, upper) = match byte {
            0x00..=0x7F => {
                self.chars += 1;
                return;
            }
            0xC2..=0xDF => (1, 0x80, 0xBF),
            0xE0 => (2, 0xA0, 0xBF),
            0xE1..=0xEC | 0xEE..=0xEF => (2, 0x80, 0xBF),
            0xED => (2, 0x80, 0x9F),
            0xF0 => (3, 0x90, 0xBF),
            0xF1..=0xF3 => (3, 0x80, 0xBF),
            0xF4 => (3, 0x80, 0x8F),
            _ => {
                self.chars += 1;
                self.broken = true;
                return;
            }
        };
        self.need = need;
        self.lower = lower;
        self.upper = upper;
    }

    fn feed_utf16_unit(&mut self, unit: u16) {
        self.high_bytes = true;
        if self.high_surrogate {
            self.high_surrogate = false;
            self.chars += 1;
            if (0xDC00..=0xDFFF).contains(&unit) {
                return;
            }
            self.broken = true;
        }
        match unit {
            0xD800..=0xDBFF => self.high_surrogate = true,
            0xDC00..=0xDFFF => {
                self.chars += 1;
                self.broken = true;
            }
            _ => self.chars += 1,
        }
    }

    /// Finish scanning and return the classification.
    #[must_use]
    pub fn finish(mut self) -> ScanResult {
        if self.need > 0 {
            self.chars += 1;
            self.broken = true;
        }
        if self.high_surrogate {
            self.chars += 1;
            self.broken = true;
        }
        if self.odd_byte.is_some() {
            self.chars += 1;
            self.broken = true;
        }
        let code_range = if self.broken {
            CodeRange::Broken
        } else if self.encoding.is_ascii_compatible() && !self.high_bytes {
            CodeRange::AsciiOnly
        } else {
            CodeRange::Valid
        };
        ScanResult {
            code_range,
            char_len: self.chars,
        }
    }
}

/// Classify a contiguous buffer.
#[must_use]
pub fn scan(bytes: &[u8], encoding: Encoding) -> ScanResult {
    let mut scanner = Scanner::new(encoding);
    scanner.feed(bytes);
    scanner.finish()
}

/// Whether `bytes` are ASCII-only under `encoding`.
#[inline]
#[must_use]
pub fn is_ascii_only(bytes: &[u8], encoding: Encoding) -> bool {
    encoding.is_ascii_compatible() && bytes.is_ascii()
}

/// Whether `bytes` contain at least one invalid sequence under `encoding`.
#[must_use]
pub fn is_invalid(bytes: &[u8], encoding: Encoding) -> bool {
    scan(bytes, encoding).code_range == CodeRange::Broken
}
