#![forbid(unsafe_code)]

//! Code range classification.
//!
//! Every rope node carries a [`CodeRange`] describing how its bytes relate to
//! its encoding. The two "good" states ([`CodeRange::AsciiOnly`] and
//! [`CodeRange::Valid`]) unlock fast paths such as O(1) character indexing and
//! cheap encoding transitions; [`CodeRange::Broken`] disables them;
//! [`CodeRange::Unknown`] has not been classified yet.

use std::fmt;

/// Validity classification of a byte sequence under an encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodeRange {
    /// Not yet classified. Must be resolved before fast paths are taken.
    #[default]
    Unknown,
    /// Every byte is below 0x80 and the encoding is ASCII-compatible.
    AsciiOnly,
    /// Well-formed under the encoding, may contain multi-byte characters.
    Valid,
    /// Contains at least one sequence that is invalid under the encoding.
    Broken,
}

impl CodeRange {
    /// All classifications, in declaration order.
    pub const ALL: [CodeRange; 4] = [
        CodeRange::Unknown,
        CodeRange::AsciiOnly,
        CodeRange::Valid,
        CodeRange::Broken,
    ];

    /// Whether this classification enables the well-formed fast paths.
    #[inline]
    #[must_use]
    pub const fn is_good(self) -> bool {
        matches!(self, Self::AsciiOnly | Self::Valid)
    }

    /// Whether the content has been classified at all.
    #[inline]
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Classification of the concatenation of two sequences that share a
    /// compatible encoding.
    ///
    /// | left \ right | Unknown | AsciiOnly | Valid   | Broken |
    /// |--------------|---------|-----------|---------|--------|
    /// | Unknown      | Unknown | Unknown   | Unknown | Broken |
    /// | AsciiOnly    | Unknown | AsciiOnly | Valid   | Broken |
    /// | Valid        | Unknown | Valid     | Valid   | Broken |
    /// | Broken       | Broken  | Broken    | Broken  | Broken |
    ///
    /// Broken halves of a split character stay Broken here; the result is an
    /// upper bound that [`crate::Rope::resolve_code_range`] can tighten.
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Broken, _) | (_, Self::Broken) => Self::Broken,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (Self::AsciiOnly, Self::AsciiOnly) => Self::AsciiOnly,
            _ => Self::Valid,
        }
    }

    /// Short lowercase label used in logs and debug output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::AsciiOnly => "7bit",
            Self::Valid => "valid",
            Self::Broken => "broken",
        }
    }
}

impl fmt::Display for CodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
