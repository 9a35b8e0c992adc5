#![forbid(unsafe_code)]

//! Errors returned by the fallible rope entry points.
//!
//! The panicking entry points ([`crate::Rope::byte_at`],
//! [`crate::Rope::substring`], the transitions) treat these conditions as
//! caller bugs. The `try_*`/`get_*` twins report them instead.

use std::fmt;

use crate::code_range::CodeRange;

/// Encoding transition that was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Re-tag an ASCII-only rope with another ASCII-compatible encoding.
    Encoding7bit,
    /// Re-tag a valid rope as binary.
    BinaryEncoding,
}

impl Transition {
    /// Code range the transition requires.
    #[must_use]
    pub const fn required(self) -> CodeRange {
        match self {
            Self::Encoding7bit => CodeRange::AsciiOnly,
            Self::BinaryEncoding => CodeRange::Valid,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding7bit => f.write_str("with_encoding_7bit"),
            Self::BinaryEncoding => f.write_str("with_binary_encoding"),
        }
    }
}

/// Rope contract violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RopeError {
    /// Single-byte index outside `0..len`.
    IndexOutOfBounds { index: usize, len: usize },
    /// Byte range `offset..offset + len` not contained in `0..byte_len`.
    RangeOutOfBounds {
        offset: usize,
        len: usize,
        byte_len: usize,
    },
    /// Transition attempted on a rope with the wrong code range.
    IllegalTransition {
        transition: Transition,
        code_range: CodeRange,
    },
}

impl fmt::Display for RopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "byte index {index} out of range for rope of length {len}")
            }
            Self::RangeOutOfBounds {
                offset,
                len,
                byte_len,
            } => write!(
                f,
                "byte range {offset}+{len} out of range for rope of length {byte_len}"
            ),
            Self::IllegalTransition {
                transition,
                code_range,
            } => match transition {
                Transition::Encoding7bit => write!(
                    f,
                    "{transition} must only be called for ASCII-only ropes (got {code_range})"
                ),
                Transition::BinaryEncoding => write!(
                    f,
                    "{transition} must only be called for valid ropes (got {code_range})"
                ),
            },
        }
    }
}

impl std::error::Error for RopeError {}
