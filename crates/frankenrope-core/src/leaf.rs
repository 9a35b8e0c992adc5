#![forbid(unsafe_code)]

//! Leaf nodes: directly owned, already materialized byte buffers.
//!
//! Three leaf policies exist, fixed by the caller at construction and checked
//! against the content in debug builds:
//!
//! - [`LeafKind::AsciiOnly`]: every byte is below 0x80 under an
//!   ASCII-compatible encoding; `char_len == byte_len`.
//! - [`LeafKind::Valid`]: well-formed under the encoding; `char_len` comes
//!   from an encoding-aware scan.
//! - [`LeafKind::Invalid`]: contains at least one ill-formed sequence; the
//!   caller supplies `char_len`.
//!
//! A leaf's `raw_bytes()` is always `Some`, and `flattened_bytes()` is the
//! identity.

use std::sync::Arc;

use crate::code_range::CodeRange;
use crate::encoding::{self, Encoding};
use crate::rope::{Rope, RopeKind};

/// Content policy of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    /// 7-bit content.
    AsciiOnly,
    /// Well-formed, possibly multi-byte content.
    Valid,
    /// Content with at least one invalid sequence.
    Invalid,
}

impl LeafKind {
    /// Code range implied by this leaf kind.
    #[must_use]
    pub const fn code_range(self) -> CodeRange {
        match self {
            Self::AsciiOnly => CodeRange::AsciiOnly,
            Self::Valid => CodeRange::Valid,
            Self::Invalid => CodeRange::Broken,
        }
    }

    pub(crate) fn for_code_range(code_range: CodeRange) -> LeafKind {
        match code_range {
            CodeRange::AsciiOnly => Self::AsciiOnly,
            CodeRange::Valid => Self::Valid,
            CodeRange::Broken => Self::Invalid,
            CodeRange::Unknown => unreachable!("leaves are always classified"),
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::AsciiOnly => "ascii_leaf",
            Self::Valid => "valid_leaf",
            Self::Invalid => "invalid_leaf",
        }
    }
}

fn leaf(bytes: Arc<[u8]>, encoding: Encoding, kind: LeafKind, char_len: usize) -> Rope {
    Rope::from_parts(
        encoding,
        kind.code_range(),
        bytes.len(),
        char_len,
        0,
        Some(bytes),
        RopeKind::Leaf(kind),
    )
}

impl Rope {
    /// Leaf asserted to be ASCII-only under `encoding`.
    ///
    /// The assertion is verified in debug builds.
    #[must_use]
    pub fn ascii_only_leaf(bytes: impl Into<Arc<[u8]>>, encoding: Encoding) -> Rope {
        let bytes = bytes.into();
        debug_assert!(
            encoding::is_ascii_only(&bytes, encoding),
            "MBC string incorrectly marked as ASCII-only"
        );
        let char_len = bytes.len();
        leaf(bytes, encoding, LeafKind::AsciiOnly, char_len)
    }

    /// Leaf asserted to be well-formed under `encoding`; the character length
    /// is computed by scanning.
    #[must_use]
    pub fn valid_leaf(bytes: impl Into<Arc<[u8]>>, encoding: Encoding) -> Rope {
        let bytes = bytes.into();
        let scanned = encoding::scan(&bytes, encoding);
        debug_assert!(
            scanned.code_range != CodeRange::Broken,
            "broken string incorrectly marked as valid"
        );
        leaf(bytes, encoding, LeafKind::Valid, scanned.char_len)
    }

    /// Leaf asserted to contain an invalid sequence under `encoding`, with a
    /// caller-supplied character length.
    ///
    /// The assertion is verified in debug builds.
    #[must_use]
    pub fn invalid_leaf(bytes: impl Into<Arc<[u8]>>, encoding: Encoding, char_len: usize) -> Rope {
        let bytes = bytes.into();
        debug_assert!(
            encoding::is_invalid(&bytes, encoding),
            "valid string incorrectly marked as broken"
        );
        leaf(bytes, encoding, LeafKind::Invalid, char_len)
    }

    /// Leaf with every tag supplied by the caller.
    ///
    /// An [`CodeRange::Unknown`] tag is resolved immediately by scanning,
    /// since the bytes are at hand; in that case `char_len` must agree with
    /// the scan.
    #[must_use]
    pub fn leaf(
        bytes: impl Into<Arc<[u8]>>,
        encoding: Encoding,
        code_range: CodeRange,
        char_len: usize,
    ) -> Rope {
        let bytes = bytes.into();
        match code_range {
            CodeRange::AsciiOnly => {
                debug_assert_eq!(char_len, bytes.len());
                Rope::ascii_only_leaf(bytes, encoding)
            }
            CodeRange::Valid => {
                debug_assert_eq!(
                    encoding::scan(&bytes, encoding).char_len,
                    char_len,
                    "character length disagrees with content"
                );
                debug_assert!(!encoding::is_invalid(&bytes, encoding));
                leaf(bytes, encoding, LeafKind::Valid, char_len)
            }
            CodeRange::Broken => Rope::invalid_leaf(bytes, encoding, char_len),
            CodeRange::Unknown => {
                let rope = Rope::from_bytes(bytes, encoding);
                debug_assert_eq!(rope.char_len(), char_len);
                rope
            }
        }
    }

    /// Leaf classified by scanning `bytes` under `encoding`.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, encoding: Encoding) -> Rope {
        let bytes = bytes.into();
        let scanned = encoding::scan(&bytes, encoding);
        leaf(
            bytes,
            encoding,
            LeafKind::for_code_range(scanned.code_range),
            scanned.char_len,
        )
    }

    /// Empty leaf.
    #[must_use]
    pub fn empty(encoding: Encoding) -> Rope {
        Rope::from_bytes(Vec::new(), encoding)
    }
}

impl From<&str> for Rope {
    fn from(value: &str) -> Self {
        Rope::from_bytes(value.as_bytes(), Encoding::Utf8)
    }
}

impl From<String> for Rope {
    fn from(value: String) -> Self {
        Rope::from_bytes(value.into_bytes(), Encoding::Utf8)
    }
}

impl From<Vec<u8>> for Rope {
    /// Binary leaf.
    fn from(value: Vec<u8>) -> Self {
        Rope::from_bytes(value, Encoding::Binary)
    }
}

impl From<&[u8]> for Rope {
    /// Binary leaf.
    fn from(value: &[u8]) -> Self {
        Rope::from_bytes(value, Encoding::Binary)
    }
}
