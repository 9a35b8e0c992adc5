#![forbid(unsafe_code)]

//! Substring nodes: byte-range views of a child rope.
//!
//! [`Rope::substring`] descends through concatenations and nested views
//! while the requested range fits inside one child, so the resulting node
//! points at the smallest subtree that covers the range. Slicing a slice
//! therefore never grows depth beyond one level over the covering node.

use std::sync::Arc;

use crate::code_range::CodeRange;
use crate::encoding::{Encoding, Scanner};
use crate::error::RopeError;
use crate::flatten::{self, Chunks};
use crate::rope::{Rope, RopeKind};

impl Rope {
    /// Substring node with caller-supplied tags (makeSubstring).
    ///
    /// # Panics
    /// Panics if `byte_offset + byte_len` exceeds `child.byte_len()`.
    #[must_use]
    pub fn new_substring(
        child: Rope,
        encoding: Encoding,
        byte_offset: usize,
        byte_len: usize,
        char_len: usize,
        code_range: CodeRange,
    ) -> Rope {
        if let Err(err) = child.check_range(byte_offset, byte_len) {
            panic!("{err}");
        }
        let depth = child.depth() + 1;
        Rope::from_parts(
            encoding,
            code_range,
            byte_len,
            char_len,
            depth,
            None,
            RopeKind::Substring { child, byte_offset },
        )
    }

    /// View of `len` bytes starting at `offset`.
    ///
    /// The slice keeps this rope's encoding; its code range and character
    /// length are derived from the covered bytes without materializing them.
    ///
    /// # Panics
    /// Panics if the range is not contained in `0..self.byte_len()`.
    ///
    /// # Example
    /// ```
    /// use frankenrope_core::Rope;
    ///
    /// let rope = Rope::from("héllo").concat(&Rope::from(" world"));
    /// let slice = rope.substring(4, 3);
    /// assert_eq!(slice.flattened_bytes(), b"lo ");
    /// assert!(slice.is_ascii_only());
    /// ```
    #[must_use]
    pub fn substring(&self, offset: usize, len: usize) -> Rope {
        match self.try_substring(offset, len) {
            Ok(rope) => rope,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible form of [`Rope::substring`].
    pub fn try_substring(&self, offset: usize, len: usize) -> Result<Rope, RopeError> {
        self.check_range(offset, len)?;
        if offset == 0 && len == self.byte_len() {
            return Ok(self.clone());
        }
        if len == 0 {
            return Ok(Rope::empty(self.encoding()));
        }

        let (target, target_offset) = covering_node(self, offset, len);
        if target_offset == 0
            && len == target.byte_len()
            && target.encoding() == self.encoding()
            && target.code_range().is_resolved()
        {
            return Ok(target.clone());
        }

        let (code_range, char_len) = if self.is_ascii_only() {
            (CodeRange::AsciiOnly, len)
        } else {
            let mut scanner = Scanner::new(self.encoding());
            for chunk in Chunks::new(self, offset, len) {
                scanner.feed(chunk);
            }
            let scanned = scanner.finish();
            (scanned.code_range, scanned.char_len)
        };

        Ok(Rope::new_substring(
            target.clone(),
            self.encoding(),
            target_offset,
            len,
            char_len,
            code_range,
        ))
    }
}

/// Smallest node under `rope` containing `offset..offset + len`, with the
/// offset translated into that node's coordinates.
fn covering_node(rope: &Rope, mut offset: usize, len: usize) -> (&Rope, usize) {
    let mut node = rope;
    loop {
        match &node.node.kind {
            RopeKind::Concat { left, right, .. } => {
                let left_len = left.byte_len();
                if offset + len <= left_len {
                    node = left;
                } else if offset >= left_len {
                    offset -= left_len;
                    node = right;
                } else {
                    return (node, offset);
                }
            }
            RopeKind::Substring { child, byte_offset } => {
                offset += byte_offset;
                node = child;
            }
            RopeKind::Leaf(_) => return (node, offset),
        }
    }
}

/// Flatten a substring node, copying straight out of the child's buffer when
/// it is already materialized.
pub(crate) fn flatten_substring(rope: &Rope, child: &Rope, byte_offset: usize) -> Arc<[u8]> {
    match child.raw_bytes() {
        Some(bytes) => Arc::from(&bytes[byte_offset..byte_offset + rope.byte_len()]),
        None => flatten::flatten(rope),
    }
}
