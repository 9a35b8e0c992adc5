#![forbid(unsafe_code)]

//! The rope handle and the contract shared by every node shape.
//!
//! A [`Rope`] is a cheap, clonable, thread-safe handle to an immutable node.
//! Nodes come in three shapes (see [`RopeShape`]): leaves that own a byte
//! buffer, concatenations of two child ropes, and substrings viewing a byte
//! range of one child rope. Children are shared, never copied, so one subtree
//! may appear under any number of parents.
//!
//! The only state written after construction is the flattened-byte cell.
//! Publishing into it is idempotent: whichever thread wins, every thread
//! observes byte-identical content.
//!
//! # Example
//! ```
//! use frankenrope_core::{CodeRange, Encoding, Rope};
//!
//! let hello = Rope::from("héllo");
//! let world = Rope::from(" world");
//! let joined = hello.concat(&world);
//!
//! assert_eq!(joined.byte_len(), 12);
//! assert_eq!(joined.char_len(), 11);
//! assert_eq!(joined.code_range(), CodeRange::Valid);
//! assert_eq!(joined.encoding(), Encoding::Utf8);
//! assert!(joined.raw_bytes().is_none());
//! assert_eq!(joined.flattened_bytes(), "héllo world".as_bytes());
//! assert!(joined.raw_bytes().is_some());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHasher;

use crate::code_range::CodeRange;
use crate::encoding::{Encoding, Scanner};
use crate::error::{RopeError, Transition};
use crate::flatten::{self, Chunks};
use crate::leaf::LeafKind;

/// Handle to an immutable rope node.
#[derive(Clone)]
pub struct Rope {
    pub(crate) node: Arc<RopeNode>,
}

pub(crate) struct RopeNode {
    pub(crate) encoding: Encoding,
    pub(crate) code_range: CodeRange,
    pub(crate) byte_len: usize,
    pub(crate) char_len: usize,
    pub(crate) depth: usize,
    /// Flattened bytes. Set at construction for leaves, lazily for the rest.
    pub(crate) bytes: OnceLock<Arc<[u8]>>,
    hash: OnceLock<u64>,
    pub(crate) kind: RopeKind,
}

#[derive(Clone)]
pub(crate) enum RopeKind {
    Leaf(LeafKind),
    Concat {
        left: Rope,
        right: Rope,
        balanced: bool,
    },
    Substring {
        child: Rope,
        byte_offset: usize,
    },
}

impl RopeKind {
    /// Move child handles onto `stack`, leaving a childless placeholder.
    fn take_children(&mut self, stack: &mut Vec<Rope>) {
        if matches!(self, Self::Leaf(_)) {
            return;
        }
        match std::mem::replace(self, Self::Leaf(LeafKind::Valid)) {
            Self::Concat { left, right, .. } => {
                stack.push(left);
                stack.push(right);
            }
            Self::Substring { child, .. } => stack.push(child),
            Self::Leaf(_) => {}
        }
    }
}

impl Drop for RopeNode {
    // Unlinks uniquely owned descendants one at a time so that dropping a
    // deep chain never recurses.
    fn drop(&mut self) {
        let mut stack = Vec::new();
        self.kind.take_children(&mut stack);
        while let Some(rope) = stack.pop() {
            if let Some(mut node) = Arc::into_inner(rope.node) {
                node.kind.take_children(&mut stack);
            }
        }
    }
}

/// Borrowed view of a node's shape.
#[derive(Debug, Clone, Copy)]
pub enum RopeShape<'a> {
    /// A materialized buffer.
    Leaf(LeafKind),
    /// Logical join of two ropes.
    Concat {
        left: &'a Rope,
        right: &'a Rope,
        balanced: bool,
    },
    /// Byte-range view of one rope.
    Substring { child: &'a Rope, byte_offset: usize },
}

impl Rope {
    pub(crate) fn from_parts(
        encoding: Encoding,
        code_range: CodeRange,
        byte_len: usize,
        char_len: usize,
        depth: usize,
        bytes: Option<Arc<[u8]>>,
        kind: RopeKind,
    ) -> Rope {
        debug_assert!(
            code_range != CodeRange::AsciiOnly || byte_len == char_len,
            "ASCII-only rope must have byte_len == char_len ({byte_len} != {char_len})"
        );
        debug_assert!(bytes.as_ref().is_none_or(|b| b.len() == byte_len));
        let bytes = match bytes {
            Some(bytes) => OnceLock::from(bytes),
            None => OnceLock::new(),
        };
        Rope {
            node: Arc::new(RopeNode {
                encoding,
                code_range,
                byte_len,
                char_len,
                depth,
                bytes,
                hash: OnceLock::new(),
                kind,
            }),
        }
    }

    /// Number of bytes.
    #[inline]
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.node.byte_len
    }

    /// Number of characters under [`Rope::encoding`].
    #[inline]
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.node.char_len
    }

    /// Longest path from this node to a leaf. Leaves have depth 0.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.node.depth
    }

    /// Encoding tag.
    #[inline]
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.node.encoding
    }

    /// Code range tag.
    #[inline]
    #[must_use]
    pub fn code_range(&self) -> CodeRange {
        self.node.code_range
    }

    /// Whether the rope has no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node.byte_len == 0
    }

    /// Whether the rope is tagged ASCII-only.
    #[inline]
    #[must_use]
    pub fn is_ascii_only(&self) -> bool {
        self.node.code_range == CodeRange::AsciiOnly
    }

    /// Shape of this node.
    #[must_use]
    pub fn shape(&self) -> RopeShape<'_> {
        match &self.node.kind {
            RopeKind::Leaf(kind) => RopeShape::Leaf(*kind),
            RopeKind::Concat {
                left,
                right,
                balanced,
            } => RopeShape::Concat {
                left,
                right,
                balanced: *balanced,
            },
            RopeKind::Substring { child, byte_offset } => RopeShape::Substring {
                child,
                byte_offset: *byte_offset,
            },
        }
    }

    /// Whether the subtree satisfies the depth-balance criterion.
    ///
    /// Leaves are always balanced, concatenations carry the flag computed at
    /// construction, substrings inherit it from their child.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        let mut node = self;
        loop {
            match &node.node.kind {
                RopeKind::Leaf(_) => return true,
                RopeKind::Concat { balanced, .. } => return *balanced,
                RopeKind::Substring { child, .. } => node = child,
            }
        }
    }

    /// Whether both handles point at the same node.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Rope) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// The flattened bytes if they are already materialized.
    ///
    /// Always `Some` for leaves. Never computes anything.
    #[inline]
    #[must_use]
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        self.node.bytes.get().map(|bytes| &bytes[..])
    }

    pub(crate) fn raw_arc(&self) -> Option<Arc<[u8]>> {
        self.node.bytes.get().cloned()
    }

    /// The full contiguous byte content, materialized and cached on first use.
    ///
    /// Safe to call from many threads at once: racing computations produce
    /// identical bytes and the first published buffer is the one every caller
    /// sees afterwards.
    #[must_use]
    pub fn flattened_bytes(&self) -> &[u8] {
        if let Some(bytes) = self.node.bytes.get() {
            return bytes;
        }
        let computed = match &self.node.kind {
            RopeKind::Substring { child, byte_offset } => {
                crate::substring::flatten_substring(self, child, *byte_offset)
            }
            _ => flatten::flatten(self),
        };
        let published = self.node.bytes.get_or_init(|| Arc::clone(&computed));
        if !Arc::ptr_eq(published, &computed) {
            tracing::trace!(byte_len = self.byte_len(), "flatten publish lost race");
        }
        published
    }

    /// The byte at `index`.
    ///
    /// Uses the cached buffer when present, otherwise walks down the tree in
    /// O(depth) without materializing anything.
    ///
    /// # Panics
    /// Panics if `index >= self.byte_len()`.
    #[must_use]
    pub fn byte_at(&self, index: usize) -> u8 {
        if index >= self.byte_len() {
            let err = RopeError::IndexOutOfBounds {
                index,
                len: self.byte_len(),
            };
            panic!("{err}");
        }
        flatten::byte_at(self, index)
    }

    /// The byte at `index`, or `None` when out of range.
    #[must_use]
    pub fn get_byte(&self, index: usize) -> Option<u8> {
        (index < self.byte_len()).then(|| flatten::byte_at(self, index))
    }

    /// Iterator over the contiguous byte slices making up the rope, in order.
    #[must_use]
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks::new(self, 0, self.byte_len())
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// Only the covered pieces are visited; nothing is cached.
    pub fn copy_range_into(&self, offset: usize, dst: &mut [u8]) -> Result<(), RopeError> {
        self.check_range(offset, dst.len())?;
        let mut written = 0;
        for chunk in Chunks::new(self, offset, dst.len()) {
            dst[written..written + chunk.len()].copy_from_slice(chunk);
            written += chunk.len();
        }
        debug_assert_eq!(written, dst.len());
        Ok(())
    }

    pub(crate) fn check_range(&self, offset: usize, len: usize) -> Result<(), RopeError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.byte_len() => Ok(()),
            _ => Err(RopeError::RangeOutOfBounds {
                offset,
                len,
                byte_len: self.byte_len(),
            }),
        }
    }

    /// Content decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.flattened_bytes()).into_owned()
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Reinterpret an ASCII-only rope under `encoding`, keeping its bytes.
    ///
    /// # Panics
    /// Panics unless `self.code_range()` is [`CodeRange::AsciiOnly`].
    #[must_use]
    pub fn with_encoding_7bit(&self, encoding: Encoding) -> Rope {
        match self.try_with_encoding_7bit(encoding) {
            Ok(rope) => rope,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible form of [`Rope::with_encoding_7bit`].
    pub fn try_with_encoding_7bit(&self, encoding: Encoding) -> Result<Rope, RopeError> {
        let required = Transition::Encoding7bit.required();
        if self.code_range() != required {
            return Err(RopeError::IllegalTransition {
                transition: Transition::Encoding7bit,
                code_range: self.code_range(),
            });
        }
        debug_assert!(
            encoding.is_ascii_compatible(),
            "{encoding} cannot carry ASCII-only content"
        );
        Ok(self.retag(encoding, required, self.char_len()))
    }

    /// Reinterpret a valid rope as binary: one character per byte.
    ///
    /// # Panics
    /// Panics unless `self.code_range()` is [`CodeRange::Valid`].
    #[must_use]
    pub fn with_binary_encoding(&self) -> Rope {
        match self.try_with_binary_encoding() {
            Ok(rope) => rope,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible form of [`Rope::with_binary_encoding`].
    pub fn try_with_binary_encoding(&self) -> Result<Rope, RopeError> {
        let required = Transition::BinaryEncoding.required();
        if self.code_range() != required {
            return Err(RopeError::IllegalTransition {
                transition: Transition::BinaryEncoding,
                code_range: self.code_range(),
            });
        }
        Ok(self.retag(Encoding::Binary, required, self.byte_len()))
    }

    /// Reclassify a node tagged [`CodeRange::Unknown`] or [`CodeRange::Broken`]
    /// by scanning its bytes piece by piece.
    ///
    /// Returns `self` unchanged when the tags already match the content.
    #[must_use]
    pub fn resolve_code_range(&self) -> Rope {
        if self.code_range().is_good() {
            return self.clone();
        }
        let mut scanner = Scanner::new(self.encoding());
        for chunk in self.chunks() {
            scanner.feed(chunk);
        }
        let result = scanner.finish();
        tracing::trace!(
            from = %self.code_range(),
            to = %result.code_range,
            char_len = result.char_len,
            "code range resolved"
        );
        if result.code_range == self.code_range() && result.char_len == self.char_len() {
            return self.clone();
        }
        self.retag(self.encoding(), result.code_range, result.char_len)
    }

    /// Same shape, same children, same cached bytes, new tags.
    pub(crate) fn retag(&self, encoding: Encoding, code_range: CodeRange, char_len: usize) -> Rope {
        let kind = match &self.node.kind {
            RopeKind::Leaf(_) => {
                let leaf = LeafKind::for_code_range(code_range);
                debug_assert!(
                    leaf != LeafKind::AsciiOnly
                        || crate::encoding::is_ascii_only(self.flattened_bytes(), encoding),
                    "MBC string incorrectly marked as ASCII-only"
                );
                RopeKind::Leaf(leaf)
            }
            other => other.clone(),
        };
        Rope::from_parts(
            encoding,
            code_range,
            self.byte_len(),
            char_len,
            self.depth(),
            self.raw_arc(),
            kind,
        )
    }

    /// One leaf over the flattened bytes, keeping this rope's tags.
    ///
    /// Reuses the cached buffer, so a rope that was already flattened costs
    /// no copy. Unresolved tags are classified by scanning.
    pub(crate) fn to_leaf(&self) -> Rope {
        if matches!(self.node.kind, RopeKind::Leaf(_)) {
            return self.clone();
        }
        let _ = self.flattened_bytes();
        let bytes = self
            .raw_arc()
            .unwrap_or_else(|| Arc::from(self.flattened_bytes()));
        let code_range = self.code_range();
        if !code_range.is_resolved() {
            return Rope::from_bytes(bytes, self.encoding());
        }
        Rope::from_parts(
            self.encoding(),
            code_range,
            self.byte_len(),
            self.char_len(),
            0,
            Some(bytes),
            RopeKind::Leaf(LeafKind::for_code_range(code_range)),
        )
    }

    /// Content hash over encoding and bytes, memoized.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        *self.node.hash.get_or_init(|| {
            let mut hasher = FxHasher::default();
            self.encoding().hash(&mut hasher);
            hasher.write(self.flattened_bytes());
            hasher.finish()
        })
    }
}

impl PartialEq for Rope {
    /// Equal iff encodings match and the byte content is identical. Shape is
    /// irrelevant.
    fn eq(&self, other: &Rope) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.encoding() != other.encoding() || self.byte_len() != other.byte_len() {
            return false;
        }
        if let (Some(a), Some(b)) = (self.node.hash.get(), other.node.hash.get())
            && a != b
        {
            return false;
        }
        flatten::chunks_eq(self.chunks(), other.chunks())
    }
}

impl Eq for Rope {}

impl Hash for Rope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &self.node.kind {
            RopeKind::Leaf(kind) => kind.as_str(),
            RopeKind::Concat { .. } => "concat",
            RopeKind::Substring { .. } => "substring",
        };
        f.debug_struct("Rope")
            .field("shape", &shape)
            .field("encoding", &self.encoding())
            .field("code_range", &self.code_range())
            .field("byte_len", &self.byte_len())
            .field("char_len", &self.char_len())
            .field("depth", &self.depth())
            .finish()
    }
}
