#![forbid(unsafe_code)]

//! Flatten and byte-access engine.
//!
//! Every algorithm here walks the tree with an explicit stack or a loop, never
//! with native recursion, so a pathological chain of a million unbalanced
//! concatenations costs heap, not call stack.
//!
//! Whenever a node on the way down already has materialized bytes (a leaf, or
//! any node whose flattened cache is populated) the walk stops there and
//! slices that buffer directly.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::rope::{Rope, RopeKind};

/// A pending piece of work: `len` bytes of `node` starting at `offset`.
#[derive(Clone, Copy)]
struct Frame<'a> {
    node: &'a Rope,
    offset: usize,
    len: usize,
}

/// Iterator over the contiguous byte slices covering a range of a rope.
///
/// Slices come out in byte order; empty slices are never yielded.
#[derive(Clone)]
pub struct Chunks<'a> {
    stack: SmallVec<[Frame<'a>; 16]>,
}

impl<'a> Chunks<'a> {
    pub(crate) fn new(rope: &'a Rope, offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= rope.byte_len());
        let mut stack = SmallVec::new();
        stack.push(Frame {
            node: rope,
            offset,
            len,
        });
        Self { stack }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        while let Some(Frame { node, offset, len }) = self.stack.pop() {
            if len == 0 {
                continue;
            }
            if let Some(bytes) = node.raw_bytes() {
                return Some(&bytes[offset..offset + len]);
            }
            match &node.node.kind {
                RopeKind::Concat { left, right, .. } => {
                    let left_len = left.byte_len();
                    let end = offset + len;
                    // Right first so that the left piece is popped next.
                    if end > left_len {
                        let start = offset.max(left_len);
                        self.stack.push(Frame {
                            node: right,
                            offset: start - left_len,
                            len: end - start,
                        });
                    }
                    if offset < left_len {
                        self.stack.push(Frame {
                            node: left,
                            offset,
                            len: left_len.min(end) - offset,
                        });
                    }
                }
                RopeKind::Substring { child, byte_offset } => self.stack.push(Frame {
                    node: child,
                    offset: offset + byte_offset,
                    len,
                }),
                RopeKind::Leaf(_) => unreachable!("leaf nodes are always materialized"),
            }
        }
        None
    }
}

/// Materialize `rope` into a fresh buffer.
pub(crate) fn flatten(rope: &Rope) -> Arc<[u8]> {
    let mut buf = Vec::with_capacity(rope.byte_len());
    let mut pieces = 0usize;
    for chunk in Chunks::new(rope, 0, rope.byte_len()) {
        buf.extend_from_slice(chunk);
        pieces += 1;
    }
    debug_assert_eq!(buf.len(), rope.byte_len());
    tracing::trace!(
        byte_len = rope.byte_len(),
        depth = rope.depth(),
        pieces,
        "rope flattened"
    );
    Arc::from(buf)
}

/// Single byte lookup, descending in a loop. Caller checks bounds.
pub(crate) fn byte_at(rope: &Rope, mut index: usize) -> u8 {
    let mut node = rope;
    loop {
        if let Some(bytes) = node.raw_bytes() {
            return bytes[index];
        }
        match &node.node.kind {
            RopeKind::Concat { left, right, .. } => {
                let left_len = left.byte_len();
                if index < left_len {
                    node = left;
                } else {
                    index -= left_len;
                    node = right;
                }
            }
            RopeKind::Substring { child, byte_offset } => {
                index += byte_offset;
                node = child;
            }
            RopeKind::Leaf(_) => unreachable!("leaf nodes are always materialized"),
        }
    }
}

/// Compare two chunk streams of equal total length byte for byte.
pub(crate) fn chunks_eq(mut a: Chunks<'_>, mut b: Chunks<'_>) -> bool {
    let mut left: &[u8] = &[];
    let mut right: &[u8] = &[];
    loop {
        if left.is_empty() {
            left = a.next().unwrap_or_default();
        }
        if right.is_empty() {
            right = b.next().unwrap_or_default();
        }
        if left.is_empty() || right.is_empty() {
            return left.is_empty() && right.is_empty();
        }
        let n = left.len().min(right.len());
        if left[..n] != right[..n] {
            return false;
        }
        left = &left[n..];
        right = &right[n..];
    }
}
