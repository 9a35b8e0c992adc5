#![forbid(unsafe_code)]

//! Concatenation nodes and the depth-balance criterion.
//!
//! A concat node joins two ropes without copying either. Its lengths are the
//! sums of its children's, its depth is one more than the deeper child, and
//! its code range follows [`CodeRange::combine`] unless the encodings cannot
//! be reconciled, in which case the result is [`CodeRange::Broken`].
//!
//! The `balanced` flag is computed once at construction from a
//! [`BalancePolicy`]. Nothing here acts on it; owners such as
//! [`crate::RopeBuilder`] read it to decide when to rebuild.

use crate::code_range::CodeRange;
use crate::encoding::Encoding;
use crate::rope::{Rope, RopeKind};

/// Default multiplier on `bit_length(byte_len)` for the depth bound.
pub const DEFAULT_BALANCE_FACTOR: usize = 2;

/// Number of significant bits in `n`, at least 1.
#[inline]
const fn bit_length(n: usize) -> usize {
    let bits = (usize::BITS - n.leading_zeros()) as usize;
    if bits == 0 { 1 } else { bits }
}

/// Depth bound a concat node must meet to be flagged balanced.
///
/// A node is balanced iff `depth <= depth_factor * bit_length(byte_len)`.
///
/// # Example
/// ```
/// use frankenrope_core::BalancePolicy;
///
/// let policy = BalancePolicy::default();
/// assert_eq!(policy.depth_limit(1000), 20);
/// assert!(policy.is_balanced(20, 1000));
/// assert!(!policy.is_balanced(21, 1000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancePolicy {
    /// Multiplier on the bit length of the byte length. Values below 1 are
    /// treated as 1.
    pub depth_factor: usize,
}

impl Default for BalancePolicy {
    fn default() -> Self {
        Self {
            depth_factor: DEFAULT_BALANCE_FACTOR,
        }
    }
}

impl BalancePolicy {
    /// Policy with the given factor.
    #[must_use]
    pub const fn new(depth_factor: usize) -> Self {
        Self { depth_factor }
    }

    /// Largest depth still considered balanced for `byte_len` bytes.
    #[must_use]
    pub const fn depth_limit(&self, byte_len: usize) -> usize {
        let factor = if self.depth_factor == 0 {
            1
        } else {
            self.depth_factor
        };
        factor.saturating_mul(bit_length(byte_len))
    }

    /// Whether a node of `depth` holding `byte_len` bytes is balanced.
    #[inline]
    #[must_use]
    pub const fn is_balanced(&self, depth: usize, byte_len: usize) -> bool {
        depth <= self.depth_limit(byte_len)
    }
}

impl Rope {
    /// Concat node with caller-supplied tags.
    ///
    /// Lengths are always the sums of the children's. `depth` must be
    /// `max(left.depth(), right.depth()) + 1` (checked in debug builds).
    #[must_use]
    pub fn new_concat(
        left: Rope,
        right: Rope,
        encoding: Encoding,
        code_range: CodeRange,
        depth: usize,
        balanced: bool,
    ) -> Rope {
        debug_assert_eq!(
            depth,
            left.depth().max(right.depth()) + 1,
            "concat depth must be one more than its deeper child"
        );
        let byte_len = left.byte_len() + right.byte_len();
        let char_len = left.char_len() + right.char_len();
        Rope::from_parts(
            encoding,
            code_range,
            byte_len,
            char_len,
            depth,
            None,
            RopeKind::Concat {
                left,
                right,
                balanced,
            },
        )
    }

    /// Join `self` and `right` under the default [`BalancePolicy`].
    ///
    /// An empty side is absorbed: the other side is returned as is.
    #[must_use]
    pub fn concat(&self, right: &Rope) -> Rope {
        self.concat_with(right, BalancePolicy::default())
    }

    /// Join `self` and `right`, flagging balance with `policy`.
    #[must_use]
    pub fn concat_with(&self, right: &Rope, policy: BalancePolicy) -> Rope {
        if right.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return right.clone();
        }
        let (encoding, code_range) = match Encoding::compatible(
            self.encoding(),
            self.code_range(),
            right.encoding(),
            right.code_range(),
        ) {
            Some(encoding) => (encoding, self.code_range().combine(right.code_range())),
            None => (self.encoding(), CodeRange::Broken),
        };
        let depth = self.depth().max(right.depth()) + 1;
        let balanced = policy.is_balanced(depth, self.byte_len() + right.byte_len());
        Rope::new_concat(
            self.clone(),
            right.clone(),
            encoding,
            code_range,
            depth,
            balanced,
        )
    }
}
