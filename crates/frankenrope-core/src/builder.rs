#![forbid(unsafe_code)]

//! Rebalancing and the appending builder.
//!
//! A rope produced by repeated `concat` onto the same side degenerates into a
//! chain whose depth equals the number of appends. [`Rope::rebalance`]
//! rebuilds such a tree from its pieces. [`RopeBuilder`] never builds the
//! chain in the first place: it keeps a binary-counter forest of balanced
//! subtrees and joins two of them only when they hold equally many pieces,
//! so each append costs amortized O(1) and depth stays logarithmic.

use smallvec::SmallVec;

use crate::concat::BalancePolicy;
use crate::config::{RebalanceStrategy, RopeConfig};
use crate::encoding::Encoding;
use crate::rope::{Rope, RopeKind};

impl Rope {
    /// Rebuild this tree with the default [`BalancePolicy`].
    #[must_use]
    pub fn rebalance(&self) -> Rope {
        self.rebalance_with(BalancePolicy::default())
    }

    /// Rebuild this tree as a pairwise-balanced tree over the same pieces.
    ///
    /// Pieces are the non-concat nodes (leaves and substrings) in byte order;
    /// they are shared, not copied, except for substrings over an unbalanced
    /// child, which are materialized into a leaf. The new root carries this
    /// rope's encoding, code range and character length.
    ///
    /// Anything that is not a concat, or whose rebuilt tree would be no
    /// shallower, is returned unchanged.
    #[must_use]
    pub fn rebalance_with(&self, policy: BalancePolicy) -> Rope {
        if !matches!(self.node.kind, RopeKind::Concat { .. }) {
            return self.clone();
        }
        let span = tracing::debug_span!(
            "rope_rebalance",
            before_depth = self.depth(),
            after_depth = tracing::field::Empty,
            pieces = tracing::field::Empty,
        )
        .entered();

        let mut pieces = collect_pieces(self);
        span.record("pieces", pieces.len());

        while pieces.len() > 2 {
            let mut merged = Vec::with_capacity(pieces.len().div_ceil(2));
            let mut iter = pieces.into_iter();
            while let Some(left) = iter.next() {
                match iter.next() {
                    Some(right) => merged.push(left.concat_with(&right, policy)),
                    None => merged.push(left),
                }
            }
            pieces = merged;
        }

        let [left, right]: [Rope; 2] = match pieces.try_into() {
            Ok(pair) => pair,
            Err(_) => return self.clone(),
        };
        let depth = left.depth().max(right.depth()) + 1;
        if depth >= self.depth() {
            span.record("after_depth", self.depth());
            tracing::debug!(depth, "rebalance kept the original tree");
            return self.clone();
        }
        let balanced = policy.is_balanced(depth, self.byte_len());
        let mut root = Rope::new_concat(
            left,
            right,
            self.encoding(),
            self.code_range(),
            depth,
            balanced,
        );
        if root.char_len() != self.char_len() {
            root = root.retag(self.encoding(), self.code_range(), self.char_len());
        }
        span.record("after_depth", root.depth());
        tracing::debug!(byte_len = root.byte_len(), "rope rebalanced");
        root
    }
}

/// Non-empty, non-concat nodes under `rope`, left to right.
///
/// A substring whose child is unbalanced would keep its whole depth in any
/// rebuilt tree, so it comes back as a leaf instead.
fn collect_pieces(rope: &Rope) -> Vec<Rope> {
    let mut pieces = Vec::new();
    let mut stack: SmallVec<[&Rope; 32]> = SmallVec::new();
    stack.push(rope);
    while let Some(node) = stack.pop() {
        match &node.node.kind {
            RopeKind::Concat { left, right, .. } => {
                stack.push(right);
                stack.push(left);
            }
            _ if node.is_empty() => {}
            RopeKind::Substring { .. } if !node.is_balanced() => pieces.push(node.to_leaf()),
            _ => pieces.push(node.clone()),
        }
    }
    pieces
}

/// Appending builder that keeps the rope within the depth bound.
///
/// Appends are amortized O(1): pushed pieces go into a forest of balanced
/// subtrees, and [`RopeBuilder::build`] joins the forest once at the end.
///
/// # Example
/// ```
/// use frankenrope_core::{Encoding, RopeBuilder};
///
/// let mut builder = RopeBuilder::new(Encoding::Utf8);
/// for _ in 0..1000 {
///     builder.push_str("x");
/// }
/// let rope = builder.build();
/// assert_eq!(rope.byte_len(), 1000);
/// assert!(rope.depth() <= 20);
/// ```
#[derive(Debug, Clone)]
pub struct RopeBuilder {
    // Subtrees in byte order, each with the number of pieces it holds.
    // Unless the strategy is `Never`, counts are distinct powers of two
    // decreasing towards the end.
    forest: SmallVec<[(Rope, usize); 16]>,
    // Last small piece, held back so the next small piece can join it.
    tail: Option<Rope>,
    encoding: Encoding,
    config: RopeConfig,
}

impl RopeBuilder {
    /// Builder with the default [`RopeConfig`].
    #[must_use]
    pub fn new(encoding: Encoding) -> Self {
        Self::with_config(encoding, RopeConfig::default())
    }

    /// Builder with an explicit config.
    #[must_use]
    pub fn with_config(encoding: Encoding, config: RopeConfig) -> Self {
        Self {
            forest: SmallVec::new(),
            tail: None,
            encoding,
            config,
        }
    }

    /// Config in effect.
    #[must_use]
    pub fn config(&self) -> &RopeConfig {
        &self.config
    }

    /// Append a rope.
    pub fn push(&mut self, piece: &Rope) -> &mut Self {
        if piece.is_empty() {
            return self;
        }
        let limit = self.config.small_concat_bytes;
        if let Some(tail) = &self.tail
            && tail.encoding() == piece.encoding()
            && tail.byte_len() + piece.byte_len() <= limit
        {
            let merged = tail
                .concat_with(piece, self.config.balance_policy())
                .to_leaf();
            tracing::trace!(byte_len = merged.byte_len(), limit, "merged_small");
            self.tail = Some(merged);
            return self;
        }
        self.flush_tail();
        if piece.byte_len() <= limit {
            self.tail = Some(piece.clone());
        } else {
            self.append(piece.clone());
        }
        self
    }

    /// Append bytes as a leaf under the builder's encoding.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        if bytes.is_empty() {
            return self;
        }
        let leaf = Rope::from_bytes(bytes, self.encoding);
        self.push(&leaf)
    }

    /// Append UTF-8 text as a leaf under the builder's encoding.
    pub fn push_str(&mut self, text: &str) -> &mut Self {
        self.push_bytes(text.as_bytes())
    }

    /// Bytes appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        let held = self.tail.as_ref().map_or(0, Rope::byte_len);
        self.forest
            .iter()
            .map(|(rope, _)| rope.byte_len())
            .sum::<usize>()
            + held
    }

    /// Whether nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth [`RopeBuilder::build`] would produce, not counting a held-back
    /// small piece.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut trees = self.forest.iter().rev();
        let Some((last, _)) = trees.next() else {
            return 0;
        };
        trees.fold(last.depth(), |depth, (rope, _)| rope.depth().max(depth) + 1)
    }

    /// Finish and return the rope.
    #[must_use]
    pub fn build(mut self) -> Rope {
        self.flush_tail();
        let policy = self.config.balance_policy();
        let trees = self.forest.len();
        let Some((mut rope, _)) = self.forest.pop() else {
            return Rope::empty(self.encoding);
        };
        while let Some((left, _)) = self.forest.pop() {
            rope = left.concat_with(&rope, policy);
        }
        tracing::trace!(
            byte_len = rope.byte_len(),
            depth = rope.depth(),
            trees,
            "rope built"
        );
        rope
    }

    fn flush_tail(&mut self) {
        if let Some(tail) = self.tail.take() {
            self.append(tail);
        }
    }

    fn append(&mut self, piece: Rope) {
        let policy = self.config.balance_policy();
        let piece = self.prepare(piece, policy);
        if self.config.rebalance == RebalanceStrategy::Never {
            let joined = match self.forest.pop() {
                Some((rope, count)) => (rope.concat_with(&piece, policy), count + 1),
                None => (piece, 1),
            };
            self.forest.push(joined);
            return;
        }
        let mut rope = piece;
        let mut count = 1;
        while self.forest.last().is_some_and(|(_, top)| *top == count) {
            let Some((left, top)) = self.forest.pop() else {
                break;
            };
            rope = self.join(&left, &rope, policy);
            count += top;
        }
        self.forest.push((rope, count));
    }

    /// Two neighbouring subtrees as one.
    fn join(&self, left: &Rope, right: &Rope, policy: BalancePolicy) -> Rope {
        let joined = left.concat_with(right, policy);
        if self.config.rebalance != RebalanceStrategy::Flatten {
            tracing::trace!(depth = joined.depth(), "forest merged");
            return joined;
        }
        let flat = joined.to_leaf();
        tracing::trace!(byte_len = flat.byte_len(), depth = joined.depth(), "flattened");
        flat
    }

    /// An incoming piece made shallow enough to sit in the forest.
    fn prepare(&self, piece: Rope, policy: BalancePolicy) -> Rope {
        if piece.is_balanced() {
            return piece;
        }
        match self.config.rebalance {
            RebalanceStrategy::Never => return piece,
            RebalanceStrategy::Rebalance => {
                let rebuilt = piece.rebalance_with(policy);
                if rebuilt.is_balanced() {
                    tracing::trace!(
                        before_depth = piece.depth(),
                        after_depth = rebuilt.depth(),
                        "rebalanced"
                    );
                    return rebuilt;
                }
            }
            RebalanceStrategy::Flatten => {}
        }
        let flat = piece.to_leaf();
        tracing::trace!(byte_len = flat.byte_len(), depth = piece.depth(), "flattened");
        flat
    }
}
