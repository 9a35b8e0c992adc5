//! Property-based invariant tests for ropes.
//!
//! Trees are generated from random recipes of leaves, concatenations and
//! slices, built alongside a plain byte vector that models their content.
//!
//! 1. A leaf flattens to exactly the bytes it was built from.
//! 2. `byte_at(i)` agrees with `flattened_bytes()[i]`, before and after flattening.
//! 3. Concatenation adds byte and character lengths.
//! 4. A substring flattens to the covered range of its parent.
//! 5. Depth recurrence for leaves, concatenations and substring nodes.
//! 6. `with_encoding_7bit` keeps bytes and character length.
//! 7. `with_binary_encoding` counts one character per byte.
//! 8. Concurrent flattening is idempotent.
//! 9. Chunks and range copies agree with the model.
//! 10. Equality and hashing ignore shape.
//! 11. Rebalancing keeps content and bounds depth.
//! 12. UTF-8 character counts match a lossy decoder.
//! 13. The builder keeps content, tags and a logarithmic depth for every strategy.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use frankenrope_core::{
    BalancePolicy, CodeRange, Encoding, RebalanceStrategy, Rope, RopeBuilder, RopeConfig,
    RopeShape,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Recipe {
    Leaf(Vec<u8>),
    Concat(Box<Recipe>, Box<Recipe>),
    Slice(Box<Recipe>, usize, usize),
}

fn leaf_bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(String::into_bytes),
        "\\PC{0,6}".prop_map(String::into_bytes),
        proptest::collection::vec(any::<u8>(), 0..6),
    ]
}

fn recipe_strategy() -> impl Strategy<Value = Recipe> {
    leaf_bytes_strategy()
        .prop_map(Recipe::Leaf)
        .prop_recursive(6, 64, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone())
                    .prop_map(|(l, r)| Recipe::Concat(Box::new(l), Box::new(r))),
                (inner, any::<usize>(), any::<usize>())
                    .prop_map(|(c, a, b)| Recipe::Slice(Box::new(c), a, b)),
            ]
        })
}

/// Pick `(offset, len)` inside `0..len` from two arbitrary seeds.
fn pick_range(total: usize, a: usize, b: usize) -> (usize, usize) {
    let offset = a % (total + 1);
    let len = b % (total - offset + 1);
    (offset, len)
}

fn build(recipe: &Recipe) -> (Rope, Vec<u8>) {
    match recipe {
        Recipe::Leaf(bytes) => (Rope::from_bytes(bytes.clone(), Encoding::Utf8), bytes.clone()),
        Recipe::Concat(l, r) => {
            let (left, mut model) = build(l);
            let (right, tail) = build(r);
            model.extend_from_slice(&tail);
            (left.concat(&right), model)
        }
        Recipe::Slice(c, a, b) => {
            let (child, model) = build(c);
            let (offset, len) = pick_range(model.len(), *a, *b);
            (
                child.substring(offset, len),
                model[offset..offset + len].to_vec(),
            )
        }
    }
}

fn hash_of(rope: &Rope) -> u64 {
    let mut hasher = DefaultHasher::new();
    rope.hash(&mut hasher);
    hasher.finish()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Leaf flattening is the identity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn leaf_flattens_to_input(bytes in leaf_bytes_strategy()) {
        let rope = Rope::from_bytes(bytes.clone(), Encoding::Utf8);
        prop_assert_eq!(rope.flattened_bytes(), bytes.as_slice());
        prop_assert_eq!(rope.byte_len(), bytes.len());
        prop_assert_eq!(rope.depth(), 0);
        prop_assert_ne!(rope.code_range(), CodeRange::Unknown);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Slow-path byte access agrees with flattening
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn byte_at_matches_flattened(recipe in recipe_strategy()) {
        let (rope, model) = build(&recipe);
        prop_assert_eq!(rope.byte_len(), model.len());
        let slow: Vec<u8> = (0..rope.byte_len()).map(|i| rope.byte_at(i)).collect();
        prop_assert_eq!(&slow, &model);
        let flat = rope.flattened_bytes();
        prop_assert_eq!(flat, model.as_slice());
        for (i, &byte) in model.iter().enumerate() {
            prop_assert_eq!(rope.byte_at(i), byte);
        }
        prop_assert_eq!(rope.get_byte(model.len()), None);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Additivity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn concat_adds_lengths(l in recipe_strategy(), r in recipe_strategy()) {
        let (left, _) = build(&l);
        let (right, _) = build(&r);
        let joined = left.concat(&right);
        prop_assert_eq!(joined.byte_len(), left.byte_len() + right.byte_len());
        prop_assert_eq!(joined.char_len(), left.char_len() + right.char_len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Substring containment
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn substring_covers_parent_range(
        recipe in recipe_strategy(),
        a in any::<usize>(),
        b in any::<usize>(),
    ) {
        let (rope, model) = build(&recipe);
        let (offset, len) = pick_range(model.len(), a, b);
        let slice = rope.substring(offset, len);
        prop_assert!(slice.byte_len() <= rope.byte_len());
        prop_assert_eq!(slice.flattened_bytes(), &rope.flattened_bytes()[offset..offset + len]);
        prop_assert!(slice.depth() <= rope.depth() + 1);
        prop_assert_eq!(slice.encoding(), rope.encoding());
    }

    #[test]
    fn try_substring_rejects_overrun(recipe in recipe_strategy(), extra in 1usize..8) {
        let (rope, model) = build(&recipe);
        prop_assert!(rope.try_substring(0, model.len() + extra).is_err());
        prop_assert!(rope.try_substring(model.len() + extra, 0).is_err());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Depth recurrence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn depth_recurrence(l in recipe_strategy(), r in recipe_strategy()) {
        let (left, _) = build(&l);
        let (right, _) = build(&r);
        prop_assume!(!left.is_empty() && !right.is_empty());
        let joined = left.concat(&right);
        prop_assert_eq!(joined.depth(), left.depth().max(right.depth()) + 1);

        let view = Rope::new_substring(
            joined.clone(),
            joined.encoding(),
            0,
            joined.byte_len(),
            joined.char_len(),
            joined.code_range(),
        );
        prop_assert_eq!(view.depth(), joined.depth() + 1);

        match joined.shape() {
            RopeShape::Concat { left: l2, right: r2, balanced } => {
                prop_assert!(l2.ptr_eq(&left));
                prop_assert!(r2.ptr_eq(&right));
                prop_assert_eq!(
                    balanced,
                    BalancePolicy::default().is_balanced(joined.depth(), joined.byte_len())
                );
            }
            other => prop_assert!(false, "expected concat, got {:?}", other),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. 7-bit transition
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn seven_bit_preserves_content(recipe in recipe_strategy()) {
        let (rope, model) = build(&recipe);
        let result = rope.try_with_encoding_7bit(Encoding::UsAscii);
        if rope.code_range() == CodeRange::AsciiOnly {
            let ascii = result.expect("ASCII-only rope must transition");
            prop_assert_eq!(ascii.encoding(), Encoding::UsAscii);
            prop_assert_eq!(ascii.char_len(), rope.char_len());
            prop_assert_eq!(ascii.byte_len(), rope.byte_len());
            prop_assert_eq!(ascii.depth(), rope.depth());
            prop_assert_eq!(ascii.flattened_bytes(), model.as_slice());
        } else {
            prop_assert!(result.is_err());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Binary transition
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn binary_counts_bytes(recipe in recipe_strategy()) {
        let (rope, model) = build(&recipe);
        let result = rope.try_with_binary_encoding();
        if rope.code_range() == CodeRange::Valid {
            let binary = result.expect("valid rope must transition");
            prop_assert_eq!(binary.encoding(), Encoding::Binary);
            prop_assert_eq!(binary.char_len(), binary.byte_len());
            prop_assert_eq!(binary.code_range(), CodeRange::Valid);
            prop_assert_eq!(binary.flattened_bytes(), model.as_slice());
        } else {
            prop_assert!(result.is_err());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Concurrent flatten idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn concurrent_flatten_is_idempotent(recipe in recipe_strategy()) {
        let (rope, model) = build(&recipe);
        let results: Vec<Vec<u8>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| rope.flattened_bytes().to_vec()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for bytes in &results {
            prop_assert_eq!(bytes, &model);
        }
        let first = rope.flattened_bytes().as_ptr();
        prop_assert_eq!(rope.flattened_bytes().as_ptr(), first);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 9. Chunks and range copies
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn chunks_concatenate_to_model(recipe in recipe_strategy()) {
        let (rope, model) = build(&recipe);
        let mut joined = Vec::new();
        for chunk in rope.chunks() {
            prop_assert!(!chunk.is_empty());
            joined.extend_from_slice(chunk);
        }
        prop_assert_eq!(joined, model);
    }

    #[test]
    fn copy_range_matches_model(
        recipe in recipe_strategy(),
        a in any::<usize>(),
        b in any::<usize>(),
    ) {
        let (rope, model) = build(&recipe);
        let (offset, len) = pick_range(model.len(), a, b);
        let mut dst = vec![0u8; len];
        prop_assert!(rope.copy_range_into(offset, &mut dst).is_ok());
        prop_assert_eq!(dst.as_slice(), &model[offset..offset + len]);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 10. Equality and hashing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn equality_ignores_shape(recipe in recipe_strategy()) {
        let (rope, model) = build(&recipe);
        let flat = Rope::from_bytes(model, Encoding::Utf8);
        prop_assert_eq!(&rope, &flat);
        prop_assert_eq!(hash_of(&rope), hash_of(&flat));
    }

    #[test]
    fn differing_content_is_unequal(a in recipe_strategy(), b in recipe_strategy()) {
        let (left, left_model) = build(&a);
        let (right, right_model) = build(&b);
        prop_assert_eq!(left == right, left_model == right_model);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 11. Rebalancing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn rebalance_keeps_content(recipe in recipe_strategy()) {
        let (rope, model) = build(&recipe);
        let rebuilt = rope.rebalance();
        prop_assert_eq!(rebuilt.flattened_bytes(), model.as_slice());
        prop_assert_eq!(rebuilt.char_len(), rope.char_len());
        prop_assert_eq!(rebuilt.code_range(), rope.code_range());
        prop_assert_eq!(rebuilt.encoding(), rope.encoding());
    }

    #[test]
    fn rebalanced_chain_is_balanced(pieces in proptest::collection::vec("[a-z]{1,4}", 2..200)) {
        let mut rope = Rope::from(pieces[0].as_str());
        for piece in &pieces[1..] {
            rope = rope.concat(&Rope::from(piece.as_str()));
        }
        let rebuilt = rope.rebalance();
        prop_assert!(rebuilt.is_balanced());
        prop_assert!(rebuilt.depth() <= rope.depth());
        prop_assert_eq!(rebuilt, rope);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 12. UTF-8 character counting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn utf8_char_len_matches_lossy_decoding(bytes in proptest::collection::vec(any::<u8>(), 0..32)) {
        let rope = Rope::from_bytes(bytes.clone(), Encoding::Utf8);
        let lossy = String::from_utf8_lossy(&bytes);
        prop_assert_eq!(rope.char_len(), lossy.chars().count());
        let broken = std::str::from_utf8(&bytes).is_err();
        prop_assert_eq!(rope.code_range() == CodeRange::Broken, broken);
    }

    #[test]
    fn resolve_matches_flat_scan(recipe in recipe_strategy()) {
        let (rope, model) = build(&recipe);
        let resolved = rope.resolve_code_range();
        let flat = Rope::from_bytes(model, Encoding::Utf8);
        if rope.code_range() == CodeRange::Broken {
            prop_assert_eq!(resolved.code_range(), flat.code_range());
            prop_assert_eq!(resolved.char_len(), flat.char_len());
        } else {
            prop_assert!(resolved.ptr_eq(&rope));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 13. Builder
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn builder_matches_model(
        recipes in proptest::collection::vec(recipe_strategy(), 1..24),
        strategy in prop_oneof![
            Just(RebalanceStrategy::Rebalance),
            Just(RebalanceStrategy::Flatten),
        ],
        small_concat_bytes in 0usize..16,
    ) {
        let config = RopeConfig { rebalance: strategy, small_concat_bytes, ..RopeConfig::default() };
        let mut builder = RopeBuilder::with_config(Encoding::Utf8, config);
        let mut naive = Rope::empty(Encoding::Utf8);
        let mut model = Vec::new();
        let mut deepest = 0;
        for recipe in &recipes {
            let (piece, piece_model) = build(recipe);
            deepest = deepest.max(piece.depth());
            builder.push(&piece);
            naive = naive.concat(&piece);
            model.extend_from_slice(&piece_model);
        }
        let rope = builder.build();
        prop_assert_eq!(rope.flattened_bytes(), model.as_slice());
        prop_assert_eq!(rope.byte_len(), naive.byte_len());
        prop_assert_eq!(rope.char_len(), naive.char_len());
        prop_assert_eq!(rope.code_range(), naive.code_range());
        prop_assert!(rope.depth() <= deepest + recipes.len().ilog2() as usize + 1);
    }
}
