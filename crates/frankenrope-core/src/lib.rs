#![forbid(unsafe_code)]

//! Immutable byte ropes for dynamic-language string runtimes.
//!
//! This crate provides the string representation primitives:
//! - [`Rope`] - shared, immutable tree of bytes tagged with an [`Encoding`]
//!   and a [`CodeRange`]
//! - leaves, concatenations and substrings (see [`RopeShape`])
//! - [`Chunks`] - iteration over contiguous byte pieces without flattening
//! - [`RopeBuilder`] - appending with depth control
//! - [`RopeConfig`] - tuning loaded from the environment
//!
//! Concatenation and slicing never copy bytes. Contiguous content is
//! materialized on demand by [`Rope::flattened_bytes`] and cached in the node,
//! so later calls and later byte lookups are O(1).
//!
//! # Example
//! ```
//! use frankenrope_core::{CodeRange, Encoding, Rope, RopeBuilder};
//!
//! let h = Rope::valid_leaf("héllo".as_bytes(), Encoding::Utf8);
//! let w = Rope::ascii_only_leaf(&b" world"[..], Encoding::Utf8);
//! let hw = h.concat(&w);
//! assert_eq!((hw.byte_len(), hw.char_len()), (12, 11));
//! assert_eq!(hw.code_range(), CodeRange::Valid);
//! assert_eq!(hw.byte_at(6), b' ');
//!
//! // Views share the underlying leaves.
//! let slice = hw.substring(4, 3);
//! assert_eq!(slice.flattened_bytes(), b"lo ");
//!
//! // Re-tag without touching the bytes.
//! let binary = hw.with_binary_encoding();
//! assert_eq!(binary.char_len(), 12);
//!
//! // Keep depth logarithmic while appending.
//! let mut builder = RopeBuilder::new(Encoding::Utf8);
//! for _ in 0..1000 {
//!     builder.push_bytes(b"x");
//! }
//! assert!(builder.build().is_balanced());
//! ```

pub mod builder;
pub mod code_range;
pub mod concat;
pub mod config;
pub mod encoding;
pub mod error;
pub mod flatten;
pub mod leaf;
pub mod rope;
pub mod substring;

pub use builder::RopeBuilder;
pub use code_range::CodeRange;
pub use concat::{BalancePolicy, DEFAULT_BALANCE_FACTOR};
pub use config::{RebalanceStrategy, RopeConfig, RopeConfigError, RopeConfigParse};
pub use encoding::{Encoding, ScanResult, Scanner};
pub use error::{RopeError, Transition};
pub use flatten::Chunks;
pub use leaf::LeafKind;
pub use rope::{Rope, RopeShape};
