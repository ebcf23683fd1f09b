//! An in-memory B+ tree: an ordered, logarithmic-cost associative container
//! with values stored only at the leaves and leaves chained in sorted order
//! for efficient range scans.
//!
//! See [`Tree`] for the public surface. Structural details (node layout,
//! split/borrow/merge rebalancing) live in `tree` and `node`; they are not
//! part of the crate's public API.

mod error;
mod iter;
mod key;
mod node;
mod tree;

pub use error::{BTreeError, Result};
pub use iter::RangeIter;
pub use key::{Identity, KeyMapper};
pub use tree::Tree;
