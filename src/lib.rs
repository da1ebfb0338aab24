//! Accumulating B+ tree over an ordered key-value store.
//!
//! The tree stores one `u64` weight per byte-string key and answers prefix
//! sums and arbitrary inclusive range sums in O(log n) store reads, without
//! scanning leaves. Nodes are location-addressed records inside the backing
//! store's key space rather than an in-memory pointer graph, so any store
//! with ordered iteration can host the structure.
//!
//! ```
//! use sumtree::{MemoryStore, Tree};
//!
//! let mut tree = Tree::new(MemoryStore::new(), 4)?;
//! tree.set(b"a", 1)?;
//! tree.set(b"b", 2)?;
//! tree.set(b"c", 3)?;
//!
//! assert_eq!(tree.get(b"b")?, 2);
//! assert_eq!(tree.prefix_sum(b"b")?, 3);
//! assert_eq!(tree.total_accumulated_value()?, 6);
//! assert_eq!(tree.subset_accumulation(Some(b"b"), Some(b"c"))?, 5);
//! # Ok::<(), sumtree::SumTreeError>(())
//! ```

pub mod error;
mod node;
pub mod store;
mod tree;

pub use error::{Result, SumTreeError};
pub use store::{MemoryStore, OrderedStore};
pub use tree::Tree;
