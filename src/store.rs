//! The ordered key-value store seam the tree runs on.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::Result;

/// Items yielded by store iteration: raw `(key, value)` pairs.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Byte-string keyed store with ordered iteration.
///
/// This is the sole capability the tree requires from its environment. Any
/// backing store satisfying these semantics works: an in-memory map, an LSM
/// engine, a Merkle-committed store. Iteration bounds are start-inclusive and
/// end-exclusive; `None` means unbounded on that side.
pub trait OrderedStore {
    /// Returns the value stored under `key`, or `None` when absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, overwriting any prior value.
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Removes `key`; removing an absent key is a no-op.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Reports whether `key` is present.
    fn has(&self, key: &[u8]) -> Result<bool>;

    /// Ascending iteration over `[start, end)`.
    fn iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<Box<dyn Iterator<Item = KvPair> + 'a>>;

    /// Descending iteration over `[start, end)`.
    fn iter_rev<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<Box<dyn Iterator<Item = KvPair> + 'a>>;
}

/// In-memory [`OrderedStore`] backed by a `BTreeMap`.
///
/// The reference implementation used throughout the test suite; also suitable
/// for callers that do not need persistence.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Reports whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn bounds<'k>(
        start: Option<&'k [u8]>,
        end: Option<&'k [u8]>,
    ) -> (Bound<&'k [u8]>, Bound<&'k [u8]>) {
        let lower = start.map_or(Bound::Unbounded, Bound::Included);
        let upper = end.map_or(Bound::Unbounded, Bound::Excluded);
        (lower, upper)
    }
}

impl OrderedStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.map.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.map.contains_key(key))
    }

    fn iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<Box<dyn Iterator<Item = KvPair> + 'a>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Ok(Box::new(std::iter::empty()));
            }
        }
        let range = self.map.range::<[u8], _>(Self::bounds(start, end));
        Ok(Box::new(range.map(|(k, v)| (k.clone(), v.clone()))))
    }

    fn iter_rev<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<Box<dyn Iterator<Item = KvPair> + 'a>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Ok(Box::new(std::iter::empty()));
            }
        }
        let range = self.map.range::<[u8], _>(Self::bounds(start, end));
        Ok(Box::new(range.rev().map(|(k, v)| (k.clone(), v.clone()))))
    }
}
