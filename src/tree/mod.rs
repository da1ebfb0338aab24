//! The tree engine: mutations, rebalancing and navigation.

mod debug;
mod query;

use tracing::{debug, trace};

use crate::error::{Result, SumTreeError};
use crate::node::{
    decode_weight, encode_weight, leaf_key, node_key, parse_node_key, prefix_end, Child, Children,
    NodeAddr, NODE_NAMESPACE,
};
use crate::store::OrderedStore;

/// Accumulating B+ tree mapping byte-string keys to `u64` weights.
///
/// Branches hold up to `m` children, each summarized by its representative
/// key and the exact sum of leaf weights in its subtree, so range sums are
/// answered by a single root-to-leaf descent. The structure assumes one
/// logical writer; it holds no locks and runs no background maintenance.
///
/// The empty key is reserved: construction seeds a zero-weight sentinel leaf
/// under it so a root is always discoverable. Aggregated sums use wrapping
/// `u64` addition.
#[derive(Debug)]
pub struct Tree<S: OrderedStore> {
    store: S,
    m: u8,
}

impl<S: OrderedStore> Tree<S> {
    /// Creates a tree over `store` with branching factor `m`.
    ///
    /// Seeds the sentinel leaf; calling this over a store already holding
    /// tree data is harmless and simply reopens the structure, provided `m`
    /// matches the value the data was built with.
    pub fn new(store: S, m: u8) -> Result<Self> {
        if m < 2 {
            return Err(SumTreeError::Invalid("branching factor must be at least 2"));
        }
        let mut tree = Tree { store, m };
        tree.set(&[], 0)?;
        Ok(tree)
    }

    /// Consumes the tree and returns the backing store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Returns the weight stored under `key`, or 0 when absent.
    ///
    /// # Panics
    /// Panics when the stored leaf record cannot be decoded (corruption).
    pub fn get(&self, key: &[u8]) -> Result<u64> {
        match self.store.get(&leaf_key(key))? {
            Some(bytes) => Ok(decode_weight(&bytes)),
            None => Ok(0),
        }
    }

    /// Inserts `key` with the given weight, or overwrites its weight if
    /// present, then propagates the new accumulation to every ancestor.
    ///
    /// # Panics
    /// Panics on corrupt stored records or on an internal invariant
    /// violation; the structure offers no partial-application rollback.
    pub fn set(&mut self, key: &[u8], weight: u64) -> Result<()> {
        trace!(key = %hex::encode(key), weight, "sumtree.set");
        let leaf = NodeAddr::new(0, key);
        self.store.set(&leaf.store_key(), encode_weight(weight))?;
        let parent = self.parent(&leaf)?;
        self.push(&parent, Child::new(key, weight))
    }

    /// Deletes `key`'s leaf and restores ancestor accumulations. Removing an
    /// absent key is a no-op.
    ///
    /// # Panics
    /// Panics on corrupt stored records or on an internal invariant
    /// violation.
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        let leaf = NodeAddr::new(0, key);
        if !self.exists(&leaf)? {
            return Ok(());
        }
        trace!(key = %hex::encode(key), "sumtree.remove");
        let parent = self.parent(&leaf)?;
        self.store.delete(&leaf.store_key())?;
        self.pull(&parent, key)
    }

    /// Ascending traversal over stored leaves as `(key, weight)` pairs.
    /// Bounds are start-inclusive, end-exclusive; `None` means unbounded.
    /// The sentinel leaf under the empty key appears like any other leaf.
    pub fn iter(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<impl Iterator<Item = (Vec<u8>, u64)> + '_> {
        let (start_key, end_key) = Self::leaf_range(start, end);
        let iter = self.store.iter(Some(&start_key), end_key.as_deref())?;
        Ok(iter.map(|(raw, value)| {
            let (_, key) = parse_node_key(&raw);
            (key, decode_weight(&value))
        }))
    }

    /// Descending counterpart of [`Tree::iter`], over the same bounds.
    pub fn iter_rev(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<impl Iterator<Item = (Vec<u8>, u64)> + '_> {
        let (start_key, end_key) = Self::leaf_range(start, end);
        let iter = self.store.iter_rev(Some(&start_key), end_key.as_deref())?;
        Ok(iter.map(|(raw, value)| {
            let (_, key) = parse_node_key(&raw);
            (key, decode_weight(&value))
        }))
    }

    fn leaf_range(start: Option<&[u8]>, end: Option<&[u8]>) -> (Vec<u8>, Option<Vec<u8>>) {
        let start_key = leaf_key(start.unwrap_or_default());
        let end_key = match end {
            Some(end) => Some(leaf_key(end)),
            None => prefix_end(&node_key(0, &[])),
        };
        (start_key, end_key)
    }

    // ------------------------------------------------------------------
    // Location-addressed navigation.
    //
    // Nodes carry no parent or sibling pointers; neighbors are found by
    // range iteration over the store's sorted key space.
    // ------------------------------------------------------------------

    fn exists(&self, addr: &NodeAddr) -> Result<bool> {
        self.store.has(&addr.store_key())
    }

    fn children(&self, addr: &NodeAddr) -> Result<Children> {
        Ok(match self.store.get(&addr.store_key())? {
            Some(bytes) => Children::decode(&bytes),
            None => Children::default(),
        })
    }

    fn set_children(&mut self, addr: &NodeAddr, children: &Children) -> Result<()> {
        self.store.set(&addr.store_key(), children.encode())
    }

    fn delete_node(&mut self, addr: &NodeAddr) -> Result<()> {
        self.store.delete(&addr.store_key())
    }

    /// Highest node in the namespace. The big-endian level prefix makes the
    /// topmost level sort last, and that level holds exactly one node.
    pub(crate) fn root(&self) -> Result<Option<NodeAddr>> {
        let end = prefix_end(NODE_NAMESPACE);
        let mut iter = self.store.iter_rev(Some(NODE_NAMESPACE), end.as_deref())?;
        Ok(iter.next().map(|(raw, _)| {
            let (level, key) = parse_node_key(&raw);
            NodeAddr::new(level, key)
        }))
    }

    fn left_sibling(&self, addr: &NodeAddr) -> Result<Option<NodeAddr>> {
        let start = node_key(addr.level, &[]);
        let end = addr.store_key();
        let mut iter = self.store.iter_rev(Some(&start), Some(&end))?;
        Ok(iter.next().map(|(raw, _)| {
            let (level, key) = parse_node_key(&raw);
            NodeAddr::new(level, key)
        }))
    }

    fn right_sibling(&self, addr: &NodeAddr) -> Result<Option<NodeAddr>> {
        let start = addr.store_key();
        let end = prefix_end(&node_key(addr.level, &[]));
        let mut iter = self.store.iter(Some(&start), end.as_deref())?;
        let mut next = iter.next();
        if let Some((raw, _)) = &next {
            if raw == &start {
                next = iter.next();
            }
        }
        Ok(next.map(|(raw, _)| {
            let (level, key) = parse_node_key(&raw);
            NodeAddr::new(level, key)
        }))
    }

    /// Parent of `addr`: the same-key node one level up when it exists, else
    /// the nearest branch one level up with a smaller key. When neither
    /// exists the returned address does not exist in the store, which is how
    /// upward recursion terminates above the root.
    fn parent(&self, addr: &NodeAddr) -> Result<NodeAddr> {
        let up = NodeAddr::new(addr.level + 1, addr.key.clone());
        if self.exists(&up)? {
            return Ok(up);
        }
        if let Some(sibling) = self.left_sibling(&up)? {
            return Ok(sibling);
        }
        Ok(NodeAddr::new(addr.level + 1, Vec::new()))
    }

    // ------------------------------------------------------------------
    // Insertion, split, accumulation propagation.
    // ------------------------------------------------------------------

    fn push(&mut self, addr: &NodeAddr, child: Child) -> Result<()> {
        if !self.exists(addr)? {
            // first entry at this level: a new root is born
            return self.set_children(addr, &Children(vec![child]));
        }
        let mut cs = self.children(addr)?;
        let (idx, found) = cs.find(&child.index);
        if found {
            return self.update_accumulation(addr, child);
        }
        cs.0.insert(idx, child);

        if cs.0.len() > self.m as usize {
            let split = self.m as usize / 2 + 1;
            let right = Children(cs.0.split_off(split));
            let left = cs;
            let right_addr = NodeAddr::new(addr.level, right.key().to_vec());
            debug!(
                level = addr.level,
                key = %hex::encode(&addr.key),
                right = %hex::encode(&right_addr.key),
                "sumtree.split"
            );
            self.set_children(&right_addr, &right)?;
            let parent = self.parent(addr)?;
            if !self.exists(&parent)? {
                let summary = Children(vec![
                    Child::new(addr.key.clone(), left.accumulate()),
                    Child::new(right_addr.key.clone(), right.accumulate()),
                ]);
                self.set_children(&parent, &summary)?;
                return self.set_children(addr, &left);
            }
            self.push(&parent, Child::new(right_addr.key.clone(), right.accumulate()))?;
            self.set_children(addr, &left)?;
            // the parent may itself have split; address it by navigation,
            // not by the stale locator captured above
            let parent = self.parent(addr)?;
            return self.update_accumulation(
                &parent,
                Child::new(addr.key.clone(), left.accumulate()),
            );
        }

        self.set_children(addr, &cs)?;
        let total = cs.accumulate();
        let parent = self.parent(addr)?;
        self.update_accumulation(&parent, Child::new(addr.key.clone(), total))
    }

    /// Replaces the accumulation stored for `child.index` in `addr` and
    /// ripples the node's new total up to the root.
    fn update_accumulation(&mut self, addr: &NodeAddr, child: Child) -> Result<()> {
        if !self.exists(addr)? {
            return Ok(()); // above the root
        }
        let mut cs = self.children(addr)?;
        let (idx, found) = cs.find(&child.index);
        if !found {
            panic!(
                "sumtree: accumulation update for key {} not present in branch (level {}, key {})",
                hex::encode(&child.index),
                addr.level,
                hex::encode(&addr.key)
            );
        }
        cs.0[idx].acc = child.acc;
        self.set_children(addr, &cs)?;
        let parent = self.parent(addr)?;
        self.update_accumulation(&parent, Child::new(addr.key.clone(), cs.accumulate()))
    }

    // ------------------------------------------------------------------
    // Deletion, cascade, opportunistic merge.
    // ------------------------------------------------------------------

    fn pull(&mut self, addr: &NodeAddr, key: &[u8]) -> Result<()> {
        if !self.exists(addr)? {
            return Ok(()); // above the root
        }
        let mut cs = self.children(addr)?;
        let (idx, found) = cs.find(key);
        if !found {
            panic!(
                "sumtree: pulled key {} not present in branch (level {}, key {})",
                hex::encode(key),
                addr.level,
                hex::encode(&addr.key)
            );
        }
        cs.0.remove(idx);

        if !cs.0.is_empty() {
            // removing the head entry invalidates the node's representative
            // key; move the record so insert navigation and query descent
            // keep agreeing on subtree boundaries
            let addr = if idx == 0 {
                self.rekey(addr, &cs)?
            } else {
                addr.clone()
            };
            self.set_children(&addr, &cs)?;
            let parent = self.parent(&addr)?;
            return self.update_accumulation(&parent, Child::new(addr.key, cs.accumulate()));
        }

        // node emptied: drop it and cascade. Siblings are captured first,
        // while the node still anchors their discovery.
        let left = self.left_sibling(addr)?;
        let right = self.right_sibling(addr)?;
        let parent = self.parent(addr)?;
        self.delete_node(addr)?;
        self.pull(&parent, &addr.key)?;

        let (Some(left), Some(right)) = (left, right) else {
            return Ok(());
        };
        // the captured parent may have been deleted by the cascade;
        // re-derive from the surviving siblings
        let parent = self.parent(&left)?;
        if parent.key != self.parent(&right)?.key {
            return Ok(());
        }
        let left_cs = self.children(&left)?;
        let right_cs = self.children(&right)?;
        if left_cs.0.len() + right_cs.0.len() >= self.m as usize {
            return Ok(());
        }
        debug!(
            level = left.level,
            left = %hex::encode(&left.key),
            right = %hex::encode(&right.key),
            "sumtree.merge"
        );
        let mut merged = left_cs;
        merged.0.extend(right_cs.0);
        self.set_children(&left, &merged)?;
        self.delete_node(&right)?;
        self.pull(&parent, &right.key)?;
        self.update_accumulation(&parent, Child::new(left.key.clone(), merged.accumulate()))
    }

    /// Moves a branch whose head entry was pulled to the address of its new
    /// head, so the node's key stays the smallest key in its subtree. The
    /// record itself is rewritten by the caller under the returned address.
    ///
    /// Empty-keyed nodes anchor the left edge of their level and never move:
    /// their key is already below every possible pivot.
    fn rekey(&mut self, addr: &NodeAddr, cs: &Children) -> Result<NodeAddr> {
        if addr.key.is_empty() {
            return Ok(addr.clone());
        }
        let moved = NodeAddr::new(addr.level, cs.key().to_vec());
        debug!(
            level = addr.level,
            from = %hex::encode(&addr.key),
            to = %hex::encode(&moved.key),
            "sumtree.rekey"
        );
        let parent = self.parent(addr)?;
        self.delete_node(addr)?;
        self.reindex(&parent, &addr.key, moved.key.clone())?;
        Ok(moved)
    }

    /// Rewrites the entry carrying index `old` in `addr` to `new`. When that
    /// entry heads the node, the node's own representative key changes with
    /// it and the rewrite continues upward.
    fn reindex(&mut self, addr: &NodeAddr, old: &[u8], new: Vec<u8>) -> Result<()> {
        if !self.exists(addr)? {
            return Ok(()); // above the root
        }
        let mut cs = self.children(addr)?;
        let (idx, found) = cs.find(old);
        if !found {
            panic!(
                "sumtree: reindexed key {} not present in branch (level {}, key {})",
                hex::encode(old),
                addr.level,
                hex::encode(&addr.key)
            );
        }
        cs.0[idx].index = new.clone();
        if idx == 0 && !addr.key.is_empty() {
            let parent = self.parent(addr)?;
            self.delete_node(addr)?;
            self.set_children(&NodeAddr::new(addr.level, new.clone()), &cs)?;
            return self.reindex(&parent, &addr.key, new);
        }
        self.set_children(addr, &cs)?;
        Ok(())
    }
}
