//! Node addressing and on-store record encoding.
//!
//! Every node lives at a store key derived from its `(level, key)` pair:
//! a constant namespace tag, the level as a big-endian `u16`, then the raw
//! key bytes. Level 0 records hold a single leaf weight; higher levels hold
//! an encoded children list. The layout is an on-disk format and must stay
//! stable.

use std::cmp::Ordering;

/// Namespace tag prefixed to every tree record in the backing store.
pub(crate) const NODE_NAMESPACE: &[u8] = b"node/";

const LEVEL_LEN: usize = 2;

/// Logical locator for a node: never persisted, only used to derive store
/// keys. A branch is identified by the smallest key among its descendant
/// leaves (its representative key).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeAddr {
    pub level: u16,
    pub key: Vec<u8>,
}

impl NodeAddr {
    pub fn new(level: u16, key: impl Into<Vec<u8>>) -> Self {
        Self {
            level,
            key: key.into(),
        }
    }

    pub fn store_key(&self) -> Vec<u8> {
        node_key(self.level, &self.key)
    }
}

/// Store key for the node at `(level, key)`.
pub(crate) fn node_key(level: u16, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(NODE_NAMESPACE.len() + LEVEL_LEN + key.len());
    out.extend_from_slice(NODE_NAMESPACE);
    out.extend_from_slice(&level.to_be_bytes());
    out.extend_from_slice(key);
    out
}

/// Store key for the leaf holding `key`'s weight.
pub(crate) fn leaf_key(key: &[u8]) -> Vec<u8> {
    node_key(0, key)
}

/// Splits a raw store key from the node namespace back into `(level, key)`.
///
/// Panics when the key does not carry the namespace tag or is too short to
/// hold a level; such a key reaching the tree means the namespace is shared
/// with foreign records or the store is corrupt.
pub(crate) fn parse_node_key(raw: &[u8]) -> (u16, Vec<u8>) {
    let body = match raw.strip_prefix(NODE_NAMESPACE) {
        Some(body) if body.len() >= LEVEL_LEN => body,
        _ => panic!(
            "sumtree: store key outside node namespace: {}",
            hex::encode(raw)
        ),
    };
    let level = u16::from_be_bytes([body[0], body[1]]);
    (level, body[LEVEL_LEN..].to_vec())
}

/// Smallest byte string strictly greater than every key carrying `prefix`,
/// or `None` when no such bound exists (all bytes `0xff`). `None` doubles as
/// the unbounded end marker for store iteration, which is exactly the bound
/// wanted in that case.
pub(crate) fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last == 0xff {
            end.pop();
        } else {
            *last += 1;
            return Some(end);
        }
    }
    None
}

/// One entry of a branch's children list: the representative key of the
/// child subtree and the exact sum of leaf weights beneath it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Child {
    pub index: Vec<u8>,
    pub acc: u64,
}

impl Child {
    pub fn new(index: impl Into<Vec<u8>>, acc: u64) -> Self {
        Self {
            index: index.into(),
            acc,
        }
    }
}

/// Ordered children list of a branch, strictly ascending by index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Children(pub Vec<Child>);

impl Children {
    /// Representative key of the node holding this list: its first index.
    pub fn key(&self) -> &[u8] {
        &self.0[0].index
    }

    /// Sum of the stored accumulations; wraps on `u64` overflow.
    pub fn accumulate(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, c| acc.wrapping_add(c.acc))
    }

    /// Position of `key` in the list. On an exact hit returns `(idx, true)`;
    /// otherwise `(idx, false)` where `idx` is the insertion position that
    /// keeps the list sorted.
    pub fn find(&self, key: &[u8]) -> (usize, bool) {
        for (idx, child) in self.0.iter().enumerate() {
            match child.index.as_slice().cmp(key) {
                Ordering::Equal => return (idx, true),
                Ordering::Greater => return (idx, false),
                Ordering::Less => {}
            }
        }
        (self.0.len(), false)
    }

    /// Length-prefixed binary encoding: per entry a `u32` LE index length,
    /// the index bytes, then the `u64` LE accumulation.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.iter().map(|c| 12 + c.index.len()).sum());
        for child in &self.0 {
            out.extend_from_slice(&(child.index.len() as u32).to_le_bytes());
            out.extend_from_slice(&child.index);
            out.extend_from_slice(&child.acc.to_le_bytes());
        }
        out
    }

    /// Decodes a children list; empty input yields an empty list.
    ///
    /// Panics on truncated input: a branch record that cannot be decoded
    /// means the accumulated sums can no longer be trusted.
    pub fn decode(bytes: &[u8]) -> Self {
        let mut entries = Vec::new();
        let mut pos = 0usize;
        while pos < bytes.len() {
            if bytes.len() - pos < 4 {
                panic!("sumtree: corrupt children record: truncated index length");
            }
            let mut len_bytes = [0u8; 4];
            len_bytes.copy_from_slice(&bytes[pos..pos + 4]);
            let len = u32::from_le_bytes(len_bytes) as usize;
            pos += 4;
            if bytes.len() - pos < len + 8 {
                panic!("sumtree: corrupt children record: truncated entry");
            }
            let index = bytes[pos..pos + len].to_vec();
            pos += len;
            let mut acc_bytes = [0u8; 8];
            acc_bytes.copy_from_slice(&bytes[pos..pos + 8]);
            pos += 8;
            entries.push(Child {
                index,
                acc: u64::from_le_bytes(acc_bytes),
            });
        }
        Children(entries)
    }
}

/// Encodes a leaf weight as 8 little-endian bytes.
pub(crate) fn encode_weight(weight: u64) -> Vec<u8> {
    weight.to_le_bytes().to_vec()
}

/// Decodes a leaf weight; panics unless the record is exactly 8 bytes.
pub(crate) fn decode_weight(bytes: &[u8]) -> u64 {
    let arr: [u8; 8] = match bytes.try_into() {
        Ok(arr) => arr,
        Err(_) => panic!("sumtree: corrupt leaf weight record ({} bytes)", bytes.len()),
    };
    u64::from_le_bytes(arr)
}
