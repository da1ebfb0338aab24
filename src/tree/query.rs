//! Range accumulation queries: one descent per pivot, no leaf scans.

use std::cmp::Ordering;

use crate::error::{Result, SumTreeError};
use crate::node::NodeAddr;
use crate::store::OrderedStore;

use super::Tree;

impl<S: OrderedStore> Tree<S> {
    /// Sum of every stored weight.
    pub fn total_accumulated_value(&self) -> Result<u64> {
        self.subset_accumulation(None, None)
    }

    /// Sum of weights over keys less than or equal to `key`.
    pub fn prefix_sum(&self, key: &[u8]) -> Result<u64> {
        self.subset_accumulation(None, Some(key))
    }

    /// Sum of weights over the inclusive range `[start, end]`, where `None`
    /// leaves that side unbounded.
    ///
    /// Composed from at most two pivot descents by inclusion-exclusion:
    /// `sum(start..=end) = (exact(start) + right(start)) - right(end)`.
    /// Sums wrap on `u64` overflow.
    pub fn subset_accumulation(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<u64> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(SumTreeError::Invalid("range start exceeds range end"));
            }
        }
        let Some(root) = self.root()? else {
            return Ok(0);
        };
        match (start, end) {
            (None, None) => Ok(self.children(&root)?.accumulate()),
            (None, Some(end)) => {
                let (left, exact, _) = self.split_acc(&root, end)?;
                Ok(left.wrapping_add(exact))
            }
            (Some(start), None) => {
                let (_, exact, right) = self.split_acc(&root, start)?;
                Ok(exact.wrapping_add(right))
            }
            (Some(start), Some(end)) => {
                let (_, exact, rest) = self.split_acc(&root, start)?;
                let (_, _, right_of_end) = self.split_acc(&root, end)?;
                Ok(exact.wrapping_add(rest).wrapping_sub(right_of_end))
            }
        }
    }

    /// Partitions the accumulated weight of `addr`'s subtree around `pivot`
    /// into `(left, exact, right)`: strictly below, at, and strictly above.
    ///
    /// One node is touched per level: a branch recurses into the single
    /// child whose key range contains the pivot and folds its siblings'
    /// stored accumulations into `left`/`right`.
    fn split_acc(&self, addr: &NodeAddr, pivot: &[u8]) -> Result<(u64, u64, u64)> {
        if addr.level == 0 {
            let weight = self.get(&addr.key)?;
            return Ok(match addr.key.as_slice().cmp(pivot) {
                Ordering::Less => (weight, 0, 0),
                Ordering::Equal => (0, weight, 0),
                Ordering::Greater => (0, 0, weight),
            });
        }
        let cs = self.children(addr)?;
        let (mut idx, found) = cs.find(pivot);
        if !found {
            if idx == 0 {
                // every child starts beyond the pivot
                return Ok((0, 0, cs.accumulate()));
            }
            idx -= 1;
        }
        let child = NodeAddr::new(addr.level - 1, cs.0[idx].index.clone());
        let (left, exact, right) = self.split_acc(&child, pivot)?;
        let left = cs.0[..idx].iter().fold(left, |a, c| a.wrapping_add(c.acc));
        let right = cs.0[idx + 1..].iter().fold(right, |a, c| a.wrapping_add(c.acc));
        Ok((left, exact, right))
    }
}
