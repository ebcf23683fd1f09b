use std::cmp::Ordering;

use crate::key::KeyMapper;
use crate::node::NodeId;
use crate::tree::Tree;

/// Lazy, forward, single-pass cursor over `(key, value)` pairs, optionally
/// bounded by a half-open interval `[start, stop)`.
///
/// Borrows the tree immutably for its entire lifetime, so the borrow checker
/// rejects any attempt to mutate the tree while an iterator from it is
/// alive — there is no runtime check because none is needed.
pub struct RangeIter<'a, K, V, M>
where
    M: KeyMapper<K>,
{
    tree: &'a Tree<K, V, M>,
    current: Option<NodeId>,
    index: usize,
    stop: Option<M::Ordered>,
}

impl<'a, K, V, M> RangeIter<'a, K, V, M>
where
    K: Clone,
    M: KeyMapper<K>,
{
    pub(crate) fn new(
        tree: &'a Tree<K, V, M>,
        current: Option<NodeId>,
        index: usize,
        stop: Option<M::Ordered>,
    ) -> Self {
        RangeIter {
            tree,
            current,
            index,
            stop,
        }
    }
}

impl<'a, K, V, M> Iterator for RangeIter<'a, K, V, M>
where
    K: Clone,
    M: KeyMapper<K>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf_id = self.current?;
            let node = &self.tree.arena[leaf_id.0];

            if self.index >= node.keys.len() {
                self.current = node.next;
                self.index = 0;
                continue;
            }

            let key = &node.keys[self.index];
            if let Some(stop) = &self.stop {
                let mapped = self.tree.mapper.map(key);
                match mapped.partial_cmp(stop) {
                    Some(Ordering::Less) => {}
                    // Incomparable keys mid-scan end the iteration rather
                    // than silently skipping past the bound.
                    _ => return None,
                }
            }

            let value = &node.values[self.index];
            self.index += 1;
            return Some((key, value));
        }
    }
}

#[cfg(test)]
#[path = "iter_test.rs"]
mod iter_test;
