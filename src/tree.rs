use std::cmp::Ordering;

use crate::error::{BTreeError, Result};
use crate::iter::RangeIter;
use crate::key::{Identity, KeyMapper};
use crate::node::{Node, NodeId};

/// An in-memory B+ tree: values live only at the leaves, leaves are chained
/// in ascending key order, and every mutation resolves a target leaf by
/// descending through separator comparisons before rebalancing back toward
/// the root.
///
/// Nodes live in a single owning arena (`Vec<Node<K, V>>`) addressed by
/// [`NodeId`], so the otherwise-cyclic parent/child/sibling/leaf-chain graph
/// needs no `Rc`/`RefCell`: every cross-reference is just an index. Deleted
/// nodes are never reclaimed or compacted — deletions are structural, not by
/// key, so an abandoned slot is simply unreferenced afterward.
///
/// `M` projects a stored key `K` onto the value actually compared during
/// descent (identity by default); see [`KeyMapper`].
#[derive(Debug)]
pub struct Tree<K, V, M = Identity<K>>
where
    M: KeyMapper<K>,
{
    order: usize,
    pub(crate) arena: Vec<Node<K, V>>,
    root: NodeId,
    head_leaf: NodeId,
    len: usize,
    pub(crate) mapper: M,
}

impl<K, V> Tree<K, V, Identity<K>>
where
    K: PartialOrd + Clone,
{
    /// Creates an empty tree with the identity key mapper.
    ///
    /// `order` is the fanout parameter (maximum key count plus one) and must
    /// be at least 3, the smallest order for which `m = ceil(order/2) - 1`
    /// is non-degenerate.
    pub fn new(order: usize) -> Result<Self> {
        Self::with_mapper(order, Identity::new())
    }
}

impl<K, V, M> Tree<K, V, M>
where
    K: Clone,
    M: KeyMapper<K>,
{
    /// Creates an empty tree with a custom key-ordering function.
    pub fn with_mapper(order: usize, mapper: M) -> Result<Self> {
        if order < 3 {
            return Err(BTreeError::InvalidArgument(format!(
                "order must be >= 3, got {order}"
            )));
        }
        let root_id = NodeId(0);
        Ok(Tree {
            order,
            arena: vec![Node::leaf()],
            root: root_id,
            head_leaf: root_id,
            len: 0,
            mapper,
        })
    }

    /// Fanout parameter supplied at construction.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of stored key-value pairs. O(1).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distance from `id` to the root (root is height 0). Walks `parent`
    /// links through the arena on demand; never cached, since it is only
    /// used for diagnostics and tests, not on any hot path.
    pub(crate) fn height(&self, mut id: NodeId) -> usize {
        let mut h = 0;
        while let Some(parent) = self.arena[id.0].parent {
            id = parent;
            h += 1;
        }
        h
    }

    fn alloc_node(&mut self, node: Node<K, V>) -> NodeId {
        let id = NodeId(self.arena.len());
        self.arena.push(node);
        id
    }

    fn compare(&self, a: &M::Ordered, b: &M::Ordered) -> Result<Ordering> {
        a.partial_cmp(b).ok_or(BTreeError::IncomparableKey)
    }

    /// Lowest index `i` with `map(keys[i]) > k`.
    fn bisect_right(&self, keys: &[K], k: &M::Ordered) -> Result<usize> {
        let mut lo = 0usize;
        let mut hi = keys.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let mapped = self.mapper.map(&keys[mid]);
            if self.compare(&mapped, k)? == Ordering::Greater {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    /// Lowest index `i` with `map(keys[i]) >= k`.
    fn bisect_left(&self, keys: &[K], k: &M::Ordered) -> Result<usize> {
        let mut lo = 0usize;
        let mut hi = keys.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let mapped = self.mapper.map(&keys[mid]);
            if self.compare(&mapped, k)? == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    fn find_target_leaf(&self, k: &M::Ordered) -> Result<NodeId> {
        let mut node_id = self.root;
        loop {
            if self.arena[node_id.0].is_leaf() {
                return Ok(node_id);
            }
            let pos = self.bisect_right(&self.arena[node_id.0].keys, k)?;
            node_id = self.arena[node_id.0].children[pos];
        }
    }

    /// Looks up `key`, failing [`BTreeError::KeyNotFound`] if absent.
    pub fn search(&self, key: &K) -> Result<&V> {
        let k = self.mapper.map(key);
        let leaf_id = self.find_target_leaf(&k)?;
        let node = &self.arena[leaf_id.0];
        let pos = self.bisect_left(&node.keys, &k)?;
        if pos < node.keys.len() {
            let mapped = self.mapper.map(&node.keys[pos]);
            if self.compare(&mapped, &k)? == Ordering::Equal {
                return Ok(&node.values[pos]);
            }
        }
        Err(BTreeError::KeyNotFound)
    }

    /// True iff [`Tree::search`] would succeed.
    pub fn contains(&self, key: &K) -> Result<bool> {
        match self.search(key) {
            Ok(_) => Ok(true),
            Err(BTreeError::KeyNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Inserts `key` with `value`. With `update = false`, an existing key
    /// fails with [`BTreeError::DuplicateKey`] and nothing changes. With
    /// `update = true`, an existing key's value is overwritten without
    /// touching `len()` or the leaf structure.
    pub fn insert(&mut self, key: K, value: V, update: bool) -> Result<()> {
        let ordered = self.mapper.map(&key);
        let leaf_id = self.find_target_leaf(&ordered)?;
        let pos = self.bisect_right(&self.arena[leaf_id.0].keys, &ordered)?;

        if pos > 0 {
            let existing = self.mapper.map(&self.arena[leaf_id.0].keys[pos - 1]);
            if self.compare(&existing, &ordered)? == Ordering::Equal {
                if update {
                    self.arena[leaf_id.0].values[pos - 1] = value;
                    log::debug!("updated value in place, leaf={:?} pos={}", leaf_id, pos - 1);
                    return Ok(());
                }
                return Err(BTreeError::DuplicateKey);
            }
        }

        self.arena[leaf_id.0].keys.insert(pos, key);
        self.arena[leaf_id.0].values.insert(pos, value);
        self.len += 1;

        if self.arena[leaf_id.0].full(self.order) {
            self.split(leaf_id)?;
        }
        Ok(())
    }

    /// Removes `key`, failing [`BTreeError::KeyNotFound`] if absent.
    pub fn delete(&mut self, key: &K) -> Result<()> {
        let ordered = self.mapper.map(key);
        let leaf_id = self.find_target_leaf(&ordered)?;
        let node = &self.arena[leaf_id.0];
        let pos = self.bisect_left(&node.keys, &ordered)?;
        if node.empty() || pos >= node.keys.len() {
            return Err(BTreeError::KeyNotFound);
        }
        let mapped = self.mapper.map(&node.keys[pos]);
        if self.compare(&mapped, &ordered)? != Ordering::Equal {
            return Err(BTreeError::KeyNotFound);
        }

        self.arena[leaf_id.0].keys.remove(pos);
        self.arena[leaf_id.0].values.remove(pos);
        self.len -= 1;
        self.fix(leaf_id)
    }

    /// Discards every node and installs a fresh empty root-leaf, which is
    /// also the head leaf. Idempotent.
    pub fn clear(&mut self) {
        self.arena = vec![Node::leaf()];
        self.root = NodeId(0);
        self.head_leaf = NodeId(0);
        self.len = 0;
        log::debug!("tree cleared");
    }

    /// Lazily iterates `(key, value)` pairs, optionally bounded by the
    /// half-open interval `[start, stop)`. Fails with
    /// [`BTreeError::InvalidRange`] if both bounds are supplied and
    /// `start >= stop`.
    pub fn items(&self, start: Option<K>, stop: Option<K>) -> Result<RangeIter<'_, K, V, M>> {
        let start_ordered = start.as_ref().map(|k| self.mapper.map(k));
        let stop_ordered = stop.as_ref().map(|k| self.mapper.map(k));

        if let (Some(s), Some(e)) = (&start_ordered, &stop_ordered) {
            if self.compare(s, e)? != Ordering::Less {
                return Err(BTreeError::InvalidRange("start must be less than stop"));
            }
        }

        let (current, index) = match &start_ordered {
            None => (Some(self.head_leaf), 0),
            Some(s) => {
                let leaf_id = self.find_target_leaf(s)?;
                let mut idx = self.bisect_left(&self.arena[leaf_id.0].keys, s)?;
                let mut cur = Some(leaf_id);
                if idx >= self.arena[leaf_id.0].keys.len() {
                    cur = self.arena[leaf_id.0].next;
                    idx = 0;
                }
                (cur, idx)
            }
        };

        Ok(RangeIter::new(self, current, index, stop_ordered))
    }

    /// Thin projection over [`Tree::items`] yielding only keys.
    pub fn keys(&self, start: Option<K>, stop: Option<K>) -> Result<impl Iterator<Item = &K> + '_> {
        Ok(self.items(start, stop)?.map(|(k, _)| k))
    }

    /// Thin projection over [`Tree::items`] yielding only values.
    pub fn values(
        &self,
        start: Option<K>,
        stop: Option<K>,
    ) -> Result<impl Iterator<Item = &V> + '_> {
        Ok(self.items(start, stop)?.map(|(_, v)| v))
    }

    /// Materializes [`Tree::items`] into an owned, order-preserving vector.
    pub fn get_range(&self, start: Option<K>, stop: Option<K>) -> Result<Vec<(K, V)>>
    where
        V: Clone,
    {
        Ok(self
            .items(start, stop)?
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Runs only when `N.full`; splits `N` and, if the split cascades past a
    /// full parent, keeps climbing toward the root. Iterative rather than
    /// recursive to bound stack depth at tree height.
    fn split(&mut self, mut node_id: NodeId) -> Result<()> {
        loop {
            if !self.arena[node_id.0].full(self.order) {
                return Ok(());
            }
            let is_leaf = self.arena[node_id.0].is_leaf();
            let pos = self.arena[node_id.0].keys.len() / 2;

            let parent_id = match self.arena[node_id.0].parent {
                Some(p) => p,
                None => {
                    let mut new_root = Node::internal();
                    new_root.children.push(node_id);
                    let new_root_id = self.alloc_node(new_root);
                    self.arena[node_id.0].parent = Some(new_root_id);
                    self.root = new_root_id;
                    new_root_id
                }
            };

            let right_id = self.alloc_node(if is_leaf {
                Node::leaf()
            } else {
                Node::internal()
            });
            self.arena[right_id.0].parent = Some(parent_id);

            let old_right = self.arena[node_id.0].right;
            self.arena[node_id.0].right = Some(right_id);
            self.arena[right_id.0].left = Some(node_id);
            self.arena[right_id.0].right = old_right;
            if let Some(old_right_id) = old_right {
                self.arena[old_right_id.0].left = Some(right_id);
            }

            let split_key = if is_leaf {
                let right_keys = self.arena[node_id.0].keys.split_off(pos);
                let right_values = self.arena[node_id.0].values.split_off(pos);
                let split_key = right_keys[0].clone();
                let old_next = self.arena[node_id.0].next;
                self.arena[right_id.0].keys = right_keys;
                self.arena[right_id.0].values = right_values;
                self.arena[right_id.0].next = old_next;
                self.arena[node_id.0].next = Some(right_id);
                log::trace!(
                    "leaf split: node={:?} right={:?} (separator copied up)",
                    node_id,
                    right_id
                );
                split_key
            } else {
                let split_key = self.arena[node_id.0].keys[pos].clone();
                let right_keys = self.arena[node_id.0].keys.split_off(pos + 1);
                self.arena[node_id.0].keys.pop(); // the promoted key itself
                let right_children = self.arena[node_id.0].children.split_off(pos + 1);

                let last_left_child = *self.arena[node_id.0].children.last().unwrap();
                let first_right_child = right_children[0];
                self.arena[last_left_child.0].right = None;
                self.arena[first_right_child.0].left = None;

                for &child in &right_children {
                    self.arena[child.0].parent = Some(right_id);
                }
                self.arena[right_id.0].keys = right_keys;
                self.arena[right_id.0].children = right_children;
                log::trace!(
                    "internal split: node={:?} right={:?} (separator promoted, not copied)",
                    node_id,
                    right_id
                );
                split_key
            };

            let ordered = self.mapper.map(&split_key);
            let ins_pos = self.bisect_right(&self.arena[parent_id.0].keys, &ordered)?;
            self.arena[parent_id.0].keys.insert(ins_pos, split_key);
            self.arena[parent_id.0].children.insert(ins_pos + 1, right_id);

            node_id = parent_id;
        }
    }

    /// Rebalances after a shrink, walking from the mutated node toward the
    /// root iteratively (same stack-bounding reason as [`Tree::split`]).
    fn fix(&mut self, mut node_id: NodeId) -> Result<()> {
        loop {
            let node = &self.arena[node_id.0];
            if node.is_root() && !node.is_leaf() && node.empty() {
                let child = self.arena[node_id.0].children.pop().unwrap();
                self.arena[child.0].parent = None;
                self.root = child;
                log::debug!("root collapsed into {:?}", child);
                return Ok(());
            }
            if node.valid(self.order) {
                return Ok(());
            }

            let parent_id = node.parent.expect("non-root node always has a parent");
            let left_id = node.left;
            let right_id = node.right;
            let is_leaf = node.is_leaf();

            if let Some(left_id) = left_id.filter(|&l| self.arena[l.0].borrowable(self.order)) {
                self.borrow_from_left(node_id, left_id, parent_id, is_leaf)?;
                log::trace!("borrowed from left sibling into {:?}", node_id);
                return Ok(());
            } else if let Some(right_id) =
                right_id.filter(|&r| self.arena[r.0].borrowable(self.order))
            {
                self.borrow_from_right(node_id, right_id, parent_id, is_leaf)?;
                log::trace!("borrowed from right sibling into {:?}", node_id);
                return Ok(());
            } else {
                let (left, right) = match left_id {
                    Some(l) => (l, node_id),
                    None => (node_id, right_id.expect("invalid node must have a sibling")),
                };
                self.merge(left, right, parent_id, is_leaf)?;
                log::debug!("merged {:?} and {:?}", left, right);
                node_id = parent_id;
            }
        }
    }

    fn borrow_from_left(
        &mut self,
        node_id: NodeId,
        left_id: NodeId,
        parent_id: NodeId,
        is_leaf: bool,
    ) -> Result<()> {
        let sk = self.arena[left_id.0]
            .keys
            .pop()
            .expect("borrowable implies non-empty");
        let sk_ordered = self.mapper.map(&sk);
        let parent_pos = self.bisect_left(&self.arena[parent_id.0].keys, &sk_ordered)?;

        if is_leaf {
            let v = self.arena[left_id.0]
                .values
                .pop()
                .expect("keys and values move in lockstep");
            self.arena[node_id.0].keys.insert(0, sk.clone());
            self.arena[node_id.0].values.insert(0, v);
            self.arena[parent_id.0].keys[parent_pos] = sk;
        } else {
            let promoted = self.arena[parent_id.0].keys[parent_pos].clone();
            self.arena[node_id.0].keys.insert(0, promoted);

            let moved_child = self.arena[left_id.0]
                .children
                .pop()
                .expect("internal node has children");
            self.arena[moved_child.0].parent = Some(node_id);
            if let Some(&new_left_last) = self.arena[left_id.0].children.last() {
                self.arena[new_left_last.0].right = None;
            }
            let old_first = self.arena[node_id.0].children[0];
            self.arena[node_id.0].children.insert(0, moved_child);
            self.arena[moved_child.0].left = None;
            self.arena[moved_child.0].right = Some(old_first);
            self.arena[old_first.0].left = Some(moved_child);

            self.arena[parent_id.0].keys[parent_pos] = sk;
        }
        Ok(())
    }

    fn borrow_from_right(
        &mut self,
        node_id: NodeId,
        right_id: NodeId,
        parent_id: NodeId,
        is_leaf: bool,
    ) -> Result<()> {
        // The separator between `node` and `right` lives at the parent key
        // index matching `node`'s position among its siblings, not at an
        // index derived from either node's own key contents — those shrink
        // to nothing exactly when a borrow/merge is triggered.
        let sep_pos = self.arena[parent_id.0]
            .children
            .iter()
            .position(|&c| c == node_id)
            .expect("node must be a child of parent");
        let borrowed_key = self.arena[right_id.0].keys.remove(0);

        if is_leaf {
            let borrowed_value = self.arena[right_id.0].values.remove(0);
            self.arena[node_id.0].keys.push(borrowed_key);
            self.arena[node_id.0].values.push(borrowed_value);
            let new_sep = self.arena[right_id.0].keys[0].clone();
            self.arena[parent_id.0].keys[sep_pos] = new_sep;
        } else {
            let descending_sep = self.arena[parent_id.0].keys[sep_pos].clone();
            self.arena[node_id.0].keys.push(descending_sep);

            let moved_child = self.arena[right_id.0].children.remove(0);
            self.arena[moved_child.0].parent = Some(node_id);
            if let Some(&new_right_first) = self.arena[right_id.0].children.first() {
                self.arena[new_right_first.0].left = None;
            }
            let old_last = *self.arena[node_id.0]
                .children
                .last()
                .expect("internal node has children");
            self.arena[moved_child.0].left = Some(old_last);
            self.arena[moved_child.0].right = None;
            self.arena[old_last.0].right = Some(moved_child);
            self.arena[node_id.0].children.push(moved_child);

            self.arena[parent_id.0].keys[sep_pos] = borrowed_key;
        }
        Ok(())
    }

    fn merge(
        &mut self,
        left_id: NodeId,
        right_id: NodeId,
        parent_id: NodeId,
        is_leaf: bool,
    ) -> Result<()> {
        // Locate the dropped separator by `right`'s position among its
        // siblings rather than by `left.keys[0]` — `left` is exactly the
        // node that may have shrunk to zero keys when this runs.
        let right_pos = self.arena[parent_id.0]
            .children
            .iter()
            .position(|&c| c == right_id)
            .expect("right child must be in parent");
        let sep_pos = right_pos - 1;
        let split_key = self.arena[parent_id.0].keys.remove(sep_pos);
        self.arena[parent_id.0].children.remove(right_pos);

        let right_keys = std::mem::take(&mut self.arena[right_id.0].keys);
        self.arena[left_id.0].keys.extend(right_keys);

        let right_right = self.arena[right_id.0].right;
        self.arena[left_id.0].right = right_right;
        if let Some(rr) = right_right {
            self.arena[rr.0].left = Some(left_id);
        }

        if is_leaf {
            let right_values = std::mem::take(&mut self.arena[right_id.0].values);
            self.arena[left_id.0].values.extend(right_values);
            self.arena[left_id.0].next = self.arena[right_id.0].next;
        } else {
            let insert_pos = self.arena[left_id.0].children.len() - 1;
            self.arena[left_id.0].keys.insert(insert_pos, split_key);

            let left_last = *self.arena[left_id.0]
                .children
                .last()
                .expect("internal node has children");
            let right_children = std::mem::take(&mut self.arena[right_id.0].children);
            let right_first = right_children[0];
            self.arena[left_last.0].right = Some(right_first);
            self.arena[right_first.0].left = Some(left_last);
            for &child in &right_children {
                self.arena[child.0].parent = Some(left_id);
            }
            self.arena[left_id.0].children.extend(right_children);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
