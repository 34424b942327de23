//! # implicit-treap
//!
//! A rank-indexed sequence with monoid range aggregation, built on an implicit
//! treap: a randomized binary search tree keyed by in-order position and
//! heap-ordered by random node priorities.
//!
//! Positional insert, remove, read, write, range fold, split and merge all run
//! in expected `O(log n)`.
//!
//! ## Example
//!
//! ```rust
//! use implicit_treap::{monoid::Sum, Treap};
//!
//! let mut t = Treap::with_seed(Sum::<i64>::new(), 42);
//! t.insert(0, 3);
//! t.insert(1, 5);
//! t.insert(2, 7);
//! assert_eq!(t.fold(0..3), 15);
//! assert_eq!(t.fold(1..3), 12);
//!
//! assert_eq!(t.remove(1), 5);
//! let mut head = t.split(0..1);
//! assert_eq!(head.iter().copied().collect::<Vec<_>>(), vec![3]);
//! t.merge(1, &mut head);
//! assert_eq!(t.iter().copied().collect::<Vec<_>>(), vec![7, 3]);
//! assert!(head.is_empty());
//! ```

use std::ops::{Index, IndexMut, RangeBounds};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

mod error;
mod iter;
pub mod monoid;
pub mod priority;

pub use error::{Result, TreapError};
pub use iter::{Cursor, CursorMut, Iter};
pub use monoid::Monoid;
pub use priority::{Mwc256xxa64, PrioritySource};

use error::{fail, resolve_range};

// =============================================================================
// Links and node storage
// =============================================================================

/// Arena handle. Handles stay valid across rotations, so a node keeps its
/// handle for its whole life inside one arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Link(u32);

impl Link {
    const NULL: Link = Link(u32::MAX);

    #[inline]
    fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    fn idx(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }
}

#[derive(Clone)]
struct Node<T> {
    raw: T,
    /// Aggregate of the subtree rooted here, in order.
    agg: T,
    size: usize,
    priority: u64,
    left: Link,
    right: Link,
    parent: Link,
}

/// Slot arena with a free list. Trees reference nodes only through [`Link`]s
/// into their own arena.
#[derive(Clone)]
struct NodeArena<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<Link>,
}

impl<T> NodeArena<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    fn alloc(&mut self, node: Node<T>) -> Link {
        if let Some(link) = self.free.pop() {
            self.slots[link.idx()] = Some(node);
            return link;
        }
        let idx = self.slots.len();
        assert!(idx < Link::NULL.0 as usize, "treap node arena exhausted");
        self.slots.push(Some(node));
        Link(idx as u32)
    }

    fn release(&mut self, link: Link) -> Node<T> {
        match self.slots[link.idx()].take() {
            Some(node) => {
                self.free.push(link);
                node
            }
            None => unreachable!("released a vacant treap slot"),
        }
    }

    #[inline]
    fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional.saturating_sub(self.free.len()));
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// Moves the subtree rooted at `root` out of `from` and into `self`,
    /// returning its new root. Sizes, aggregates and priorities travel with
    /// the nodes unchanged.
    fn adopt(&mut self, from: &mut NodeArena<T>, root: Link) -> Link {
        if root.is_null() {
            return Link::NULL;
        }
        let mut new_root = Link::NULL;
        // (old link, new parent, attach as right child)
        let mut stack = vec![(root, Link::NULL, false)];
        while let Some((old, parent, as_right)) = stack.pop() {
            let mut node = from.release(old);
            let (left, right) = (node.left, node.right);
            node.left = Link::NULL;
            node.right = Link::NULL;
            node.parent = parent;
            let link = self.alloc(node);
            if parent.is_null() {
                new_root = link;
            } else if as_right {
                self[parent].right = link;
            } else {
                self[parent].left = link;
            }
            if !right.is_null() {
                stack.push((right, link, true));
            }
            if !left.is_null() {
                stack.push((left, link, false));
            }
        }
        new_root
    }
}

impl<T> Index<Link> for NodeArena<T> {
    type Output = Node<T>;

    #[inline]
    fn index(&self, link: Link) -> &Node<T> {
        match &self.slots[link.idx()] {
            Some(node) => node,
            None => unreachable!("dangling treap link"),
        }
    }
}

impl<T> IndexMut<Link> for NodeArena<T> {
    #[inline]
    fn index_mut(&mut self, link: Link) -> &mut Node<T> {
        match &mut self.slots[link.idx()] {
            Some(node) => node,
            None => unreachable!("dangling treap link"),
        }
    }
}

// =============================================================================
// Treap
// =============================================================================

/// A sequence of `M::Value` indexed by position, aggregating with `M`.
///
/// Between public operations the tree is in-order by rank, max-heap ordered
/// by priority, and every node caches its subtree size and aggregate.
pub struct Treap<M: Monoid, P = StdRng> {
    nodes: NodeArena<M::Value>,
    root: Link,
    monoid: M,
    priorities: P,
}

impl<M: Monoid> Treap<M, StdRng> {
    /// Creates an empty treap with priorities drawn from an OS-seeded `StdRng`.
    pub fn new(monoid: M) -> Self {
        Self::with_priorities(monoid, StdRng::from_entropy())
    }

    /// Creates an empty treap whose shape is reproducible from `seed`.
    pub fn with_seed(monoid: M, seed: u64) -> Self {
        Self::with_priorities(monoid, StdRng::seed_from_u64(seed))
    }

    pub fn with_capacity(monoid: M, capacity: usize) -> Self {
        let mut t = Self::new(monoid);
        t.nodes = NodeArena::with_capacity(capacity);
        t
    }
}

impl<M: Monoid, P> Treap<M, P> {
    pub fn with_priorities(monoid: M, priorities: P) -> Self {
        Self {
            nodes: NodeArena::new(),
            root: Link::NULL,
            monoid,
            priorities,
        }
    }

    pub fn monoid(&self) -> &M {
        &self.monoid
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size_of(self.root)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.nodes.reserve(additional);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = Link::NULL;
    }

    pub fn get(&self, pos: usize) -> Option<&M::Value> {
        if pos < self.len() {
            Some(&self.nodes[self.locate(pos)].raw)
        } else {
            None
        }
    }

    pub fn first(&self) -> Option<&M::Value> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&M::Value> {
        if self.root.is_null() {
            return None;
        }
        Some(&self.nodes[self.rightmost(self.root)].raw)
    }

    /// Replaces the element at `pos`, returning the old one.
    #[track_caller]
    pub fn set(&mut self, pos: usize, value: M::Value) -> M::Value {
        self.try_set(pos, value).unwrap_or_else(|e| fail(e))
    }

    pub fn try_set(&mut self, pos: usize, value: M::Value) -> Result<M::Value> {
        let link = self.checked_locate(pos)?;
        let old = std::mem::replace(&mut self.nodes[link].raw, value);
        self.fixup(link);
        Ok(old)
    }

    /// Edits the element at `pos` in place and refreshes the aggregates above it.
    #[track_caller]
    pub fn update<F: FnOnce(&mut M::Value)>(&mut self, pos: usize, f: F) {
        let link = self.checked_locate(pos).unwrap_or_else(|e| fail(e));
        f(&mut self.nodes[link].raw);
        self.fixup(link);
    }

    /// Removes and returns the element at `pos`; later elements shift left.
    #[track_caller]
    pub fn remove(&mut self, pos: usize) -> M::Value {
        self.try_remove(pos).unwrap_or_else(|e| fail(e))
    }

    pub fn try_remove(&mut self, pos: usize) -> Result<M::Value> {
        let link = self.checked_locate(pos)?;
        Ok(self.unlink(link))
    }

    pub fn pop_front(&mut self) -> Option<M::Value> {
        self.try_remove(0).ok()
    }

    pub fn pop_back(&mut self) -> Option<M::Value> {
        if self.root.is_null() {
            return None;
        }
        let link = self.rightmost(self.root);
        Some(self.unlink(link))
    }

    /// Folds the elements in `range` left to right.
    ///
    /// Subtrees lying entirely inside the range contribute their cached
    /// aggregate, so this visits `O(height)` nodes.
    #[track_caller]
    pub fn fold<R: RangeBounds<usize>>(&self, range: R) -> M::Value {
        self.try_fold(range).unwrap_or_else(|e| fail(e))
    }

    pub fn try_fold<R: RangeBounds<usize>>(&self, range: R) -> Result<M::Value> {
        let (start, end) = resolve_range(range, self.len())?;
        Ok(self.fold_subtree(self.root, start, end))
    }

    /// Aggregate of the whole sequence.
    pub fn total(&self) -> M::Value {
        if self.root.is_null() {
            self.monoid.identity()
        } else {
            self.nodes[self.root].agg.clone()
        }
    }

    /// Moves every element of `other` into `self` as one block starting at
    /// `pos`. `other` is left empty.
    #[track_caller]
    pub fn merge(&mut self, pos: usize, other: &mut Self) {
        self.try_merge(pos, other).unwrap_or_else(|e| fail(e))
    }

    pub fn try_merge(&mut self, pos: usize, other: &mut Self) -> Result<()> {
        let len = self.len();
        if pos > len {
            return Err(TreapError::OutOfBounds { pos, len });
        }
        if other.root.is_null() {
            return Ok(());
        }
        let moved = other.len();

        // Relocate whichever side is smaller into the other's arena.
        let donor = if moved > len {
            std::mem::swap(&mut self.nodes, &mut other.nodes);
            self.root = self.nodes.adopt(&mut other.nodes, self.root);
            other.root
        } else {
            self.nodes.adopt(&mut other.nodes, other.root)
        };
        other.root = Link::NULL;
        other.nodes.clear();

        let (head, tail) = self.split_at(self.root, pos);
        let joined = self.join(head, donor);
        self.root = self.join(joined, tail);
        trace!("merged {moved} elements at position {pos}; length now {}", self.len());
        Ok(())
    }

    /// Moves all of `other` to the end of `self`.
    pub fn append(&mut self, other: &mut Self) {
        let len = self.len();
        self.merge(len, other);
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        if self.root.is_null() {
            return 0;
        }
        let mut best = 0;
        let mut stack = vec![(self.root, 1usize)];
        while let Some((link, depth)) = stack.pop() {
            best = best.max(depth);
            let node = &self.nodes[link];
            for child in [node.left, node.right] {
                if !child.is_null() {
                    stack.push((child, depth + 1));
                }
            }
        }
        best
    }

    /// Rebuilds the node arena densely, dropping the holes left behind by
    /// removals and splits. Returns the number of nodes moved.
    pub fn compact(&mut self) -> usize {
        let len = self.len();
        let holes = self.nodes.free.len();
        let mut fresh = NodeArena::with_capacity(len);
        self.root = fresh.adopt(&mut self.nodes, self.root);
        self.nodes = fresh;
        debug!("compacted treap arena: {len} nodes kept, {holes} holes dropped");
        len
    }

    pub fn iter(&self) -> Iter<'_, M, P> {
        Iter::new(self)
    }

    /// Cursor on the first element, or on the end position if empty.
    pub fn cursor_front(&self) -> Cursor<'_, M, P> {
        Cursor::new(self, self.leftmost(self.root))
    }

    /// Cursor on the end position, one past the last element.
    pub fn cursor_end(&self) -> Cursor<'_, M, P> {
        Cursor::new(self, Link::NULL)
    }

    /// Cursor on the element at `pos`; `pos == len()` gives the end position.
    #[track_caller]
    pub fn cursor_at(&self, pos: usize) -> Cursor<'_, M, P> {
        let link = self.cursor_link(pos);
        Cursor::new(self, link)
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, M, P> {
        let link = self.leftmost(self.root);
        CursorMut::new(self, link)
    }

    #[track_caller]
    pub fn cursor_at_mut(&mut self, pos: usize) -> CursorMut<'_, M, P> {
        let link = self.cursor_link(pos);
        CursorMut::new(self, link)
    }

    // -------------------------------------------------------------------------
    // Rank descent and navigation
    // -------------------------------------------------------------------------

    #[inline]
    fn size_of(&self, link: Link) -> usize {
        if link.is_null() {
            0
        } else {
            self.nodes[link].size
        }
    }

    /// Node at in-order position `pos`. Requires `pos < len()`.
    fn locate(&self, mut pos: usize) -> Link {
        debug_assert!(pos < self.len());
        let mut cur = self.root;
        loop {
            let node = &self.nodes[cur];
            let left = self.size_of(node.left);
            if pos < left {
                cur = node.left;
            } else if pos > left {
                pos -= left + 1;
                cur = node.right;
            } else {
                return cur;
            }
        }
    }

    fn checked_locate(&self, pos: usize) -> Result<Link> {
        let len = self.len();
        if pos >= len {
            return Err(TreapError::OutOfBounds { pos, len });
        }
        Ok(self.locate(pos))
    }

    #[track_caller]
    fn cursor_link(&self, pos: usize) -> Link {
        let len = self.len();
        if pos > len {
            fail(TreapError::OutOfBounds { pos, len });
        }
        if pos == len {
            Link::NULL
        } else {
            self.locate(pos)
        }
    }

    fn leftmost(&self, mut link: Link) -> Link {
        if link.is_null() {
            return link;
        }
        while !self.nodes[link].left.is_null() {
            link = self.nodes[link].left;
        }
        link
    }

    fn rightmost(&self, mut link: Link) -> Link {
        if link.is_null() {
            return link;
        }
        while !self.nodes[link].right.is_null() {
            link = self.nodes[link].right;
        }
        link
    }

    /// In-order successor, or NULL past the last node.
    fn successor(&self, link: Link) -> Link {
        let right = self.nodes[link].right;
        if !right.is_null() {
            return self.leftmost(right);
        }
        let mut cur = link;
        let mut parent = self.nodes[cur].parent;
        while !parent.is_null() && self.nodes[parent].right == cur {
            cur = parent;
            parent = self.nodes[cur].parent;
        }
        parent
    }

    /// In-order predecessor, or NULL before the first node.
    fn predecessor(&self, link: Link) -> Link {
        let left = self.nodes[link].left;
        if !left.is_null() {
            return self.rightmost(left);
        }
        let mut cur = link;
        let mut parent = self.nodes[cur].parent;
        while !parent.is_null() && self.nodes[parent].left == cur {
            cur = parent;
            parent = self.nodes[cur].parent;
        }
        parent
    }

    /// Count of elements strictly before `link`.
    fn rank_of(&self, link: Link) -> usize {
        let mut rank = self.size_of(self.nodes[link].left);
        let mut cur = link;
        let mut parent = self.nodes[cur].parent;
        while !parent.is_null() {
            if self.nodes[parent].right == cur {
                rank += self.size_of(self.nodes[parent].left) + 1;
            }
            cur = parent;
            parent = self.nodes[cur].parent;
        }
        rank
    }

    // -------------------------------------------------------------------------
    // Rotation / reheap
    // -------------------------------------------------------------------------

    /// Recomputes the cached size and aggregate of `link` from its children.
    fn pull(&mut self, link: Link) {
        let Self { nodes, monoid, .. } = self;
        let node = &nodes[link];
        let (left, right) = (node.left, node.right);
        let mut size = 1;
        let mut agg = if left.is_null() {
            node.raw.clone()
        } else {
            size += nodes[left].size;
            monoid.combine(&nodes[left].agg, &node.raw)
        };
        if !right.is_null() {
            size += nodes[right].size;
            agg = monoid.combine(&agg, &nodes[right].agg);
        }
        let node = &mut nodes[link];
        node.size = size;
        node.agg = agg;
    }

    fn replace_child(&mut self, parent: Link, old: Link, new: Link) {
        if parent.is_null() {
            self.root = new;
        } else if self.nodes[parent].left == old {
            self.nodes[parent].left = new;
        } else {
            self.nodes[parent].right = new;
        }
    }

    /// Rotates `x` above its parent. Caches are left stale.
    fn rotate_up(&mut self, x: Link) {
        let p = self.nodes[x].parent;
        let g = self.nodes[p].parent;
        if self.nodes[p].left == x {
            let inner = self.nodes[x].right;
            self.nodes[p].left = inner;
            if !inner.is_null() {
                self.nodes[inner].parent = p;
            }
            self.nodes[x].right = p;
        } else {
            let inner = self.nodes[x].left;
            self.nodes[p].right = inner;
            if !inner.is_null() {
                self.nodes[inner].parent = p;
            }
            self.nodes[x].left = p;
        }
        self.nodes[p].parent = x;
        self.nodes[x].parent = g;
        self.replace_child(g, p, x);
    }

    /// Walks from `link` to the root, rotating a higher-priority child above
    /// the current node where heap order is broken and refreshing every
    /// cache on the way up.
    fn fixup(&mut self, mut cur: Link) {
        while !cur.is_null() {
            let node = &self.nodes[cur];
            let (left, right, prio) = (node.left, node.right, node.priority);
            let lp = (!left.is_null()).then(|| self.nodes[left].priority);
            let rp = (!right.is_null()).then(|| self.nodes[right].priority);
            let up = match (lp, rp) {
                (Some(l), Some(r)) if l > prio || r > prio => {
                    if l >= r {
                        left
                    } else {
                        right
                    }
                }
                (Some(l), _) if l > prio => left,
                (_, Some(r)) if r > prio => right,
                _ => Link::NULL,
            };
            if !up.is_null() {
                self.rotate_up(up);
                self.pull(cur);
                cur = up;
            }
            self.pull(cur);
            cur = self.nodes[cur].parent;
        }
    }

    /// Removes `x` from the tree and frees its slot.
    fn unlink(&mut self, x: Link) -> M::Value {
        // Sink x until it has at most one child; the caches of the nodes
        // rotated above it are refreshed by the fixup below.
        loop {
            let node = &self.nodes[x];
            let (left, right) = (node.left, node.right);
            if left.is_null() || right.is_null() {
                break;
            }
            let up = if self.nodes[left].priority >= self.nodes[right].priority {
                left
            } else {
                right
            };
            self.rotate_up(up);
        }

        let node = &self.nodes[x];
        let child = if node.left.is_null() {
            node.right
        } else {
            node.left
        };
        let parent = node.parent;
        if !child.is_null() {
            self.nodes[child].parent = parent;
        }
        self.replace_child(parent, x, child);
        self.fixup(parent);
        self.nodes.release(x).raw
    }

    fn fold_subtree(&self, link: Link, start: usize, end: usize) -> M::Value {
        if start >= end {
            return self.monoid.identity();
        }
        let node = &self.nodes[link];
        if start == 0 && end == node.size {
            return node.agg.clone();
        }
        let left = self.size_of(node.left);
        let mut acc = None;
        if start < left {
            acc = Some(self.fold_subtree(node.left, start, end.min(left)));
        }
        if start <= left && left < end {
            acc = Some(match acc {
                Some(a) => self.monoid.combine(&a, &node.raw),
                None => node.raw.clone(),
            });
        }
        if end > left + 1 {
            let rest = self.fold_subtree(node.right, start.saturating_sub(left + 1), end - left - 1);
            acc = Some(match acc {
                Some(a) => self.monoid.combine(&a, &rest),
                None => rest,
            });
        }
        acc.unwrap_or_else(|| self.monoid.identity())
    }

    // -------------------------------------------------------------------------
    // Meld
    // -------------------------------------------------------------------------

    /// Splits the detached tree rooted at `root` into its first `k` elements
    /// and the rest. Both results are detached roots.
    fn split_at(&mut self, root: Link, mut k: usize) -> (Link, Link) {
        debug_assert!(k <= self.size_of(root));
        // Index 0 collects the prefix (open slot: tail.right), index 1 the
        // suffix (open slot: tail.left).
        let mut heads = [Link::NULL; 2];
        let mut tails = [Link::NULL; 2];
        let mut path = Vec::new();
        let mut cur = root;
        while !cur.is_null() {
            path.push(cur);
            let left = self.size_of(self.nodes[cur].left);
            let side = usize::from(k <= left);
            let tail = tails[side];
            if tail.is_null() {
                heads[side] = cur;
            } else if side == 0 {
                self.nodes[tail].right = cur;
            } else {
                self.nodes[tail].left = cur;
            }
            self.nodes[cur].parent = tail;
            tails[side] = cur;
            if side == 0 {
                k -= left + 1;
                cur = self.nodes[cur].right;
            } else {
                cur = self.nodes[cur].left;
            }
        }
        if !tails[0].is_null() {
            self.nodes[tails[0]].right = Link::NULL;
        }
        if !tails[1].is_null() {
            self.nodes[tails[1]].left = Link::NULL;
        }
        for &link in path.iter().rev() {
            self.pull(link);
        }
        (heads[0], heads[1])
    }

    /// Joins two detached trees, every element of `a` preceding every element
    /// of `b`. The higher-priority root stays on top at each level.
    fn join(&mut self, mut a: Link, mut b: Link) -> Link {
        let mut root = Link::NULL;
        let mut parent = Link::NULL;
        let mut as_right = false;
        let mut path = Vec::new();
        loop {
            let next = if a.is_null() {
                b
            } else if b.is_null() || self.nodes[a].priority >= self.nodes[b].priority {
                a
            } else {
                b
            };
            if parent.is_null() {
                root = next;
            } else if as_right {
                self.nodes[parent].right = next;
            } else {
                self.nodes[parent].left = next;
            }
            if !next.is_null() {
                self.nodes[next].parent = parent;
            }
            if a.is_null() || b.is_null() {
                break;
            }
            path.push(next);
            parent = next;
            if next == a {
                as_right = true;
                a = self.nodes[a].right;
            } else {
                as_right = false;
                b = self.nodes[b].left;
            }
        }
        for &link in path.iter().rev() {
            self.pull(link);
        }
        root
    }

    /// Refreshes every cache below `root`, children before parents.
    fn pull_all(&mut self, root: Link) {
        if root.is_null() {
            return;
        }
        let mut order = Vec::with_capacity(self.size_of(root));
        let mut stack = vec![root];
        while let Some(link) = stack.pop() {
            order.push(link);
            let node = &self.nodes[link];
            for child in [node.left, node.right] {
                if !child.is_null() {
                    stack.push(child);
                }
            }
        }
        for &link in order.iter().rev() {
            self.pull(link);
        }
    }
}

impl<M: Monoid, P: PrioritySource> Treap<M, P> {
    /// Inserts `value` so that it lands at position `pos`; elements at `pos`
    /// and after shift right.
    #[track_caller]
    pub fn insert(&mut self, pos: usize, value: M::Value) {
        self.try_insert(pos, value).unwrap_or_else(|e| fail(e))
    }

    pub fn try_insert(&mut self, pos: usize, value: M::Value) -> Result<()> {
        let len = self.len();
        if pos > len {
            return Err(TreapError::OutOfBounds { pos, len });
        }
        self.insert_at(pos, value);
        Ok(())
    }

    pub fn push_front(&mut self, value: M::Value) {
        self.insert_at(0, value);
    }

    pub fn push_back(&mut self, value: M::Value) {
        let len = self.len();
        self.insert_at(len, value);
    }

    /// Detaches the elements in `range` into a new treap; later elements of
    /// `self` shift left to close the gap.
    #[track_caller]
    pub fn split<R: RangeBounds<usize>>(&mut self, range: R) -> Self
    where
        M: Clone,
    {
        self.try_split(range).unwrap_or_else(|e| fail(e))
    }

    pub fn try_split<R: RangeBounds<usize>>(&mut self, range: R) -> Result<Self>
    where
        M: Clone,
    {
        let (start, end) = resolve_range(range, self.len())?;
        let (head, rest) = self.split_at(self.root, start);
        let (mid, tail) = self.split_at(rest, end - start);
        self.root = self.join(head, tail);

        let mut out = Self::with_priorities(self.monoid.clone(), self.priorities.fork());
        let taken = end - start;
        if taken > self.len() {
            // The detached block is the bigger side: hand it the arena.
            std::mem::swap(&mut self.nodes, &mut out.nodes);
            self.root = self.nodes.adopt(&mut out.nodes, self.root);
            out.root = mid;
        } else {
            out.root = out.nodes.adopt(&mut self.nodes, mid);
        }
        trace!("split off {start}..{end}; {} elements remain", self.len());
        Ok(out)
    }

    /// Detaches everything from `at` onwards.
    #[track_caller]
    pub fn split_off(&mut self, at: usize) -> Self
    where
        M: Clone,
    {
        self.split(at..)
    }

    fn new_node(&mut self, value: M::Value) -> Link {
        let priority = self.priorities.next_priority();
        self.nodes.alloc(Node {
            agg: value.clone(),
            raw: value,
            size: 1,
            priority,
            left: Link::NULL,
            right: Link::NULL,
            parent: Link::NULL,
        })
    }

    fn insert_at(&mut self, pos: usize, value: M::Value) {
        debug_assert!(pos <= self.len());
        let leaf = self.new_node(value);
        if self.root.is_null() {
            self.root = leaf;
            return;
        }
        // Attach the leaf next to its in-order neighbour.
        let (parent, as_left) = if pos == self.len() {
            (self.rightmost(self.root), false)
        } else {
            let at = self.locate(pos);
            let left = self.nodes[at].left;
            if left.is_null() {
                (at, true)
            } else {
                (self.rightmost(left), false)
            }
        };
        if as_left {
            self.nodes[parent].left = leaf;
        } else {
            self.nodes[parent].right = leaf;
        }
        self.nodes[leaf].parent = parent;
        self.fixup(leaf);
    }

    /// Builds a heap-ordered subtree from `iter` in linear time using the
    /// right-spine stack construction. Returns its detached root.
    fn build<I: IntoIterator<Item = M::Value>>(&mut self, iter: I) -> Link {
        let mut spine: Vec<Link> = Vec::new();
        let mut count = 0usize;
        for value in iter {
            let link = self.new_node(value);
            let priority = self.nodes[link].priority;
            let mut last = Link::NULL;
            while let Some(&top) = spine.last() {
                if self.nodes[top].priority >= priority {
                    break;
                }
                last = top;
                spine.pop();
            }
            if !last.is_null() {
                self.nodes[link].left = last;
                self.nodes[last].parent = link;
            }
            if let Some(&top) = spine.last() {
                self.nodes[top].right = link;
                self.nodes[link].parent = top;
            }
            spine.push(link);
            count += 1;
        }
        let root = spine.first().copied().unwrap_or(Link::NULL);
        self.pull_all(root);
        trace!("built treap block of {count} elements");
        root
    }
}

impl<M: Monoid + Default> Default for Treap<M, StdRng> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: Monoid + Clone, P: Clone> Clone for Treap<M, P> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            monoid: self.monoid.clone(),
            priorities: self.priorities.clone(),
        }
    }
}

impl<M: Monoid, P> std::fmt::Debug for Treap<M, P>
where
    M::Value: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<M: Monoid, P> PartialEq for Treap<M, P>
where
    M::Value: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<M: Monoid, P> Eq for Treap<M, P> where M::Value: Eq {}

impl<M: Monoid, P> Index<usize> for Treap<M, P> {
    type Output = M::Value;

    #[track_caller]
    fn index(&self, pos: usize) -> &M::Value {
        match self.get(pos) {
            Some(value) => value,
            None => fail(TreapError::OutOfBounds {
                pos,
                len: self.len(),
            }),
        }
    }
}

impl<M: Monoid, P: PrioritySource> Extend<M::Value> for Treap<M, P> {
    fn extend<I: IntoIterator<Item = M::Value>>(&mut self, iter: I) {
        let block = self.build(iter);
        let root = self.root;
        self.root = self.join(root, block);
    }
}

impl<M: Monoid + Default> FromIterator<M::Value> for Treap<M, StdRng> {
    fn from_iter<I: IntoIterator<Item = M::Value>>(iter: I) -> Self {
        let mut t = Self::default();
        t.root = t.build(iter);
        t
    }
}

impl<'a, M: Monoid, P> IntoIterator for &'a Treap<M, P> {
    type Item = &'a M::Value;
    type IntoIter = Iter<'a, M, P>;

    fn into_iter(self) -> Iter<'a, M, P> {
        self.iter()
    }
}


#[cfg(test)]
mod proptests;
