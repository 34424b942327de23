use std::iter::FusedIterator;

use rand::rngs::StdRng;

use crate::{Link, Monoid, PrioritySource, Treap};

// =============================================================================
// Iter
// =============================================================================

/// In-order iterator over the elements of a [`Treap`].
pub struct Iter<'a, M: Monoid, P = StdRng> {
    tree: &'a Treap<M, P>,
    front: Link,
    back: Link,
    remaining: usize,
}

impl<'a, M: Monoid, P> Iter<'a, M, P> {
    pub(crate) fn new(tree: &'a Treap<M, P>) -> Self {
        Self {
            tree,
            front: tree.leftmost(tree.root),
            back: tree.rightmost(tree.root),
            remaining: tree.len(),
        }
    }
}

impl<M: Monoid, P> Clone for Iter<'_, M, P> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, M: Monoid, P> Iterator for Iter<'a, M, P> {
    type Item = &'a M::Value;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let link = self.front;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.front = self.tree.successor(link);
        }
        Some(&self.tree.nodes[link].raw)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<M: Monoid, P> DoubleEndedIterator for Iter<'_, M, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let link = self.back;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.back = self.tree.predecessor(link);
        }
        Some(&self.tree.nodes[link].raw)
    }
}

impl<M: Monoid, P> ExactSizeIterator for Iter<'_, M, P> {}

impl<M: Monoid, P> FusedIterator for Iter<'_, M, P> {}

// =============================================================================
// Cursors
// =============================================================================

/// A read-only cursor over a [`Treap`].
///
/// Besides the elements there is one extra "end" position, one past the last
/// element. Moving forward from the end wraps to the first element and moving
/// backward from the end wraps to the last one.
pub struct Cursor<'a, M: Monoid, P = StdRng> {
    tree: &'a Treap<M, P>,
    node: Link,
}

impl<'a, M: Monoid, P> Cursor<'a, M, P> {
    pub(crate) fn new(tree: &'a Treap<M, P>, node: Link) -> Self {
        Self { tree, node }
    }

    pub fn current(&self) -> Option<&'a M::Value> {
        if self.node.is_null() {
            None
        } else {
            Some(&self.tree.nodes[self.node].raw)
        }
    }

    pub fn is_end(&self) -> bool {
        self.node.is_null()
    }

    /// Position of the current element; `len()` at the end position.
    pub fn rank(&self) -> usize {
        if self.node.is_null() {
            self.tree.len()
        } else {
            self.tree.rank_of(self.node)
        }
    }

    pub fn move_next(&mut self) {
        self.node = step_next(self.tree, self.node);
    }

    pub fn move_prev(&mut self) {
        self.node = step_prev(self.tree, self.node);
    }

    /// `self.rank() - other.rank()`.
    ///
    /// # Panics
    ///
    /// If the cursors belong to different trees.
    pub fn distance(&self, other: &Cursor<'_, M, P>) -> isize {
        assert!(
            std::ptr::eq(self.tree, other.tree),
            "cursors belong to different trees"
        );
        self.rank() as isize - other.rank() as isize
    }
}

impl<M: Monoid, P> Clone for Cursor<'_, M, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Monoid, P> Copy for Cursor<'_, M, P> {}

impl<M: Monoid, P> PartialEq for Cursor<'_, M, P> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.node == other.node
    }
}

impl<M: Monoid, P> Eq for Cursor<'_, M, P> {}

impl<M: Monoid, P> std::fmt::Debug for Cursor<'_, M, P>
where
    M::Value: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Cursor").field(&self.current()).finish()
    }
}

/// A cursor that can edit the [`Treap`] it walks.
pub struct CursorMut<'a, M: Monoid, P = StdRng> {
    tree: &'a mut Treap<M, P>,
    node: Link,
}

impl<'a, M: Monoid, P> CursorMut<'a, M, P> {
    pub(crate) fn new(tree: &'a mut Treap<M, P>, node: Link) -> Self {
        Self { tree, node }
    }

    pub fn current(&self) -> Option<&M::Value> {
        if self.node.is_null() {
            None
        } else {
            Some(&self.tree.nodes[self.node].raw)
        }
    }

    pub fn is_end(&self) -> bool {
        self.node.is_null()
    }

    pub fn rank(&self) -> usize {
        if self.node.is_null() {
            self.tree.len()
        } else {
            self.tree.rank_of(self.node)
        }
    }

    pub fn move_next(&mut self) {
        self.node = step_next(&*self.tree, self.node);
    }

    pub fn move_prev(&mut self) {
        self.node = step_prev(&*self.tree, self.node);
    }

    pub fn as_cursor(&self) -> Cursor<'_, M, P> {
        Cursor::new(&*self.tree, self.node)
    }

    /// Replaces the current element, returning the old one. Does nothing at
    /// the end position.
    pub fn replace_current(&mut self, value: M::Value) -> Option<M::Value> {
        if self.node.is_null() {
            return None;
        }
        let old = std::mem::replace(&mut self.tree.nodes[self.node].raw, value);
        self.tree.fixup(self.node);
        Some(old)
    }

    /// Removes the current element and moves to the one after it.
    pub fn remove_current(&mut self) -> Option<M::Value> {
        if self.node.is_null() {
            return None;
        }
        let next = self.tree.successor(self.node);
        let value = self.tree.unlink(self.node);
        self.node = next;
        Some(value)
    }
}

impl<M: Monoid, P: PrioritySource> CursorMut<'_, M, P> {
    /// Inserts `value` right before the current element (at the end if the
    /// cursor is at the end position). The cursor keeps pointing at the same
    /// element.
    pub fn insert_before(&mut self, value: M::Value) {
        let pos = self.rank();
        self.tree.insert_at(pos, value);
    }
}

fn step_next<M: Monoid, P>(tree: &Treap<M, P>, node: Link) -> Link {
    if node.is_null() {
        tree.leftmost(tree.root)
    } else {
        tree.successor(node)
    }
}

fn step_prev<M: Monoid, P>(tree: &Treap<M, P>, node: Link) -> Link {
    if node.is_null() {
        tree.rightmost(tree.root)
    } else {
        tree.predecessor(node)
    }
}
