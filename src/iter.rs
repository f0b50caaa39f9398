use core::ptr::NonNull;

use crate::{Links, OrderedTree, TreeNode};

/// An in-order iterator over the elements of an [`OrderedTree`].
///
/// Iteration never restructures the tree, so it is available through a shared reference under
/// any policy.
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree OrderedTree<T>,

    front: Option<NonNull<T>>,
    back: Option<NonNull<T>>,

    len: usize,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree OrderedTree<T>) -> Self {
        Iter {
            tree,

            front: tree.first,
            back: tree.last,
            len: tree.len(),
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.len -= 1;

        // SAFETY: `cur` is an element of `self.tree`, which is borrowed for `'tree`.
        unsafe {
            self.front = self.tree.find_next_node(cur);
            Some(cur.as_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T: TreeNode<Links<T>> + ?Sized> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.len -= 1;

        unsafe {
            self.back = self.tree.find_prev_node(cur);
            Some(cur.as_ref())
        }
    }
}

impl<T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'_, T> {}

impl<T: TreeNode<Links<T>> + ?Sized> core::iter::FusedIterator for Iter<'_, T> {}

impl<T: TreeNode<Links<T>> + ?Sized> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            len: self.len,
        }
    }
}
