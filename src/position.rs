use core::{fmt, ptr::NonNull};

use crate::{Dir, Links, OrderedTree, TreeNode};

/// An open slot in an [`OrderedTree`] where a new node can be attached.
///
/// A position is either the root of an empty tree, or a missing child of an existing node. In
/// both cases it sits directly before or after an existing element, or at one end of the
/// sequence.
///
/// Positions are consumed by [`OrderedTree::link`] and cannot be copied. A position is only
/// meaningful until the tree it was obtained from is modified.
#[must_use = "an insert position does nothing unless it is linked into"]
pub struct InsertPosition<T: ?Sized> {
    slot: Slot<T>,
}

pub(crate) enum Slot<T: ?Sized> {
    Root,
    Child { parent: NonNull<T>, dir: Dir },
}

impl<T: ?Sized> InsertPosition<T> {
    fn root() -> Self {
        InsertPosition { slot: Slot::Root }
    }

    fn child(parent: NonNull<T>, dir: Dir) -> Self {
        InsertPosition {
            slot: Slot::Child { parent, dir },
        }
    }

    /// Returns `true` if this position is the root of an empty tree.
    pub fn is_root(&self) -> bool {
        matches!(self.slot, Slot::Root)
    }

    pub(crate) fn into_slot(self) -> Slot<T> {
        self.slot
    }
}

impl<T: ?Sized> fmt::Debug for InsertPosition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Slot::Root => f.write_str("InsertPosition::Root"),
            Slot::Child { parent, dir } => f
                .debug_struct("InsertPosition::Child")
                .field("parent", parent)
                .field("dir", dir)
                .finish(),
        }
    }
}

impl<T> OrderedTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns the slot in front of the first element.
    pub fn get_first_insert_position(&self) -> InsertPosition<T> {
        match self.first {
            Some(first) => InsertPosition::child(first, Dir::Left),
            None => InsertPosition::root(),
        }
    }

    /// Returns the slot behind the last element.
    pub fn get_last_insert_position(&self) -> InsertPosition<T> {
        match self.last {
            Some(last) => InsertPosition::child(last, Dir::Right),
            None => InsertPosition::root(),
        }
    }

    /// Returns the slot immediately before `node` if `before` is `true`, or immediately after it
    /// otherwise.
    ///
    /// If `node` is missing the child on that side, the slot is that child. Otherwise it is the
    /// missing child on the far side of `node`'s in-order neighbor within that subtree.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn make_insert_position(&self, node: NonNull<T>, before: bool) -> InsertPosition<T> {
        let dir = if before { Dir::Left } else { Dir::Right };

        match unsafe { T::links(node).as_ref().child(dir) } {
            Some(child) => InsertPosition::child(unsafe { self.extreme_in_subtree(child, !dir) }, !dir),
            None => InsertPosition::child(node, dir),
        }
    }

    /// Returns the slot immediately before `node`.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn get_prev_insert_position(&self, node: NonNull<T>) -> InsertPosition<T> {
        unsafe { self.make_insert_position(node, true) }
    }

    /// Returns the slot immediately after `node`.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn get_next_insert_position(&self, node: NonNull<T>) -> InsertPosition<T> {
        unsafe { self.make_insert_position(node, false) }
    }
}
