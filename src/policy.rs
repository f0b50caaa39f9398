//! Rebalancing policies.
//!
//! A [`Policy`] decides how an [`OrderedTree`] is restructured around the five logical
//! operations that can change its shape: lookup, insertion, removal, join and split. Policies are
//! zero-sized types used as type parameters, so every call is statically dispatched.

use core::ptr::NonNull;

use crate::{Error, InsertPosition, Links, OrderedTree, TreeNode};

/// A strategy for keeping an [`OrderedTree`] shallow.
///
/// Implementors provide the five shape-changing operations. Everything else is built on top of
/// them by the provided methods.
pub trait Policy {
    /// Returns the node at in-order position `index`.
    fn find_node_at_index<T>(tree: &mut OrderedTree<T>, index: usize) -> Result<NonNull<T>, Error>
    where
        T: TreeNode<Links<T>> + ?Sized;

    /// Links the detached node `node` at `position`.
    ///
    /// # Safety
    ///
    /// See [`OrderedTree::link`].
    unsafe fn insert<T>(tree: &mut OrderedTree<T>, position: InsertPosition<T>, node: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized;

    /// Removes `node` from the tree and returns its handle.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `tree`.
    unsafe fn remove<T>(tree: &mut OrderedTree<T>, node: NonNull<T>) -> T::Handle
    where
        T: TreeNode<Links<T>> + ?Sized;

    /// Moves every element of `other` to the back of `tree`, leaving `other` empty.
    fn join<T>(tree: &mut OrderedTree<T>, other: &mut OrderedTree<T>)
    where
        T: TreeNode<Links<T>> + ?Sized;

    /// Splits `tree` at `at`, returning a new tree with the elements in `at..len`.
    ///
    /// `tree` keeps the elements in `0..at`. Returns [`Error::OutOfRange`] without modifying
    /// `tree` if `at > len`.
    fn split_off<T>(tree: &mut OrderedTree<T>, at: usize) -> Result<OrderedTree<T>, Error>
    where
        T: TreeNode<Links<T>> + ?Sized;

    /// Creates a node holding `value`, inserts it at `position` and returns it.
    ///
    /// # Safety
    ///
    /// See [`OrderedTree::link`].
    unsafe fn emplace<T>(
        tree: &mut OrderedTree<T>,
        position: InsertPosition<T>,
        value: T::Value,
    ) -> NonNull<T>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let node = tree.create_node(value);
        unsafe { Self::insert(tree, position, node) };
        node
    }

    /// Creates a node holding `value` and places it as the first node of `tree`.
    fn emplace_front<T>(tree: &mut OrderedTree<T>, value: T::Value) -> NonNull<T>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let position = tree.get_first_insert_position();
        unsafe { Self::emplace(tree, position, value) }
    }

    /// Creates a node holding `value` and places it as the last node of `tree`.
    fn emplace_back<T>(tree: &mut OrderedTree<T>, value: T::Value) -> NonNull<T>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let position = tree.get_last_insert_position();
        unsafe { Self::emplace(tree, position, value) }
    }

    /// Creates a node holding `value` and places it immediately before `node`, or at the back
    /// of `tree` if `node` is `None`.
    ///
    /// # Safety
    ///
    /// If `node` is `Some`, it must be an element of `tree`.
    unsafe fn emplace_before<T>(
        tree: &mut OrderedTree<T>,
        node: Option<NonNull<T>>,
        value: T::Value,
    ) -> NonNull<T>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let position = match node {
            Some(node) => unsafe { tree.get_prev_insert_position(node) },
            None => tree.get_last_insert_position(),
        };

        unsafe { Self::emplace(tree, position, value) }
    }

    /// Inserts nodes for every value of `values`, in order, immediately before `node` (or at the
    /// back of `tree` if `node` is `None`), and returns the first new node.
    ///
    /// If `values` is empty, this returns `node`.
    ///
    /// # Safety
    ///
    /// If `node` is `Some`, it must be an element of `tree`.
    unsafe fn insert_values_before<T, I>(
        tree: &mut OrderedTree<T>,
        node: Option<NonNull<T>>,
        values: I,
    ) -> Option<NonNull<T>>
    where
        T: TreeNode<Links<T>> + ?Sized,
        I: IntoIterator<Item = T::Value>,
    {
        let mut values = values.into_iter();

        let Some(value) = values.next() else {
            return node;
        };

        let first_new = unsafe { Self::emplace_before(tree, node, value) };

        let mut prev = first_new;
        for value in values {
            prev = unsafe {
                let position = tree.get_next_insert_position(prev);
                Self::emplace(tree, position, value)
            };
        }

        Some(first_new)
    }

    /// Replaces the contents of `tree` with `values`.
    fn assign<T, I>(tree: &mut OrderedTree<T>, values: I)
    where
        T: TreeNode<Links<T>> + ?Sized,
        I: IntoIterator<Item = T::Value>,
    {
        tree.destroy_all_nodes();
        unsafe { Self::insert_values_before(tree, None, values) };
    }

    /// Moves every element of `other` to the front of `tree`, leaving `other` empty.
    fn join_front<T>(tree: &mut OrderedTree<T>, other: &mut OrderedTree<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        Self::join(other, tree);
        core::mem::swap(tree, other);
    }

    /// Removes the first node of `tree`, returning its handle.
    fn erase_front<T>(tree: &mut OrderedTree<T>) -> Option<T::Handle>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let first = tree.first_raw()?;
        Some(unsafe { Self::remove(tree, first) })
    }

    /// Removes the last node of `tree`, returning its handle.
    fn erase_back<T>(tree: &mut OrderedTree<T>) -> Option<T::Handle>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let last = tree.last_raw()?;
        Some(unsafe { Self::remove(tree, last) })
    }

    /// Removes `node` from `tree`, returning its handle and its former successor.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `tree`.
    unsafe fn erase_node<T>(
        tree: &mut OrderedTree<T>,
        node: NonNull<T>,
    ) -> (T::Handle, Option<NonNull<T>>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe {
            let next = tree.find_next_node(node);
            (Self::remove(tree, node), next)
        }
    }

    /// Removes and releases the nodes from `begin` up to, but not including, `end`, and returns
    /// `end`.
    ///
    /// # Safety
    ///
    /// `begin` must be an element of `tree`, and `end` must be `None` or an element of `tree` at
    /// or after `begin`.
    unsafe fn erase_nodes<T>(
        tree: &mut OrderedTree<T>,
        begin: NonNull<T>,
        end: Option<NonNull<T>>,
    ) -> Option<NonNull<T>>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let mut cur = Some(begin);

        while cur != end {
            let node = cur.expect("`end` must not precede `begin`");
            let (handle, next) = unsafe { Self::erase_node(tree, node) };
            drop(handle);
            cur = next;
        }

        end
    }
}

/// The trivial policy, which never restructures the tree.
///
/// Nodes are linked and unlinked in place, so the shape of the tree depends entirely on the
/// order of operations. Appending sorted input builds a right spine, making every operation
/// _O(n)_. This policy is a reference for [`Splay`](crate::Splay), not a practical choice.
#[derive(Copy, Clone, Debug, Default)]
pub struct Basic;

impl Policy for Basic {
    fn find_node_at_index<T>(tree: &mut OrderedTree<T>, index: usize) -> Result<NonNull<T>, Error>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        tree.find_node_at_index(index)
    }

    unsafe fn insert<T>(tree: &mut OrderedTree<T>, position: InsertPosition<T>, node: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe { tree.link(position, node) };
    }

    unsafe fn remove<T>(tree: &mut OrderedTree<T>, node: NonNull<T>) -> T::Handle
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe { tree.erase::<true>(node) }
    }

    fn join<T>(tree: &mut OrderedTree<T>, other: &mut OrderedTree<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let position = tree.get_last_insert_position();
        unsafe { tree.link_tree(position, other) };
    }

    // Moves the tail over one node at a time, which costs _O((len - at) * depth)_.
    fn split_off<T>(tree: &mut OrderedTree<T>, at: usize) -> Result<OrderedTree<T>, Error>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let len = tree.len();

        if at > len {
            return Err(Error::OutOfRange { index: at, len });
        }

        if at == 0 {
            return Ok(tree.take());
        }

        let mut tail = OrderedTree::new();

        while tree.len() > at {
            unsafe {
                let last = tree.last_raw().expect("tree must not be empty");
                let prev = tree.find_prev_node(last);

                // `first` is never erased here since `at > 0`.
                let handle = tree.erase::<false>(last);
                tree.last = prev;

                let node = T::into_ptr(handle);
                let position = tail.get_first_insert_position();
                tail.link(position, node);
            }
        }

        Ok(tail)
    }
}
