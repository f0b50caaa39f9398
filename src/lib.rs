//! An intrusive, index-addressed sequence tree with pluggable rebalancing.
//!
//! Nodes are ordered by position only: the left subtree of a node holds the elements that come
//! before it, and the right subtree holds the elements that come after it. Every node caches the
//! number of nodes in its subtree, which makes positional lookup, insertion and removal
//! _O(depth)_. The tree also caches its first and last node, so both ends are reachable in
//! _O(1)_.
//!
//! [`OrderedTree`] only provides the structural primitives. How the tree is kept shallow is
//! decided by a [`Policy`]:
//!
//! - [`Splay`] moves every accessed, inserted or removed node to the root, which gives
//!   _O(log(n))_ amortized cost for every indexed operation, and _O(log(n))_ amortized join and
//!   split.
//! - [`Basic`] links and unlinks nodes without any restructuring. It degrades to a linked list
//!   under sorted insertion and exists as a reference for the splay policy.
//!
//! [`Seq`] wraps the tree and a policy into an owned sequence of boxed values.
#![no_std]

// Conventions used in comments:
// - `size(x)` is the number of nodes in the subtree rooted at `x`; a missing subtree has size 0.
// - `p(x)` is the parent of `x`.
//
// The invariants maintained by every entry point are:
// 1. `size(x) = 1 + size(left(x)) + size(right(x))` for every node `x`.
// 2. `p(c) = x` for every child `c` of `x`, and the root has no parent.
// 3. `first` is the leftmost node and `last` is the rightmost node.
//
// Rotations move nodes around without allocating or freeing them, so a pointer to a node stays
// valid until that node is erased.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

use core::{
    cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not, pin::Pin,
    ptr::NonNull,
};

use cordyceps::Linked;

pub mod cursor;
#[cfg(feature = "alloc")]
mod debug;
pub mod error;
pub mod iter;
#[cfg(any(all(test, feature = "std"), feature = "model"))]
pub mod model;
pub mod policy;
pub mod position;
#[cfg(feature = "alloc")]
pub mod seq;
pub mod splay;

#[cfg(all(test, feature = "std"))]
mod tests;

pub use cursor::{Cursor, CursorMut};
pub use error::Error;
pub use iter::Iter;
pub use policy::{Basic, Policy};
pub use position::InsertPosition;
#[cfg(feature = "alloc")]
pub use seq::{BasicSeq, Seq, SeqNode, SplaySeq};
pub use splay::Splay;

use position::Slot;

/// A node type that can be linked into an [`OrderedTree`].
pub trait TreeNode<L>: Linked<L> {
    /// The element type stored in each node.
    type Value;

    /// Allocates a new, unlinked node holding `value`.
    ///
    /// The returned handle owns the node. Together with [`Linked::from_ptr`], this is the
    /// allocation strategy of every tree of `Self`.
    fn new_node(value: Self::Value) -> Self::Handle;

    /// Returns a reference to the element stored in this node.
    fn value(&self) -> &Self::Value;
}

/// An intrusive binary tree ordered by position.
///
/// The tree owns every node linked into it, and releases them through [`Linked::from_ptr`] when
/// they are erased or when the tree is dropped. It performs no rebalancing by itself; see
/// [`Policy`].
pub struct OrderedTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    first: Link<T>,
    last: Link<T>,
    rotations: u64,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    size: usize,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T> OrderedTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> OrderedTree<T> {
        OrderedTree {
            root: None,
            first: None,
            last: None,
            rotations: 0,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        let empty = self.root.is_none();

        debug_assert_eq!(empty, self.first.is_none());
        debug_assert_eq!(empty, self.last.is_none());

        empty
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        unsafe { self.size(self.root) }
    }

    /// Returns the first element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.first
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the last element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.last
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    /// Returns a pointer to the first node, if any.
    pub fn first_raw(&self) -> Option<NonNull<T>> {
        self.first
    }

    /// Returns a pointer to the last node, if any.
    pub fn last_raw(&self) -> Option<NonNull<T>> {
        self.last
    }

    /// Returns a pointer to the root node, if any.
    pub fn root_raw(&self) -> Option<NonNull<T>> {
        self.root
    }

    /// Returns an iterator over the nodes of the tree, in order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Returns a cursor pointing at the first element of the tree.
    pub fn cursor_first(&self) -> Cursor<'_, T> {
        Cursor::first(self)
    }

    /// Returns a cursor pointing at the last element of the tree.
    pub fn cursor_last(&self) -> Cursor<'_, T> {
        Cursor::last(self)
    }

    /// Returns a cursor pointing at the first element of the tree, which can edit the tree
    /// through the policy `P`.
    pub fn cursor_first_mut<P: Policy>(&mut self) -> CursorMut<'_, T, P> {
        CursorMut::first(self)
    }

    /// Returns a cursor pointing at the last element of the tree, which can edit the tree
    /// through the policy `P`.
    pub fn cursor_last_mut<P: Policy>(&mut self) -> CursorMut<'_, T, P> {
        CursorMut::last(self)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert!(self.first.is_none(), "empty tree has a first node");
            assert!(self.last.is_none(), "empty tree has a last node");
            return;
        };

        unsafe {
            assert_eq!(
                T::links(root).as_ref().parent(),
                None,
                "root must not have a parent"
            );

            let counted = self.assert_invariants_at(root);
            assert_eq!(counted, self.len());

            assert_eq!(self.first, Some(self.min_in_subtree(root).0), "stale first");
            assert_eq!(self.last, Some(self.max_in_subtree(root)), "stale last");
        }
    }

    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(&self, node: NonNull<T>) -> usize {
        let mut count = 1;

        unsafe {
            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = T::links(node).as_ref().child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = T::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);

                    count += self.assert_invariants_at(child);
                }
            }

            assert_eq!(
                T::links(node).as_ref().size(),
                count,
                "cached subtree size is stale"
            );
        }

        count
    }

    /// Returns the number of nodes on the longest path from the root to a leaf.
    #[doc(hidden)]
    pub fn height(&self) -> usize {
        unsafe fn height_at<T>(node: Link<T>) -> usize
        where
            T: TreeNode<Links<T>> + ?Sized,
        {
            match node {
                Some(node) => unsafe {
                    let links = T::links(node);
                    1 + height_at(links.as_ref().left()).max(height_at(links.as_ref().right()))
                },
                None => 0,
            }
        }

        unsafe { height_at(self.root) }
    }

    /// Returns the number of rotations performed on this tree since it was created.
    #[doc(hidden)]
    pub fn rotation_count(&self) -> u64 {
        self.rotations
    }

    /// Returns the node at in-order position `index`.
    ///
    /// This descends from the root, comparing `index` against the size of the left subtree at
    /// each level, and completes in _O(depth)_ time. The tree is not restructured; use
    /// [`Policy::find_node_at_index`] to let the policy react to the access.
    pub fn find_node_at_index(&self, index: usize) -> Result<NonNull<T>, Error> {
        let len = self.len();
        let out_of_range = Error::OutOfRange { index, len };

        if index >= len {
            return Err(out_of_range);
        }

        let mut cur = self.root.ok_or(out_of_range)?;
        let mut index = index;

        loop {
            unsafe {
                let links = T::links(cur).as_ref();
                let left_size = self.size(links.left());

                match index.cmp(&left_size) {
                    Ordering::Less => {
                        cur = links.left().expect("left subtree must be non-empty");
                    }
                    Ordering::Equal => return Ok(cur),
                    Ordering::Greater => {
                        index -= left_size + 1;
                        cur = links.right().expect("index must fall in the right subtree");
                    }
                }
            }
        }
    }

    /// Returns the in-order position of `node`.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn index_of(&self, node: NonNull<T>) -> usize {
        unsafe {
            let mut index = self.size(T::links(node).as_ref().left());
            let mut cur = node;

            while let Some(parent) = T::links(cur).as_ref().parent() {
                if T::links(parent).as_ref().right() == Some(cur) {
                    index += self.size(T::links(parent).as_ref().left()) + 1;
                }

                cur = parent;
            }

            index
        }
    }

    /// Returns the in-order successor of `node`, or `None` if `node` is the last node.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn find_next_node(&self, node: NonNull<T>) -> Option<NonNull<T>> {
        unsafe { self.neighbor(node, Dir::Right) }
    }

    /// Returns the in-order predecessor of `node`, or `None` if `node` is the first node.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn find_prev_node(&self, node: NonNull<T>) -> Option<NonNull<T>> {
        unsafe { self.neighbor(node, Dir::Left) }
    }

    // Returns the closest node in direction `dir`.
    unsafe fn neighbor(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            if let Some(child) = T::links(node).as_ref().child(dir) {
                return Some(self.extreme_in_subtree(child, !dir));
            }

            // Ascend until `cur` is a `!dir` child; its parent is the neighbor.
            let mut cur = node;
            while let Some(parent) = T::links(cur).as_ref().parent() {
                if T::links(parent).as_ref().child(!dir) == Some(cur) {
                    return Some(parent);
                }

                cur = parent;
            }

            None
        }
    }

    /// Allocates a new node holding `value`.
    ///
    /// The node is not linked into the tree. The caller takes responsibility for either linking
    /// it with [`link`](Self::link) or releasing it with [`Linked::from_ptr`].
    pub fn create_node(&mut self, value: T::Value) -> NonNull<T> {
        let ptr = T::into_ptr(T::new_node(value));
        unsafe { T::links(ptr).as_mut().clear() };
        ptr
    }

    /// Attaches `node`, together with its whole subtree, at `position`.
    ///
    /// The sizes of all ancestors of the slot grow by the size of `node`'s subtree, and the
    /// cached first and last nodes are refreshed if the slot is at either end of the sequence.
    /// This completes in _O(depth)_ time.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `position` was obtained from `self`, and `self` has not been modified since.
    /// - `node` is the detached root of a subtree that belongs to no tree.
    pub unsafe fn link(&mut self, position: InsertPosition<T>, node: NonNull<T>) {
        unsafe {
            debug_assert!(
                T::links(node).as_ref().parent().is_none(),
                "linked node must be detached"
            );

            let first = self.min_in_subtree(node).0;
            let last = self.max_in_subtree(node);
            self.link_subtree(position, node, first, last);
        }
    }

    /// Attaches every node of `other` at `position`, leaving `other` empty.
    ///
    /// This completes in _O(depth)_ time, using `other`'s cached first and last nodes.
    ///
    /// # Safety
    ///
    /// `position` must have been obtained from `self`, and `self` must not have been modified
    /// since.
    pub unsafe fn link_tree(&mut self, position: InsertPosition<T>, other: &mut OrderedTree<T>) {
        let (Some(root), Some(first), Some(last)) =
            (other.root.take(), other.first.take(), other.last.take())
        else {
            return;
        };

        unsafe { self.link_subtree(position, root, first, last) };
    }

    unsafe fn link_subtree(
        &mut self,
        position: InsertPosition<T>,
        node: NonNull<T>,
        first: NonNull<T>,
        last: NonNull<T>,
    ) {
        unsafe {
            match position.into_slot() {
                Slot::Root => {
                    assert!(self.root.is_none(), "root slot is occupied");

                    T::links(node).as_mut().set_parent(None);
                    self.root = Some(node);
                    self.first = Some(first);
                    self.last = Some(last);
                }

                Slot::Child { parent, dir } => {
                    let added = self.size(Some(node));
                    let prev = T::links(parent).as_mut().set_child(dir, Some(node));
                    assert!(prev.is_none(), "insert position is occupied");
                    T::links(node).as_mut().set_parent(Some(parent));

                    self.grow_path(Some(parent), added);

                    match dir {
                        Dir::Left if self.first == Some(parent) => self.first = Some(first),
                        Dir::Right if self.last == Some(parent) => self.last = Some(last),
                        _ => (),
                    }
                }
            }
        }
    }

    /// Creates a node holding `value` and attaches it at `position`.
    ///
    /// # Safety
    ///
    /// `position` must have been obtained from `self`, and `self` must not have been modified
    /// since.
    pub unsafe fn emplace(&mut self, position: InsertPosition<T>, value: T::Value) -> NonNull<T> {
        let node = self.create_node(value);
        unsafe { self.link(position, node) };
        node
    }

    /// Removes `node` from the tree and returns its handle.
    ///
    /// A node with at most one child is spliced out directly. A node with two children is
    /// replaced by its in-order successor; the successor node itself is relinked, so pointers to
    /// every other node stay valid. Ancestor sizes shrink by one.
    ///
    /// If `UPDATE_EXTREMES` is `false`, the cached first and last nodes are left untouched, and
    /// the caller is responsible for updating them if `node` was either of them.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn erase<const UPDATE_EXTREMES: bool>(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            if UPDATE_EXTREMES {
                if self.first == Some(node) {
                    self.first = self.find_next_node(node);
                }

                if self.last == Some(node) {
                    self.last = self.find_prev_node(node);
                }
            }

            let parent = T::links(node).as_ref().parent();
            let left = T::links(node).as_ref().left();
            let right = T::links(node).as_ref().right();

            match (left, right) {
                (Some(left), Some(right)) => {
                    let (successor, successor_parent) = self.min_in_subtree(right);

                    if let Some(successor_parent) = successor_parent {
                        // Elevate the successor's right child to replace it.
                        let successor_right = T::links(successor).as_ref().right();
                        self.replace_child(successor_parent, successor, successor_right);
                        self.maybe_set_parent(successor_right, Some(successor_parent));

                        T::links(successor).as_mut().set_right(Some(right));
                        T::links(right).as_mut().set_parent(Some(successor));

                        // Every node between the successor's old slot and `right` lost one
                        // descendant.
                        self.shrink_path(Some(successor_parent), Some(successor), 1);
                    }

                    self.replace_child_or_set_root(parent, node, Some(successor));

                    T::links(successor).as_mut().set_parent(parent);
                    T::links(successor).as_mut().set_left(Some(left));
                    // Right link is updated above iff successor != right.
                    T::links(left).as_mut().set_parent(Some(successor));

                    let size = T::links(node).as_ref().size() - 1;
                    T::links(successor).as_mut().set_size(size);
                }

                (Some(child), None) | (None, Some(child)) => {
                    self.replace_child_or_set_root(parent, node, Some(child));
                    T::links(child).as_mut().set_parent(parent);
                }

                (None, None) => {
                    self.replace_child_or_set_root(parent, node, None);
                }
            }

            self.shrink_path(parent, None, 1);

            T::links(node).as_mut().clear();
            T::from_ptr(node)
        }
    }

    /// Releases every node of the tree, leaving it empty.
    ///
    /// Nodes are released in order without recursion, so this is safe for trees of any depth.
    pub fn destroy_all_nodes(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(len = self.len(), "destroying all nodes");

        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = self.min_in_subtree(cur);
                let parent = parent.or_else(|| T::links(cur).as_ref().parent());

                let right = T::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                T::links(cur).as_mut().clear();
                drop(T::from_ptr(cur));

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        self.first = None;
        self.last = None;

        debug_assert!(self.root.is_none());
    }

    /// Moves every node of `self` into a new tree, leaving `self` empty.
    pub fn take(&mut self) -> OrderedTree<T> {
        OrderedTree {
            root: self.root.take(),
            first: self.first.take(),
            last: self.last.take(),
            rotations: 0,
        }
    }

    // Support methods ========================================================

    /// Returns the size of the subtree rooted at the pointed-to node.
    #[inline]
    unsafe fn size(&self, node: Link<T>) -> usize {
        node.map(|n| unsafe { T::links(n).as_ref().size() })
            .unwrap_or(0)
    }

    // Recomputes the size of `node` from its children.
    #[inline]
    unsafe fn update_size(&mut self, node: NonNull<T>) {
        unsafe {
            let links = T::links(node).as_ref();
            let size = 1 + self.size(links.left()) + self.size(links.right());
            T::links(node).as_mut().set_size(size);
        }
    }

    // Adds `by` to the size of `from` and every ancestor of it.
    unsafe fn grow_path(&mut self, from: Link<T>, by: usize) {
        let mut opt_cur = from;

        while let Some(cur) = opt_cur {
            unsafe {
                let links = T::links(cur).as_mut();
                links.set_size(links.size() + by);
                opt_cur = links.parent();
            }
        }
    }

    // Subtracts `by` from the size of `from` and every ancestor of it, stopping before `until`.
    unsafe fn shrink_path(&mut self, from: Link<T>, until: Link<T>, by: usize) {
        let mut opt_cur = from;

        while let Some(cur) = opt_cur {
            if opt_cur == until {
                break;
            }

            unsafe {
                let links = T::links(cur).as_mut();
                links.set_size(links.size() - by);
                opt_cur = links.parent();
            }
        }
    }

    // Detaches the `dir` child of `parent` and returns it as the root of a free subtree.
    //
    // Ancestor sizes are updated. The cached first and last nodes are not.
    pub(crate) unsafe fn cut_child(&mut self, parent: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            let child = T::links(parent).as_mut().set_child(dir, None)?;
            T::links(child).as_mut().set_parent(None);

            let removed = self.size(Some(child));
            self.shrink_path(Some(parent), None, removed);

            Some(child)
        }
    }

    // Attaches the free subtree `child` as the `dir` child of `parent`, which must be missing.
    //
    // Ancestor sizes are updated. The cached first and last nodes are not.
    pub(crate) unsafe fn attach_child(&mut self, parent: NonNull<T>, dir: Dir, child: NonNull<T>) {
        unsafe {
            let prev = T::links(parent).as_mut().set_child(dir, Some(child));
            assert!(prev.is_none(), "attachment slot is occupied");
            T::links(child).as_mut().set_parent(Some(parent));

            let added = self.size(Some(child));
            self.grow_path(Some(parent), added);
        }
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    #[inline]
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Option<NonNull<T>>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert_eq!(
                T::links(parent).as_ref().child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );
            debug_assert!(
                new_child.is_none() || T::links(parent).as_ref().child(!dir) != new_child,
                "`new_child` must not be a child of `parent`"
            );

            T::links(parent).as_mut().set_child(dir, new_child);
        }
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // `up` takes over the subtree size of `down`, and the size of `down` is recomputed.
    pub(crate) fn rotate_at(&mut self, down: NonNull<T>, up: NonNull<T>) {
        unsafe {
            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let dir = if T::links(down).as_ref().right() == Some(up) {
                Dir::Left
            } else {
                Dir::Right
            };

            debug_assert_eq!(T::links(up).as_ref().parent(), Some(down));
            debug_assert_ne!(self.root, Some(up));

            let across = T::links(up).as_ref().child(dir);
            T::links(down).as_mut().set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            T::links(up).as_mut().set_child(dir, Some(down));
            let parent = T::links(down).as_mut().set_parent(Some(up));
            T::links(up).as_mut().set_parent(parent);

            self.replace_child_or_set_root(parent, down, Some(up));

            let total = T::links(down).as_ref().size();
            T::links(up).as_mut().set_size(total);
            self.update_size(down);
        }

        self.rotations += 1;
    }

    // Performs a double rotation at the non-root node `up`, whose parent `down_first` is on the
    // opposite side of its own parent `down_second`.
    //
    // `up` takes over the subtree size of `down_second`; both other sizes are recomputed.
    pub(crate) fn rotate_twice_at(
        &mut self,
        down_second: NonNull<T>,
        down_first: NonNull<T>,
        up: NonNull<T>,
    ) {
        unsafe {
            let dir = if T::links(down_first).as_ref().right() == Some(up) {
                Dir::Right
            } else {
                Dir::Left
            };

            debug_assert_eq!(
                T::links(down_second).as_ref().child(!dir),
                Some(down_first),
                "double rotation requires a zig-zag shape"
            );

            let total = T::links(down_second).as_ref().size();

            let across_first = T::links(up).as_ref().child(!dir);
            let across_second = T::links(up).as_ref().child(dir);

            self.maybe_set_parent(across_first, Some(down_first));

            T::links(down_first).as_mut().set_child(dir, across_first);
            T::links(down_first).as_mut().set_parent(Some(up));

            self.maybe_set_parent(across_second, Some(down_second));

            T::links(down_second)
                .as_mut()
                .set_child(!dir, across_second);
            let parent = T::links(down_second).as_mut().set_parent(Some(up));

            T::links(up).as_mut().set_parent(parent);
            T::links(up).as_mut().set_child(!dir, Some(down_first));
            T::links(up).as_mut().set_child(dir, Some(down_second));

            self.replace_child_or_set_root(parent, down_second, Some(up));

            self.update_size(down_first);
            self.update_size(down_second);
            T::links(up).as_mut().set_size(total);
        }

        self.rotations += 2;
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<T>) -> (NonNull<T>, Option<NonNull<T>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { T::links(cur).as_ref().left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    // Returns the maximum node in the subtree.
    #[inline]
    unsafe fn max_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        unsafe { self.extreme_in_subtree(root, Dir::Right) }
    }

    #[inline]
    unsafe fn extreme_in_subtree(&self, root: NonNull<T>, dir: Dir) -> NonNull<T> {
        let mut cur = root;

        while let Some(child) = unsafe { T::links(cur).as_ref().child(dir) } {
            cur = child;
        }

        cur
    }

    pub(crate) unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if unsafe { T::links(parent).as_ref().left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

impl<T> Default for OrderedTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for OrderedTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.destroy_all_nodes();
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                size: 1,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Returns the number of nodes in the subtree rooted at this node.
    #[inline]
    pub fn subtree_size(&self) -> usize {
        self.size()
    }

    #[inline]
    fn size(&self) -> usize {
        unsafe { (*self.inner.get()).size }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_size(&mut self, size: usize) {
        self.inner.get_mut().size = size;
    }

    // Resets the links to those of a detached single node.
    #[inline]
    fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.size = 1;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod engine_tests {
    use std::{boxed::Box, prelude::v1::*};

    use super::*;

    #[repr(C)]
    struct TestNode {
        links: Links<TestNode>,
        value: u32,
    }

    unsafe impl Linked<Links<TestNode>> for TestNode {
        type Handle = Box<TestNode>;

        fn into_ptr(r: Self::Handle) -> NonNull<Self> {
            NonNull::new(Box::into_raw(r)).unwrap()
        }

        unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
            unsafe { Box::from_raw(ptr.as_ptr()) }
        }

        unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
            // SAFETY: Self is #[repr(C)] and `links` is first field
            ptr.cast()
        }
    }

    impl TreeNode<Links<TestNode>> for TestNode {
        type Value = u32;

        fn new_node(value: u32) -> Box<TestNode> {
            Box::new(TestNode {
                links: Links::new(),
                value,
            })
        }

        fn value(&self) -> &u32 {
            &self.value
        }
    }

    fn values(tree: &OrderedTree<TestNode>) -> Vec<u32> {
        tree.iter().map(|node| node.value).collect()
    }

    fn push_back(tree: &mut OrderedTree<TestNode>, value: u32) -> NonNull<TestNode> {
        let pos = tree.get_last_insert_position();
        let node = unsafe { tree.emplace(pos, value) };
        tree.assert_invariants();
        node
    }

    #[test]
    fn empty_tree() {
        let tree: OrderedTree<TestNode> = OrderedTree::new();
        tree.assert_invariants();

        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.first().is_none());
        assert_eq!(
            tree.find_node_at_index(0),
            Err(Error::OutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn find_every_index() {
        let mut tree: OrderedTree<TestNode> = OrderedTree::new();

        for value in 0..32 {
            push_back(&mut tree, value);
        }

        for index in 0..32 {
            let node = tree.find_node_at_index(index).unwrap();
            assert_eq!(unsafe { node.as_ref().value }, index as u32);
            assert_eq!(unsafe { tree.index_of(node) }, index);
        }

        assert_eq!(
            tree.find_node_at_index(32),
            Err(Error::OutOfRange { index: 32, len: 32 })
        );
    }

    #[test]
    fn insert_before_and_after() {
        let mut tree: OrderedTree<TestNode> = OrderedTree::new();
        let middle = push_back(&mut tree, 10);

        unsafe {
            let pos = tree.make_insert_position(middle, true);
            tree.emplace(pos, 5);
            tree.assert_invariants();

            let pos = tree.make_insert_position(middle, false);
            tree.emplace(pos, 15);
            tree.assert_invariants();

            let pos = tree.make_insert_position(middle, true);
            tree.emplace(pos, 7);
            tree.assert_invariants();

            let pos = tree.get_first_insert_position();
            tree.emplace(pos, 1);
            tree.assert_invariants();
        }

        assert_eq!(values(&tree), [1, 5, 7, 10, 15]);
        assert_eq!(tree.first().map(|n| n.value), Some(1));
        assert_eq!(tree.last().map(|n| n.value), Some(15));
    }

    #[test]
    fn erase_two_children_keeps_identity() {
        let mut tree: OrderedTree<TestNode> = OrderedTree::new();
        let root = push_back(&mut tree, 1);

        let nodes = unsafe {
            let left = tree.emplace(tree.make_insert_position(root, true), 0);
            let right = tree.emplace(tree.make_insert_position(root, false), 3);
            let right_left = tree.emplace(tree.make_insert_position(right, true), 2);
            [left, root, right_left, right]
        };
        tree.assert_invariants();
        assert_eq!(values(&tree), [0, 1, 2, 3]);

        // The successor of the root is `2`, which has a parent other than the root.
        let removed = unsafe { tree.erase::<true>(root) };
        assert_eq!(removed.value, 1);
        tree.assert_invariants();

        assert_eq!(tree.root_raw(), Some(nodes[2]));
        assert_eq!(values(&tree), [0, 2, 3]);

        for (index, node) in [nodes[0], nodes[2], nodes[3]].into_iter().enumerate() {
            assert_eq!(tree.find_node_at_index(index), Ok(node));
        }
    }

    #[test]
    fn erase_extremes() {
        let mut tree: OrderedTree<TestNode> = OrderedTree::new();
        let nodes: Vec<_> = (0..5).map(|v| push_back(&mut tree, v)).collect();

        unsafe {
            tree.erase::<true>(nodes[0]);
            tree.assert_invariants();
            tree.erase::<true>(nodes[4]);
            tree.assert_invariants();
        }

        assert_eq!(values(&tree), [1, 2, 3]);
        assert_eq!(tree.first_raw(), Some(nodes[1]));
        assert_eq!(tree.last_raw(), Some(nodes[3]));
    }

    #[test]
    fn link_whole_tree() {
        let mut a: OrderedTree<TestNode> = OrderedTree::new();
        let mut b: OrderedTree<TestNode> = OrderedTree::new();

        for v in 0..3 {
            push_back(&mut a, v);
        }
        for v in 3..6 {
            push_back(&mut b, v);
        }

        unsafe {
            let pos = a.get_last_insert_position();
            a.link_tree(pos, &mut b);
        }

        a.assert_invariants();
        b.assert_invariants();
        assert_eq!(values(&a), [0, 1, 2, 3, 4, 5]);
        assert!(b.is_empty());
    }

    #[test]
    fn rotations_keep_sizes() {
        let mut tree: OrderedTree<TestNode> = OrderedTree::new();
        let nodes: Vec<_> = (0..4).map(|v| push_back(&mut tree, v)).collect();

        // Sorted insertion builds a right spine: 0 -> 1 -> 2 -> 3.
        tree.rotate_at(nodes[0], nodes[1]);
        tree.assert_invariants();
        assert_eq!(tree.root_raw(), Some(nodes[1]));
        assert_eq!(tree.rotation_count(), 1);

        tree.rotate_at(nodes[1], nodes[2]);
        tree.assert_invariants();
        assert_eq!(values(&tree), [0, 1, 2, 3]);
        assert_eq!(tree.height(), 3);
    }

    #[test]
    fn destroy_all() {
        let mut tree: OrderedTree<TestNode> = OrderedTree::new();

        for v in 0..100 {
            push_back(&mut tree, v);
        }

        tree.destroy_all_nodes();
        tree.assert_invariants();
        assert!(tree.is_empty());

        push_back(&mut tree, 7);
        assert_eq!(values(&tree), [7]);
    }
}
