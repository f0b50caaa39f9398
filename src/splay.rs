//! The splay policy.
//!
//! Every node that is looked up, inserted or removed is first rotated to the root by a sequence
//! of splay steps. Given a node `x` with parent `p` and grandparent `g`:
//!
//! - zig: `p` is the root. Rotate `x` over `p`.
//! - zig-zig: `x` and `p` are children on the same side. Rotate `p` over `g`, then `x` over `p`.
//! - zig-zag: `x` and `p` are children on opposite sides. Rotate `x` over `p`, then over `g`.
//!
//! Splaying a node at depth `d` costs _O(d)_, and any sequence of `m` operations on a tree of at
//! most `n` nodes costs _O((m + n) log(n))_ in total.

use core::ptr::NonNull;

use crate::{policy::Policy, Dir, Error, InsertPosition, Links, OrderedTree, TreeNode};

/// The splay policy. See the [module documentation](self).
#[derive(Copy, Clone, Debug, Default)]
pub struct Splay;

impl Splay {
    /// Rotates `node` to the root of `tree`.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `tree`.
    pub unsafe fn splay<T>(tree: &mut OrderedTree<T>, node: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe {
            while let Some(parent) = T::links(node).as_ref().parent() {
                let Some(grandparent) = T::links(parent).as_ref().parent() else {
                    // Zig.
                    tree.rotate_at(parent, node);
                    break;
                };

                if tree.which_child(grandparent, parent) == tree.which_child(parent, node) {
                    // Zig-zig. The grandparent goes first.
                    tree.rotate_at(grandparent, parent);
                    tree.rotate_at(parent, node);
                } else {
                    // Zig-zag.
                    tree.rotate_twice_at(grandparent, parent, node);
                }
            }
        }
    }
}

impl Policy for Splay {
    fn find_node_at_index<T>(tree: &mut OrderedTree<T>, index: usize) -> Result<NonNull<T>, Error>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let node = tree.find_node_at_index(index)?;
        unsafe { Self::splay(tree, node) };
        Ok(node)
    }

    unsafe fn insert<T>(tree: &mut OrderedTree<T>, position: InsertPosition<T>, node: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe {
            tree.link(position, node);
            Self::splay(tree, node);
        }
    }

    unsafe fn remove<T>(tree: &mut OrderedTree<T>, node: NonNull<T>) -> T::Handle
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe {
            Self::splay(tree, node);
            debug_assert_eq!(tree.root, Some(node));

            let prev = tree.find_prev_node(node);
            let next = tree.find_next_node(node);

            // Detach the root, leaving its two subtrees as free trees.
            let left = tree.cut_child(node, Dir::Left);
            let right = tree.cut_child(node, Dir::Right);
            tree.root = left;

            match (left, prev) {
                (Some(_), Some(prev)) => {
                    // `prev` is the maximum of the left subtree. Once it is the root, its right
                    // child is missing and the right subtree can hang there.
                    Self::splay(tree, prev);

                    if let Some(right) = right {
                        tree.attach_child(prev, Dir::Right, right);
                    }
                }

                _ => tree.root = right,
            }

            if tree.first == Some(node) {
                tree.first = next;
            }

            if tree.last == Some(node) {
                tree.last = prev;
            }

            T::links(node).as_mut().clear();
            T::from_ptr(node)
        }
    }

    fn join<T>(tree: &mut OrderedTree<T>, other: &mut OrderedTree<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        #[cfg(feature = "tracing")]
        tracing::trace!(len = tree.len(), donor_len = other.len(), "join");

        let Some(last) = tree.last else {
            core::mem::swap(tree, other);
            return;
        };

        unsafe {
            // With `last` at the root, the root's right child is the back of the sequence.
            Self::splay(tree, last);

            let position = tree.get_last_insert_position();
            tree.link_tree(position, other);
        }
    }

    fn split_off<T>(tree: &mut OrderedTree<T>, at: usize) -> Result<OrderedTree<T>, Error>
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let len = tree.len();

        #[cfg(feature = "tracing")]
        tracing::trace!(len, at, "split");

        if at > len {
            return Err(Error::OutOfRange { index: at, len });
        }

        if at == 0 {
            return Ok(tree.take());
        }

        let mut tail = OrderedTree::new();

        if at == len {
            return Ok(tail);
        }

        unsafe {
            // The last node that stays becomes the root, so everything after it is exactly the
            // root's right subtree.
            let pivot = Self::find_node_at_index(tree, at - 1)?;
            let right = tree
                .cut_child(pivot, Dir::Right)
                .expect("pivot must have a right subtree");

            let first = tail.min_in_subtree(right).0;
            tail.first = Some(first);
            tail.last = tree.last;
            tail.root = Some(right);

            tree.last = Some(pivot);

            // The walk down to `first` is paid for by splaying it.
            Self::splay(&mut tail, first);
        }

        Ok(tail)
    }
}

#[cfg(test)]
mod tests {
    use std::{boxed::Box, prelude::v1::*};

    use cordyceps::Linked;

    use super::*;
    use crate::Basic;

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

    // Builds a right spine 0 -> 1 -> ... -> n-1 without restructuring.
    fn spine(n: u32) -> (OrderedTree<TestNode>, Vec<NonNull<TestNode>>) {
        let mut tree = OrderedTree::new();
        let nodes = (0..n)
            .map(|v| Basic::emplace_back(&mut tree, v))
            .collect();
        (tree, nodes)
    }

    fn values(tree: &OrderedTree<TestNode>) -> Vec<u32> {
        tree.iter().map(|node| node.value).collect()
    }

    #[test]
    fn zig() {
        let (mut tree, nodes) = spine(2);

        unsafe { Splay::splay(&mut tree, nodes[1]) };
        tree.assert_invariants();

        assert_eq!(tree.root_raw(), Some(nodes[1]));
        assert_eq!(tree.rotation_count(), 1);
        assert_eq!(values(&tree), [0, 1]);
    }

    #[test]
    fn zig_zig() {
        let (mut tree, nodes) = spine(3);

        unsafe { Splay::splay(&mut tree, nodes[2]) };
        tree.assert_invariants();

        // 2 becomes the root with 1 as its left child and 0 below that.
        assert_eq!(tree.root_raw(), Some(nodes[2]));
        assert_eq!(tree.height(), 3);
        assert_eq!(tree.rotation_count(), 2);
        assert_eq!(values(&tree), [0, 1, 2]);
    }

    #[test]
    fn zig_zag() {
        let mut tree = OrderedTree::new();
        let a = Basic::emplace_back(&mut tree, 0);
        let c = Basic::emplace_back(&mut tree, 2);
        let b = unsafe { Basic::emplace_before(&mut tree, Some(c), 1) };
        tree.assert_invariants();
        assert_eq!(tree.root_raw(), Some(a));

        unsafe { Splay::splay(&mut tree, b) };
        tree.assert_invariants();

        assert_eq!(tree.root_raw(), Some(b));
        assert_eq!(tree.height(), 2);
        assert_eq!(values(&tree), [0, 1, 2]);
    }

    #[test]
    fn splay_halves_spine() {
        let (mut tree, nodes) = spine(64);
        assert_eq!(tree.height(), 64);

        unsafe { Splay::splay(&mut tree, nodes[63]) };
        tree.assert_invariants();

        // Zig-zig steps fold the spine roughly in half.
        assert!(tree.height() <= 40, "height {}", tree.height());
    }

    #[test]
    fn find_moves_to_root() {
        let (mut tree, nodes) = spine(10);

        for index in [3, 9, 0, 5] {
            let node = Splay::find_node_at_index(&mut tree, index).unwrap();
            tree.assert_invariants();

            assert_eq!(node, nodes[index]);
            assert_eq!(tree.root_raw(), Some(node));
        }

        assert_eq!(
            Splay::find_node_at_index(&mut tree, 10),
            Err(Error::OutOfRange { index: 10, len: 10 })
        );
    }

    #[test]
    fn remove_root_joins_children() {
        let (mut tree, nodes) = spine(7);

        for &index in &[3, 0, 6, 2] {
            let removed = unsafe { Splay::remove(&mut tree, nodes[index]) };
            assert_eq!(removed.value, index as u32);
            tree.assert_invariants();
        }

        assert_eq!(values(&tree), [1, 4, 5]);
    }

    #[test]
    fn split_and_join() {
        let (mut tree, _) = spine(5);

        let mut tail = Splay::split_off(&mut tree, 2).unwrap();
        tree.assert_invariants();
        tail.assert_invariants();
        assert_eq!(tree.root_raw(), tree.last_raw());
        assert_eq!(tail.root_raw(), tail.first_raw());
        assert_eq!(values(&tree), [0, 1]);
        assert_eq!(values(&tail), [2, 3, 4]);

        Splay::join(&mut tree, &mut tail);
        tree.assert_invariants();
        tail.assert_invariants();
        assert_eq!(values(&tree), [0, 1, 2, 3, 4]);
        assert!(tail.is_empty());
    }
}
