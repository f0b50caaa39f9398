use alloc::{boxed::Box, string::String};
use core::{
    fmt,
    hash::{Hash, Hasher},
    iter::FusedIterator,
    marker::{PhantomData, PhantomPinned},
    ptr::{self, NonNull},
};

use cordyceps::Linked;

use crate::{
    iter::Iter as NodeIter, Basic, Cursor, CursorMut, Error, Links, OrderedTree, Policy, Splay,
    TreeNode,
};

/// An indexed sequence backed by an [`OrderedTree`] of boxed nodes.
///
/// Every positional operation costs _O(depth)_. With the default [`Splay`] policy that is
/// _O(log(n))_ amortized, including [`append`](Seq::append) and [`split_off`](Seq::split_off).
pub struct Seq<V, P: Policy = Splay> {
    tree: OrderedTree<SeqNode<V>>,
    _policy: PhantomData<P>,
}

/// A [`Seq`] using the splay policy.
pub type SplaySeq<V> = Seq<V, Splay>;

/// A [`Seq`] that never rebalances. Only useful as a baseline.
pub type BasicSeq<V> = Seq<V, Basic>;

/// A heap-allocated node of a [`Seq`].
pub struct SeqNode<V> {
    links: Links<SeqNode<V>>,
    value: V,
    _unpin: PhantomPinned,
}

unsafe impl<V> Linked<Links<SeqNode<V>>> for SeqNode<V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<SeqNode<V>>> {
        let ptr = ptr.as_ptr();
        // SAFETY: a field of a non-null pointer is non-null.
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<V> TreeNode<Links<SeqNode<V>>> for SeqNode<V> {
    type Value = V;

    fn new_node(value: V) -> Box<Self> {
        Box::new(SeqNode {
            links: Links::new(),
            value,
            _unpin: PhantomPinned,
        })
    }

    fn value(&self) -> &V {
        &self.value
    }
}

impl<V> SeqNode<V> {
    /// Consumes a detached node, returning its value.
    pub fn into_value(self: Box<Self>) -> V {
        let SeqNode { value, .. } = *self;
        value
    }
}

// SAFETY: a `Seq` owns its nodes exclusively, and the raw pointers never escape a borrow of it.
unsafe impl<V: Send, P: Policy> Send for Seq<V, P> {}
unsafe impl<V: Sync, P: Policy> Sync for Seq<V, P> {}

impl<V, P: Policy> Seq<V, P> {
    /// Creates a new, empty `Seq`.
    pub const fn new() -> Self {
        Seq {
            tree: OrderedTree::new(),
            _policy: PhantomData,
        }
    }

    /// Returns `true` if the sequence contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the first element.
    #[inline]
    pub fn front(&self) -> Option<&V> {
        self.tree.first().map(|node| node.get_ref().value())
    }

    /// Returns the last element.
    #[inline]
    pub fn back(&self) -> Option<&V> {
        self.tree.last().map(|node| node.get_ref().value())
    }

    /// Returns the element at `index`, letting the policy restructure the tree around it.
    pub fn get(&mut self, index: usize) -> Result<&V, Error> {
        let node = P::find_node_at_index(&mut self.tree, index)?;
        Ok(unsafe { &node.as_ref().value })
    }

    /// Returns a mutable reference to the element at `index`, letting the policy restructure the
    /// tree around it.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut V, Error> {
        let node = P::find_node_at_index(&mut self.tree, index)?;
        // SAFETY: Pinning is not structural for `node.value`.
        Ok(unsafe { &mut (*node.as_ptr()).value })
    }

    /// Returns the element at `index` without restructuring the tree.
    pub fn peek(&self, index: usize) -> Result<&V, Error> {
        let node = self.tree.find_node_at_index(index)?;
        Ok(unsafe { &node.as_ref().value })
    }

    /// Prepends `value` to the sequence.
    pub fn push_front(&mut self, value: V) {
        P::emplace_front(&mut self.tree, value);
    }

    /// Appends `value` to the sequence.
    pub fn push_back(&mut self, value: V) {
        P::emplace_back(&mut self.tree, value);
    }

    /// Removes and returns the first element.
    pub fn pop_front(&mut self) -> Option<V> {
        P::erase_front(&mut self.tree).map(SeqNode::into_value)
    }

    /// Removes and returns the last element.
    pub fn pop_back(&mut self) -> Option<V> {
        P::erase_back(&mut self.tree).map(SeqNode::into_value)
    }

    /// Inserts `value` so that it ends up at `index`, shifting later elements back.
    ///
    /// Returns [`Error::OutOfRange`] if `index > len`.
    pub fn insert(&mut self, index: usize, value: V) -> Result<(), Error> {
        let len = self.len();

        let before = match index {
            i if i < len => Some(P::find_node_at_index(&mut self.tree, i)?),
            i if i == len => None,
            _ => return Err(Error::OutOfRange { index, len }),
        };

        unsafe { P::emplace_before(&mut self.tree, before, value) };
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting later elements forward.
    pub fn remove(&mut self, index: usize) -> Result<V, Error> {
        let node = P::find_node_at_index(&mut self.tree, index)?;
        Ok(unsafe { P::remove(&mut self.tree, node) }.into_value())
    }

    /// Moves every element of `other` to the back of `self`, leaving `other` empty.
    pub fn append(&mut self, other: &mut Self) {
        P::join(&mut self.tree, &mut other.tree);
    }

    /// Moves every element of `other` to the front of `self`, leaving `other` empty.
    pub fn prepend(&mut self, other: &mut Self) {
        P::join_front(&mut self.tree, &mut other.tree);
    }

    /// Splits the sequence in two at `at`.
    ///
    /// `self` keeps the elements in `0..at` and the elements in `at..len` are returned. Returns
    /// [`Error::OutOfRange`] if `at > len`.
    pub fn split_off(&mut self, at: usize) -> Result<Self, Error> {
        Ok(Seq {
            tree: P::split_off(&mut self.tree, at)?,
            _policy: PhantomData,
        })
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.tree.destroy_all_nodes();
    }

    /// Returns an iterator over the elements, front to back.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Returns a cursor pointing to the first element.
    pub fn cursor_front(&self) -> Cursor<'_, SeqNode<V>> {
        self.tree.cursor_first()
    }

    /// Returns a cursor pointing to the last element.
    pub fn cursor_back(&self) -> Cursor<'_, SeqNode<V>> {
        self.tree.cursor_last()
    }

    /// Returns an editing cursor pointing to the first element.
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, SeqNode<V>, P> {
        self.tree.cursor_first_mut()
    }

    /// Returns an editing cursor pointing to the last element.
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, SeqNode<V>, P> {
        self.tree.cursor_last_mut()
    }

    /// Returns an editing cursor pointing to the element at `index`.
    ///
    /// An `index` equal to the length yields a cursor at the "ghost" end position.
    pub fn cursor_at_mut(&mut self, index: usize) -> Result<CursorMut<'_, SeqNode<V>, P>, Error> {
        let len = self.len();

        let node = match index {
            i if i < len => Some(P::find_node_at_index(&mut self.tree, i)?),
            i if i == len => None,
            _ => return Err(Error::OutOfRange { index, len }),
        };

        Ok(unsafe { CursorMut::at(&mut self.tree, node) })
    }

    /// Renders the shape of the underlying tree as a graphviz digraph.
    pub fn dotgraph(&self, name: &str) -> String
    where
        V: fmt::Display,
    {
        let mut out = String::new();
        // Writing to a `String` cannot fail.
        let _ = self.tree.dotgraph(name, &mut out);
        out
    }

    #[doc(hidden)]
    pub fn tree(&self) -> &OrderedTree<SeqNode<V>> {
        &self.tree
    }
}

impl<V, P: Policy> Default for Seq<V, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug, P: Policy> fmt::Debug for Seq<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<V: Clone, P: Policy> Clone for Seq<V, P> {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl<V: PartialEq, P: Policy> PartialEq for Seq<V, P> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<V: Eq, P: Policy> Eq for Seq<V, P> {}

impl<V: Hash, P: Policy> Hash for Seq<V, P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for value in self {
            value.hash(state);
        }
    }
}

impl<V, P: Policy> Extend<V> for Seq<V, P> {
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        unsafe { P::insert_values_before(&mut self.tree, None, iter) };
    }
}

impl<V, P: Policy> FromIterator<V> for Seq<V, P> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut seq = Seq::new();
        seq.extend(iter);
        seq
    }
}

impl<'a, V, P: Policy> IntoIterator for &'a Seq<V, P> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V, P: Policy> IntoIterator for Seq<V, P> {
    type Item = V;
    type IntoIter = IntoIter<V, P>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { seq: self }
    }
}

/// A borrowing iterator over the elements of a [`Seq`].
pub struct Iter<'a, V> {
    inner: NodeIter<'a, SeqNode<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(SeqNode::value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(SeqNode::value)
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

/// An owning iterator over the elements of a [`Seq`].
pub struct IntoIter<V, P: Policy = Splay> {
    seq: Seq<V, P>,
}

impl<V, P: Policy> Iterator for IntoIter<V, P> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.seq.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.seq.len(), Some(self.seq.len()))
    }
}

impl<V, P: Policy> DoubleEndedIterator for IntoIter<V, P> {
    fn next_back(&mut self) -> Option<V> {
        self.seq.pop_back()
    }
}

impl<V, P: Policy> ExactSizeIterator for IntoIter<V, P> {}
impl<V, P: Policy> FusedIterator for IntoIter<V, P> {}
