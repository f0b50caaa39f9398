use core::{marker::PhantomData, pin::Pin, ptr::NonNull};

use crate::{policy::Policy, Error, Links, OrderedTree, TreeNode};

/// A cursor over an [`OrderedTree`].
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first. The ghost doubles as the end-of-sequence position.
pub struct Cursor<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    curs: CursorRaw<T>,
    phantom: PhantomData<&'tree OrderedTree<T>>,
}

impl<'tree, T> Cursor<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn first(tree: &'tree OrderedTree<T>) -> Cursor<'tree, T> {
        Cursor {
            curs: CursorRaw::new(tree.into(), tree.first),
            phantom: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree OrderedTree<T>) -> Cursor<'tree, T> {
        Cursor {
            curs: CursorRaw::new(tree.into(), tree.last),
            phantom: PhantomData,
        }
    }

    /// Moves the cursor to the next element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the first
    /// element. If it is pointing to the last element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the last
    /// element. If it is pointing to the first element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns a reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<&'tree T> {
        unsafe { self.curs.get() }
    }

    /// Returns the value of the item pointed to by the cursor.
    ///
    /// Returns [`Error::InvalidatedIterator`] if the cursor is pointing to the "ghost"
    /// non-element.
    pub fn current(&self) -> Result<&'tree T::Value, Error> {
        self.get()
            .map(T::value)
            .ok_or(Error::InvalidatedIterator)
    }

    /// Returns a reference to the next item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek_next() }
    }

    /// Returns a reference to the previous item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek_prev() }
    }

    /// Returns the position of the current element, or `None` for the "ghost" non-element.
    pub fn index(&self) -> Option<usize> {
        unsafe { self.curs.index() }
    }
}

impl<T> Clone for Cursor<'_, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn clone(&self) -> Self {
        Cursor {
            curs: CursorRaw::new(self.curs.tree, self.curs.ptr),
            phantom: PhantomData,
        }
    }
}

impl<T> PartialEq for Cursor<'_, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn eq(&self, other: &Self) -> bool {
        self.curs.tree == other.curs.tree && self.curs.ptr == other.curs.ptr
    }
}

impl<T> Eq for Cursor<'_, T> where T: TreeNode<Links<T>> + ?Sized {}

/// A cursor over an [`OrderedTree`] which supports editing operations.
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first. Insertions and removals go through the policy `P`; rebalancing
/// never moves the cursor off its element.
pub struct CursorMut<'tree, T, P>
where
    T: TreeNode<Links<T>> + ?Sized,
    P: Policy,
{
    curs: CursorRaw<T>,
    phantom: PhantomData<(&'tree mut OrderedTree<T>, P)>,
}

impl<'tree, T, P> CursorMut<'tree, T, P>
where
    T: TreeNode<Links<T>> + ?Sized,
    P: Policy,
{
    pub(crate) fn first(tree: &'tree mut OrderedTree<T>) -> CursorMut<'tree, T, P> {
        let first = tree.first;
        CursorMut {
            curs: CursorRaw::new(tree.into(), first),
            phantom: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree mut OrderedTree<T>) -> CursorMut<'tree, T, P> {
        let last = tree.last;
        CursorMut {
            curs: CursorRaw::new(tree.into(), last),
            phantom: PhantomData,
        }
    }

    // The caller must ensure that `ptr` is `None` or an element of `tree`.
    #[cfg(feature = "alloc")]
    pub(crate) unsafe fn at(
        tree: &'tree mut OrderedTree<T>,
        ptr: Option<NonNull<T>>,
    ) -> CursorMut<'tree, T, P> {
        CursorMut {
            curs: CursorRaw::new(tree.into(), ptr),
            phantom: PhantomData,
        }
    }

    /// Returns a read-only cursor pointing to the current element.
    ///
    /// The `CursorMut` remains immutably borrowed for the lifetime of the returned `Cursor`.
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor {
            curs: CursorRaw::new(self.curs.tree, self.curs.ptr),
            phantom: PhantomData,
        }
    }

    /// Moves the cursor to the next element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the first
    /// element. If it is pointing to the last element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the last
    /// element. If it is pointing to the first element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns a reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<&T> {
        unsafe { self.curs.get() }
    }

    /// Returns the value of the item pointed to by the cursor.
    ///
    /// Returns [`Error::InvalidatedIterator`] if the cursor is pointing to the "ghost"
    /// non-element.
    pub fn current(&self) -> Result<&T::Value, Error> {
        self.get()
            .map(T::value)
            .ok_or(Error::InvalidatedIterator)
    }

    /// Returns a pinned mutable reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get_mut(&mut self) -> Option<Pin<&mut T>> {
        unsafe { self.curs.get_mut() }
    }

    /// Returns a reference to the next item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<&T> {
        unsafe { self.curs.peek_next() }
    }

    /// Returns a reference to the previous item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<&T> {
        unsafe { self.curs.peek_prev() }
    }

    /// Returns the position of the current element, or `None` for the "ghost" non-element.
    pub fn index(&self) -> Option<usize> {
        unsafe { self.curs.index() }
    }

    /// Inserts `value` immediately before the current element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, the value becomes the last element.
    /// The cursor keeps pointing at the same element.
    pub fn insert_before(&mut self, value: T::Value) {
        unsafe { self.curs.insert_before::<P>(value) }
    }

    /// Inserts `value` immediately after the current element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, the value becomes the first element.
    /// The cursor keeps pointing at the same element.
    pub fn insert_after(&mut self, value: T::Value) {
        unsafe { self.curs.insert_after::<P>(value) }
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the next element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_current::<P>() }
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the previous element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current_and_move_prev(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_current_and_move_prev::<P>() }
    }
}

struct CursorRaw<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: NonNull<OrderedTree<T>>,
    ptr: Option<NonNull<T>>,
}

impl<T> CursorRaw<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn new(tree: NonNull<OrderedTree<T>>, ptr: Option<NonNull<T>>) -> CursorRaw<T> {
        CursorRaw { tree, ptr }
    }

    unsafe fn move_next(&mut self) {
        let tree = unsafe { self.tree.as_ref() };

        match self.ptr {
            Some(p) => self.ptr = unsafe { tree.find_next_node(p) },
            None => self.ptr = tree.first,
        }
    }

    unsafe fn move_prev(&mut self) {
        let tree = unsafe { self.tree.as_ref() };

        match self.ptr {
            Some(p) => self.ptr = unsafe { tree.find_prev_node(p) },
            None => self.ptr = tree.last,
        }
    }

    unsafe fn get<'a>(&self) -> Option<&'a T> {
        self.ptr.map(|p| unsafe { p.as_ref() })
    }

    unsafe fn get_mut<'a>(&mut self) -> Option<Pin<&'a mut T>> {
        self.ptr
            .map(|mut p| unsafe { Pin::new_unchecked(p.as_mut()) })
    }

    unsafe fn peek_next<'a>(&self) -> Option<&'a T> {
        let tree = unsafe { self.tree.as_ref() };

        let next_ptr = match self.ptr {
            Some(p) => unsafe { tree.find_next_node(p) },
            None => tree.first,
        };

        next_ptr.map(|p| unsafe { p.as_ref() })
    }

    unsafe fn peek_prev<'a>(&self) -> Option<&'a T> {
        let tree = unsafe { self.tree.as_ref() };

        let prev_ptr = match self.ptr {
            Some(p) => unsafe { tree.find_prev_node(p) },
            None => tree.last,
        };

        prev_ptr.map(|p| unsafe { p.as_ref() })
    }

    unsafe fn index(&self) -> Option<usize> {
        let tree = unsafe { self.tree.as_ref() };
        self.ptr.map(|p| unsafe { tree.index_of(p) })
    }

    unsafe fn insert_before<P: Policy>(&mut self, value: T::Value) {
        let tree = unsafe { self.tree.as_mut() };
        unsafe { P::emplace_before(tree, self.ptr, value) };
    }

    unsafe fn insert_after<P: Policy>(&mut self, value: T::Value) {
        let tree = unsafe { self.tree.as_mut() };

        let position = match self.ptr {
            Some(p) => unsafe { tree.get_next_insert_position(p) },
            None => tree.get_first_insert_position(),
        };

        unsafe { P::emplace(tree, position, value) };
    }

    unsafe fn remove_current<P: Policy>(&mut self) -> Option<T::Handle> {
        let remove = self.ptr?;

        unsafe { self.move_next() };

        let tree = unsafe { self.tree.as_mut() };
        Some(unsafe { P::remove(tree, remove) })
    }

    unsafe fn remove_current_and_move_prev<P: Policy>(&mut self) -> Option<T::Handle> {
        let remove = self.ptr?;

        unsafe { self.move_prev() };

        let tree = unsafe { self.tree.as_mut() };
        Some(unsafe { P::remove(tree, remove) })
    }
}
