//! Link between Blocks, unsynchronized.

use core::{
    cell::Cell,
    ptr::NonNull,
};

/// BlockPtr
///
/// A link to a potentially absent T, mutable through a shared reference.
pub(crate) struct BlockPtr<T>(Cell<Option<NonNull<T>>>);

impl<T> BlockPtr<T> {
    /// Creates an instance pointing nowhere.
    pub(crate) const fn null() -> Self { Self(Cell::new(None)) }

    /// Returns the inner pointer, possibly null.
    pub(crate) fn get(&self) -> Option<NonNull<T>> { self.0.get() }

    /// Sets the inner pointer.
    pub(crate) fn set(&self, ptr: Option<NonNull<T>>) { self.0.set(ptr); }

    /// Returns whether the link points nowhere.
    pub(crate) fn is_null(&self) -> bool { self.get().is_none() }

    /// Sets the inner pointer to null and return the previous value, possibly null.
    pub(crate) fn replace_with_null(&self) -> Option<NonNull<T>> { self.0.replace(None) }
}

impl<T> Default for BlockPtr<T> {
    fn default() -> Self { Self::null() }
}

// mod tests
