//! Errors reported by lookups and cursors.
//!
//! Misuse of the raw node API (linking through a stale position, passing a node from another
//! tree) is not reported here; it is a contract violation and panics where it is detected.

/// An error returned by an index lookup or a cursor dereference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An index was outside `0..len`, or outside `0..=len` for operations that accept the end
    /// position.
    #[error("index {index} is out of range for a sequence of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// A cursor pointing past the last element was dereferenced.
    #[error("cursor does not point at an element")]
    InvalidatedIterator,
}
