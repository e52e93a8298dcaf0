//! Errors reported by a Heap.

use thiserror::Error;

/// HeapError
///
/// None of these errors leaves the `Heap` in a different state than before the failed operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum HeapError {
    /// The memory source refused to grow by `requested` bytes.
    #[error("memory source exhausted, could not grow by {requested} bytes")]
    Exhausted {
        /// Number of bytes, header included, the memory source was asked for.
        requested: usize,
    },
    /// The request of `requested` bytes cannot be represented by a block.
    #[error("request of {requested} bytes exceeds the capacity of a block")]
    TooLarge {
        /// Number of bytes requested by the caller.
        requested: usize,
    },
    /// The block directory is corrupted; this is a bug, or the consequence of misuse of the heap.
    #[error("inconsistent block directory: {0}")]
    Inconsistent(&'static str),
}
