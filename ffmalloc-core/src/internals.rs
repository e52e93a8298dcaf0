//! The internals of ffmalloc-core.
//!
//! The internals manipulate the headers embedded in the managed region.

mod block;
mod block_ptr;
mod directory;

pub(crate) use block::{Block, State};
pub(crate) use block_ptr::BlockPtr;
pub(crate) use directory::{BlockDirectory, BlockIter};

pub use block::HEADER_SIZE;
