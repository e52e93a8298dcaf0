//! Block
//!
//! A Block header describes the span of memory immediately following it, its payload.
//!
//! Whilst taken, the payload is purely in the hands of the user. The header, however, is always owned by the
//! `BlockDirectory`: it links the block to its neighbours, which are also its neighbours in memory.
//!
//! ```text
//!   ┌──────────────────────────────┬──────────────────────┬──────────────────────────────┬───────────
//!   │ next │ prev │ state │ size   │  payload (size B)    │ next │ prev │ state │ size   │  payload
//!   └──────────────────────────────┴──────────────────────┴──────────────────────────────┴───────────
//!   ▲                              ▲                      ▲
//!   header                         pointer handed out     header of the following block
//! ```
//!
//! Note: Blocks are never _constructed_, instead raw memory is reinterpreted as blocks.

use core::{
    cell::Cell,
    mem,
    ptr::{self, NonNull},
};

use crate::{PowerOf2, utils};

use super::BlockPtr;

/// Size of a Block header, in bytes.
///
/// The payload handed out to the user starts exactly this many bytes after its header.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// State of a Block.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum State {
    /// In use by the user.
    Taken = 0,
    /// Available for reuse.
    Free = 1,
}

/// Block.
#[repr(C)]
pub(crate) struct Block {
    /// The following block, in memory and in the list.
    pub(crate) next: BlockPtr<Block>,
    /// The preceding block, in memory and in the list.
    pub(crate) prev: BlockPtr<Block>,
    /// Whether the payload is free or taken.
    pub(crate) state: Cell<State>,
    /// Size of the payload, in bytes, excluding the header.
    pub(crate) data_size: Cell<u32>,
}

impl Block {
    /// In-place constructs an unlinked `Block`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that access to the memory location is exclusive.
    /// -   Assumes that there is sufficient memory available, for both header and payload.
    /// -   Assumes that the pointer is correctly aligned.
    #[allow(clippy::cast_ptr_alignment)]
    pub(crate) unsafe fn initialize(at: NonNull<u8>, data_size: u32, state: State) -> NonNull<Block> {
        debug_assert!(utils::is_sufficiently_aligned_for(at, PowerOf2::align_of::<Block>()));

        //  Safety:
        //  -   `at` is assumed to be sufficiently aligned.
        let ptr = at.as_ptr() as *mut Block;

        let block = Block {
            next: BlockPtr::null(),
            prev: BlockPtr::null(),
            state: Cell::new(state),
            data_size: Cell::new(data_size),
        };

        //  Safety:
        //  -   Access to the memory location is exclusive.
        //  -   `ptr` is assumed to be sufficiently sized.
        ptr::write(ptr, block);

        at.cast()
    }

    /// Returns the block whose payload starts at `data`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `data` was obtained from `Block::data`.
    pub(crate) unsafe fn from_data(data: NonNull<u8>) -> NonNull<Block> {
        //  Safety:
        //  -   The header lies `HEADER_SIZE` bytes before the payload, within the same region.
        NonNull::new_unchecked(data.as_ptr().sub(HEADER_SIZE)).cast()
    }

    /// Returns the start of the payload of `block`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `block` points to a valid header.
    pub(crate) unsafe fn data(block: NonNull<Block>) -> NonNull<u8> {
        //  Safety:
        //  -   The payload follows the header, within the same region.
        NonNull::new_unchecked((block.as_ptr() as *mut u8).add(HEADER_SIZE))
    }

    /// Returns the first byte past the payload of `block`, where the following header, if any, lives.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `block` points to a valid header.
    pub(crate) unsafe fn end(block: NonNull<Block>) -> NonNull<u8> {
        let data_size = block.as_ref().data_size.get() as usize;

        //  Safety:
        //  -   The payload spans `data_size` bytes, within the same region.
        NonNull::new_unchecked(Self::data(block).as_ptr().add(data_size))
    }

    /// Returns whether the block is free.
    pub(crate) fn is_free(&self) -> bool { self.state.get() == State::Free }
}

// mod tests
