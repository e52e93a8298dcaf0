//! Heap
//!
//! The Heap is the allocator engine: it carves blocks out of the region of its `MemorySource`, first-fit.
//!
//! Allocation looks for the first free block, in address order, large enough to hold the request. If one is found,
//! it is taken, and split if the left over is large enough to form a useful free block on its own. Otherwise, the
//! region is grown by a new block.
//!
//! Release eagerly coalesces the released block with its free neighbours, so that no two adjacent blocks are ever
//! both free. If the coalesced block ends up as the tail, it is returned to the `MemorySource` altogether, hence the
//! tail is only ever free if the `MemorySource` refused to shrink, in which case it is kept for reuse.

use core::{convert::TryFrom, marker, ptr::NonNull};

use log::{debug, error, warn};

use crate::internals::{Block, BlockDirectory, State};

use super::{
    BlockInfo, Blocks, Configuration, DefaultConfiguration, HeadAndTail, HeapDump, HeapError, HeapStats, MemorySource,
    Properties, HEADER_SIZE,
};

/// Heap
///
/// A first-fit heap over the region of a `MemorySource`.
///
/// The Heap owns its block directory and its memory source; it is not thread-safe, and all mutations go through
/// `&mut self`.
pub struct Heap<S, C = DefaultConfiguration> {
    directory: BlockDirectory,
    source: S,
    _configuration: marker::PhantomData<C>,
}

impl<S, C> Heap<S, C> {
    /// Creates an empty instance, which will grow within `source`.
    pub const fn new(source: S) -> Self {
        Self { directory: BlockDirectory::new(), source, _configuration: marker::PhantomData }
    }

    /// Returns a reference to the memory source.
    pub fn source(&self) -> &S { &self.source }

    /// Returns whether the heap contains no block, in which case its whole region was returned to the source.
    pub fn is_empty(&self) -> bool { self.directory.is_empty() }

    /// Returns the addresses of the head and tail blocks.
    pub fn head_and_tail(&self) -> HeadAndTail { HeadAndTail::new(&self.directory) }

    /// Returns an iterator over the blocks, in address order.
    pub fn blocks(&self) -> Blocks<'_> { Blocks::new(&self.directory) }

    /// Returns statistics over the blocks.
    pub fn stats(&self) -> HeapStats { HeapStats::new(&self.directory) }

    /// Returns a displayable dump of the heap.
    pub fn dump(&self) -> HeapDump<'_> { HeapDump::new(&self.directory) }
}

impl<S, C> Heap<S, C>
    where
        S: MemorySource,
        C: Configuration,
{
    /// Allocates at least `size` bytes of memory.
    ///
    /// Returns None if `size` is 0, or if the allocation failed, in which case the error is logged.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        match self.try_allocate(size) {
            Ok(pointer) => pointer,
            Err(e) => {
                error!("Could not allocate {} bytes: {}", size, e);
                None
            },
        }
    }

    /// Allocates at least `size` bytes of memory.
    ///
    /// Returns Ok(None) if `size` is 0, in which case nothing happened.
    ///
    /// If allocation succeeds, the returned pointer is aligned on at least `HEAP_ALIGNMENT`, and the memory it points
    /// to is uninitialized.
    ///
    /// #   Errors
    ///
    /// -   If `size` cannot be represented in a block, or would grow the heap beyond what a block can span.
    /// -   If the memory source refuses to grow.
    /// -   If the block directory is found inconsistent.
    ///
    /// In all cases, the heap is left untouched.
    pub fn try_allocate(&mut self, size: usize) -> Result<Option<NonNull<u8>>, HeapError> {
        let normalized = Properties::<C>::normalize(size)
            .and_then(|normalized| u32::try_from(normalized).ok())
            .ok_or(HeapError::TooLarge { requested: size })?;

        if normalized == 0 {
            return Ok(None);
        }

        if let Some(block) = self.directory.find_first_fit(normalized) {
            //  Safety:
            //  -   `block` is a free block of the directory, with at least `normalized` bytes.
            unsafe { self.take(block, normalized) };

            //  Safety:
            //  -   `block` is valid.
            return Ok(Some(unsafe { Block::data(block) }));
        }

        //  A free block may coalesce the whole span, which must fit in its header.
        let span = self.directory.span()
            .checked_add(HEADER_SIZE)
            .and_then(|span| span.checked_add(normalized as usize))
            .filter(|span| span - HEADER_SIZE <= u32::MAX as usize);

        if span.is_none() {
            return Err(HeapError::TooLarge { requested: size });
        }

        //  Safety:
        //  -   The tail of the directory always ends at the break of the source.
        let block = unsafe { self.directory.append_tail(&mut self.source, normalized, State::Taken)? };

        debug!("Grew heap by {} bytes, at {:?}", HEADER_SIZE + normalized as usize, block);

        //  Safety:
        //  -   `block` is valid.
        Ok(Some(unsafe { Block::data(block) }))
    }

    /// Releases the memory located at `pointer`.
    ///
    /// Does nothing if `pointer` is null.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate` or `try_allocate` on this instance.
    /// -   Assumes `pointer` has not been released since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn release(&mut self, pointer: *mut u8) {
        let data = match NonNull::new(pointer) {
            Some(data) => data,
            None => return,
        };

        let block = Block::from_data(data);

        debug_assert!(!block.as_ref().is_free(), "Double release of {:?}", pointer);

        block.as_ref().state.set(State::Free);

        let block = self.coalesce(block);

        if self.directory.tail() == Some(block) {
            self.retract(block);
        }
    }

    /// Checks the invariants of the block directory.
    ///
    /// -   Payload sizes are multiples of the granularity, and at least the minimum allocation.
    /// -   Links are consistent, in both directions, and with head and tail.
    /// -   Each block ends exactly where the next begins, and the tail ends at the break of the memory source.
    /// -   No two adjacent blocks are free.
    ///
    /// The tail is free only when the memory source refused to shrink, which is not an inconsistency.
    ///
    /// #   Errors
    ///
    /// -   HeapError::Inconsistent, describing the first violation found.
    pub fn verify(&self) -> Result<(), HeapError> {
        let mut previous: Option<BlockInfo> = None;

        for block in self.blocks() {
            if block.data_size % C::GRANULARITY != 0 {
                return Err(HeapError::Inconsistent("data size is not a multiple of the granularity"));
            }

            if block.data_size < C::MINIMUM_ALLOCATION {
                return Err(HeapError::Inconsistent("data size is below the minimum allocation"));
            }

            if block.prev != previous.map(|previous| previous.address) {
                return Err(HeapError::Inconsistent("back link does not match the preceding block"));
            }

            match previous {
                None if Some(block.address) != self.head_and_tail().head => {
                    return Err(HeapError::Inconsistent("first block is not the head"));
                },
                Some(previous) if previous.data.as_ptr() as usize + previous.data_size != block.address.as_ptr() as usize => {
                    return Err(HeapError::Inconsistent("adjacent blocks are not contiguous in memory"));
                },
                Some(previous) if previous.is_free && block.is_free => {
                    return Err(HeapError::Inconsistent("adjacent blocks are both free"));
                },
                _ => (),
            }

            previous = Some(block);
        }

        let last = match previous {
            Some(last) => last,
            None if self.head_and_tail().tail.is_none() => return Ok(()),
            None => return Err(HeapError::Inconsistent("tail is not null but head is")),
        };

        if Some(last.address) != self.head_and_tail().tail {
            return Err(HeapError::Inconsistent("last block is not the tail"));
        }

        //  Safety:
        //  -   `last.data_size` bytes past `last.data` belong to the block.
        let end = unsafe { last.data.as_ptr().add(last.data_size) };

        if end != self.source.current_break() {
            return Err(HeapError::Inconsistent("tail does not end at the break"));
        }

        Ok(())
    }

    //  Marks `block` as taken, splitting off the left over if large enough.
    //
    //  #   Safety
    //
    //  -   Assumes that `block` is a free block of the directory.
    //  -   Assumes that `size` is normalized, and less than or equal to the size of `block`.
    unsafe fn take(&self, block: NonNull<Block>, size: u32) {
        let header = block.as_ref();

        header.state.set(State::Taken);

        let available = header.data_size.get();

        if !Properties::<C>::should_split(available as usize, size as usize) {
            return;
        }

        header.data_size.set(size);

        //  The left over exceeds `HEADER_SIZE`, as per `should_split`.
        let left_over = available - size - HEADER_SIZE as u32;

        //  Safety:
        //  -   The left over bytes past the shrunk `block` are unused.
        self.directory.insert_after(block, left_over, State::Free);
    }

    //  Merges `block` with its left neighbour, then its right neighbour, if free.
    //
    //  Returns the resulting block.
    //
    //  #   Safety
    //
    //  -   Assumes that `block` is a free block of the directory.
    unsafe fn coalesce(&self, block: NonNull<Block>) -> NonNull<Block> {
        let mut block = block;

        if let Some(prev) = block.as_ref().prev.get() {
            if prev.as_ref().is_free() {
                block = self.directory.merge_right(block);
            }
        }

        if let Some(next) = block.as_ref().next.get() {
            if next.as_ref().is_free() {
                block = self.directory.merge_right(next);
            }
        }

        block
    }

    //  Unlinks the free tail, and returns its memory to the source.
    //
    //  If the source refuses to shrink, the tail is linked back, and stays free for reuse.
    //
    //  #   Safety
    //
    //  -   Assumes that `block` is the tail of the directory, and is free.
    unsafe fn retract(&mut self, block: NonNull<Block>) {
        debug_assert!(self.directory.tail() == Some(block));

        let released = HEADER_SIZE + block.as_ref().data_size.get() as usize;

        self.directory.unlink(block);

        //  Safety:
        //  -   `block` was handed out by the source, and its memory is no longer referenced once unlinked.
        if !self.source.shrink(block.cast()) {
            warn!("Could not retract heap by {} bytes, keeping {:?} as free tail", released, block);

            //  Safety:
            //  -   `block` is still owned, and starts where the new tail ends.
            self.directory.link_tail(block);
            return;
        }

        debug!("Retracted heap by {} bytes, to {:?}", released, block);
    }
}

//  Safety:
//  -   The Heap exclusively owns the blocks of its directory; none is shared with another instance.
unsafe impl<S, C> Send for Heap<S, C>
    where
        S: Send
{}

// mod tests
