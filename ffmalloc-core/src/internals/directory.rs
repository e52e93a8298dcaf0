//! Block Directory
//!
//! The directory of all blocks of a region, free and taken alike, maintained as an intrusive doubly linked list of
//! headers ordered by address.
//!
//! The list is laid out within the region it describes: the payload of each block is immediately followed by the
//! header of the next block, and the payload of the tail ends at the break of the `MemorySource`.

use core::{marker, ptr::NonNull};

use crate::{HeapError, MemorySource};

use super::{Block, BlockPtr, State, HEADER_SIZE};

/// BlockDirectory.
pub(crate) struct BlockDirectory {
    head: BlockPtr<Block>,
    tail: BlockPtr<Block>,
}

impl BlockDirectory {
    /// Creates an empty instance.
    pub(crate) const fn new() -> Self { Self { head: BlockPtr::null(), tail: BlockPtr::null() } }

    /// Returns the lowest-addressed block, if any.
    pub(crate) fn head(&self) -> Option<NonNull<Block>> { self.head.get() }

    /// Returns the highest-addressed block, if any.
    pub(crate) fn tail(&self) -> Option<NonNull<Block>> { self.tail.get() }

    /// Returns whether the directory contains no block.
    pub(crate) fn is_empty(&self) -> bool { self.head.is_null() }

    /// Returns an iterator over the blocks, in address order.
    pub(crate) fn iter(&self) -> BlockIter<'_> { BlockIter { current: self.head(), _marker: marker::PhantomData } }

    /// Returns the number of bytes spanned by the blocks, headers included.
    pub(crate) fn span(&self) -> usize {
        match (self.head(), self.tail()) {
            //  Safety:
            //  -   `tail` is valid.
            (Some(head), Some(tail)) => unsafe { Block::end(tail).as_ptr() as usize - head.as_ptr() as usize },
            _ => 0,
        }
    }

    /// Returns the first free block, in address order, with a payload of at least `size` bytes.
    pub(crate) fn find_first_fit(&self, size: u32) -> Option<NonNull<Block>> {
        self.iter().find(|block| {
            //  Safety:
            //  -   Blocks of the directory are valid.
            let header = unsafe { block.as_ref() };

            header.is_free() && header.data_size.get() >= size
        })
    }

    /// Grows `source` to make room for a new block of `size` bytes of payload, and links it after the tail.
    ///
    /// Returns the new tail.
    ///
    /// #   Errors
    ///
    /// -   If `source` refuses to grow, in which case the directory is left untouched.
    /// -   If head and tail disagree on whether the directory is empty.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the current tail, if any, ends at the break of `source`.
    pub(crate) unsafe fn append_tail<S>(&self, source: &mut S, size: u32, state: State)
        -> Result<NonNull<Block>, HeapError>
        where
            S: MemorySource
    {
        let previous = match (self.head(), self.tail()) {
            (None, None) => None,
            (Some(_), Some(tail)) => Some(tail),
            (None, Some(_)) => return Err(HeapError::Inconsistent("head is null but tail is not")),
            (Some(_), None) => return Err(HeapError::Inconsistent("tail is null but head is not")),
        };

        let requested = HEADER_SIZE + size as usize;
        let at = source.grow(requested).ok_or(HeapError::Exhausted { requested })?;

        debug_assert!(previous.map_or(true, |tail| Block::end(tail) == at),
            "Discontiguous growth: {:?} does not follow {:?}", at, previous);

        //  Safety:
        //  -   `at` was just handed out by `source`, hence exclusive, sufficiently sized and aligned.
        let block = Block::initialize(at, size, state);

        self.link_tail(block);

        Ok(block)
    }

    /// Links `block`, which is not part of the list, as the new tail.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `block` is a valid header, starting where the current tail, if any, ends.
    pub(crate) unsafe fn link_tail(&self, block: NonNull<Block>) {
        let previous = self.tail();

        debug_assert!(previous.map_or(true, |tail| Block::end(tail) == block.cast()),
            "Discontiguous tail: {:?} does not follow {:?}", block, previous);

        block.as_ref().prev.set(previous);
        block.as_ref().next.set(None);

        match previous {
            None => self.head.set(Some(block)),
            Some(tail) => tail.as_ref().next.set(Some(block)),
        }

        self.tail.set(Some(block));
    }

    /// Creates a new block of `size` bytes of payload immediately after the payload of `block`, and links it.
    ///
    /// Returns the new block.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `block` belongs to this directory.
    /// -   Assumes that the memory between the end of `block` and the next header, or break, is unused and spans at
    ///     least `HEADER_SIZE + size` bytes.
    pub(crate) unsafe fn insert_after(&self, block: NonNull<Block>, size: u32, state: State) -> NonNull<Block> {
        //  Safety:
        //  -   The memory past `block` is assumed to be unused and sufficiently sized.
        let inserted = Block::initialize(Block::end(block), size, state);

        let next = block.as_ref().next.get();

        inserted.as_ref().prev.set(Some(block));
        inserted.as_ref().next.set(next);

        match next {
            Some(next) => next.as_ref().prev.set(Some(inserted)),
            None => self.tail.set(Some(inserted)),
        }

        block.as_ref().next.set(Some(inserted));

        inserted
    }

    /// Removes `block` from the list, patching its neighbours, head and tail.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `block` belongs to this directory.
    pub(crate) unsafe fn unlink(&self, block: NonNull<Block>) {
        let prev = block.as_ref().prev.replace_with_null();
        let next = block.as_ref().next.replace_with_null();

        match prev {
            Some(prev) => prev.as_ref().next.set(next),
            None => self.head.set(next),
        }

        match next {
            Some(next) => next.as_ref().prev.set(prev),
            None => self.tail.set(prev),
        }
    }

    /// Merges `block` into its left neighbour, which absorbs both header and payload of `block`.
    ///
    /// Returns the left neighbour.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `block` belongs to this directory.
    /// -   Assumes that `block` has a left neighbour.
    pub(crate) unsafe fn merge_right(&self, block: NonNull<Block>) -> NonNull<Block> {
        let left = match block.as_ref().prev.get() {
            Some(left) => left,
            None => {
                debug_assert!(false, "Cannot merge {:?} without left neighbour", block);
                return block;
            },
        };

        let absorbed = HEADER_SIZE as u32 + block.as_ref().data_size.get();

        self.unlink(block);

        let left_header = left.as_ref();
        left_header.data_size.set(left_header.data_size.get() + absorbed);

        left
    }
}

/// Iterator over the blocks of a BlockDirectory, in address order.
pub(crate) struct BlockIter<'a> {
    current: Option<NonNull<Block>>,
    _marker: marker::PhantomData<&'a BlockDirectory>,
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = NonNull<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;

        //  Safety:
        //  -   Blocks of the directory are valid for as long as the directory is borrowed.
        self.current = unsafe { result.as_ref().next.get() };

        Some(result)
    }
}

#[cfg(test)]
mod tests {

use std::{vec, vec::Vec};

use ffmalloc_test::AlignedRegion;

use crate::RegionSource;

use super::*;

fn sizes(directory: &BlockDirectory) -> Vec<(u32, bool)> {
    directory.iter()
        //  Safety:
        //  -   Blocks of the directory are valid.
        .map(|block| unsafe { (block.as_ref().data_size.get(), block.as_ref().is_free()) })
        .collect()
}

#[test]
fn block_directory_new() {
    let directory = BlockDirectory::new();

    assert!(directory.is_empty());
    assert_eq!(None, directory.head());
    assert_eq!(None, directory.tail());
    assert_eq!(0, directory.span());
    assert_eq!(None, directory.find_first_fit(16));
}

#[test]
fn block_directory_append_tail() {
    let mut region = AlignedRegion::new(1024);
    let mut source = RegionSource::new(region.as_mut_slice());
    let base = source.current_break();

    let directory = BlockDirectory::new();

    //  Safety:
    //  -   The directory is empty.
    let a = unsafe { directory.append_tail(&mut source, 40, State::Taken) }.expect("Grown");

    assert_eq!(base, a.as_ptr() as *mut u8);
    assert_eq!(Some(a), directory.head());
    assert_eq!(Some(a), directory.tail());

    //  Safety:
    //  -   The tail ends at the break.
    let b = unsafe { directory.append_tail(&mut source, 80, State::Taken) }.expect("Grown");

    assert_eq!(base as usize + HEADER_SIZE + 40, b.as_ptr() as usize);
    assert_eq!(Some(a), directory.head());
    assert_eq!(Some(b), directory.tail());
    assert_eq!(2 * HEADER_SIZE + 120, directory.span());
    assert_eq!(source.current_break() as usize, base as usize + directory.span());

    //  Safety:
    //  -   Valid blocks.
    unsafe {
        assert_eq!(Some(b), a.as_ref().next.get());
        assert_eq!(Some(a), b.as_ref().prev.get());
    }
}

#[test]
fn block_directory_append_tail_exhausted() {
    let mut region = AlignedRegion::new(128);
    let mut source = RegionSource::new(region.as_mut_slice());
    let base = source.current_break();

    let directory = BlockDirectory::new();

    //  Safety:
    //  -   The directory is empty.
    let result = unsafe { directory.append_tail(&mut source, 256, State::Taken) };

    assert_eq!(Err(HeapError::Exhausted { requested: HEADER_SIZE + 256 }), result);
    assert!(directory.is_empty());
    assert_eq!(base, source.current_break());
}

#[test]
fn block_directory_append_tail_inconsistent() {
    let mut region = AlignedRegion::new(1024);
    let mut source = RegionSource::new(region.as_mut_slice());

    let directory = BlockDirectory::new();

    //  Safety:
    //  -   The directory is empty.
    let a = unsafe { directory.append_tail(&mut source, 16, State::Taken) }.expect("Grown");

    let before = source.current_break();

    directory.tail.set(None);

    //  Safety:
    //  -   The consistency check fires before any use of the tail.
    let result = unsafe { directory.append_tail(&mut source, 16, State::Taken) };

    assert!(matches!(result, Err(HeapError::Inconsistent(_))));
    assert_eq!(before, source.current_break());

    directory.tail.set(Some(a));
    directory.head.set(None);

    //  Safety:
    //  -   The consistency check fires before any use of the tail.
    let result = unsafe { directory.append_tail(&mut source, 16, State::Taken) };

    assert!(matches!(result, Err(HeapError::Inconsistent(_))));
    assert_eq!(before, source.current_break());
}

#[test]
fn block_directory_find_first_fit() {
    let mut region = AlignedRegion::new(1024);
    let mut source = RegionSource::new(region.as_mut_slice());

    let directory = BlockDirectory::new();

    let blocks: Vec<_> = [40, 16, 120, 16, 200, 16].iter()
        //  Safety:
        //  -   The tail ends at the break.
        .map(|&size| unsafe { directory.append_tail(&mut source, size, State::Taken) }.expect("Grown"))
        .collect();

    assert_eq!(None, directory.find_first_fit(16));

    for &index in &[0, 2, 4] {
        //  Safety:
        //  -   Valid block.
        unsafe { blocks[index].as_ref().state.set(State::Free) };
    }

    assert_eq!(Some(blocks[0]), directory.find_first_fit(16));
    assert_eq!(Some(blocks[0]), directory.find_first_fit(40));
    assert_eq!(Some(blocks[2]), directory.find_first_fit(48));
    assert_eq!(Some(blocks[2]), directory.find_first_fit(120));
    assert_eq!(Some(blocks[4]), directory.find_first_fit(128));
    assert_eq!(None, directory.find_first_fit(208));
}

#[test]
fn block_directory_insert_after() {
    let mut region = AlignedRegion::new(1024);
    let mut source = RegionSource::new(region.as_mut_slice());

    let directory = BlockDirectory::new();

    //  Safety:
    //  -   The tail ends at the break.
    let (a, b) = unsafe {
        let a = directory.append_tail(&mut source, 80, State::Taken).expect("Grown");
        let b = directory.append_tail(&mut source, 16, State::Taken).expect("Grown");
        (a, b)
    };

    //  Carve the payload of `a` into 16 bytes, and a free remainder.
    let remainder = (80 - 16 - HEADER_SIZE) as u32;

    //  Safety:
    //  -   `a` belongs to the directory, and its last 64 bytes are unused.
    let inserted = unsafe {
        a.as_ref().data_size.set(16);
        directory.insert_after(a, remainder, State::Free)
    };

    //  Safety:
    //  -   Valid block.
    assert_eq!(unsafe { Block::data(a).as_ptr().add(16) }, inserted.as_ptr() as *mut u8);
    assert_eq!(vec![(16, false), (remainder, true), (16, false)], sizes(&directory));

    //  Safety:
    //  -   Valid blocks.
    unsafe {
        assert_eq!(Some(b), inserted.as_ref().next.get());
        assert_eq!(Some(inserted), b.as_ref().prev.get());
        assert_eq!(b, Block::end(inserted).cast());
    }
}

#[test]
fn block_directory_unlink() {
    let mut region = AlignedRegion::new(1024);
    let mut source = RegionSource::new(region.as_mut_slice());

    let directory = BlockDirectory::new();

    let blocks: Vec<_> = [16, 24, 32].iter()
        //  Safety:
        //  -   The tail ends at the break.
        .map(|&size| unsafe { directory.append_tail(&mut source, size, State::Taken) }.expect("Grown"))
        .collect();

    //  Safety:
    //  -   The blocks belong to the directory.
    unsafe { directory.unlink(blocks[1]) };

    assert_eq!(vec![(16, false), (32, false)], sizes(&directory));

    //  Safety:
    //  -   The blocks belong to the directory.
    unsafe { directory.unlink(blocks[2]) };

    assert_eq!(Some(blocks[0]), directory.tail());
    assert_eq!(vec![(16, false)], sizes(&directory));

    //  Safety:
    //  -   The blocks belong to the directory.
    unsafe { directory.unlink(blocks[0]) };

    assert!(directory.is_empty());
    assert_eq!(None, directory.tail());
}

#[test]
fn block_directory_link_tail() {
    let mut region = AlignedRegion::new(1024);
    let mut source = RegionSource::new(region.as_mut_slice());

    let directory = BlockDirectory::new();

    let blocks: Vec<_> = [16, 24].iter()
        //  Safety:
        //  -   The tail ends at the break.
        .map(|&size| unsafe { directory.append_tail(&mut source, size, State::Taken) }.expect("Grown"))
        .collect();

    //  Safety:
    //  -   The blocks belong to the directory, and are relinked in place.
    unsafe {
        directory.unlink(blocks[1]);
        directory.link_tail(blocks[1]);
    }

    assert_eq!(Some(blocks[1]), directory.tail());
    assert_eq!(vec![(16, false), (24, false)], sizes(&directory));

    //  Safety:
    //  -   The blocks belong to the directory, and are relinked in place.
    unsafe {
        directory.unlink(blocks[1]);
        directory.unlink(blocks[0]);

        assert!(directory.is_empty());

        directory.link_tail(blocks[0]);
    }

    assert_eq!(Some(blocks[0]), directory.head());
    assert_eq!(Some(blocks[0]), directory.tail());
    assert_eq!(vec![(16, false)], sizes(&directory));
}

#[test]
fn block_directory_merge_right() {
    let mut region = AlignedRegion::new(1024);
    let mut source = RegionSource::new(region.as_mut_slice());

    let directory = BlockDirectory::new();

    let blocks: Vec<_> = [40, 40, 40].iter()
        //  Safety:
        //  -   The tail ends at the break.
        .map(|&size| unsafe { directory.append_tail(&mut source, size, State::Free) }.expect("Grown"))
        .collect();

    //  Safety:
    //  -   `blocks[1]` belongs to the directory, and has a left neighbour.
    let merged = unsafe { directory.merge_right(blocks[1]) };

    assert_eq!(blocks[0], merged);
    assert_eq!(vec![((80 + HEADER_SIZE) as u32, true), (40, true)], sizes(&directory));

    //  Safety:
    //  -   `blocks[2]` belongs to the directory, and has a left neighbour.
    let merged = unsafe { directory.merge_right(blocks[2]) };

    assert_eq!(blocks[0], merged);
    assert_eq!(Some(blocks[0]), directory.tail());
    assert_eq!(vec![((120 + 2 * HEADER_SIZE) as u32, true)], sizes(&directory));
    assert_eq!(source.current_break() as usize, blocks[0].as_ptr() as usize + directory.span());
}

} // mod tests
