//! Diagnostics
//!
//! Read-only views over the block list of a `Heap`, for debugging and test-failure diagnosis. None of these are used
//! by the `Heap` itself.

use core::{fmt, ptr::NonNull};

use crate::internals::{Block, BlockDirectory, BlockIter};

/// Addresses of the head and tail blocks of a heap.
///
/// Displayed as two lines, `HEAD: <address>` and `TAIL: <address>`, a null address standing for a missing block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeadAndTail {
    /// The lowest-addressed header, if any.
    pub head: Option<NonNull<u8>>,
    /// The highest-addressed header, if any.
    pub tail: Option<NonNull<u8>>,
}

impl HeadAndTail {
    pub(crate) fn new(directory: &BlockDirectory) -> Self {
        Self { head: directory.head().map(NonNull::cast), tail: directory.tail().map(NonNull::cast) }
    }
}

impl fmt::Display for HeadAndTail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HEAD: {}", Address(self.head))?;
        write!(f, "TAIL: {}", Address(self.tail))
    }
}

/// Snapshot of the header of a block.
///
/// Displayed as a single line: `LAST: <address>, THIS: <address>, NEXT: <address>, FREE?: <0|1>, DATA_SIZE: <size>`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockInfo {
    /// Address of the header.
    pub address: NonNull<u8>,
    /// Address of the payload, as handed out to the user.
    pub data: NonNull<u8>,
    /// Address of the header of the preceding block, if any.
    pub prev: Option<NonNull<u8>>,
    /// Address of the header of the following block, if any.
    pub next: Option<NonNull<u8>>,
    /// Whether the block is free.
    pub is_free: bool,
    /// Size of the payload, in bytes.
    pub data_size: usize,
}

impl BlockInfo {
    //  #   Safety
    //
    //  -   Assumes that `block` is valid.
    unsafe fn new(block: NonNull<Block>) -> Self {
        let header = block.as_ref();

        Self {
            address: block.cast(),
            data: Block::data(block),
            prev: header.prev.get().map(NonNull::cast),
            next: header.next.get().map(NonNull::cast),
            is_free: header.is_free(),
            data_size: header.data_size.get() as usize,
        }
    }
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LAST: {}, THIS: {}, NEXT: {}, FREE?: {}, DATA_SIZE: {}",
            Address(self.prev), Address(Some(self.address)), Address(self.next), self.is_free as u32, self.data_size)
    }
}

/// Iterator over the blocks of a heap, in address order.
pub struct Blocks<'a>(BlockIter<'a>);

impl<'a> Blocks<'a> {
    pub(crate) fn new(directory: &'a BlockDirectory) -> Self { Self(directory.iter()) }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        //  Safety:
        //  -   Blocks of the directory are valid for as long as the directory is borrowed.
        self.0.next().map(|block| unsafe { BlockInfo::new(block) })
    }
}

/// Aggregated statistics over the blocks of a heap.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HeapStats {
    /// Number of blocks.
    pub blocks: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Sum of the payload sizes of free blocks, in bytes.
    pub free_bytes: usize,
    /// Sum of the payload sizes of taken blocks, in bytes.
    pub used_bytes: usize,
    /// Number of bytes from the start of the head to the end of the tail, headers included.
    pub span: usize,
}

impl HeapStats {
    pub(crate) fn new(directory: &BlockDirectory) -> Self {
        let mut stats = Blocks::new(directory).fold(HeapStats::default(), |mut stats, block| {
            stats.blocks += 1;

            if block.is_free {
                stats.free_blocks += 1;
                stats.free_bytes += block.data_size;
            } else {
                stats.used_bytes += block.data_size;
            }

            stats
        });

        stats.span = directory.span();
        stats
    }

    /// Returns the number of taken blocks.
    pub fn used_blocks(&self) -> usize { self.blocks - self.free_blocks }
}

/// Full dump of a heap: head and tail, followed by one line per block.
pub struct HeapDump<'a>(&'a BlockDirectory);

impl<'a> HeapDump<'a> {
    pub(crate) fn new(directory: &'a BlockDirectory) -> Self { Self(directory) }
}

impl<'a> fmt::Display for HeapDump<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HeadAndTail::new(self.0))?;

        for block in Blocks::new(self.0) {
            writeln!(f, "{}", block)?;
        }

        Ok(())
    }
}

//
//  Implementation
//

struct Address(Option<NonNull<u8>>);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = self.0.map(|pointer| pointer.as_ptr() as usize).unwrap_or(0);

        write!(f, "{:#x}", address)
    }
}

// mod tests
