//! Allocator

use core::{
    alloc::{GlobalAlloc, Layout},
    fmt::Write,
    ptr::{self, NonNull},
};

use ffmalloc_core::{Heap, HeapError, HeapStats, HEAP_ALIGNMENT};
use spin::Mutex;

use crate::{Sbrk, Stdout};

/// First-Fit Allocator.
///
/// A single first-fit heap over the program break, guarded by a spin lock.
///
/// `allocate` logs its failures. `GlobalAlloc::alloc` does not: it signals failure by a null pointer alone, leaving it
/// to the caller, typically `handle_alloc_error`, to report it.
///
/// #   Warning
///
/// The heap logs through the `log` facade while the lock is held. When used as the global allocator, any installed
/// logger must not allocate, lest it deadlock.
pub struct FFAllocator(Mutex<Heap<Sbrk>>);

impl FFAllocator {
    /// Creates an instance.
    pub const fn new() -> Self { Self(Mutex::new(Heap::new(Sbrk::new()))) }

    /// Allocates at least `size` bytes of memory, aligned on at least `HEAP_ALIGNMENT`.
    ///
    /// Returns a null pointer if `size` is 0, or if the allocation failed, in which case the error is logged.
    pub fn allocate(&self, size: usize) -> *mut u8 {
        self.0.lock().allocate(size).map(NonNull::as_ptr).unwrap_or(ptr::null_mut())
    }

    /// Releases the memory located at `pointer`.
    ///
    /// Does nothing if `pointer` is null.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate`, or `alloc`.
    /// -   Assumes `pointer` has not been released since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn release(&self, pointer: *mut u8) { self.0.lock().release(pointer) }

    /// Prints the addresses of the head and tail blocks to the standard output, one per line.
    #[cold]
    pub fn print_head_and_tail(&self) {
        let heap = self.0.lock();

        //  Diagnostics are best effort.
        let _ = writeln!(Stdout, "{}", heap.head_and_tail());
    }

    /// Prints every block to the standard output, one per line, in address order.
    #[cold]
    pub fn print_linked_list(&self) {
        let heap = self.0.lock();

        for block in heap.blocks() {
            //  Diagnostics are best effort.
            let _ = writeln!(Stdout, "{}", block);
        }
    }

    /// Returns statistics over the blocks of the heap.
    #[cold]
    pub fn stats(&self) -> HeapStats { self.0.lock().stats() }

    /// Checks the invariants of the heap.
    ///
    /// #   Errors
    ///
    /// -   HeapError::Inconsistent, describing the first violation found.
    #[cold]
    pub fn verify(&self) -> Result<(), HeapError> { self.0.lock().verify() }
}

impl Default for FFAllocator {
    fn default() -> Self { Self::new() }
}

unsafe impl GlobalAlloc for FFAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > HEAP_ALIGNMENT.value() {
            return ptr::null_mut();
        }

        //  Silent on failure, unlike `allocate`: the caller reports null.
        self.0.lock().try_allocate(layout.size())
            .ok()
            .flatten()
            .map(NonNull::as_ptr)
            .unwrap_or(ptr::null_mut())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _: Layout) { self.release(ptr) }
}
