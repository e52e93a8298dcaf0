//! Memory Source
//!
//! The MemorySource trait is used to grow and retract the region managed by a `Heap`. By abstracting the underlying
//! mechanism, it becomes possible to run the `Heap` over the program break, over a fixed buffer, or over anything
//! else which behaves like a break pointer.

use core::ptr::NonNull;

use crate::{PowerOf2, HEADER_SIZE};

/// Alignment of the start of a region handed out by a `MemorySource`.
///
/// As header and payload sizes are multiples of this alignment, every header and every payload is aligned on it.
//  Safety:
//  -   8 is a power of 2.
pub const HEAP_ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(8) };

const _: () = assert!(HEADER_SIZE % 8 == 0);
const _: () = assert!(core::mem::align_of::<crate::internals::Block>() <= 8);

/// Abstraction of a contiguous region, growing and shrinking at its end.
pub trait MemorySource {
    /// Moves the break forward by `bytes`.
    ///
    /// Returns the previous break, that is the start of the newly available memory, or None if the request cannot be
    /// satisfied.
    ///
    /// The caller may assume that if the returned pointer is not None then:
    /// -   The `bytes` bytes following the returned pointer are usable, and exclusively owned by the caller.
    /// -   The returned pointer is equal to the break prior to the call: successive growths are contiguous.
    /// -   The first region returned after the source was created, or fully retracted, is aligned on
    ///     `HEAP_ALIGNMENT`.
    fn grow(&mut self, bytes: usize) -> Option<NonNull<u8>>;

    /// Moves the break back to `to`.
    ///
    /// Returns whether the break was moved. If not, the memory past `to` remains owned by the caller, and the break is
    /// left untouched, hence the next region handed out by `grow` is still contiguous with it.
    ///
    /// #   Safety
    ///
    /// The caller should no longer reference the memory past `to` after this function returns true.
    ///
    /// `shrink` assumes that:
    /// -   `to` lies between the start of the first region handed out by `grow` and the current break.
    unsafe fn shrink(&mut self, to: NonNull<u8>) -> bool;

    /// Returns the current break.
    fn current_break(&self) -> *mut u8;
}
