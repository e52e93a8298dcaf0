#![deny(missing_docs)]

//! Exposition of FFAllocator API via a C ABI.
//!
//! The declarations are available in `include/ffmalloc.h`.

use std::os::raw::{c_uint, c_void};

use ffmalloc::FFAllocator;

/// Allocates `size` bytes of memory, aligned on at least 8 bytes.
///
/// Returns a null pointer if `size` is 0, or if the allocation failed.
#[no_mangle]
pub extern "C" fn ff_malloc(size: c_uint) -> *mut c_void { ALLOCATOR.allocate(size as usize) as *mut c_void }

/// Releases the memory located at `pointer`.
///
/// Does nothing if `pointer` is null.
///
/// #   Safety
///
/// -   Assumes `pointer` has been returned by a prior call to `ff_malloc`.
/// -   Assumes `pointer` has not been released since its allocation.
/// -   Assumes the memory pointed by `pointer` is no longer in use.
#[no_mangle]
pub unsafe extern "C" fn ff_free(pointer: *mut c_void) { ALLOCATOR.release(pointer as *mut u8) }

/// Prints the addresses of the head and tail blocks to the standard output.
#[cold]
#[no_mangle]
pub extern "C" fn ff_print_head_and_tail() { ALLOCATOR.print_head_and_tail() }

/// Prints every block to the standard output, one per line, in address order.
#[cold]
#[no_mangle]
pub extern "C" fn ff_print_linked_list() { ALLOCATOR.print_linked_list() }

/// Returns 0 if the invariants of the heap hold, and -1 otherwise.
#[cold]
#[no_mangle]
pub extern "C" fn ff_verify() -> i32 { if ALLOCATOR.verify().is_ok() { 0 } else { -1 } }

//
//  Implementation
//

static ALLOCATOR: FFAllocator = FFAllocator::new();
