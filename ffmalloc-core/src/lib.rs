#![no_std]

#![deny(missing_docs)]

//! Building blocks for a first-fit, break-based allocator.
//!
//! ffmalloc-core is the engine of a malloc replacement carving variable-sized blocks out of a single contiguous region
//! which grows and shrinks at its end, like the program break. It contains:
//! -   A memory source trait, used to grow and retract the region, and an in-memory implementation over a slice.
//! -   The `Heap`, tracking every block of the region in an intrusive, address-ordered, doubly linked list of headers,
//!     and implementing first-fit allocation with block splitting and eager coalescing on release.
//! -   Diagnostics, to inspect the block list of a `Heap`.
//!
//! The `Heap` is not thread-safe; it is up to the user to arrange for mutual exclusion if required.

#[cfg(test)]
extern crate std;

mod api;
mod internals;
mod utils;

pub use api::*;
