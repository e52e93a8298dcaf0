#![no_std]
#![deny(missing_docs)]

//! A first-fit memory allocator library, over the program break.
//!
//! The type `FFAllocator` provides a process-wide first-fit allocator, usable directly, or as a drop-in replacement
//! for the global allocator.
//!
//! #   Warning
//!
//! This allocator grows and shrinks the program break: it does not cooperate with any other user of `brk` or `sbrk`
//! in the process, and only one instance should ever be used.

mod allocator;
mod platform;

pub use allocator::FFAllocator;
pub use platform::Sbrk;

pub use ffmalloc_core::{HeapError, HeapStats, MemorySource, HEADER_SIZE, HEAP_ALIGNMENT};

use platform::Stdout;
