#![deny(missing_docs)]

//! Test utilities shared by the ffmalloc crates.
//!
//! -   `AlignedRegion`: backing storage for in-memory heaps, aligned as headers require.
//! -   `program_break`: probe of the current program break.
//! -   `fill_ints` and `check_ints`: writing and checking recognizable patterns in payloads.
//! -   `read_number_from_environment`: tunable test parameters.

use std::{mem, slice};

/// A region of memory, aligned on 8 bytes.
pub struct AlignedRegion(Vec<u64>);

impl AlignedRegion {
    /// Creates a zeroed region of at least `bytes` bytes, rounded up to a multiple of 8.
    pub fn new(bytes: usize) -> Self {
        let words = (bytes + mem::size_of::<u64>() - 1) / mem::size_of::<u64>();

        Self(vec![0; words])
    }

    /// Returns the number of bytes of the region.
    pub fn len(&self) -> usize { self.0.len() * mem::size_of::<u64>() }

    /// Returns whether the region is empty.
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Returns the region, as bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len();

        //  Safety:
        //  -   The storage spans `len` bytes, and any bit pattern is a valid `u8`.
        //  -   The returned slice borrows `self` mutably.
        unsafe { slice::from_raw_parts_mut(self.0.as_mut_ptr() as *mut u8, len) }
    }
}

/// Returns the current program break.
pub fn program_break() -> *mut u8 {
    //  Safety:
    //  -   `sbrk(0)` only queries the break.
    unsafe { libc::sbrk(0) as *mut u8 }
}

/// Writes `count` consecutive ints at `pointer`, `seed` followed by `seed + 1`, and so on.
///
/// #   Safety
///
/// -   Assumes that `pointer` is valid for writes of `count` ints, and suitably aligned.
pub unsafe fn fill_ints(pointer: *mut u8, count: usize, seed: i32) {
    let ints = pointer as *mut i32;

    for i in 0..count {
        ints.add(i).write(seed.wrapping_add(i as i32));
    }
}

/// Checks that the `count` consecutive ints at `pointer` were written by `fill_ints` with `seed`.
///
/// #   Safety
///
/// -   Assumes that `pointer` is valid for reads of `count` ints, and suitably aligned.
pub unsafe fn check_ints(pointer: *const u8, count: usize, seed: i32) -> bool {
    let ints = pointer as *const i32;

    (0..count).all(|i| ints.add(i).read() == seed.wrapping_add(i as i32))
}

/// Reads the value of the environment variable `name`, as a number, or returns `default`.
pub fn read_number_from_environment(name: &str, default: usize) -> usize {
    if let Some(result) = std::env::var(name).ok().and_then(|value| value.parse().ok()) {
        println!("read_number_from_environment - {}: {}", name, result);
        return result;
    }

    println!("read_number_from_environment - {}: {} (default)", name, default);
    default
}

// mod tests
