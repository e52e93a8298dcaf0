//! A MemorySource simulating a break within a caller-provided slice.

use core::{marker, ptr::NonNull};

use crate::{MemorySource, HEAP_ALIGNMENT};

/// RegionSource
///
/// Hands out the bytes of a slice, front to back, as if moving a break pointer; refuses to grow past its end.
///
/// The start of the slice is skipped as necessary to align the region on `HEAP_ALIGNMENT`.
pub struct RegionSource<'a> {
    base: NonNull<u8>,
    capacity: usize,
    used: usize,
    _region: marker::PhantomData<&'a mut [u8]>,
}

impl<'a> RegionSource<'a> {
    /// Creates an instance over `region`.
    pub fn new(region: &'a mut [u8]) -> Self {
        let start = region.as_mut_ptr();
        let padding = HEAP_ALIGNMENT.padding_for(start as usize).min(region.len());

        //  Safety:
        //  -   `padding` is within the bounds of `region`, or one past its end.
        let base = unsafe { start.add(padding) };

        //  Safety:
        //  -   `base` is derived from a slice pointer, which is never null.
        let base = unsafe { NonNull::new_unchecked(base) };
        let capacity = region.len() - padding;

        Self { base, capacity, used: 0, _region: marker::PhantomData }
    }

    /// Returns the start of the region.
    pub fn base(&self) -> NonNull<u8> { self.base }

    /// Returns the number of bytes the region can grow to.
    pub fn capacity(&self) -> usize { self.capacity }

    /// Returns the number of bytes currently handed out.
    pub fn used(&self) -> usize { self.used }
}

impl<'a> MemorySource for RegionSource<'a> {
    fn grow(&mut self, bytes: usize) -> Option<NonNull<u8>> {
        if bytes > self.capacity - self.used {
            return None;
        }

        let previous = self.current_break();
        self.used += bytes;

        NonNull::new(previous)
    }

    unsafe fn shrink(&mut self, to: NonNull<u8>) -> bool {
        let offset = to.as_ptr() as usize - self.base.as_ptr() as usize;

        debug_assert!(offset <= self.used, "Cannot shrink from {} to {}", self.used, offset);

        self.used = offset;

        true
    }

    fn current_break(&self) -> *mut u8 {
        //  Safety:
        //  -   `used` is at most `capacity`, hence the result is within the region, or one past its end.
        unsafe { self.base.as_ptr().add(self.used) }
    }
}

// mod tests
