//! The configuration of ffmalloc-core.
//!
//! The Configuration fixes the two knobs bounding the size of blocks:
//!
//! -   The minimum allocation: no payload is ever smaller, hence no free fragment is ever smaller either.
//! -   The granularity: every payload size is a multiple of it, which keeps headers and payloads aligned.
//!
//! Splitting a block carves a header out of its payload, and merging two blocks folds a header into a payload, hence
//! the granularity must divide `HEADER_SIZE` for payload sizes to remain multiples of it.
//!
//! Block splitting is derived from those: a free block is only split if the remainder can hold a header and the
//! minimum allocation, with room to spare.

use super::{PowerOf2, HEADER_SIZE, HEAP_ALIGNMENT};

/// Configuration
///
/// The Configuration instance allows adjusting the size bounds of blocks.
pub trait Configuration {
    /// The minimum size of the payload of a block, in bytes.
    ///
    /// Must be a multiple of `GRANULARITY`.
    const MINIMUM_ALLOCATION: usize;

    /// The granularity of the payload of a block, in bytes.
    ///
    /// Must be at least `HEAP_ALIGNMENT`, and must divide `HEADER_SIZE`.
    const GRANULARITY: PowerOf2;
}

/// DefaultConfiguration
///
/// Payloads of at least 16 bytes, in multiples of 8 bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfiguration;

impl Configuration for DefaultConfiguration {
    const MINIMUM_ALLOCATION: usize = 16;

    //  Safety:
    //  -   8 is a power of 2.
    const GRANULARITY: PowerOf2 = unsafe { PowerOf2::new_unchecked(8) };
}

/// Properties
///
/// Properties of a given Configuration.
///
/// Work-around for the inability to implement static methods directly on a trait.
pub struct Properties<C>(C);

impl<C> Properties<C>
    where
        C: Configuration
{
    /// Returns the size of the payload of a block able to hold `size` bytes.
    ///
    /// -   0 is preserved, as it signals that no allocation should take place.
    /// -   Sizes below the minimum allocation are bumped to the minimum allocation.
    /// -   Other sizes are rounded up to the next multiple of the granularity.
    ///
    /// Returns None if the rounded up size does not fit in a `usize`.
    pub fn normalize(size: usize) -> Option<usize> {
        debug_assert!(C::GRANULARITY >= HEAP_ALIGNMENT);
        debug_assert!(C::MINIMUM_ALLOCATION % C::GRANULARITY == 0);
        debug_assert!(HEADER_SIZE % C::GRANULARITY == 0);

        if size == 0 {
            Some(0)
        } else if size < C::MINIMUM_ALLOCATION {
            Some(C::MINIMUM_ALLOCATION)
        } else {
            C::GRANULARITY.checked_round_up(size)
        }
    }

    /// Returns the threshold above which the left over of a free block is split off as a new free block.
    ///
    /// A left over less than or equal to the threshold remains part of the block it was carved from.
    pub fn split_threshold() -> usize { HEADER_SIZE + C::MINIMUM_ALLOCATION }

    /// Returns whether a free block of `available` bytes should be split when taken for `requested` bytes.
    pub fn should_split(available: usize, requested: usize) -> bool {
        debug_assert!(available >= requested);
        debug_assert!(HEADER_SIZE % C::GRANULARITY == 0);

        available - requested > Self::split_threshold()
    }
}

// mod tests
