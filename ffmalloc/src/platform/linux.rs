//! Implementation of Linux specific calls.

use core::{convert::TryFrom, fmt, ptr::{self, NonNull}};

use log::warn;

use ffmalloc_core::{MemorySource, HEAP_ALIGNMENT};

/// Implementation of the MemorySource trait, over the program break.
///
/// The range granted by `Sbrk` starts at the first break it observes, padded to `HEAP_ALIGNMENT`, and ends at the
/// break it last set. The range must remain contiguous, hence:
///
/// -   `grow` refuses to extend the range if any other party moved the break since.
/// -   `shrink` leaves the break alone if any other party moved it since, as the memory past the range is not owned.
///     The range is kept as is, so that growth resumes contiguously once the other party restores the break.
///
/// Once shrunk back to its start, the range is forgotten, and the break restored to the unpadded origin.
pub struct Sbrk {
    //  Break observed when the range was started, before padding.
    origin: *mut u8,
    //  First byte of the range, aligned on `HEAP_ALIGNMENT`.
    start: *mut u8,
    //  Last break set, one past the last byte of the range.
    end: *mut u8,
}

impl Sbrk {
    /// Creates an instance, with an empty range.
    pub const fn new() -> Self { Self { origin: ptr::null_mut(), start: ptr::null_mut(), end: ptr::null_mut() } }

    /// Returns whether the range is empty.
    pub fn is_empty(&self) -> bool { self.end == self.start }

    //  Starts the range at the current break.
    fn start(&mut self, bytes: usize) -> Option<NonNull<u8>> {
        let origin = current_break()?;
        let padding = HEAP_ALIGNMENT.padding_for(origin as usize);

        let previous = move_break(padding.checked_add(bytes)?)?;

        debug_assert!(previous == origin, "Break moved from {:?} to {:?} while starting", origin, previous);

        //  Safety:
        //  -   `padding + bytes` bytes were just granted past `previous`.
        let (start, end) = unsafe { (previous.add(padding), previous.add(padding + bytes)) };

        self.origin = previous;
        self.start = start;
        self.end = end;

        NonNull::new(start)
    }

    //  Forgets the range.
    fn reset(&mut self) { *self = Self::new(); }
}

impl Default for Sbrk {
    fn default() -> Self { Self::new() }
}

impl MemorySource for Sbrk {
    fn grow(&mut self, bytes: usize) -> Option<NonNull<u8>> {
        if self.end.is_null() {
            return self.start(bytes);
        }

        let current = current_break()?;

        if current != self.end {
            warn!("Program break moved from {:?} to {:?} by another party, cannot grow", self.end, current);
            return None;
        }

        let previous = move_break(bytes)?;

        //  Safety:
        //  -   `bytes` bytes were just granted past `previous`.
        self.end = unsafe { previous.add(bytes) };

        NonNull::new(previous)
    }

    unsafe fn shrink(&mut self, to: NonNull<u8>) -> bool {
        debug_assert!(self.start <= to.as_ptr() && to.as_ptr() <= self.end,
            "{:?} is not within [{:?}, {:?}]", to, self.start, self.end);

        let current = current_break();

        if current != Some(self.end) {
            warn!("Program break moved from {:?} to {:?} by another party, cannot shrink to {:?}",
                self.end, current, to);
            return false;
        }

        let target = if to.as_ptr() == self.start { self.origin } else { to.as_ptr() };

        //  Safety:
        //  -   `[target, end)` is owned, and no longer in use.
        if libc::brk(target as *mut libc::c_void) != 0 {
            warn!("Could not move program break from {:?} to {:?}", self.end, target);
            return false;
        }

        if target == self.origin {
            self.reset();
        } else {
            self.end = target;
        }

        true
    }

    fn current_break(&self) -> *mut u8 { current_break().unwrap_or(ptr::null_mut()) }
}

//  Safety:
//  -   The pointers are only ever dereferenced by the owner of the range, through `&mut self`.
unsafe impl Send for Sbrk {}

/// Allocation-free writer to the standard output.
pub(crate) struct Stdout;

impl fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut bytes = s.as_bytes();

        while !bytes.is_empty() {
            //  Safety:
            //  -   `bytes` is valid for reads of `bytes.len()` bytes.
            let written = unsafe { libc::write(libc::STDOUT_FILENO, bytes.as_ptr() as *const libc::c_void, bytes.len()) };

            if written <= 0 {
                return Err(fmt::Error);
            }

            bytes = &bytes[written as usize..];
        }

        Ok(())
    }
}

//  Returns the current program break, or None if it cannot be queried.
fn current_break() -> Option<*mut u8> {
    //  Safety:
    //  -   `sbrk(0)` only queries the break.
    let result = unsafe { libc::sbrk(0) };

    if result as isize == -1 { None } else { Some(result as *mut u8) }
}

//  Advances the program break by `bytes`.
//
//  Returns the previous break, or None if the break could not be moved.
fn move_break(bytes: usize) -> Option<*mut u8> {
    let increment = libc::intptr_t::try_from(bytes).ok()?;

    //  Safety:
    //  -   Growing the break does not invalidate any memory.
    let result = unsafe { libc::sbrk(increment) };

    if result as isize == -1 { None } else { Some(result as *mut u8) }
}
