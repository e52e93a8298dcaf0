use std::collections::VecDeque;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use ffmalloc::FFAllocator;

//  The program break cannot be shared with the system allocator, hence all of the process allocations are routed
//  through FFAllocator.
#[global_allocator]
static FF_ALLOCATOR: FFAllocator = FFAllocator::new();

//  Single-Thread Single-Allocation Round-Trip.
//
//  This benchmark repeatedly allocates and releases a block of memory.
//
//  This is the best-case scenario for first-fit: the block is carved at the tail, and retracted immediately.
fn single_allocation_round_trip(c: &mut Criterion) {
    c.bench_function("SA Round-trip", |b| b.iter(|| {
        let _ = black_box(FFVec::with_capacity(32));
    }));
}

//  Single-Thread Single-Allocation Reuse.
//
//  This benchmark repeatedly allocates and releases a block of memory, in a hole between two taken blocks.
//
//  The released block is not retracted, and is reused as is by the next allocation.
fn single_allocation_reuse(c: &mut Criterion) {
    let holder = FFVec::with_capacity(32);
    let hole = FFVec::with_capacity(32);
    let tail = FFVec::with_capacity(32);

    drop(hole);

    c.bench_function("SA Reuse", |b| b.iter(|| {
        let _ = black_box(FFVec::with_capacity(32));
    }));

    drop(tail);
    drop(holder);
}

criterion_group!(
    single_allocation,
    single_allocation_round_trip,
    single_allocation_reuse
);

//  Single-Thread Batch-Allocation Allocation.
//
//  This benchmark repeatedly allocates a block of memory, without releasing any.
//
//  Every allocation grows the heap, after a first-fit scan of an increasingly long list of taken blocks.
fn batch_allocation_allocation(c: &mut Criterion) {
    fn bencher(name: &'static str, c: &mut Criterion, number_iterations: usize) {
        c.bench_function(name, |b| b.iter_batched_ref(
            || Vec::<FFVec>::with_capacity(number_iterations),
            |v| v.push(black_box(FFVec::with_capacity(32))),
            BatchSize::NumIterations(number_iterations as u64)
        ));
    }

    const NUMBER_ITERATIONS: usize = 1024;

    bencher("BA Allocation", c, NUMBER_ITERATIONS);
}

//  Single-Thread Batch-Allocation Release.
//
//  This benchmark repeatedly releases the last allocated block of memory.
//
//  Every release retracts the heap.
fn batch_allocation_release(c: &mut Criterion) {
    fn bencher(name: &'static str, c: &mut Criterion, number_iterations: usize) {
        c.bench_function(name, |b| b.iter_batched_ref(
            || {
                let mut v = Vec::<FFVec>::new();
                v.resize_with(number_iterations, || black_box(FFVec::with_capacity(32)));
                v
            },
            |v| v.pop(),
            BatchSize::NumIterations(number_iterations as u64)
        ));
    }

    const NUMBER_ITERATIONS: usize = 1024;

    bencher("BA Release", c, NUMBER_ITERATIONS);
}

//  Single-Thread Batch-Allocation Round-Trip.
//
//  This benchmark repeatedly allocates a block of memory, then releases the oldest one.
//
//  Every release frees the head, and every allocation reuses it after coalescing.
fn batch_allocation_round_trip(c: &mut Criterion) {
    fn bencher(name: &'static str, c: &mut Criterion, number_iterations: usize) {
        c.bench_function(name, |b| b.iter_batched_ref(
            || {
                let mut v = VecDeque::<FFVec>::with_capacity(number_iterations);
                v.resize_with(number_iterations - 1, || black_box(FFVec::with_capacity(32)));
                v
            },
            |v| {
                v.push_back(black_box(FFVec::with_capacity(32)));
                v.pop_front()
            },
            BatchSize::NumIterations(number_iterations as u64)
        ));
    }

    const NUMBER_ITERATIONS: usize = 1024;

    bencher("BA Round-trip", c, NUMBER_ITERATIONS);
}

criterion_group!(
    batch_allocation,
    batch_allocation_allocation,
    batch_allocation_release,
    batch_allocation_round_trip
);

criterion_main!(
    single_allocation,
    batch_allocation
);

//
//  Implementation Details
//

//  Mimics the layout of Vec.
struct FFVec {
    pointer: *mut u8,
    #[allow(dead_code)]
    len: usize,
    #[allow(dead_code)]
    cap: usize,
}

impl FFVec {
    fn with_capacity(capacity: usize) -> FFVec {
        let pointer = FF_ALLOCATOR.allocate(capacity);
        FFVec { pointer, len: 0, cap: capacity }
    }
}

impl Drop for FFVec {
    fn drop(&mut self) {
        unsafe { FF_ALLOCATOR.release(self.pointer) }
    }
}
