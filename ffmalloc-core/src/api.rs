//! The API of ffmalloc-core.

mod configuration;
mod error;
mod heap;
mod memory_source;
mod region_source;
mod report;

pub use configuration::{Configuration, DefaultConfiguration, Properties};
pub use error::HeapError;
pub use heap::Heap;
pub use memory_source::{HEAP_ALIGNMENT, MemorySource};
pub use region_source::RegionSource;
pub use report::{BlockInfo, Blocks, HeadAndTail, HeapDump, HeapStats};

pub use crate::internals::HEADER_SIZE;
pub use crate::utils::PowerOf2;
