//! Abstraction over OS differences.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::Sbrk;

#[cfg(target_os = "linux")]
pub(crate) use linux::Stdout;
