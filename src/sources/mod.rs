//! Lap source implementations

pub mod memory;

pub use memory::MemoryLapSource;
