//! Blacklist store implementations.

pub mod memory;

pub use memory::MemoryBlacklist;
