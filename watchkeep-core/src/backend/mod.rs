//! Persistence backends for versioned stores.

pub mod directory;
pub mod memory;

pub use directory::DirectoryBackend;
pub use memory::MemoryBackend;
