//! Job sink implementations.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemorySink;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSink;
