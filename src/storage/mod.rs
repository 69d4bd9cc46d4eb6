//! Storage backends for the node collection
//!
//! The collection is always read and written whole through the `NodeStore`
//! trait. `JsonFileStore` is the persistent backend; `MemoryStore` backs
//! tests.

mod json;
mod memory;
mod traits;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{NodeStore, StorageError, StorageResult};
