//! Graph store backend implementations.

pub mod memory;

pub use memory::{GraphSnapshot, MemoryStore, StoreSnapshot};
