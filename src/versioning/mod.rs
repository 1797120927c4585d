//! Per-graph version histories.

mod manager;
mod storage;
mod store;

pub use manager::VersionManager;
pub use storage::{Histories, JsonFileStorage, VersionStorage};
pub use store::VersionStore;
