//! Persistence layer: the daily run checkpoint.

pub mod libsql_backend;
pub mod memory;
mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlCheckpointStore;
pub use memory::MemoryCheckpointStore;
pub use traits::CheckpointStore;
