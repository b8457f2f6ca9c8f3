//! History persistence for Weft workflows.
//!
//! Two `HistoryStore` implementations: [`MemoryStore`], the bounded
//! in-process reference store, and [`SqliteHistoryStore`] for durable
//! run history.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteHistoryStore;
