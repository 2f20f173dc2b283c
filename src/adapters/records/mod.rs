//! Record store adapters.

mod in_memory;
mod sqlite;

pub use in_memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;
