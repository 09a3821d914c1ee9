pub mod memory;
pub mod provider;
pub mod sqlite;

pub use memory::MemoryStore;
pub use provider::BackupStore;
pub use sqlite::SqliteStore;
