mod document;
mod error;
mod journal;
mod memory;
mod models;
mod sqlite;

pub use document::DocumentStore;
pub use error::StoreError;
pub use journal::{DocumentJournal, JournalStore, NotificationSink};
pub use memory::MemoryDocumentStore;
pub use models::*;
pub use sqlite::SqliteDocumentStore;
