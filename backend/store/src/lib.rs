//! `wird-store`: subscriber persistence.
//!
//! Two implementations of [`wird_core::SubscriberStore`]:
//! - [`SqliteSubscriberStore`]: durable, `rusqlite` with additive schema upgrades
//! - [`InMemorySubscriberStore`]: process-local, used by tests and dry runs

pub mod memory;
pub mod sqlite;

pub use memory::InMemorySubscriberStore;
pub use sqlite::SqliteSubscriberStore;
