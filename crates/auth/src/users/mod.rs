//! Local account storage.
//!
//! Provides `UserRepository` implementations for:
//! - SQLite (with `sqlite` feature)
//! - In-memory (always available)

mod inmemory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use inmemory::InMemoryUserStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteUserStore;
