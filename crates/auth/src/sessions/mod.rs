//! Session storage implementations.
//!
//! Provides `SessionRepository` implementations for:
//! - SQLite (with `sqlite` feature)
//! - In-memory (always available; used by tests and the mock IdP setup)

mod inmemory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use inmemory::InMemorySessionStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionStore;
