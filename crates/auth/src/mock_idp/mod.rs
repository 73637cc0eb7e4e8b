//! Mock identity provider for local development.
//!
//! Serves an `/authorize` page so the full challenge and callback round trip
//! can run without a real authority.

mod server;
mod templates;

pub use server::MockIdpServer;
