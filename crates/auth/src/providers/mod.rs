//! `OidcClient` implementations.
//!
//! - `OpenIdProvider`: discovery-based client for a real authority
//! - `MockProvider`: decodes codes minted by the mock IdP (with `mock` feature)

mod claims;
#[cfg(feature = "mock")]
mod mock;
mod openid;

#[cfg(feature = "mock")]
pub(crate) use mock::MockGrant;
#[cfg(feature = "mock")]
pub use mock::MockProvider;
pub use openid::OpenIdProvider;
