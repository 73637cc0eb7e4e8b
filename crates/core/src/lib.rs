//! Functional core for oidping.
//!
//! Everything in here is free of I/O: settings parsing, scheme registration,
//! claim mapping, the login attempt state machine and the failure redirect.
//! The traits at the seams (`OidcClient`, `SessionRepository`,
//! `UserRepository`, `EmailSender`) are implemented by `oidping_auth`.

pub mod auth;
pub mod storage;
