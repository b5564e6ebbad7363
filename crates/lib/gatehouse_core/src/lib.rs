//! # gatehouse_core
//!
//! Token-based session layer for Gatehouse: opaque token generation, the
//! expiring token → session store, per-login session state, and the
//! authentication contracts the store is fed from.

pub mod auth;
pub mod config;
pub mod events;
pub mod service;
pub mod session;
pub mod token;

pub use service::SessionService;
pub use session::{Session, SessionStore};
pub use token::TokenGenerator;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
