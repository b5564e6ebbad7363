//! Request handlers.

pub mod health;
pub mod session;
pub mod tokens;
