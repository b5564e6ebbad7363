//! Request-level helpers shared by handlers.

pub mod credentials;
