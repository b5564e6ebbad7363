//! Authentication contracts.
//!
//! The session layer never checks credentials itself. It hands them to an
//! [`Authenticator`] and stores whatever [`Identity`] comes back. The
//! [`provider::ProviderChain`] is the stock authenticator, polling an ordered
//! list of [`provider::AuthenticationProvider`]s.

pub mod password;
pub mod provider;
pub mod static_users;

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use provider::{AuthenticationProvider, ProviderChain};
pub use static_users::StaticUserProvider;

/// Message used for every caller-visible authentication failure.
pub const PERMISSION_DENIED: &str = "Permission Denied.";

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credentials were supplied but rejected.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// More credentials are required before a decision can be made.
    #[error("Insufficient credentials: {0}")]
    InsufficientCredentials(String),

    /// Token missing, unknown or expired.
    #[error("Permission Denied.")]
    Unauthorized,

    /// The originating provider refused to re-authenticate the user.
    #[error("User re-authentication failed")]
    ReauthenticationFailed,

    /// Explicit logout of a token the store does not hold.
    #[error("No such token.")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether this error is a verdict on the supplied credentials, as opposed
    /// to a failure to reach a verdict at all.
    pub fn is_credentials_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials(_) | AuthError::InsufficientCredentials(_)
        )
    }
}

/// Credentials presented with a login or refresh request.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Client address in a form suitable for logging, possibly including a
    /// validated proxy chain.
    pub remote_addr: Option<String>,
}

impl Credentials {
    /// Username/password credentials with no request details.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            remote_addr: None,
        }
    }

    /// Attach the loggable client address.
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Address for log lines, `unknown` when the transport did not supply one.
    pub fn loggable_address(&self) -> &str {
        self.remote_addr.as_deref().unwrap_or("unknown")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

/// A user vouched for by one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    /// Identifier of the provider that authenticated this user.
    pub provider: String,
}

/// What one provider grants an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    /// Identifier of the provider (data source) that issued this context.
    pub provider: String,
    pub permissions: BTreeSet<String>,
}

impl AuthorizationContext {
    pub fn new<I, S>(provider: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider: provider.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Everything stored in a session about who is logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: AuthenticatedUser,
    /// One context per provider that recognised the user.
    pub contexts: Vec<AuthorizationContext>,
}

impl Identity {
    pub fn new(user: AuthenticatedUser, contexts: Vec<AuthorizationContext>) -> Self {
        Self { user, contexts }
    }

    /// The context issued by the provider with the given identifier.
    pub fn context(&self, provider: &str) -> Option<&AuthorizationContext> {
        self.contexts.iter().find(|c| c.provider == provider)
    }

    /// Identifiers of every provider holding a context for this user.
    pub fn providers(&self) -> Vec<String> {
        self.contexts.iter().map(|c| c.provider.clone()).collect()
    }
}

/// Performs the actual credential check on behalf of the session layer.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a fresh login.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError>;

    /// Refresh an identity already held by a live session.
    async fn reauthenticate(
        &self,
        existing: &Identity,
        credentials: &Credentials,
    ) -> Result<Identity, AuthError>;
}
