//! Session orchestration used by HTTP handlers.
//!
//! Ties the [`Authenticator`], [`SessionStore`] and [`TokenGenerator`]
//! together: log in (or refresh) and get a token, resolve a token back to its
//! session, log out.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::{AuthError, Authenticator, AuthorizationContext, Credentials, Identity};
use crate::config::SessionConfig;
use crate::events::{AuthEvent, Listeners};
use crate::session::{Session, SessionStore};
use crate::token::{TokenGenerator, fingerprint};

/// Creates, resolves and destroys token-bound sessions.
pub struct SessionService {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<SessionStore>,
    tokens: TokenGenerator,
    listeners: Listeners,
}

impl SessionService {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        store: Arc<SessionStore>,
        tokens: TokenGenerator,
    ) -> Self {
        Self {
            authenticator,
            store,
            tokens,
            listeners: Listeners::none(),
        }
    }

    /// Build the store from `config` as well. Fails only if the entropy
    /// source is unusable.
    pub fn from_config(
        authenticator: Arc<dyn Authenticator>,
        config: &SessionConfig,
    ) -> Result<Self, AuthError> {
        Ok(Self::new(
            authenticator,
            Arc::new(SessionStore::new(config)),
            TokenGenerator::new()?,
        ))
    }

    /// Listeners for authentication and invalidation events.
    pub fn with_listeners(mut self, listeners: Listeners) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Authenticate and return a token for later requests.
    ///
    /// With an `existing_token` that still resolves, the session is
    /// re-authenticated in place and the same token comes back. An unknown
    /// or expired `existing_token` is treated as a fresh login and yields a
    /// new token.
    pub async fn create_or_refresh_session(
        &self,
        existing_token: Option<&str>,
        credentials: &Credentials,
    ) -> Result<String, AuthError> {
        let existing = existing_token.and_then(|token| {
            self.store
                .get(token)
                .map(|session| (token.to_string(), session))
        });

        let identity = self
            .authenticate(existing.as_ref().map(|(_, s)| s.identity()), credentials)
            .await?;

        if let Some((token, session)) = existing {
            session.replace_identity(identity.clone());
            // A logout or eviction may have landed while re-authenticating.
            if session.is_valid() && self.store.contains(&token) {
                debug!(
                    token = %fingerprint(&token),
                    username = %session.username(),
                    "session re-authenticated"
                );
                return Ok(token);
            }
            debug!(
                token = %fingerprint(&token),
                "session ended during re-authentication, issuing a new token"
            );
        }

        Ok(self.open_session(identity))
    }

    fn open_session(&self, identity: Identity) -> String {
        let token = self.tokens.generate();
        let username = identity.user.username.clone();
        let session =
            Session::new(identity, self.store.now()).with_listeners(self.listeners.clone());
        self.store.put(token.clone(), Arc::new(session));
        debug!(token = %fingerprint(&token), %username, "login was successful");
        token
    }

    async fn authenticate(
        &self,
        existing: Option<Arc<Identity>>,
        credentials: &Credentials,
    ) -> Result<Identity, AuthError> {
        let result = match existing {
            Some(identity) => {
                self.authenticator
                    .reauthenticate(&identity, credentials)
                    .await
            }
            None => self.authenticator.authenticate(credentials).await,
        };

        match &result {
            Ok(identity) => self.listeners.dispatch(&AuthEvent::AuthenticationSucceeded {
                username: identity.user.username.clone(),
                provider: identity.user.provider.clone(),
                remote_addr: credentials.remote_addr.clone(),
            }),
            Err(e) => {
                debug!(error = %e, "authentication failed");
                self.listeners.dispatch(&AuthEvent::AuthenticationFailed {
                    username: credentials.username.clone(),
                    remote_addr: credentials.remote_addr.clone(),
                });
            }
        }
        result
    }

    /// The live session behind `token`. Missing, unknown and expired tokens
    /// are indistinguishable: all yield [`AuthError::Unauthorized`].
    pub fn resolve_session(&self, token: &str) -> Result<Arc<Session>, AuthError> {
        self.store.get(token).ok_or(AuthError::Unauthorized)
    }

    /// Authorization contexts of the session behind `token`.
    pub fn user_contexts(&self, token: &str) -> Result<Vec<AuthorizationContext>, AuthError> {
        Ok(self.resolve_session(token)?.identity().contexts.clone())
    }

    /// Log out: remove the mapping and invalidate the session, closing its
    /// resources.
    pub fn destroy_session(&self, token: &str) -> Result<(), AuthError> {
        let session = self.store.remove(token).ok_or(AuthError::SessionNotFound)?;
        session.invalidate();
        debug!(token = %fingerprint(token), username = %session.username(), "session destroyed");
        Ok(())
    }

    /// Start the background sweeper if `config` asks for one.
    pub fn spawn_sweeper(
        &self,
        config: &SessionConfig,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        config
            .sweep_interval
            .map(|interval| self.store.spawn_sweeper(interval, cancel))
    }

    /// Invalidate every live session. Returns how many there were.
    pub fn shutdown(&self) -> usize {
        let sessions = self.store.drain();
        for session in &sessions {
            session.invalidate();
        }
        info!(sessions = sessions.len(), "all sessions invalidated");
        sessions.len()
    }
}
