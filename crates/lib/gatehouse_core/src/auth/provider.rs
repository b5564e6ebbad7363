//! Ordered chain of authentication providers.
//!
//! A provider (identity provider / data source) may vouch for a user and may
//! grant an [`AuthorizationContext`]. A principal can be known to several
//! providers at once, so a single login collects one context per provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    AuthError, AuthenticatedUser, Authenticator, AuthorizationContext, Credentials, Identity,
    PERMISSION_DENIED,
};

/// One identity provider.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Stable identifier, also used as the data source name.
    fn identifier(&self) -> &str;

    /// Returns `Ok(None)` when this provider does not recognise the
    /// credentials, so the next provider gets a chance.
    async fn authenticate_user(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<AuthenticatedUser>, AuthError>;

    /// Re-validate a user this provider authenticated earlier. `Ok(None)`
    /// refuses the refresh.
    async fn update_authenticated_user(
        &self,
        user: &AuthenticatedUser,
        _credentials: &Credentials,
    ) -> Result<Option<AuthenticatedUser>, AuthError> {
        Ok(Some(user.clone()))
    }

    /// The context this provider grants the user, if any.
    async fn authorization_context(
        &self,
        user: &AuthenticatedUser,
    ) -> Result<Option<AuthorizationContext>, AuthError>;

    /// Refresh a context this provider issued earlier. `Ok(None)` drops it.
    async fn update_authorization_context(
        &self,
        _existing: &AuthorizationContext,
        user: &AuthenticatedUser,
        _credentials: &Credentials,
    ) -> Result<Option<AuthorizationContext>, AuthError> {
        self.authorization_context(user).await
    }
}

/// [`Authenticator`] that tries each provider in order.
pub struct ProviderChain {
    providers: Vec<Arc<dyn AuthenticationProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn AuthenticationProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn AuthenticationProvider>] {
        &self.providers
    }

    fn provider(&self, identifier: &str) -> Option<&Arc<dyn AuthenticationProvider>> {
        self.providers.iter().find(|p| p.identifier() == identifier)
    }

    /// First provider to return a user wins. Insufficient-credentials
    /// failures outrank invalid-credentials failures; otherwise the first
    /// credentials failure is reported.
    async fn authenticate_user(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthenticatedUser, AuthError> {
        let mut failure: Option<AuthError> = None;

        for provider in &self.providers {
            match provider.authenticate_user(credentials).await {
                Ok(Some(user)) => return Ok(user),
                Ok(None) => {}
                Err(e @ AuthError::InsufficientCredentials(_)) => {
                    if matches!(failure, None | Some(AuthError::InvalidCredentials(_))) {
                        failure = Some(e);
                    }
                }
                Err(e) if e.is_credentials_failure() => {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(failure.unwrap_or_else(|| AuthError::InvalidCredentials(PERMISSION_DENIED.into())))
    }
}

#[async_trait]
impl Authenticator for ProviderChain {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let user = self.authenticate_user(credentials).await?;

        let mut contexts = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            if let Some(context) = provider.authorization_context(&user).await? {
                contexts.push(context);
            }
        }

        Ok(Identity::new(user, contexts))
    }

    async fn reauthenticate(
        &self,
        existing: &Identity,
        credentials: &Credentials,
    ) -> Result<Identity, AuthError> {
        let origin = self
            .provider(&existing.user.provider)
            .ok_or(AuthError::ReauthenticationFailed)?;

        let user = origin
            .update_authenticated_user(&existing.user, credentials)
            .await?
            .ok_or(AuthError::ReauthenticationFailed)?;

        let mut contexts = Vec::with_capacity(existing.contexts.len());
        for old in &existing.contexts {
            let Some(provider) = self.provider(&old.provider) else {
                debug!(provider = %old.provider, "provider no longer configured, dropping its context");
                continue;
            };
            match provider
                .update_authorization_context(old, &user, credentials)
                .await?
            {
                Some(context) => contexts.push(context),
                None => debug!(
                    provider = %old.provider,
                    "provider retroactively destroyed its authorization context"
                ),
            }
        }

        Ok(Identity::new(user, contexts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Provider with a scripted answer.
    struct Scripted {
        id: &'static str,
        answer: fn(&Credentials) -> Result<Option<AuthenticatedUser>, AuthError>,
        grants: bool,
        refresh: bool,
    }

    #[async_trait]
    impl AuthenticationProvider for Scripted {
        fn identifier(&self) -> &str {
            self.id
        }

        async fn authenticate_user(
            &self,
            credentials: &Credentials,
        ) -> Result<Option<AuthenticatedUser>, AuthError> {
            (self.answer)(credentials)
        }

        async fn update_authenticated_user(
            &self,
            user: &AuthenticatedUser,
            _credentials: &Credentials,
        ) -> Result<Option<AuthenticatedUser>, AuthError> {
            Ok(self.refresh.then(|| user.clone()))
        }

        async fn authorization_context(
            &self,
            _user: &AuthenticatedUser,
        ) -> Result<Option<AuthorizationContext>, AuthError> {
            Ok(self
                .grants
                .then(|| AuthorizationContext::new(self.id, [format!("{}:read", self.id)])))
        }
    }

    fn provider(
        id: &'static str,
        answer: fn(&Credentials) -> Result<Option<AuthenticatedUser>, AuthError>,
    ) -> Arc<dyn AuthenticationProvider> {
        Arc::new(Scripted {
            id,
            answer,
            grants: true,
            refresh: true,
        })
    }

    fn nobody(_: &Credentials) -> Result<Option<AuthenticatedUser>, AuthError> {
        Ok(None)
    }

    fn invalid(_: &Credentials) -> Result<Option<AuthenticatedUser>, AuthError> {
        Err(AuthError::InvalidCredentials("bad password".into()))
    }

    fn insufficient(_: &Credentials) -> Result<Option<AuthenticatedUser>, AuthError> {
        Err(AuthError::InsufficientCredentials("need otp".into()))
    }

    fn broken(_: &Credentials) -> Result<Option<AuthenticatedUser>, AuthError> {
        Err(AuthError::Internal("directory unreachable".into()))
    }

    fn alice_from_b(_: &Credentials) -> Result<Option<AuthenticatedUser>, AuthError> {
        Ok(Some(AuthenticatedUser {
            username: "alice".into(),
            provider: "b".into(),
        }))
    }

    #[tokio::test]
    async fn first_successful_provider_wins_and_all_grant_contexts() {
        let chain = ProviderChain::new(vec![
            provider("a", nobody),
            provider("b", alice_from_b),
            provider("c", invalid),
        ]);
        let identity = chain.authenticate(&Credentials::new("alice", "pw")).await.unwrap();
        assert_eq!(identity.user.provider, "b");
        assert_eq!(identity.providers(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn no_provider_means_permission_denied() {
        let chain = ProviderChain::new(vec![provider("a", nobody)]);
        let err = chain.authenticate(&Credentials::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(m) if m == PERMISSION_DENIED));
    }

    #[tokio::test]
    async fn insufficient_outranks_invalid() {
        let chain = ProviderChain::new(vec![provider("a", invalid), provider("b", insufficient)]);
        let err = chain.authenticate(&Credentials::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::InsufficientCredentials(_)));
    }

    #[tokio::test]
    async fn first_invalid_failure_is_kept() {
        let chain = ProviderChain::new(vec![provider("a", invalid), provider("b", nobody)]);
        let err = chain.authenticate(&Credentials::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(m) if m == "bad password"));
    }

    #[tokio::test]
    async fn non_credential_errors_abort_the_chain() {
        let chain = ProviderChain::new(vec![provider("a", broken), provider("b", alice_from_b)]);
        let err = chain.authenticate(&Credentials::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }

    #[tokio::test]
    async fn reauthentication_goes_to_originating_provider() {
        let chain = ProviderChain::new(vec![
            provider("a", nobody),
            Arc::new(Scripted {
                id: "b",
                answer: alice_from_b,
                grants: true,
                refresh: false,
            }),
        ]);
        let identity = chain.authenticate(&Credentials::new("alice", "pw")).await.unwrap();
        let err = chain
            .reauthenticate(&identity, &Credentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ReauthenticationFailed));
    }

    #[tokio::test]
    async fn reauthentication_drops_contexts_of_removed_providers() {
        let full = ProviderChain::new(vec![provider("a", nobody), provider("b", alice_from_b)]);
        let identity = full.authenticate(&Credentials::new("alice", "pw")).await.unwrap();
        assert_eq!(identity.contexts.len(), 2);

        let reduced = ProviderChain::new(vec![provider("b", alice_from_b)]);
        let refreshed = reduced
            .reauthenticate(&identity, &Credentials::default())
            .await
            .unwrap();
        assert_eq!(refreshed.providers(), vec!["b"]);
        assert_eq!(refreshed.user, identity.user);
    }
}
