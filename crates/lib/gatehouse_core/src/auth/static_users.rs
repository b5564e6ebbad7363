//! Provider backed by a static YAML user file.
//!
//! ```yaml
//! users:
//!   - username: alice
//!     password: "$2b$10$..."   # bcrypt, see `gatehouse hash-password`
//!     permissions: [connection:rdp-1, admin]
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::password::verify_password;
use super::{AuthError, AuthenticatedUser, AuthenticationProvider, AuthorizationContext, Credentials};
use crate::config::ConfigError;

/// Default identifier of the static provider.
pub const STATIC_PROVIDER_ID: &str = "static";

/// One entry in the user file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub username: String,
    /// bcrypt hash.
    pub password: String,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct UserFile {
    #[serde(default)]
    users: Vec<UserEntry>,
}

/// Authenticates against a fixed set of users.
#[derive(Debug)]
pub struct StaticUserProvider {
    identifier: String,
    users: HashMap<String, UserEntry>,
}

impl StaticUserProvider {
    pub fn new(identifier: impl Into<String>, users: Vec<UserEntry>) -> Self {
        Self {
            identifier: identifier.into(),
            users: users.into_iter().map(|u| (u.username.clone(), u)).collect(),
        }
    }

    /// Parse a YAML user file body.
    pub fn from_yaml_str(identifier: impl Into<String>, yaml: &str) -> Result<Self, ConfigError> {
        let file: UserFile = serde_yaml::from_str(yaml)?;
        Ok(Self::new(identifier, file.users))
    }

    /// Load a YAML user file from disk.
    pub fn from_file(identifier: impl Into<String>, path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(identifier, &yaml)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// The entry whose password matches, if any.
    fn verify(&self, credentials: &Credentials) -> Result<Option<&UserEntry>, AuthError> {
        let (Some(username), Some(password)) = (&credentials.username, &credentials.password)
        else {
            return Ok(None);
        };
        let Some(entry) = self.users.get(username) else {
            debug!(provider = %self.identifier, %username, "no such user");
            return Ok(None);
        };
        Ok(verify_password(password, &entry.password)?.then_some(entry))
    }
}

#[async_trait]
impl AuthenticationProvider for StaticUserProvider {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn authenticate_user(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<AuthenticatedUser>, AuthError> {
        Ok(self.verify(credentials)?.map(|entry| AuthenticatedUser {
            username: entry.username.clone(),
            provider: self.identifier.clone(),
        }))
    }

    /// A bare token refresh keeps the user. Fresh credentials must verify and
    /// must name the same user.
    async fn update_authenticated_user(
        &self,
        user: &AuthenticatedUser,
        credentials: &Credentials,
    ) -> Result<Option<AuthenticatedUser>, AuthError> {
        if credentials.username.is_none() && credentials.password.is_none() {
            return Ok(self.users.contains_key(&user.username).then(|| user.clone()));
        }
        Ok(self
            .verify(credentials)?
            .filter(|entry| entry.username == user.username)
            .map(|_| user.clone()))
    }

    async fn authorization_context(
        &self,
        user: &AuthenticatedUser,
    ) -> Result<Option<AuthorizationContext>, AuthError> {
        Ok(self.users.get(&user.username).map(|entry| AuthorizationContext {
            provider: self.identifier.clone(),
            permissions: entry.permissions.clone(),
        }))
    }
}
