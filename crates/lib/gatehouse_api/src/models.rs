//! Request and response bodies. JSON field names are camelCase.

use chrono::{DateTime, Utc};
use gatehouse_core::auth::Identity;
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `POST /api/tokens` form. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Existing token to refresh instead of issuing a new one.
    pub token: Option<String>,
}

/// Issued (or refreshed) token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub auth_token: String,
    pub username: String,
    /// Provider whose context is considered primary for this login.
    pub data_source: String,
    pub available_data_sources: Vec<String>,
}

impl TokenResponse {
    pub fn new(token: String, identity: &Identity) -> Self {
        Self {
            auth_token: token,
            username: identity.user.username.clone(),
            data_source: primary_data_source(identity),
            available_data_sources: identity.providers(),
        }
    }
}

/// `GET /api/session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfoResponse {
    pub username: String,
    pub data_source: String,
    pub available_data_sources: Vec<String>,
    pub login_time: DateTime<Utc>,
    pub active_resources: usize,
}

/// `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_sessions: usize,
}

/// The provider that authenticated the user if it also issued a context,
/// else the first provider that did, else the authenticating provider.
pub fn primary_data_source(identity: &Identity) -> String {
    let origin = &identity.user.provider;
    if identity.context(origin).is_some() {
        return origin.clone();
    }
    identity
        .contexts
        .first()
        .map(|c| c.provider.clone())
        .unwrap_or_else(|| origin.clone())
}
