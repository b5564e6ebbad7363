//! Session middleware: find the presented token and resolve it to a session.

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, Uri, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use gatehouse_core::Session;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;

/// Header carrying the token when `Authorization` is taken by something else.
pub const TOKEN_HEADER: &str = "gatehouse-token";

/// The resolved session, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub token: String,
    pub session: Arc<Session>,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// The token presented with a request, checked in order: `Authorization:
/// Bearer`, the `Gatehouse-Token` header, the `token` query parameter.
pub fn presented_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim());
    let header = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    if let Some(token) = bearer.or(header).filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Axum middleware: resolves the presented token and injects
/// [`AuthenticatedSession`] into request extensions. Missing, unknown and
/// expired tokens all get the same 401.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = presented_token(request.headers(), request.uri())
        .ok_or_else(AppError::permission_denied)?;
    let session = state.sessions.resolve_session(&token)?;

    request
        .extensions_mut()
        .insert(AuthenticatedSession { token, session });

    Ok(next.run(request).await)
}
