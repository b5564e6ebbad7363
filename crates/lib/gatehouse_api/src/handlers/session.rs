//! Handlers for the session behind the presented token.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedSession;
use crate::models::{SessionInfoResponse, primary_data_source};

/// `GET /api/session` — who is logged in and what the session holds.
pub async fn session_info_handler(
    Extension(auth): Extension<AuthenticatedSession>,
) -> Json<SessionInfoResponse> {
    let session = &auth.session;
    let identity = session.identity();
    Json(SessionInfoResponse {
        username: identity.user.username.clone(),
        data_source: primary_data_source(&identity),
        available_data_sources: identity.providers(),
        login_time: session.login_time(),
        active_resources: session.resource_count(),
    })
}

/// `DELETE /api/session` — log out the presented token.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedSession>,
) -> AppResult<StatusCode> {
    state.sessions.destroy_session(&auth.token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/session/data/{data_source}/permissions` — permissions granted by
/// one provider.
pub async fn permissions_handler(
    Extension(auth): Extension<AuthenticatedSession>,
    Path(data_source): Path<String>,
) -> AppResult<Json<Vec<String>>> {
    let context = auth
        .session
        .context(&data_source)
        .ok_or_else(|| AppError::NotFound(format!("No such data source: {data_source}")))?;
    Ok(Json(context.permissions.into_iter().collect()))
}
