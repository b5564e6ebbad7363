//! Token issue and revocation.

use axum::Json;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{TokenRequest, TokenResponse};
use crate::services::credentials::{ClientAddress, credentials_from_request};

/// `POST /api/tokens` — log in, or refresh the session behind `token`.
///
/// A request without a form body is allowed; credentials then come from an
/// `Authorization: Basic` header, if any.
pub async fn create_token_handler(
    State(state): State<AppState>,
    address: ClientAddress,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> AppResult<Json<TokenResponse>> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(FormRejection::InvalidFormContentType(_)) => TokenRequest::default(),
        Err(e) => return Err(AppError::Validation(e.body_text())),
    };

    let credentials = credentials_from_request(&form, &headers, address);
    let token = state
        .sessions
        .create_or_refresh_session(form.token.as_deref(), &credentials)
        .await?;

    let session = state.sessions.resolve_session(&token)?;
    debug!(
        username = %session.username(),
        remote_addr = credentials.loggable_address(),
        "token issued"
    );
    Ok(Json(TokenResponse::new(token, &session.identity())))
}

/// `DELETE /api/tokens/{token}` — log out the given token.
pub async fn destroy_token_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<StatusCode> {
    state.sessions.destroy_session(&token)?;
    Ok(StatusCode::NO_CONTENT)
}
