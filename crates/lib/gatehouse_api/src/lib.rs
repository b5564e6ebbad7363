//! # gatehouse_api
//!
//! HTTP API library for Gatehouse.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use gatehouse_core::SessionService;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{health, session, tokens};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Login, token resolution and logout.
    pub sessions: Arc<SessionService>,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no token required)
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_API_TOKENS, post(tokens::create_token_handler))
        .route(
            routes::DELETE_API_TOKENS_TOKEN,
            delete(tokens::destroy_token_handler),
        );

    // Protected routes (require a live session)
    let protected = Router::new()
        .route(
            routes::GET_API_SESSION,
            get(session::session_info_handler).delete(session::logout_handler),
        )
        .route(
            routes::GET_API_SESSION_PERMISSIONS,
            get(session::permissions_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
