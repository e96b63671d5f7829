use crate::{
    AppState,
    guard::{LOGIN_PATH, UNAUTHORIZED_PATH},
    handlers,
};
use axum::{Router, routing::get};
use tower_http::services::ServeFile;

/// Public Router Module
///
/// Unauthenticated endpoints. The two console pages here are the redirect targets
/// of every role gate, so they must never be gated themselves.
pub fn public_routes(state: &AppState) -> Router<AppState> {
    let pages = &state.config.pages_dir;
    Router::new()
        // GET /health
        // Load balancer probe. Answers without touching the backend.
        .route("/health", get(handlers::health))
        // GET /login
        .route_service(LOGIN_PATH, ServeFile::new(pages.join("login.html")))
        // GET /unauthorized
        .route_service(UNAUTHORIZED_PATH, ServeFile::new(pages.join("unauthorized.html")))
}
