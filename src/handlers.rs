use axum::Json;

use crate::{auth::CurrentSession, session::SessionUser};

/// health
///
/// [Public Route] Liveness probe. Never contacts the backend.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Gateway is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// get_session
///
/// [Authenticated Route] Returns the auth context resolved from the caller's bearer
/// token or `admin_token`/`auth_token` cookie. This is what a console page asks
/// before deciding between rendering, `/login` and `/unauthorized`.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Resolved session", body = SessionUser),
        (status = 401, description = "No valid session", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_session(CurrentSession { user, .. }: CurrentSession) -> Json<SessionUser> {
    Json(user)
}
