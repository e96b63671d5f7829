use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    error::GatewayError,
    session::{SessionState, SessionUser},
};

/// Cookie set by the web-admin console and the legacy admin panel.
pub const ADMIN_TOKEN_COOKIE: &str = "admin_token";
/// Cookie set by the public web app.
pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// token_from_headers
///
/// Token lookup order: `Authorization: Bearer`, then the `admin_token` cookie,
/// then the `auth_token` cookie. Blank values count as absent.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim_start().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        let jar = CookieJar::from_headers(headers);
        [ADMIN_TOKEN_COOKIE, AUTH_TOKEN_COOKIE]
            .iter()
            .filter_map(|name| jar.get(name))
            .map(|cookie| cookie.value().trim().to_string())
            .find(|token| !token.is_empty())
    })
}

/// AccessToken
///
/// Extractor for proxy routes: only proves a token is present. Whether it is valid is
/// the backend's call. Rejects with the 401 envelope before any upstream traffic.
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);

impl<S> FromRequestParts<S> for AccessToken
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        token_from_headers(&parts.headers)
            .map(AccessToken)
            .ok_or(GatewayError::MissingToken)
    }
}

/// CurrentSession
///
/// Extractor resolving the token into a `SessionUser` through the configured
/// `SessionResolver`. A failed lookup is logged and treated as "not signed in".
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub user: SessionUser,
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AccessToken(token) = AccessToken::from_request_parts(parts, state).await?;
        let sessions = SessionState::from_ref(state);

        match sessions.resolve(&token).await {
            Ok(Some(user)) => Ok(CurrentSession { token, user }),
            Ok(None) => Err(GatewayError::MissingToken),
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                Err(GatewayError::MissingToken)
            }
        }
    }
}
