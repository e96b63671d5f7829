use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation, decode};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{api_client::ApiClient, error::GatewayError};

/// Role
///
/// Marketplace roles as the backend spells them. Unknown spellings are kept
/// verbatim so a new backend role never breaks session parsing; it simply
/// matches no gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    Finance,
    Marketing,
    Moderator,
    Support,
    Host,
    Traveller,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Finance => "finance",
            Role::Marketing => "marketing",
            Role::Moderator => "moderator",
            Role::Support => "support",
            Role::Host => "host",
            Role::Traveller => "traveller",
            Role::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "super_admin" | "superadmin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "finance" => Role::Finance,
            "marketing" => Role::Marketing,
            "moderator" => Role::Moderator,
            "support" => Role::Support,
            "host" => Role::Host,
            "traveller" | "traveler" => Role::Traveller,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SessionUser
///
/// The resolved auth context: who is calling and with which role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    pub email: String,
    #[schema(value_type = String, example = "finance")]
    pub role: Role,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Claims
///
/// Payload of the tokens the backend issues. Only read when the gateway shares the
/// backend's signing secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    pub email: String,
    pub role: Role,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

/// SessionResolver
///
/// Turns a raw token into the caller's identity. `Ok(None)` means "no valid session"
/// (expired, revoked, garbage); `Err` means the lookup itself could not be made.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<SessionUser>, GatewayError>;
}

pub type SessionState = Arc<dyn SessionResolver>;

/// Asks the backend who owns the token (`GET /auth/me`). Outages are retried per
/// `ApiClient` policy; a 401/403 is an answer and ends the lookup at once.
pub struct BackendSessionResolver {
    client: ApiClient,
}

impl BackendSessionResolver {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionResolver for BackendSessionResolver {
    async fn resolve(&self, token: &str) -> Result<Option<SessionUser>, GatewayError> {
        match self
            .client
            .fetch_with_retry_when(
                Method::GET,
                "/auth/me",
                Some(token),
                None,
                GatewayError::is_retryable,
            )
            .await
        {
            Ok(body) => Ok(extract_user(&body)),
            Err(GatewayError::Upstream { status, .. })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Finds the user object in a backend `/auth/me` body. The Express handlers are not
/// consistent: `{ data: { user } }`, `{ data }`, `{ user }` and a bare user all occur.
pub fn extract_user(body: &Value) -> Option<SessionUser> {
    ["/data/user", "/data", "/user", ""]
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(|candidate| SessionUser::deserialize(candidate).ok())
}

/// Validates the token locally with the backend's signing secret.
pub struct JwtSessionResolver {
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionResolver {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve(&self, token: &str) -> Result<Option<SessionUser>, GatewayError> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => {
                let claims = data.claims;
                Ok(Some(SessionUser {
                    id: claims.id,
                    uuid: claims.uuid,
                    email: claims.email,
                    role: claims.role,
                    first_name: None,
                    last_name: None,
                }))
            }
            Err(e) => {
                tracing::debug!(error = ?e, "rejected session token");
                Ok(None)
            }
        }
    }
}

/// StaticSessionResolver
///
/// Fixed token -> user table. Used for local development without a backend and in tests.
#[derive(Clone, Default)]
pub struct StaticSessionResolver {
    sessions: HashMap<String, SessionUser>,
}

impl StaticSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: &str, user: SessionUser) -> Self {
        self.sessions.insert(token.to_string(), user);
        self
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve(&self, token: &str) -> Result<Option<SessionUser>, GatewayError> {
        Ok(self.sessions.get(token).cloned())
    }
}
