use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// GatewayError
///
/// The flat failure taxonomy of the gateway. Every variant renders as the
/// `{ "success": false, "message": ... }` envelope the frontends expect.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Unauthorized")]
    MissingToken,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// A proxied path that would leave its catalog resource (`..`, `%2e%2e`).
    #[error("Invalid request path")]
    InvalidPath,

    /// The backend answered with a non-2xx status. Its status is relayed as-is.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// The backend could not be reached (connect error, timeout, broken body).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("request to {path} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        path: String,
        attempts: u32,
        last: String,
    },
}

/// ErrorEnvelope
///
/// Wire shape of every failed gateway response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingToken => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidBody(_) | GatewayError::InvalidPath => StatusCode::BAD_REQUEST,
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RetriesExhausted { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// True for failures worth another attempt: transport errors, 5xx and 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Upstream { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // The real cause goes to the logs, never to the client.
            GatewayError::Transport(e) => {
                tracing::error!(error = %e, "upstream transport failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorEnvelope::new(message))).into_response()
    }
}

/// Pulls a human readable message out of a backend error body.
/// Express handlers answer with either `message` or `error`.
pub fn upstream_message(body: &serde_json::Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}
