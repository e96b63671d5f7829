use std::sync::Arc;

use axum::{
    Extension, Json,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{
    AppState,
    auth::AccessToken,
    error::{GatewayError, upstream_message},
    transform::{FieldMap, Validator},
};

/// Which request paths below the resource a route answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subpaths {
    /// `/api/<resource>` and anything below it.
    Any,
    /// `/api/<resource>` followed by exactly this axum pattern, e.g. `/{id}/reply`.
    Only(&'static str),
}

/// ProxyRoute
///
/// Declaration of one backend resource exposed under `/api`: where it forwards,
/// how JSON keys are mapped each way, and which bodies are schema-checked.
#[derive(Debug, Clone)]
pub struct ProxyRoute {
    pub resource: &'static str,
    pub upstream: &'static str,
    pub subpaths: Subpaths,
    pub request_fields: FieldMap,
    pub response_fields: FieldMap,
    pub schemas: Vec<(Method, Validator)>,
}

pub const API_PREFIX: &str = "/api";

impl ProxyRoute {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            upstream: resource,
            subpaths: Subpaths::Any,
            request_fields: FieldMap::identity(),
            response_fields: FieldMap::identity(),
            schemas: Vec::new(),
        }
    }

    pub fn upstream(mut self, upstream: &'static str) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn only(mut self, pattern: &'static str) -> Self {
        self.subpaths = Subpaths::Only(pattern);
        self
    }

    pub fn request(mut self, fields: FieldMap) -> Self {
        self.request_fields = fields;
        self
    }

    pub fn response(mut self, fields: FieldMap) -> Self {
        self.response_fields = fields;
        self
    }

    pub fn validate(mut self, method: Method, validator: Validator) -> Self {
        self.schemas.push((method, validator));
        self
    }

    /// Axum route patterns this declaration is mounted on.
    pub fn mount_paths(&self) -> Vec<String> {
        let base = format!("{API_PREFIX}{}", self.resource);
        match self.subpaths {
            Subpaths::Any => vec![base.clone(), format!("{base}/{{*rest}}")],
            Subpaths::Only(pattern) => vec![format!("{base}{pattern}")],
        }
    }

    /// `/api/comments/12` -> `/comments/12` (or the renamed upstream prefix).
    /// A tail with a dot segment, plain or percent-encoded, is refused so the
    /// URL parser cannot climb out of the resource.
    pub fn upstream_path(&self, request_path: &str) -> Result<String, GatewayError> {
        let base = format!("{API_PREFIX}{}", self.resource);
        let rest = request_path.strip_prefix(base.as_str()).unwrap_or("");
        if rest.split(['/', '\\']).any(is_dot_segment) {
            return Err(GatewayError::InvalidPath);
        }
        Ok(format!("{}{}", self.upstream, rest))
    }

    fn schema_for(&self, method: &Method) -> Option<Validator> {
        self.schemas
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, validator)| *validator)
    }
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

fn is_json(content_type: Option<&HeaderValue>) -> bool {
    content_type
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json") || v.contains("+json"))
        .unwrap_or(false)
}

/// forward
///
/// The one handler behind every catalog route. No token means 401 before any
/// upstream traffic; the backend's non-2xx status is relayed inside the error
/// envelope; a transport failure becomes a generic 500. Never retries.
pub async fn forward(
    State(state): State<AppState>,
    Extension(route): Extension<Arc<ProxyRoute>>,
    AccessToken(token): AccessToken,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let path = route.upstream_path(uri.path()).inspect_err(|_| {
        tracing::warn!(path = %uri.path(), "refused path outside the proxied resource");
    })?;
    let url = match uri.query() {
        Some(query) => format!("{}{}?{}", state.config.api_url, path, query),
        None => format!("{}{}", state.config.api_url, path),
    };

    let mut request = state
        .http
        .request(method.clone(), &url)
        .bearer_auth(&token)
        .header(header::ACCEPT, "application/json");
    if let Some(request_id) = headers.get("x-request-id") {
        request = request.header("x-request-id", request_id.clone());
    }

    let content_type = headers.get(header::CONTENT_TYPE);
    let schema = route.schema_for(&method);
    if is_json(content_type) || (body.is_empty() && schema.is_some()) {
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice::<Value>(&body)
                .map_err(|e| GatewayError::InvalidBody(e.to_string()))?
        };
        let mapped = route.request_fields.apply(value);
        if let Some(validate) = schema {
            validate(&mapped).map_err(GatewayError::InvalidBody)?;
        }
        if !mapped.is_null() {
            request = request.json(&mapped);
        }
    } else if !body.is_empty() {
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type.clone());
        }
        request = request.body(body);
    }

    tracing::debug!(%method, upstream = %url, "forwarding");
    let response = request.send().await?;
    let status = response.status();
    let upstream_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let value = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
        let message = upstream_message(&value)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        tracing::warn!(%method, upstream = %url, status = status.as_u16(), reason = %message, "backend rejected request");
        return Err(GatewayError::Upstream { status, message });
    }

    if bytes.is_empty() || status == StatusCode::NO_CONTENT {
        return Ok(status.into_response());
    }

    if !route.response_fields.is_identity() && is_json(upstream_type.as_ref()) {
        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            return Ok((status, Json(route.response_fields.apply(value))).into_response());
        }
    }

    let mut relayed = Response::new(Body::from(bytes));
    *relayed.status_mut() = status;
    if let Some(content_type) = upstream_type {
        relayed.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    Ok(relayed)
}
