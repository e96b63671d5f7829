use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod api_client;
pub mod auth;
pub mod config;
pub mod editor;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod proxy;
pub mod session;
pub mod transform;

// Routing segregation (Public, Authenticated proxy catalog, Admin console sections).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use api_client::{ApiClient, RetryPolicy};
pub use config::AppConfig;
pub use error::GatewayError;
pub use session::{
    BackendSessionResolver, JwtSessionResolver, SessionState, StaticSessionResolver,
};

/// ApiDoc
///
/// OpenAPI document for the gateway's own endpoints and the backend DTOs the
/// frontends consume through the proxy catalog. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::get_session),
    components(
        schemas(
            session::SessionUser, error::ErrorEnvelope,
            models::User, models::Experience, models::Story, models::Comment, models::Booking,
            models::NotificationSettings, models::Bank, models::Country, models::City,
            models::Language, models::Faq,
            models::CreateCommentRequest, models::CreateStoryRequest,
            models::CreateBankAccountRequest, models::ReviewReplyRequest,
            models::UpdateNotificationSettingsRequest,
        )
    ),
    tags(
        (name = "voyage-gateway", description = "Authenticated proxy in front of the marketplace backend")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable per-process state. `http` is the pooled client every proxy
/// route forwards through; `sessions` resolves tokens for gates and `/api/auth/session`.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub http: reqwest::Client,
    pub sessions: SessionState,
}

impl AppState {
    /// Builds the upstream client with the configured timeout.
    pub fn new(config: AppConfig, sessions: SessionState) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config,
            http,
            sessions,
        })
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

/// session_resolver
///
/// Local token validation when the backend's signing secret is configured,
/// otherwise a `/auth/me` round trip through the retrying `ApiClient`.
pub fn session_resolver(config: &AppConfig) -> Result<SessionState, GatewayError> {
    match &config.jwt_secret {
        Some(secret) => Ok(Arc::new(JwtSessionResolver::new(secret))),
        None => {
            let client = ApiClient::new(&config.api_url, config.request_timeout, config.retry)?;
            Ok(Arc::new(BackendSessionResolver::new(client)))
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    match config.env {
        crate::config::Env::Local => CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any),
        crate::config::Env::Production => match HeaderValue::from_str(&config.website_url) {
            // Cookies travel cross-origin, so the origin must be exact and credentials allowed.
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    HeaderName::from_static("x-request-id"),
                ]),
            Err(e) => {
                tracing::error!(error = %e, origin = %config.website_url, "invalid CORS origin, cross-origin requests disabled");
                CorsLayer::new()
            }
        },
    }
}

/// create_router
///
/// Assembles public, authenticated and admin routes, applies request-id and tracing
/// layers, then CORS outermost.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes(&state))
        .merge(authenticated::authenticated_routes(authenticated::catalog()))
        .merge(admin::admin_routes(&state))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Puts method, URI and `x-request-id` on the request span so every log line of a
/// request, proxy warnings included, can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
