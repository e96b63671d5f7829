use std::sync::Arc;

use crate::{
    AppState, handlers,
    models::{
        CreateBankAccountRequest, CreateCommentRequest, CreateStoryRequest, ReviewReplyRequest,
        UpdateNotificationSettingsRequest,
    },
    proxy::{self, ProxyRoute},
    transform::{FieldMap, KeyCase, validate_as},
};
use axum::{
    Extension, Router,
    http::Method,
    routing::{MethodFilter, get, on},
};

/// catalog
///
/// Every backend resource the frontends reach through the gateway. Field mapping
/// and body schemas are declared here and nowhere else.
pub fn catalog() -> Vec<ProxyRoute> {
    vec![
        ProxyRoute::new("/experiences"),
        ProxyRoute::new("/stories").validate(Method::POST, validate_as::<CreateStoryRequest>),
        // The story page posts `storyId` / `parentId`; the backend columns are snake_case.
        ProxyRoute::new("/comments")
            .request(
                FieldMap::identity()
                    .rename("storyId", "story_id")
                    .rename("parentId", "parent_id"),
            )
            .validate(Method::POST, validate_as::<CreateCommentRequest>),
        ProxyRoute::new("/users"),
        ProxyRoute::new("/bookings"),
        // --- Master data (web-admin console) ---
        ProxyRoute::new("/banks"),
        ProxyRoute::new("/countries"),
        ProxyRoute::new("/cities"),
        ProxyRoute::new("/faqs"),
        ProxyRoute::new("/languages"),
        // --- Account settings (public web app, camelCase end to end on the client) ---
        ProxyRoute::new("/notifications/settings")
            .request(FieldMap::identity().keys(KeyCase::Snake))
            .response(FieldMap::identity().keys(KeyCase::Camel))
            .validate(Method::PUT, validate_as::<UpdateNotificationSettingsRequest>)
            .validate(Method::PATCH, validate_as::<UpdateNotificationSettingsRequest>),
        ProxyRoute::new("/payments/bank-accounts")
            .request(FieldMap::identity().keys(KeyCase::Snake))
            .response(FieldMap::identity().keys(KeyCase::Camel))
            .validate(Method::POST, validate_as::<CreateBankAccountRequest>),
        // Host dashboard: replying to a guest review.
        ProxyRoute::new("/reviews")
            .only("/{id}/reply")
            .validate(Method::POST, validate_as::<ReviewReplyRequest>),
    ]
}

/// Authenticated Router Module
///
/// Mounts each catalog declaration on its paths with the shared `proxy::forward`
/// handler. The `AccessToken` extractor inside `forward` rejects tokenless requests
/// with 401 before the backend is contacted.
pub fn authenticated_routes(routes: Vec<ProxyRoute>) -> Router<AppState> {
    let methods = MethodFilter::GET
        .or(MethodFilter::POST)
        .or(MethodFilter::PUT)
        .or(MethodFilter::PATCH)
        .or(MethodFilter::DELETE);

    routes.into_iter().fold(
        Router::new()
            // GET /api/auth/session
            // The resolved auth context the console's guard and header widgets read.
            .route("/api/auth/session", get(handlers::get_session)),
        |router, route| {
            let paths = route.mount_paths();
            let route = Arc::new(route);
            paths.into_iter().fold(router, |router, path| {
                router.route(
                    &path,
                    on(methods, proxy::forward).layer(Extension(route.clone())),
                )
            })
        },
    )
}
