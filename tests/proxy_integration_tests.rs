mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use tower::util::ServiceExt;
use voyage_gateway::{SessionState, StaticSessionResolver};

use common::{dead_backend, gateway, read_json, spawn_backend};

fn no_sessions() -> SessionState {
    Arc::new(StaticSessionResolver::new())
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_rejected_before_the_backend() {
    let (api_url, recorder) = spawn_backend().await;
    let app = gateway(&api_url, no_sessions());

    let response = app.oneshot(get("/api/experiences", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Unauthorized"));
    assert!(recorder.all().is_empty(), "backend must not be contacted");
}

#[tokio::test]
async fn test_bearer_request_is_forwarded_and_relayed_unchanged() {
    let (api_url, recorder) = spawn_backend().await;
    let app = gateway(&api_url, no_sessions());

    let payload = json!({ "title": "Sunrise at Sintra", "price": 45.5, "currency": "EUR" });
    let response = app
        .oneshot(json_request("PUT", "/api/experiences/12?draft=true", Some("tok-1"), payload.clone()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["echo"]["method"], json!("PUT"));
    assert_eq!(body["echo"]["path"], json!("/experiences/12"));
    assert_eq!(body["echo"]["query"], json!("draft=true"));
    assert_eq!(body["echo"]["body"], payload);

    let seen = recorder.last();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok-1"));
    assert_eq!(seen.body, payload);
    // The gateway stamps a request id and hands it to the backend.
    assert!(seen.request_id.is_some());
}

#[tokio::test]
async fn test_admin_cookie_is_forwarded_as_bearer() {
    let (api_url, recorder) = spawn_backend().await;
    let app = gateway(&api_url, no_sessions());

    let request = Request::builder()
        .method("GET")
        .uri("/api/banks")
        .header(header::COOKIE, "theme=dark; admin_token=console-tok")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(recorder.last().authorization.as_deref(), Some("Bearer console-tok"));
    assert_eq!(recorder.last().path, "/banks");
}

#[tokio::test]
async fn test_comment_story_id_is_sent_as_snake_case() {
    let (api_url, recorder) = spawn_backend().await;
    let app = gateway(&api_url, no_sessions());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/comments",
            Some("tok"),
            json!({ "storyId": 42, "content": "Lovely write-up!", "parentId": null }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let seen = recorder.last();
    assert_eq!(seen.path, "/comments");
    assert_eq!(
        seen.body,
        json!({ "story_id": 42, "content": "Lovely write-up!", "parent_id": null })
    );
    assert!(seen.body.get("storyId").is_none());
}

#[tokio::test]
async fn test_invalid_comment_body_is_rejected_locally() {
    let (api_url, recorder) = spawn_backend().await;
    let app = gateway(&api_url, no_sessions());

    let response = app
        .oneshot(json_request("POST", "/api/comments", Some("tok"), json!({ "storyId": 42 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));
    assert!(recorder.all().is_empty());
}

#[tokio::test]
async fn test_backend_failure_status_and_message_are_relayed() {
    let (api_url, _recorder) = spawn_backend().await;
    let app = gateway(&api_url, no_sessions());

    let response = app.oneshot(get("/api/stories/missing", Some("tok"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        read_json(response).await,
        json!({ "success": false, "message": "Story not found" })
    );
}

#[tokio::test]
async fn test_backend_failure_without_json_gets_generic_message() {
    let (api_url, _recorder) = spawn_backend().await;
    let app = gateway(&api_url, no_sessions());

    let response = app.oneshot(get("/api/bookings/conflict", Some("tok"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["message"], json!("Request failed with status 409"));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_generic_500() {
    let api_url = dead_backend().await;
    let app = gateway(&api_url, no_sessions());

    let response = app.oneshot(get("/api/countries", Some("tok"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(response).await,
        json!({ "success": false, "message": "Internal server error" })
    );
}

#[tokio::test]
async fn test_no_content_is_relayed() {
    let (api_url, recorder) = spawn_backend().await;
    let app = gateway(&api_url, no_sessions());

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/bookings/7")
        .header(header::AUTHORIZATION, "Bearer tok")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(recorder.last().path, "/bookings/7");
}

#[tokio::test]
async fn test_notification_settings_are_camel_cased_both_ways() {
    let (api_url, recorder) = spawn_backend().await;

    let response = gateway(&api_url, no_sessions())
        .oneshot(get("/api/notifications/settings", Some("tok")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({
            "success": true,
            "data": {
                "userId": 3,
                "emailNotifications": true,
                "pushNotifications": false,
                "marketingEmails": false
            }
        })
    );

    let response = gateway(&api_url, no_sessions())
        .oneshot(json_request(
            "PUT",
            "/api/notifications/settings",
            Some("tok"),
            json!({ "emailNotifications": false, "storyComments": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        recorder.last().body,
        json!({ "email_notifications": false, "story_comments": true })
    );
}

#[tokio::test]
async fn test_review_reply_route_is_exact() {
    let (api_url, recorder) = spawn_backend().await;

    let response = gateway(&api_url, no_sessions())
        .oneshot(json_request(
            "POST",
            "/api/reviews/55/reply",
            Some("tok"),
            json!({ "reply": "Thanks for staying with us!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(recorder.last().path, "/reviews/55/reply");

    // Only the reply endpoint of reviews is exposed.
    let response = gateway(&api_url, no_sessions())
        .oneshot(get("/api/reviews/55", Some("tok")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bank_account_payload_is_snake_cased() {
    let (api_url, recorder) = spawn_backend().await;

    let response = gateway(&api_url, no_sessions())
        .oneshot(json_request(
            "POST",
            "/api/payments/bank-accounts",
            Some("tok"),
            json!({ "bankId": 4, "accountNumber": "PT50000201231234567890154", "accountHolderName": "Ana Sousa" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        recorder.last().body,
        json!({ "bank_id": 4, "account_number": "PT50000201231234567890154", "account_holder_name": "Ana Sousa" })
    );
}

#[tokio::test]
async fn test_unsupported_method_is_not_forwarded() {
    let (api_url, recorder) = spawn_backend().await;

    let request = Request::builder()
        .method("TRACE")
        .uri("/api/faqs")
        .header(header::AUTHORIZATION, "Bearer tok")
        .body(Body::empty())
        .unwrap();
    let response = gateway(&api_url, no_sessions()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(recorder.all().is_empty());
}

#[tokio::test]
async fn test_dot_segments_cannot_leave_the_resource() {
    let (api_url, recorder) = spawn_backend().await;

    for uri in [
        "/api/faqs/../../internal/secrets",
        "/api/faqs/%2e%2e/%2e%2e/internal/x",
        "/api/faqs/%2E%2E/users",
        "/api/reviews/../reply",
    ] {
        let response = gateway(&api_url, no_sessions())
            .oneshot(get(uri, Some("tok")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            read_json(response).await,
            json!({ "success": false, "message": "Invalid request path" })
        );
    }

    assert!(recorder.all().is_empty(), "backend must not be contacted");
}

#[tokio::test]
async fn test_unknown_paths_are_404_without_session_lookups() {
    let (api_url, recorder) = spawn_backend().await;

    for uri in ["/no/such/page", "/api/no-such-resource", "/api/reviews/55"] {
        let response = gateway(&api_url, no_sessions())
            .oneshot(get(uri, Some("tok")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert!(response.headers().get(header::LOCATION).is_none(), "{uri}");
    }

    assert!(recorder.all().is_empty());
}
