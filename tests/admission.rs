//! End-to-end admission tests driving the router over HTTP semantics

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use gatewarden::domain::claims::Role;
use gatewarden::infrastructure::session::SessionGate;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use common::{TestConfigBuilder, TestGateway};

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap()
}

fn get_with_token(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let gw = TestGateway::new();
    let response = gw.router.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let gw = TestGateway::new();
    let response = gw.router.clone().oneshot(get("/api/items")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-auth-error").unwrap(),
        "MISSING_TOKEN"
    );

    let body = json_body(response).await;
    assert_eq!(body["error"], "MISSING_TOKEN");
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());
    assert!(body["requestId"].is_string());
}

#[tokio::test]
async fn admitted_request_is_forwarded_with_identity() {
    let gw = TestGateway::new();
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/api/items", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-ratelimit-limit"));
    assert!(response.headers().contains_key("x-ratelimit-remaining"));
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["forwarded"], true);
    assert_eq!(body["userId"], "u-1");
    assert_eq!(body["tenantId"], "acme");
    assert_eq!(body["role"], "user");
    assert_eq!(body["sessionId"], "s-1");
}

#[tokio::test]
async fn spoofed_identity_headers_are_replaced() {
    let gw = TestGateway::new();
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;

    let request = Request::builder()
        .uri("/api/items")
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header("x-auth-user-id", "someone-else")
        .header("x-auth-role", "super_admin")
        .body(Body::empty())
        .unwrap();

    let response = gw.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["userId"], "u-1");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn expired_token_is_401() {
    let gw = TestGateway::new();
    let token = gw.expired_token("u-1");

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/api/items", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-auth-error").unwrap(),
        "EXPIRED_TOKEN"
    );
}

#[tokio::test]
async fn tampered_token_is_401() {
    let gw = TestGateway::new();
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;
    let tampered = format!("{}x", &token[..token.len() - 1]);

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/api/items", &tampered))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoked_token_is_401_blacklisted() {
    let gw = TestGateway::new();
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;
    gw.sessions
        .blacklist_token_hash(SessionGate::hash_token(&token))
        .await;

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/api/items", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-auth-error").unwrap(),
        "BLACKLISTED_TOKEN"
    );
}

#[tokio::test]
async fn admin_route_rejects_regular_user() {
    let gw = TestGateway::new();
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/admin/whitelist", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers().get("x-auth-error").unwrap(),
        "INSUFFICIENT_PRIVILEGES"
    );
}

#[tokio::test]
async fn admin_manages_whitelist_over_http() {
    let gw = TestGateway::new();
    let token = gw.login("root", "acme", "s-root", Role::Admin).await;

    let add = Request::builder()
        .method("POST")
        .uri("/admin/whitelist")
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"ip":"198.51.100.4","reason":"load test"}"#,
        ))
        .unwrap();
    let response = gw.router.clone().oneshot(add).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(gw.state.is_whitelisted("198.51.100.4"));

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/admin/whitelist", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let remove = Request::builder()
        .method("DELETE")
        .uri("/admin/whitelist/198.51.100.4")
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = gw.router.clone().oneshot(remove).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!gw.state.is_whitelisted("198.51.100.4"));
}

#[tokio::test]
async fn rate_limit_answers_429_with_retry_after() {
    let config = TestConfigBuilder::new().with_general_capacity(2).build();
    let gw = TestGateway::with_config(config);
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;

    for _ in 0..2 {
        let response = gw
            .router
            .clone()
            .oneshot(get_with_token("/api/items", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/api/items", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    assert_eq!(
        response.headers().get("x-auth-error").unwrap(),
        "RATE_LIMITED"
    );
}

#[tokio::test]
async fn whitelisted_ip_is_not_rate_limited() {
    let config = TestConfigBuilder::new().with_general_capacity(1).build();
    let gw = TestGateway::with_config(config);
    gw.state
        .whitelist_add("203.0.113.7".parse().unwrap(), "partner");
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;

    for _ in 0..5 {
        let response = gw
            .router
            .clone()
            .oneshot(get_with_token("/api/items", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn hostile_query_is_400_validation_error() {
    let gw = TestGateway::new();

    let response = gw
        .router
        .clone()
        .oneshot(get("/api/search?q=1%20UNION%20SELECT%20password%20FROM%20users"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("x-validation-error").unwrap(),
        "MALICIOUS_CONTENT"
    );

    // The response must not echo the payload
    let body = json_body(response).await;
    assert!(!body["message"].as_str().unwrap().contains("UNION"));
}

#[tokio::test]
async fn oversized_body_is_400() {
    let config = TestConfigBuilder::new().with_max_body_bytes(64).build();
    let gw = TestGateway::with_config(config);

    let request = Request::builder()
        .method("POST")
        .uri("/api/items")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(vec![b'a'; 128]))
        .unwrap();

    let response = gw.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("x-validation-error").unwrap(),
        "REQUEST_TOO_LARGE"
    );
}

#[tokio::test]
async fn high_load_escalates_general_traffic() {
    // General capacity 5, upload default 30: under load General traffic
    // is evaluated as Upload, which here is stricter than General
    let mut config = TestConfigBuilder::new().with_adaptive_threshold(0.5).build();
    config.limits.classes.general.capacity = 100;
    config.limits.classes.upload.capacity = 1;
    let gw = TestGateway::with_config(config);
    gw.state.set_load_factor(0.9);
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/api/items", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = gw
        .router
        .clone()
        .oneshot(get_with_token("/api/items", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn security_headers_present_on_every_response() {
    let gw = TestGateway::new();
    let response = gw.router.clone().oneshot(get("/health")).await.unwrap();

    assert!(response.headers().contains_key("x-content-type-options"));
    assert!(response.headers().contains_key("x-frame-options"));
    assert!(response.headers().contains_key("strict-transport-security"));
}

#[tokio::test]
async fn request_id_is_propagated_from_client() {
    let gw = TestGateway::new();
    let id = uuid::Uuid::new_v4().to_string();
    let token = gw.login("u-1", "acme", "s-1", Role::User).await;

    let request = Request::builder()
        .uri("/api/items")
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header("x-request-id", &id)
        .body(Body::empty())
        .unwrap();

    let response = gw.router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap().to_str().unwrap(),
        id
    );
}
