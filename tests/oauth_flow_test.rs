// Integration tests for the HubSpot OAuth flow endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hublink::api::{create_integration_router, IntegrationAppState};
use hublink::cache::{Cache, MemoryCache};
use hublink::config::HubLinkConfig;
use std::sync::Arc;
use tower::ServiceExt;

fn test_config(api_base_url: &str) -> HubLinkConfig {
    HubLinkConfig {
        client_id: "test-client-id".to_string(),
        client_secret: "test-client-secret".to_string(),
        redirect_uri: "http://localhost:8000/integrations/hubspot/oauth2callback".to_string(),
        api_base_url: api_base_url.to_string(),
        redis_url: "redis://localhost:6379".to_string(),
        bind_addr: "127.0.0.1:8000".to_string(),
        frontend_origin: "http://localhost:3000".to_string(),
    }
}

fn create_test_app(api_base_url: &str) -> (Router, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let state = IntegrationAppState {
        config: Arc::new(test_config(api_base_url)),
        cache: cache.clone(),
    };
    (create_integration_router(state), cache)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn request_authorization_url(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/integrations/hubspot/authorize",
            serde_json::json!({"user_id": "u1", "org_id": "o1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["url"].as_str().unwrap().to_string()
}

fn extract_state_param(url: &str) -> String {
    url.rsplit("state=").next().unwrap().to_string()
}

#[tokio::test]
async fn test_authorize_returns_url_and_stores_session() {
    let (app, cache) = create_test_app("http://unused.invalid");

    let url = request_authorization_url(&app).await;
    assert!(url.starts_with("https://app.hubspot.com/oauth/authorize?"));
    assert!(url.contains("client_id=test-client-id"));
    assert!(url.contains("response_type=code"));

    // The state parameter decodes back to the requesting user and org
    let encoded_state = extract_state_param(&url);
    let decoded = URL_SAFE_NO_PAD.decode(&encoded_state).unwrap();
    let state_data: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
    assert_eq!(state_data["user_id"], "u1");
    assert_eq!(state_data["org_id"], "o1");

    // A matching session is cached under (provider, org, user)
    let saved = cache.get("hubspot:state:o1:u1").await.unwrap().unwrap();
    let saved: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(saved["state"], state_data["state"]);
}

#[tokio::test]
async fn test_full_popup_flow() {
    let mut server = mockito::Server::new_async().await;
    let _token_mock = server
        .mock("POST", "/oauth/v1/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "access_token": "tok",
                "refresh_token": "ref",
                "expires_in": 1800,
                "token_type": "bearer"
            }"#,
        )
        .create_async()
        .await;
    let _introspect_mock = server
        .mock("GET", "/oauth/v1/access-tokens/tok")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"token": "tok", "hub_id": 62515, "scopes": ["crm.objects.contacts.read"]}"#)
        .create_async()
        .await;

    let (app, cache) = create_test_app(&server.url());

    // Step 1: the frontend asks for an authorization URL
    let url = request_authorization_url(&app).await;
    let encoded_state = extract_state_param(&url);

    // Step 2: HubSpot redirects back with code and state
    let callback_uri = format!(
        "/integrations/hubspot/oauth2callback?code=abc&state={}",
        encoded_state
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&callback_uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("window.close()"));

    // The session was consumed
    assert_eq!(cache.get("hubspot:state:o1:u1").await.unwrap(), None);

    // Step 3: the frontend picks up the bundle exactly once
    let response = app
        .clone()
        .oneshot(post_json(
            "/integrations/hubspot/credentials",
            serde_json::json!({"user_id": "u1", "org_id": "o1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bundle = body_json(response).await;
    assert_eq!(bundle["access_token"], "tok");
    assert_eq!(bundle["refresh_token"], "ref");
    assert_eq!(bundle["hub_id"], 62515);

    // A second pickup fails: the bundle was deleted on read
    let response = app
        .clone()
        .oneshot(post_json(
            "/integrations/hubspot/credentials",
            serde_json::json!({"user_id": "u1", "org_id": "o1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No credentials found");

    // Replaying the callback fails: the session is gone
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&callback_uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "State does not match");
}

#[tokio::test]
async fn test_callback_denial_surfaces_description() {
    let (app, _cache) = create_test_app("http://unused.invalid");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/integrations/hubspot/oauth2callback?error=access_denied&error_description=User%20cancelled")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Authorization denied: User cancelled");
}

#[tokio::test]
async fn test_callback_missing_state() {
    let (app, _cache) = create_test_app("http://unused.invalid");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/integrations/hubspot/oauth2callback?code=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Missing state parameter");
}

#[tokio::test]
async fn test_mismatched_state_never_reaches_token_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth/v1/token")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let (app, _cache) = create_test_app(&server.url());

    // Well-formed state for a session that was never created
    let forged = serde_json::json!({
        "state": "forged-token",
        "user_id": "u1",
        "org_id": "o1"
    });
    let encoded = URL_SAFE_NO_PAD.encode(forged.to_string());

    let response = app
        .oneshot(
            Request::builder()
                .uri(&format!(
                    "/integrations/hubspot/oauth2callback?code=abc&state={}",
                    encoded
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "State does not match");

    // No token exchange was attempted
    token_mock.assert_async().await;
}
