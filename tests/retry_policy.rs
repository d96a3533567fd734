//! Tests for the 401 refresh-and-retry policy shared by all client requests.

use anyhow::{Result, anyhow};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::sync::Arc;
use vestibule::{
    ApiClient, AuthService, ClientConfig, Error, MemoryTokenStore, RequestOptions, SessionStore,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

async fn client_with_tokens(server: &MockServer) -> Result<ApiClient> {
    let config = ClientConfig::new(&server.uri())?;
    let auth = AuthService::new(
        config,
        SessionStore::new(),
        Arc::new(MemoryTokenStore::new()),
    )?;
    auth.session().set_tokens(
        SecretString::from("stale".to_string()),
        SecretString::from("refresh-1".to_string()),
    );
    Ok(ApiClient::new(auth))
}

#[tokio::test]
async fn retries_once_with_the_refreshed_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let client = client_with_tokens(&server).await?;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/refresh/"))
        .and(body_json(json!({"refresh": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orders": [1, 2]})))
        .expect(1)
        .mount(&server)
        .await;

    let body: Value = client
        .get("/api/orders/", &RequestOptions::default())
        .await?;
    assert_eq!(body["orders"], json!([1, 2]));
    Ok(())
}

#[tokio::test]
async fn second_401_passes_through_without_a_second_refresh() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let client = client_with_tokens(&server).await?;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "revoked"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .get::<Value>("/api/orders/", &RequestOptions::default())
        .await
        .err()
        .ok_or_else(|| anyhow!("expected request failure"))?;

    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    Ok(())
}

#[tokio::test]
async fn refresh_failure_reaches_the_caller_instead_of_the_401() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let client = client_with_tokens(&server).await?;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/refresh/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "expired"})))
        .expect(1)
        .mount(&server)
        .await;

    // session teardown inside the failed refresh revokes the refresh token
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client
        .get::<Value>("/api/orders/", &RequestOptions::default())
        .await
        .err()
        .ok_or_else(|| anyhow!("expected request failure"))?;

    // the refresh failure, not the original 401
    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
    assert!(client.auth().session().access_token().is_none());
    assert!(client.auth().session().refresh_token().is_none());
    Ok(())
}

#[tokio::test]
async fn public_requests_never_trigger_a_refresh() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let client = client_with_tokens(&server).await?;

    Mock::given(method("GET"))
        .and(path("/api/public/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "nope"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .get::<Value>("/api/public/", &RequestOptions::public())
        .await
        .err()
        .ok_or_else(|| anyhow!("expected request failure"))?;

    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    // tokens untouched
    assert!(client.auth().session().access_token().is_some());
    Ok(())
}

#[tokio::test]
async fn missing_refresh_token_surfaces_as_auth_error() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let config = ClientConfig::new(&server.uri())?;
    let auth = AuthService::new(
        config,
        SessionStore::new(),
        Arc::new(MemoryTokenStore::new()),
    )?;
    let client = ApiClient::new(auth);

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .get::<Value>("/api/orders/", &RequestOptions::default())
        .await
        .err()
        .ok_or_else(|| anyhow!("expected request failure"))?;

    match err {
        Error::Auth(message) => assert_eq!(message, "No refresh token available"),
        other => return Err(anyhow!("expected Auth error, got {other:?}")),
    }
    Ok(())
}

#[tokio::test]
async fn empty_success_bodies_decode_as_unit() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let client = client_with_tokens(&server).await?;

    Mock::given(method("POST"))
        .and(path("/api/orders/42/cancel/"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .post::<()>(
            "/api/orders/42/cancel/",
            Some(&json!({"reason": "changed my mind"})),
            &RequestOptions::default(),
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn custom_headers_are_forwarded() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let client = client_with_tokens(&server).await?;

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("x-request-id", "abc123"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orders": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-request-id", "abc123".parse()?);
    let options = RequestOptions::default().with_headers(headers);

    let body: Value = client.get("/api/orders/", &options).await?;
    assert_eq!(body["orders"], json!([]));
    Ok(())
}
