#![allow(clippy::unwrap_used)]

use anyhow::Result;
use reseller_console::{
    api::{ApiClient, ApiError, AuthMode},
    config::{ApiConfig, SessionConfig},
    session::{
        SessionStore, now_millis,
        record::STORAGE_KEY,
        storage::{KeyValueStore, MemoryStore},
    },
};
use serde_json::{Value, json};
use std::{net::TcpListener, sync::Arc};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn store() -> SessionStore {
    SessionStore::init(Arc::new(MemoryStore::new()), SessionConfig::default())
}

fn client(server: &MockServer, store: SessionStore) -> ApiClient {
    let config = ApiConfig::new(&server.uri()).unwrap();
    ApiClient::new(config).unwrap().with_session(store)
}

#[tokio::test]
async fn no_auth_calls_carry_tunnel_header_but_no_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/otp/resend"))
        .and(header("ngrok-skip-browser-warning", "true"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "OTP sent to a@b.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store();
    let payload = json!({"token": "tok-1", "user": {}});
    store.set_session(payload.as_object().unwrap())?;

    let envelope = client(&server, store)
        .post_json::<_, Value>("/otp/resend", &json!({"x": 1}), AuthMode::NoAuth)
        .await?;
    assert_eq!(envelope.message(), Some("OTP sent to a@b.com"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    Ok(())
}

#[tokio::test]
async fn bearer_calls_use_the_session_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vendors"))
        .and(header("authorization", "Bearer tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"id": 7}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store();
    let payload = json!({"token": "tok-2", "user": {"email": "a@b.com"}});
    store.set_session(payload.as_object().unwrap())?;

    let envelope = client(&server, store)
        .get_json::<Value>("/vendors", AuthMode::Bearer)
        .await?;
    assert_eq!(envelope.data, Some(json!([{"id": 7}])));
    Ok(())
}

#[tokio::test]
async fn unauthorized_is_surfaced_without_retry() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, store())
        .get_json::<Value>("/users", AuthMode::Bearer)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Unauthorized {
            message: "Token expired".to_string()
        }
    );
    assert_eq!(err.status(), Some(401));
    Ok(())
}

#[tokio::test]
async fn success_false_keeps_server_message() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/otp/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Invalid OTP"
        })))
        .mount(&server)
        .await;

    let err = client(&server, store())
        .post_json::<_, Value>("/otp/verify", &json!({}), AuthMode::NoAuth)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Invalid OTP");
    assert!(err.is_rejection());
    Ok(())
}

#[tokio::test]
async fn plain_text_errors_are_trimmed() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(502).set_body_string("  upstream down \n"))
        .mount(&server)
        .await;

    let err = client(&server, store())
        .post_json::<_, Value>("/auth/login", &json!({}), AuthMode::NoAuth)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Http {
            status: 502,
            message: "upstream down".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn expired_session_token_is_not_sent() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vendors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": "anonymous"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStore::new());
    let raw = json!({"token": "stale", "user": {}, "_expiresAt": now_millis() - 60_000});
    storage.save(STORAGE_KEY, &raw.to_string())?;
    let store = SessionStore::init(storage, SessionConfig::default());
    assert!(store.get().is_some());

    let envelope = client(&server, store)
        .get_json::<Value>("/vendors", AuthMode::Bearer)
        .await?;
    assert_eq!(envelope.data, Some(json!("anonymous")));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    Ok(())
}
