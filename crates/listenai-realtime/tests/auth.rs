//! Authenticator behavior against a local mock token endpoint.

use axum::{Json, Router, http::StatusCode, routing::post};
use listenai_realtime::{AuthError, Authenticator, DeviceIdentity};
use serde_json::{Value, json};

async fn spawn_endpoint(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1/auth/tokens")
}

fn identity() -> DeviceIdentity {
    DeviceIdentity {
        product_id: "prod-1".to_string(),
        product_secret: "secret-1".to_string(),
        device_id: "dev-1".to_string(),
    }
}

#[tokio::test]
async fn authenticate_extracts_the_token() {
    let router = Router::new().route(
        "/v1/auth/tokens",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["productId"], "prod-1");
            assert_eq!(body["deviceId"], "dev-1");
            assert!(body.get("curtime").and_then(Value::as_u64).is_some());
            // 32 hex chars, as produced by the md5 signer.
            let checksum = body["checksum"].as_str().unwrap();
            assert_eq!(checksum.len(), 32);
            assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
            Json(json!({ "token": "abc" }))
        }),
    );
    let url = spawn_endpoint(router).await;

    let token = Authenticator::new(url)
        .authenticate(&identity())
        .await
        .unwrap();
    assert_eq!(token.as_str(), "abc");
}

#[tokio::test]
async fn rejected_status_carries_code_and_body() {
    let router = Router::new().route(
        "/v1/auth/tokens",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid checksum") }),
    );
    let url = spawn_endpoint(router).await;

    let err = Authenticator::new(url)
        .authenticate(&identity())
        .await
        .unwrap_err();
    match err {
        AuthError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid checksum"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn success_without_token_is_missing_token() {
    let router = Router::new().route("/v1/auth/tokens", post(|| async { Json(json!({})) }));
    let url = spawn_endpoint(router).await;

    let err = Authenticator::new(url)
        .authenticate(&identity())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MissingToken));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_level_failure() {
    // Nothing listens on port 1.
    let err = Authenticator::new("http://127.0.0.1:1/v1/auth/tokens")
        .authenticate(&identity())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unreachable(_)));
}
