//! Admin gateway integration tests
//!
//! Drives the admin router against a disk-backed registry and checks what
//! the tunnel-accept path sees through the auth gate.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use tg_core::config::GatewayConfig;
use tg_core::error::AuthError;
use tg_core::types::{TenantId, TenantInfo};
use tg_server::server::admin_routes;
use tg_server::store::DiskStore;
use tg_server::GatewayState;

const ADMIN_SECRET: &str = "operator-secret";

/// Create state persisting under `dir` and hydrate it
async fn create_test_state(dir: &Path) -> Arc<GatewayState> {
    let config = GatewayConfig {
        admin_secret: Some(ADMIN_SECRET.to_string()),
        data_dir: dir.to_path_buf(),
        ..Default::default()
    };
    let store = Arc::new(DiskStore::new(&config.data_dir));
    let state = Arc::new(GatewayState::new(config, store));
    state.registry.hydrate().await.expect("Failed to hydrate");
    state
}

async fn add_user(app: &Router, body: &str) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/adduser")
        .header("Auth", ADMIN_SECRET)
        .body(Body::from(body.to_string()))
        .expect("Failed to build request");
    app.clone()
        .oneshot(request)
        .await
        .expect("Request failed")
        .status()
}

async fn info(app: &Router) -> Vec<TenantInfo> {
    let request = Request::builder()
        .method("GET")
        .uri("/info")
        .header("Auth", ADMIN_SECRET)
        .body(Body::empty())
        .expect("Failed to build request");
    let response = app.clone().oneshot(request).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let text = String::from_utf8(body.to_vec()).expect("Body is not UTF-8");
    text.lines()
        .map(|line| serde_json::from_str(line).expect("Invalid info record"))
        .collect()
}

#[tokio::test]
async fn test_provision_then_login() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path()).await;
    let app = admin_routes(Arc::clone(&state));

    let status = add_user(
        &app,
        r#"{"user":"alice","password":"secret","tunnel":[{"subdomain":"api"}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let account = state
        .auth
        .check_login(&TenantId::new("alice"), "secret")
        .await
        .expect("alice should be authorized");
    assert_eq!(account.tunnels.len(), 1);
    assert_eq!(account.tunnels[0].effective_subdomain, "api.alice");

    assert_eq!(
        state.auth.check_login(&"alice".into(), "wrong").await,
        Err(AuthError::BadCredentials)
    );
    assert_eq!(
        state.auth.check_login(&"bob".into(), "anything").await,
        Err(AuthError::UnknownTenant)
    );
}

#[tokio::test]
async fn test_info_lists_every_tenant() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path()).await;
    let app = admin_routes(Arc::clone(&state));

    assert!(info(&app).await.is_empty());

    for name in ["alice", "bob", "carol", "dave"] {
        let body = format!(r#"{{"user":"{}","tunnel":[{{"subdomain":"www"}}]}}"#, name);
        assert_eq!(add_user(&app, &body).await, StatusCode::OK);
    }

    let listed: HashSet<String> = info(&app)
        .await
        .into_iter()
        .map(|record| record.account.tenant_id.0)
        .collect();
    let expected: HashSet<String> = ["alice", "bob", "carol", "dave"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_secret_mismatch_keeps_existing_account() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path()).await;
    let app = admin_routes(Arc::clone(&state));

    let body = r#"{"user":"alice","password":"secret","tunnel":[{"subdomain":"api"}]}"#;
    assert_eq!(add_user(&app, body).await, StatusCode::OK);
    let before = state.registry.get(&"alice".into()).await.unwrap();

    let hijack = r#"{"user":"alice","password":"guess","tunnel":[{"subdomain":"evil"}]}"#;
    assert_eq!(add_user(&app, hijack).await, StatusCode::BAD_REQUEST);

    assert_eq!(state.registry.get(&"alice".into()).await, Some(before.clone()));

    let reloaded = create_test_state(dir.path()).await;
    assert_eq!(reloaded.registry.get(&"alice".into()).await, Some(before));
}

#[tokio::test]
async fn test_accounts_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let original = {
        let state = create_test_state(dir.path()).await;
        let app = admin_routes(Arc::clone(&state));
        let body = r#"{"user":"alice","password":"secret","tunnel":[{"subdomain":"api","protocol":"http","local_addr":"127.0.0.1:8080"},{"subdomain":"db","protocol":"tcp"}]}"#;
        assert_eq!(add_user(&app, body).await, StatusCode::OK);
        state.registry.get(&"alice".into()).await.unwrap()
    };

    let restarted = create_test_state(dir.path()).await;
    let loaded = restarted.registry.get(&"alice".into()).await.unwrap();
    assert_eq!(loaded, original);
    assert_eq!(loaded.secret, "secret");
    assert_eq!(loaded.tunnels[1].protocol.as_deref(), Some("tcp"));
}

#[tokio::test]
async fn test_quota_breach_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path()).await;
    let app = admin_routes(Arc::clone(&state));
    let alice = TenantId::new("alice");

    let body = r#"{"user":"alice","password":"secret","tunnel":[{"subdomain":"api"}]}"#;
    assert_eq!(add_user(&app, body).await, StatusCode::OK);

    let limit = state.auth.daily_limit_bytes();
    assert!(state.registry.record_transfer(&alice, limit + 1).await);
    assert_eq!(
        state.auth.check_login(&alice, "secret").await,
        Err(AuthError::QuotaExceeded)
    );

    let records = info(&app).await;
    assert_eq!(records[0].usage.bytes_today, limit + 1);

    state.registry.reset_daily_usage().await;
    assert!(state.auth.check_login(&alice, "secret").await.is_ok());
    assert_eq!(
        state.registry.usage(&alice).await.unwrap().bytes_total,
        limit + 1
    );
}

#[tokio::test]
async fn test_invalid_tenant_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path()).await;
    let app = admin_routes(Arc::clone(&state));

    let body = r#"{"user":"../etc","tunnel":[{"subdomain":"api"}]}"#;
    assert_eq!(add_user(&app, body).await, StatusCode::BAD_REQUEST);
    assert!(state.registry.is_empty().await);
}
