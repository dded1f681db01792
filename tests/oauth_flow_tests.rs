// SPDX-License-Identifier: MIT

//! OAuth login flow tests against a stub identity service.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use harvest_bot::error::AuthError;
use tower::util::ServiceExt;

use common::{build_state, spawn_stub, StubConfig};

/// Pull the opaque state token back out of an authorization URL.
fn state_token_from_url(url: &str) -> String {
    let raw = url.split("state=").nth(1).expect("state param");
    let decoded = urlencoding::decode(raw).expect("urlencoded state");
    let payload: serde_json::Value = serde_json::from_str(&decoded).expect("state JSON");
    payload["token"].as_str().expect("token field").to_string()
}

#[tokio::test]
async fn test_begin_then_complete_login_stores_credential() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, transport) = build_state(&stub.base_url);

    let url = state.oauth.begin_login("U1").await.unwrap();
    assert!(url.contains("client_id=test_client_id"));
    assert!(url.contains("response_type=code"));

    let token = state_token_from_url(&url);
    let user_id = state
        .oauth
        .complete_login(&token, "auth-code", Some("harvest:1062659"))
        .await
        .unwrap();
    assert_eq!(user_id, "U1");

    let credential = state.store.credential("U1").await.unwrap().expect("credential");
    assert_eq!(credential.access_token, "access-1");
    assert_eq!(credential.account_id(), Some("1062659"));

    // Exactly one authorized notification went out.
    assert_eq!(transport.post_count(), 1);

    // Replaying the same state token fails: single use.
    let replay = state
        .oauth
        .complete_login(&token, "auth-code", Some("harvest:1062659"))
        .await;
    assert!(matches!(replay, Err(AuthError::UnknownState)));
    assert_eq!(transport.post_count(), 1, "no second notification");
}

#[tokio::test]
async fn test_provider_error_wipes_user_state() {
    let stub = spawn_stub(StubConfig {
        token_response: serde_json::json!({
            "error": "invalid_grant",
            "error_description": "The authorization code is invalid",
        }),
        ..StubConfig::default()
    })
    .await;
    let (state, _transport) = build_state(&stub.base_url);

    let url = state.oauth.begin_login("U1").await.unwrap();
    let token = state_token_from_url(&url);

    let result = state
        .oauth
        .complete_login(&token, "bad-code", Some("harvest:1062659"))
        .await;
    assert!(matches!(result, Err(AuthError::ExchangeFailed(_))));

    // Full wipe: no credential and no residual scope key.
    assert!(state.store.credential("U1").await.unwrap().is_none());
    assert!(state.store.scope("U1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_failure_wipes_and_prompts_relogin() {
    let stub = spawn_stub(StubConfig {
        token_response: serde_json::json!({ "error": "invalid_grant" }),
        ..StubConfig::default()
    })
    .await;
    let (state, transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    let result = state.oauth.refresh("U1").await;
    assert!(matches!(result, Err(AuthError::RefreshFailed(_))));

    assert!(state.store.credential("U1").await.unwrap().is_none());
    let texts = transport.posted_texts();
    assert!(
        texts.iter().any(|t| t.contains("log in again")),
        "expected a re-login prompt, got {:?}",
        texts
    );
}

#[tokio::test]
async fn test_refresh_success_overwrites_credential() {
    let stub = spawn_stub(StubConfig {
        token_response: serde_json::json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "expires_in": 1_209_600,
        }),
        ..StubConfig::default()
    })
    .await;
    let (state, _transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    state.oauth.refresh("U1").await.unwrap();

    let credential = state.store.credential("U1").await.unwrap().expect("credential");
    assert_eq!(credential.access_token, "access-2");
    assert_eq!(credential.refresh_token, "refresh-2");
    // Scope survives the refresh.
    assert_eq!(credential.account_id(), Some("1062659"));
}

#[tokio::test]
async fn test_callback_route_completes_login() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, _transport) = build_state(&stub.base_url);

    let url = state.oauth.begin_login("U1").await.unwrap();
    let token = state_token_from_url(&url);

    let app = harvest_bot::routes::create_router(state.clone());
    let state_param =
        urlencoding::encode(&serde_json::json!({ "token": token }).to_string()).into_owned();
    let uri = format!(
        "/oauth/callback?code=auth-code&scope=harvest%3A1062659&state={}",
        state_param
    );

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.store.credential("U1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_callback_route_rejects_unknown_state() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, _transport) = build_state(&stub.base_url);

    let app = harvest_bot::routes::create_router(state);
    let state_param = urlencoding::encode("{\"token\":\"no-such-token\"}").into_owned();
    let uri = format!("/oauth/callback?code=auth-code&state={}", state_param);

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
