//! End-to-end tests driving the bridge router the way a browser would.

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;
use url::Url;

use oauth2_bridge::{
    AuthBridge, BridgeConfig, IdentityProvider, MemoryIdentityMapper, OAuth2Error,
    ProviderConfig, ProviderProfile,
};
use oauth2_bridge_axum::bridge_router_no_trace;

const SECRET: &[u8] = b"integration-secret-integration-secret";

#[derive(Default)]
struct StubProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn exchange_code(
        &self,
        code: &str,
        _code_verifier: &str,
    ) -> Result<ProviderProfile, OAuth2Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if code != "valid-code" {
            return Err(OAuth2Error::ProviderExchangeFailed(
                "token endpoint returned 400 Bad Request".to_string(),
            ));
        }
        Ok(ProviderProfile {
            subject: "subject-42".to_string(),
            email: "user@example.com".to_string(),
            email_verified: true,
            name: Some("Integration User".to_string()),
            given_name: None,
            family_name: None,
            picture: None,
        })
    }
}

struct TestApp {
    router: Router,
    bridge: Arc<AuthBridge>,
    provider: Arc<StubProvider>,
}

fn app() -> TestApp {
    let provider_config = ProviderConfig::new(
        "client-123",
        "https://app.example.com/auth/oauth2/authorized",
        "https://idp.example.com/authorize",
        "https://idp.example.com/token",
    )
    .unwrap();
    let config = BridgeConfig::new(provider_config, SECRET).unwrap();
    let provider = Arc::new(StubProvider::default());
    let bridge = Arc::new(
        AuthBridge::new(config, provider.clone(), Arc::new(MemoryIdentityMapper::new())).unwrap(),
    );

    TestApp {
        router: bridge_router_no_trace(bridge.clone()),
        bridge,
        provider,
    }
}

async fn get(router: &Router, uri: &str, cookie: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(headers: &HeaderMap) -> String {
    headers
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn set_cookie_for(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookies(headers)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookie_for(headers, name)
        .map(|c| c.split(';').next().unwrap()[name.len() + 1..].to_string())
}

/// `Cookie` request header a browser would send after this response.
fn browser_cookies(headers: &HeaderMap) -> String {
    set_cookies(headers)
        .into_iter()
        .filter(|c| !c.ends_with("Max-Age=0"))
        .map(|c| c.split(';').next().unwrap().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn query(url: &str) -> HashMap<String, String> {
    let absolute = if url.starts_with('/') {
        format!("https://app.example.com{url}")
    } else {
        url.to_string()
    };
    Url::parse(&absolute)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Runs login and returns (state, cookies the browser holds afterwards).
async fn begin_login(app: &TestApp, uri: &str) -> (String, String) {
    let response = get(&app.router, uri, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let state = query(&location(response.headers()))["state"].clone();
    (state, browser_cookies(response.headers()))
}

/// Login without a return destination redirects to the provider with a
/// complete PKCE authorization request whose state matches the cookie.
#[tokio::test]
async fn test_login_redirects_to_provider() {
    let app = app();

    let response = get(&app.router, "/auth/oauth2/login", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = location(response.headers());
    assert!(location.starts_with("https://idp.example.com/authorize?"));

    let params = query(&location);
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["client_id"], "client-123");
    assert_eq!(
        params["redirect_uri"],
        "https://app.example.com/auth/oauth2/authorized"
    );
    assert_eq!(params["code_challenge_method"], "S256");
    // base64url of a SHA-256 digest
    assert_eq!(params["code_challenge"].len(), 43);

    let state_cookie = cookie_value(response.headers(), "oauth_state").unwrap();
    assert_eq!(params["state"], state_cookie);

    let verifier = cookie_value(response.headers(), "pkce_verifier").unwrap();
    assert_eq!(verifier.len(), 64);
    assert_eq!(params["code_challenge"], oauth2_bridge::challenge_for(&verifier));
}

/// A matching state and a successful exchange land on the landing page with
/// a bridging token and the flow cookies cleared in the same response.
#[tokio::test]
async fn test_callback_success_sets_bridging_token() {
    let app = app();
    let (state, cookies) = begin_login(&app, "/auth/oauth2/login").await;

    let response = get(
        &app.router,
        &format!("/auth/oauth2/authorized?code=valid-code&state={state}"),
        Some(&cookies),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response.headers()), "/auth/complete");

    let token_cookie = set_cookie_for(response.headers(), "bridging_token").unwrap();
    assert!(token_cookie.contains("HttpOnly"));
    assert!(!token_cookie.ends_with("Max-Age=0"));

    for name in ["pkce_verifier", "oauth_state"] {
        let cleared = set_cookie_for(response.headers(), name).unwrap();
        assert!(cleared.starts_with(&format!("{name}=;")));
        assert!(cleared.ends_with("Max-Age=0"));
    }
}

/// A state that differs from the cookie sends the browser to the error page
/// with the CSRF error code and never reaches the provider.
#[tokio::test]
async fn test_callback_state_mismatch() {
    let app = app();
    let (_, cookies) = begin_login(&app, "/auth/oauth2/login").await;

    let response = get(
        &app.router,
        "/auth/oauth2/authorized?code=valid-code&state=not-the-state",
        Some(&cookies),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(response.headers()),
        "/auth/signin?error=invalid_state"
    );
    assert!(set_cookie_for(response.headers(), "bridging_token").is_none());
    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_callback_without_query_or_cookies() {
    let app = app();

    let response = get(&app.router, "/auth/oauth2/authorized", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(response.headers()),
        "/auth/signin?error=invalid_state"
    );
}

#[tokio::test]
async fn test_callback_exchange_failure() {
    let app = app();
    let (state, cookies) = begin_login(&app, "/auth/oauth2/login").await;

    let response = get(
        &app.router,
        &format!("/auth/oauth2/authorized?code=expired-code&state={state}"),
        Some(&cookies),
    )
    .await;

    assert_eq!(
        location(response.headers()),
        "/auth/signin?error=provider_error"
    );
    assert!(set_cookie_for(response.headers(), "bridging_token").is_none());
}

#[tokio::test]
async fn test_return_to_round_trip() {
    let app = app();
    let (state, cookies) =
        begin_login(&app, "/auth/oauth2/login?return_to=%2Fforum%2Fthread%2F9").await;

    let response = get(
        &app.router,
        &format!("/auth/oauth2/authorized?code=valid-code&state={state}"),
        Some(&cookies),
    )
    .await;

    assert_eq!(
        location(response.headers()),
        "/auth/complete?redirect=%2Fforum%2Fthread%2F9"
    );
}

#[tokio::test]
async fn test_open_redirect_return_to_dropped() {
    let app = app();
    let (state, cookies) =
        begin_login(&app, "/auth/oauth2/login?return_to=%2F%2Fevil.example").await;

    let response = get(
        &app.router,
        &format!("/auth/oauth2/authorized?code=valid-code&state={state}"),
        Some(&cookies),
    )
    .await;

    assert_eq!(location(response.headers()), "/auth/complete");
}

/// The bridging token is readable exactly once and never cached.
#[tokio::test]
async fn test_bridge_token_delete_on_read() {
    let app = app();
    let (state, cookies) = begin_login(&app, "/auth/oauth2/login").await;
    let callback = get(
        &app.router,
        &format!("/auth/oauth2/authorized?code=valid-code&state={state}"),
        Some(&cookies),
    )
    .await;
    let cookies = browser_cookies(callback.headers());

    let first = get(&app.router, "/auth/bridge-token", Some(&cookies)).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[header::CACHE_CONTROL], "no-store");
    let cleared = set_cookie_for(first.headers(), "bridging_token").unwrap();
    assert!(cleared.ends_with("Max-Age=0"));
    let body = json_body(first).await;
    let token = body["token"].as_str().expect("token on first read");

    let claims = app.bridge.verify_bridging_token(token).unwrap();
    assert_eq!(claims.typ, "bridge");

    // The browser has dropped the cookie after the first response
    let second = get(&app.router, "/auth/bridge-token", None).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(json_body(second).await, serde_json::json!({ "token": null }));
}

#[tokio::test]
async fn test_bridge_token_ignores_query_parameter() {
    let app = app();

    let response = get(&app.router, "/auth/bridge-token?token=injected", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({ "token": null }));
}

#[tokio::test]
async fn test_bridge_token_rejects_cross_site_requests() {
    let app = app();
    let request = Request::builder()
        .uri("/auth/bridge-token")
        .header(header::COOKIE, "bridging_token=abc")
        .header("sec-fetch-site", "cross-site")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(set_cookie_for(response.headers(), "bridging_token").is_none());
}
