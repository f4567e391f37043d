//! Shared fixtures for the coordination tests: a scripted identity provider,
//! a ready-made configuration and cookie round-tripping helpers.

use async_trait::async_trait;
use http::header::{COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::BridgeConfig;
use crate::coordination::AuthBridge;
use crate::oauth2::{IdentityProvider, OAuth2Error, ProviderConfig, ProviderProfile};
use crate::userdb::MemoryIdentityMapper;

pub(crate) const TEST_SECRET: &[u8] = b"test-secret-test-secret-test-secret!";

/// Identity provider that answers every exchange with a fixed outcome and
/// records what it was called with.
pub(crate) struct FakeProvider {
    outcome: Result<ProviderProfile, OAuth2Error>,
    calls: AtomicUsize,
    last_verifier: Mutex<Option<String>>,
}

impl FakeProvider {
    pub(crate) fn succeeding() -> Self {
        Self::with_outcome(Ok(test_profile()))
    }

    pub(crate) fn with_outcome(outcome: Result<ProviderProfile, OAuth2Error>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_verifier: Mutex::new(None),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_verifier(&self) -> Option<String> {
        self.last_verifier.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn exchange_code(
        &self,
        _code: &str,
        code_verifier: &str,
    ) -> Result<ProviderProfile, OAuth2Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_verifier.lock().unwrap() = Some(code_verifier.to_string());
        self.outcome.clone()
    }
}

pub(crate) fn test_profile() -> ProviderProfile {
    ProviderProfile {
        subject: "provider-subject-1".to_string(),
        email: "user@example.com".to_string(),
        email_verified: true,
        name: Some("Test User".to_string()),
        given_name: None,
        family_name: None,
        picture: None,
    }
}

pub(crate) fn test_config() -> BridgeConfig {
    let provider = ProviderConfig::new(
        "client-123",
        "https://app.example.com/auth/oauth2/authorized",
        "https://idp.example.com/authorize",
        "https://idp.example.com/token",
    )
    .unwrap();
    BridgeConfig::new(provider, TEST_SECRET).unwrap()
}

pub(crate) fn test_bridge(provider: Arc<FakeProvider>) -> AuthBridge {
    AuthBridge::new(test_config(), provider, Arc::new(MemoryIdentityMapper::new())).unwrap()
}

/// All `Set-Cookie` values of a response.
pub(crate) fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` line for `name`, if any.
pub(crate) fn set_cookie_for(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookies(headers)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
}

/// Value written for `name`, if any.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookie_for(headers, name).map(|c| {
        c.split(';').next().unwrap()[name.len() + 1..].to_string()
    })
}

/// A request carrying the cookies a browser would send back after
/// receiving `response`.
pub(crate) fn request_from(response: &HeaderMap) -> HeaderMap {
    let pairs: Vec<String> = set_cookies(response)
        .into_iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .map(|c| c.split(';').next().unwrap().to_string())
        .collect();
    request_with(&pairs.join("; "))
}

pub(crate) fn request_with(cookie: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if !cookie.is_empty() {
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
    }
    headers
}
