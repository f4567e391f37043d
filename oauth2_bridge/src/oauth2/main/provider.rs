use async_trait::async_trait;
use http::header::ACCEPT;

use crate::oauth2::config::ProviderConfig;
use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::{OidcTokenResponse, ProviderClaims, ProviderProfile};

use super::idtoken::verify_id_token;
use super::utils::get_client;

/// The remote identity provider, seen from the callback handler.
///
/// Implementations must not retry: an authorization code is single-use, so a
/// second attempt with the same code can only fail.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderProfile, OAuth2Error>;
}

/// OIDC provider reached over HTTP with a client built once at startup.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpIdentityProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, OAuth2Error> {
        let client = get_client(config.http_timeout)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn request_tokens(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<OidcTokenResponse, OAuth2Error> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .client
            .post(self.config.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token endpoint unreachable");
                OAuth2Error::ProviderExchangeFailed("token endpoint unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Token endpoint rejected the code exchange");
            tracing::debug!(%body, "Token endpoint error body");
            return Err(OAuth2Error::ProviderExchangeFailed(format!(
                "token endpoint returned {status}"
            )));
        }

        response.json::<OidcTokenResponse>().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed token response");
            OAuth2Error::ProviderExchangeFailed("malformed token response".to_string())
        })
    }

    async fn fetch_userinfo(
        &self,
        userinfo_url: &url::Url,
        access_token: &str,
    ) -> Result<ProviderClaims, OAuth2Error> {
        let response = self
            .client
            .get(userinfo_url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Userinfo endpoint unreachable");
                OAuth2Error::ProviderExchangeFailed("userinfo endpoint unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(%status, "Userinfo endpoint returned an error");
            return Err(OAuth2Error::ProviderExchangeFailed(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        response.json::<ProviderClaims>().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed userinfo response");
            OAuth2Error::ProviderExchangeFailed("malformed userinfo response".to_string())
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[tracing::instrument(skip_all, fields(provider = %self.config.provider_name))]
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderProfile, OAuth2Error> {
        let tokens = self.request_tokens(code, code_verifier).await?;

        let claims = match (&tokens.id_token, &self.config.userinfo_url) {
            (Some(id_token), _) => verify_id_token(&self.client, id_token, &self.config).await?,
            (None, Some(userinfo_url)) => {
                let access_token = tokens.access_token.as_deref().ok_or_else(|| {
                    OAuth2Error::ProviderExchangeFailed("no access_token in response".to_string())
                })?;
                self.fetch_userinfo(userinfo_url, access_token).await?
            }
            (None, None) => {
                return Err(OAuth2Error::ProfileIncomplete(
                    "no id_token and no userinfo endpoint".to_string(),
                ));
            }
        };

        ProviderProfile::try_from(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Form, Json, Router,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
    };
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const CLIENT_ID: &str = "client-123";
    const GOOD_CODE: &str = "good-code";
    const VERIFIER: &str = "verifier-verifier-verifier-verifier-verifier-verifier";

    fn id_token(claims: Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"mock-provider"),
        )
        .unwrap()
    }

    fn exp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
            + 300
    }

    async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> Response {
        let expected = [
            ("grant_type", "authorization_code"),
            ("client_id", CLIENT_ID),
            ("code_verifier", VERIFIER),
            ("redirect_uri", "https://app.example.com/auth/oauth2/authorized"),
        ];
        if expected
            .iter()
            .any(|(k, v)| form.get(*k).map(String::as_str) != Some(*v))
        {
            return (StatusCode::BAD_REQUEST, "invalid_grant").into_response();
        }

        match form.get("code").map(String::as_str) {
            Some(GOOD_CODE) => Json(json!({
                "access_token": "at",
                "token_type": "Bearer",
                "id_token": id_token(json!({
                    "aud": CLIENT_ID,
                    "sub": "subject-1",
                    "email": "user@example.com",
                    "email_verified": true,
                    "name": "Test User",
                    "exp": exp(),
                })),
            }))
            .into_response(),
            Some("no-email") => Json(json!({
                "access_token": "at",
                "id_token": id_token(json!({"aud": CLIENT_ID, "sub": "subject-1", "exp": exp()})),
            }))
            .into_response(),
            Some("access-only") => Json(json!({"access_token": "userinfo-at"})).into_response(),
            Some("garbage") => (StatusCode::OK, "<html>not json</html>").into_response(),
            _ => (StatusCode::BAD_REQUEST, json!({"error": "invalid_grant"}).to_string())
                .into_response(),
        }
    }

    async fn userinfo_endpoint(headers: HeaderMap) -> Response {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer userinfo-at");
        if !authorized {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Json(json!({"sub": "subject-2", "email": "info@example.com"})).into_response()
    }

    async fn start_mock_provider() -> String {
        let app = Router::new()
            .route("/token", post(token_endpoint))
            .route("/userinfo", get(userinfo_endpoint));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn provider(with_userinfo: bool) -> HttpIdentityProvider {
        let base = start_mock_provider().await;
        let mut config = ProviderConfig::new(
            CLIENT_ID,
            "https://app.example.com/auth/oauth2/authorized",
            &format!("{base}/authorize"),
            &format!("{base}/token"),
        )
        .unwrap()
        .with_http_timeout(Duration::from_secs(2));
        if with_userinfo {
            config = config.with_userinfo_url(&format!("{base}/userinfo")).unwrap();
        }
        HttpIdentityProvider::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let provider = provider(false).await;

        let profile = provider.exchange_code(GOOD_CODE, VERIFIER).await.unwrap();

        assert_eq!(profile.subject, "subject-1");
        assert_eq!(profile.email, "user@example.com");
        assert!(profile.email_verified);
        assert_eq!(profile.name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn test_exchange_code_wrong_verifier_fails() {
        let provider = provider(false).await;

        let result = provider.exchange_code(GOOD_CODE, "some-other-verifier").await;

        match result {
            Err(OAuth2Error::ProviderExchangeFailed(msg)) => {
                assert!(msg.contains("400"));
                // Provider error bodies stay in the logs
                assert!(!msg.contains("invalid_grant"));
            }
            other => panic!("expected ProviderExchangeFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_malformed_response() {
        let provider = provider(false).await;
        let result = provider.exchange_code("garbage", VERIFIER).await;
        assert!(matches!(result, Err(OAuth2Error::ProviderExchangeFailed(_))));
    }

    #[tokio::test]
    async fn test_exchange_code_missing_email_is_profile_incomplete() {
        let provider = provider(false).await;
        let result = provider.exchange_code("no-email", VERIFIER).await;
        assert!(matches!(result, Err(OAuth2Error::ProfileIncomplete(_))));
    }

    #[tokio::test]
    async fn test_exchange_code_falls_back_to_userinfo() {
        let provider = provider(true).await;

        let profile = provider.exchange_code("access-only", VERIFIER).await.unwrap();

        assert_eq!(profile.subject, "subject-2");
        assert_eq!(profile.email, "info@example.com");
    }

    #[tokio::test]
    async fn test_exchange_code_without_id_token_or_userinfo() {
        let provider = provider(false).await;
        let result = provider.exchange_code("access-only", VERIFIER).await;
        assert!(matches!(result, Err(OAuth2Error::ProfileIncomplete(_))));
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint() {
        // Port 9 (discard) on localhost is normally closed
        let config = ProviderConfig::new(
            CLIENT_ID,
            "https://app.example.com/auth/oauth2/authorized",
            "http://127.0.0.1:9/authorize",
            "http://127.0.0.1:9/token",
        )
        .unwrap()
        .with_http_timeout(Duration::from_millis(500));
        let provider = HttpIdentityProvider::new(config).unwrap();

        let result = provider.exchange_code(GOOD_CODE, VERIFIER).await;
        assert!(matches!(result, Err(OAuth2Error::ProviderExchangeFailed(_))));
    }
}
