use std::time::Duration;
use url::Url;

use crate::config::ConfigError;

/// Holds the PKCE verifier between the redirect to the provider and the callback.
pub const PKCE_VERIFIER_COOKIE: &str = "pkce_verifier";
/// Holds the CSRF `state` value echoed back by the provider.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
/// Holds the sanitised post-login destination, base64url encoded.
pub const RETURN_TO_COOKIE: &str = "oauth_return_to";
/// Holds the one-time bridging token until the front end collects it.
pub const BRIDGING_TOKEN_COOKIE: &str = "bridging_token";

pub const DEFAULT_SCOPE: &str = "openid profile email";
pub const DEFAULT_PROVIDER_NAME: &str = "oidc";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to talk to one identity provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: Option<String>,
    /// Kept verbatim: providers compare it byte-for-byte with the registered value.
    pub(crate) redirect_uri: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) userinfo_url: Option<Url>,
    pub(crate) jwks_url: Option<Url>,
    pub(crate) expected_issuer: Option<String>,
    pub(crate) scope: String,
    pub(crate) provider_name: String,
    pub(crate) http_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(
        client_id: &str,
        redirect_uri: &str,
        auth_url: &str,
        token_url: &str,
    ) -> Result<Self, ConfigError> {
        let client_id = required("OAUTH2_CLIENT_ID", client_id)?;
        let redirect_uri = required("OAUTH2_REDIRECT_URI", redirect_uri)?;
        parse_http_url("OAUTH2_REDIRECT_URI", &redirect_uri)?;

        Ok(Self {
            client_id,
            client_secret: None,
            redirect_uri,
            auth_url: parse_http_url("OAUTH2_AUTH_URL", auth_url)?,
            token_url: parse_http_url("OAUTH2_TOKEN_URL", token_url)?,
            userinfo_url: None,
            jwks_url: None,
            expected_issuer: None,
            scope: DEFAULT_SCOPE.to_string(),
            provider_name: DEFAULT_PROVIDER_NAME.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    pub fn with_client_secret(mut self, secret: &str) -> Self {
        self.client_secret = Some(secret.to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn with_userinfo_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.userinfo_url = Some(parse_http_url("OAUTH2_USERINFO_URL", url)?);
        Ok(self)
    }

    pub fn with_jwks_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.jwks_url = Some(parse_http_url("OAUTH2_JWKS_URL", url)?);
        Ok(self)
    }

    pub fn with_expected_issuer(mut self, issuer: &str) -> Self {
        self.expected_issuer = Some(issuer.to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Result<Self, ConfigError> {
        let scope = scope.split_whitespace().collect::<Vec<_>>().join(" ");
        self.scope = required("OAUTH2_SCOPE", &scope)?;
        Ok(self)
    }

    pub fn with_provider_name(mut self, name: &str) -> Result<Self, ConfigError> {
        self.provider_name = required("OAUTH2_PROVIDER_NAME", name)?;
        Ok(self)
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("userinfo_url", &self.userinfo_url.as_ref().map(Url::as_str))
            .field("jwks_url", &self.jwks_url.as_ref().map(Url::as_str))
            .field("expected_issuer", &self.expected_issuer)
            .field("scope", &self.scope)
            .field("provider_name", &self.provider_name)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn required(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.to_string())
}

fn parse_http_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let value = required(name, value)?;
    let url = Url::parse(&value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "https" | "http" if url.host_str().is_some() => Ok(url),
        _ => Err(ConfigError::Invalid {
            name,
            reason: "must be an absolute http(s) URL".to_string(),
        }),
    }
}
