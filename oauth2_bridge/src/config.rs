//! Central configuration for the oauth2_bridge crate

use std::time::Duration;
use thiserror::Error;

use crate::ephemeral::MAX_EPHEMERAL_TTL;
use crate::oauth2::ProviderConfig;

pub const DEFAULT_ROUTE_PREFIX: &str = "/auth";
pub const DEFAULT_LANDING_URL: &str = "/auth/complete";
pub const DEFAULT_ERROR_URL: &str = "/auth/signin";
pub const DEFAULT_FLOW_TTL_SECS: u64 = 300;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60;
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings of the whole bridge, read once at startup.
#[derive(Clone)]
pub struct BridgeConfig {
    pub(crate) provider: ProviderConfig,
    pub(crate) route_prefix: String,
    pub(crate) landing_url: String,
    pub(crate) error_url: String,
    pub(crate) flow_ttl: u64,
    pub(crate) token_ttl: u64,
    pub(crate) token_secret: Vec<u8>,
    pub(crate) insecure_cookies: bool,
}

impl BridgeConfig {
    pub fn new(provider: ProviderConfig, token_secret: &[u8]) -> Result<Self, ConfigError> {
        if token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "BRIDGE_TOKEN_SECRET",
                reason: format!("must be at least {MIN_TOKEN_SECRET_LEN} bytes"),
            });
        }

        Ok(Self {
            provider,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            landing_url: DEFAULT_LANDING_URL.to_string(),
            error_url: DEFAULT_ERROR_URL.to_string(),
            flow_ttl: DEFAULT_FLOW_TTL_SECS,
            token_ttl: DEFAULT_TOKEN_TTL_SECS,
            token_secret: token_secret.to_vec(),
            insecure_cookies: false,
        })
    }

    /// Reads every setting from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, the environment being the
    /// usual one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mut provider = ProviderConfig::new(
            &required("OAUTH2_CLIENT_ID")?,
            &required("OAUTH2_REDIRECT_URI")?,
            &required("OAUTH2_AUTH_URL")?,
            &required("OAUTH2_TOKEN_URL")?,
        )?;
        if let Some(secret) = get("OAUTH2_CLIENT_SECRET") {
            provider = provider.with_client_secret(&secret);
        }
        if let Some(url) = get("OAUTH2_USERINFO_URL") {
            provider = provider.with_userinfo_url(&url)?;
        }
        if let Some(url) = get("OAUTH2_JWKS_URL") {
            provider = provider.with_jwks_url(&url)?;
        }
        if let Some(issuer) = get("OAUTH2_EXPECTED_ISSUER") {
            provider = provider.with_expected_issuer(&issuer);
        }
        if let Some(scope) = get("OAUTH2_SCOPE") {
            provider = provider.with_scope(&scope)?;
        }
        if let Some(name) = get("OAUTH2_PROVIDER_NAME") {
            provider = provider.with_provider_name(&name)?;
        }
        if let Some(secs) = get("OAUTH2_HTTP_TIMEOUT_SECS") {
            let secs = parse_secs("OAUTH2_HTTP_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: "OAUTH2_HTTP_TIMEOUT_SECS",
                    reason: "must be greater than zero".to_string(),
                });
            }
            provider = provider.with_http_timeout(Duration::from_secs(secs));
        }

        let secret = required("BRIDGE_TOKEN_SECRET")?;
        let mut config = Self::new(provider, secret.as_bytes())?;

        if let Some(prefix) = get("BRIDGE_ROUTE_PREFIX") {
            config = config.with_route_prefix(&prefix)?;
        }
        if let Some(url) = get("BRIDGE_LANDING_URL") {
            config = config.with_landing_url(&url)?;
        }
        if let Some(url) = get("BRIDGE_ERROR_URL") {
            config = config.with_error_url(&url)?;
        }
        if let Some(secs) = get("BRIDGE_FLOW_TTL_SECS") {
            config = config.with_flow_ttl(parse_secs("BRIDGE_FLOW_TTL_SECS", &secs)?)?;
        }
        if let Some(secs) = get("BRIDGE_TOKEN_TTL_SECS") {
            config = config.with_token_ttl(parse_secs("BRIDGE_TOKEN_TTL_SECS", &secs)?)?;
        }
        if let Some(flag) = get("BRIDGE_INSECURE_COOKIES") {
            config = config.with_insecure_cookies(parse_bool("BRIDGE_INSECURE_COOKIES", &flag)?);
        }

        tracing::debug!(?config, "Bridge configuration loaded");
        Ok(config)
    }

    pub fn with_route_prefix(mut self, prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.trim_end_matches('/');
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "BRIDGE_ROUTE_PREFIX",
                reason: "must start with '/'".to_string(),
            });
        }
        self.route_prefix = prefix.to_string();
        Ok(self)
    }

    pub fn with_landing_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.landing_url = redirect_target("BRIDGE_LANDING_URL", url)?;
        Ok(self)
    }

    pub fn with_error_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.error_url = redirect_target("BRIDGE_ERROR_URL", url)?;
        Ok(self)
    }

    /// Clamped to the ephemeral cookie limit; zero is rejected.
    pub fn with_flow_ttl(mut self, secs: u64) -> Result<Self, ConfigError> {
        self.flow_ttl = clamp_ttl("BRIDGE_FLOW_TTL_SECS", secs)?;
        Ok(self)
    }

    /// Clamped to the ephemeral cookie limit; zero is rejected.
    pub fn with_token_ttl(mut self, secs: u64) -> Result<Self, ConfigError> {
        self.token_ttl = clamp_ttl("BRIDGE_TOKEN_TTL_SECS", secs)?;
        Ok(self)
    }

    /// Development only: cookies lose the `Secure` attribute.
    pub fn with_insecure_cookies(mut self, insecure: bool) -> Self {
        self.insecure_cookies = insecure;
        self
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    pub fn landing_url(&self) -> &str {
        &self.landing_url
    }

    pub fn error_url(&self) -> &str {
        &self.error_url
    }

    pub fn flow_ttl(&self) -> u64 {
        self.flow_ttl
    }

    pub fn token_ttl(&self) -> u64 {
        self.token_ttl
    }

    pub fn insecure_cookies(&self) -> bool {
        self.insecure_cookies
    }
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("provider", &self.provider)
            .field("route_prefix", &self.route_prefix)
            .field("landing_url", &self.landing_url)
            .field("error_url", &self.error_url)
            .field("flow_ttl", &self.flow_ttl)
            .field("token_ttl", &self.token_ttl)
            .field("token_secret", &"<redacted>")
            .field("insecure_cookies", &self.insecure_cookies)
            .finish()
    }
}

fn parse_secs(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: format!("expected a number of seconds, got {value:?}"),
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            reason: format!("expected true or false, got {value:?}"),
        }),
    }
}

// A zero Max-Age makes the browser drop the cookie on arrival.
fn clamp_ttl(name: &'static str, secs: u64) -> Result<u64, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    if secs > MAX_EPHEMERAL_TTL {
        tracing::warn!(
            setting = name,
            requested = secs,
            limit = MAX_EPHEMERAL_TTL,
            "TTL clamped to the ephemeral cookie limit"
        );
    }
    Ok(secs.min(MAX_EPHEMERAL_TTL))
}

// Landing and error pages are either paths on this site or absolute http(s) URLs.
fn redirect_target(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    let is_path = value.starts_with('/') && !value.starts_with("//");
    let is_absolute = url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false);

    if is_path || is_absolute {
        Ok(value.to_string())
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: "must be a path starting with '/' or an absolute http(s) URL".to_string(),
        })
    }
}
