//! Error types for the coordination layer

use thiserror::Error;

use crate::bridge_token::TokenError;
use crate::config::ConfigError;
use crate::ephemeral::CookieError;
use crate::oauth2::OAuth2Error;
use crate::userdb::UserError;
use crate::utils::UtilError;

/// Errors that can occur while running the login flow
#[derive(Error, Debug)]
pub enum CoordinationError {
    #[error("Configuration error: {0}")]
    Config(ConfigError),

    #[error("OAuth2 error: {0}")]
    OAuth2(OAuth2Error),

    #[error("User error: {0}")]
    User(UserError),

    #[error("Token error: {0}")]
    Token(TokenError),

    #[error("Cookie error: {0}")]
    Cookie(CookieError),

    #[error("Utils error: {0}")]
    Utils(UtilError),
}

impl CoordinationError {
    /// Coarse, machine-readable code carried to the error page.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OAuth2(err) => match err {
                OAuth2Error::CsrfMissing | OAuth2Error::CsrfMismatch => "invalid_state",
                OAuth2Error::PkceMissing | OAuth2Error::InvalidVerifier(_) => "session_expired",
                OAuth2Error::ProviderDenied(_) => "access_denied",
                OAuth2Error::MissingCode
                | OAuth2Error::ProviderExchangeFailed(_)
                | OAuth2Error::IdToken(_)
                | OAuth2Error::HttpClient(_) => "provider_error",
                OAuth2Error::ProfileIncomplete(_) => "profile_incomplete",
                OAuth2Error::InvalidOrigin(_) => "forbidden",
                _ => "server_error",
            },
            Self::User(_) => "account_error",
            _ => "server_error",
        }
    }

    /// True for requests rejected because a browser marked them cross-site.
    pub fn is_cross_origin(&self) -> bool {
        matches!(self, Self::OAuth2(OAuth2Error::InvalidOrigin(_)))
    }

    /// Log the error and return self
    ///
    /// CSRF failures are logged at warning level as possible attacks; a user
    /// declining consent at the provider is not an error at all.
    pub fn log(self) -> Self {
        match &self {
            Self::OAuth2(OAuth2Error::CsrfMismatch) => {
                tracing::warn!("CSRF state mismatch on callback")
            }
            Self::OAuth2(OAuth2Error::CsrfMissing) => {
                tracing::warn!("CSRF state missing on callback")
            }
            Self::OAuth2(OAuth2Error::ProviderDenied(err)) => {
                tracing::info!(provider_error = %err, "Provider denied the authorization request")
            }
            Self::OAuth2(OAuth2Error::InvalidOrigin(msg)) => {
                tracing::warn!("Cross-origin request rejected: {}", msg)
            }
            Self::OAuth2(err) => tracing::error!("OAuth2 error: {}", err),
            Self::Config(err) => tracing::error!("Configuration error: {}", err),
            Self::User(err) => tracing::error!("User error: {}", err),
            Self::Token(err) => tracing::error!("Token error: {}", err),
            Self::Cookie(err) => tracing::error!("Cookie error: {}", err),
            Self::Utils(err) => tracing::error!("Utils error: {}", err),
        }
        self
    }
}

// Custom From implementations that automatically log errors

impl From<ConfigError> for CoordinationError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err).log()
    }
}

impl From<OAuth2Error> for CoordinationError {
    fn from(err: OAuth2Error) -> Self {
        Self::OAuth2(err).log()
    }
}

impl From<UserError> for CoordinationError {
    fn from(err: UserError) -> Self {
        Self::User(err).log()
    }
}

impl From<TokenError> for CoordinationError {
    fn from(err: TokenError) -> Self {
        Self::Token(err).log()
    }
}

impl From<CookieError> for CoordinationError {
    fn from(err: CookieError) -> Self {
        Self::Cookie(err).log()
    }
}

impl From<UtilError> for CoordinationError {
    fn from(err: UtilError) -> Self {
        Self::Utils(err).log()
    }
}
