use crate::ephemeral::CookieError;
use crate::utils::UtilError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum OAuth2Error {
    #[error("CSRF state cookie or parameter missing")]
    CsrfMissing,

    #[error("CSRF state mismatch")]
    CsrfMismatch,

    #[error("PKCE verifier cookie missing or expired")]
    PkceMissing,

    #[error("Invalid PKCE verifier: {0}")]
    InvalidVerifier(String),

    #[error("Authorization code missing from callback")]
    MissingCode,

    /// The provider redirected back with an OAuth error such as `access_denied`
    #[error("Provider returned error: {0}")]
    ProviderDenied(String),

    #[error("Provider exchange failed: {0}")]
    ProviderExchangeFailed(String),

    #[error("Id token error: {0}")]
    IdToken(String),

    #[error("Profile incomplete: {0}")]
    ProfileIncomplete(String),

    #[error("Invalid return destination")]
    InvalidReturnTo,

    /// A cross-site request reached an endpoint that only serves the bridge's own pages
    #[error("Cross-origin request rejected: {0}")]
    InvalidOrigin(String),

    #[error("Http client error: {0}")]
    HttpClient(String),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),

    #[error("Cookie error: {0}")]
    Cookie(#[from] CookieError),
}
