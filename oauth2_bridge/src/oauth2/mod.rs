//! Authorization Code + PKCE client side of the bridge: provider settings,
//! authorization URL construction, CSRF checks and the code exchange.

mod config;
mod errors;
mod main;
mod types;

pub use config::{
    BRIDGING_TOKEN_COOKIE, OAUTH_STATE_COOKIE, PKCE_VERIFIER_COOKIE, ProviderConfig,
    RETURN_TO_COOKIE,
};
pub use errors::OAuth2Error;
pub use main::{HttpIdentityProvider, IdentityProvider, PKCE_METHOD, PkcePair, challenge_for};
pub use types::{AuthResponse, BridgeTokenResponse, ProviderProfile};

pub(crate) use main::{
    append_query, build_authorization_url, csrf_checks, decode_return_to, encode_return_to,
    origin_of, sanitize_return_to, validate_origin,
};
