//! oauth2_bridge - OAuth2 identity bridge
//!
//! Runs the OAuth 2.0 Authorization Code flow with PKCE and CSRF state against
//! an external identity provider, maps the provider identity to a local user
//! and hands the front end a short-lived, one-time bridging token that it
//! trades for a first-party session.
//!
//! All per-flow state lives in HTTP-only cookies read at most once; the
//! server keeps nothing between the redirect and the callback.

mod bridge_token;
mod config;
mod coordination;
mod ephemeral;
mod oauth2;
mod userdb;
mod utils;

#[cfg(test)]
mod test_utils;

pub use bridge_token::{BRIDGE_TOKEN_TYPE, BridgeClaims, JwtTokenMinter, TokenError, TokenMinter};
pub use config::{BridgeConfig, ConfigError};
pub use coordination::{AuthBridge, CoordinationError, STATE_LEN};
pub use ephemeral::{CookieError, EphemeralStore, MAX_EPHEMERAL_TTL};
pub use oauth2::{
    AuthResponse, BRIDGING_TOKEN_COOKIE, BridgeTokenResponse, HttpIdentityProvider,
    IdentityProvider, OAUTH_STATE_COOKIE, OAuth2Error, PKCE_METHOD, PKCE_VERIFIER_COOKIE,
    PkcePair, ProviderConfig, ProviderProfile, RETURN_TO_COOKIE, challenge_for,
};
pub use userdb::{IdentityMapper, LocalUser, MemoryIdentityMapper, SqlxIdentityMapper, UserError};
pub use utils::{UtilError, gen_random_string, sha256};
