mod core;
mod idtoken;
mod pkce;
mod provider;
pub(crate) mod utils;

pub use pkce::{PKCE_METHOD, PkcePair, challenge_for};
pub use provider::{HttpIdentityProvider, IdentityProvider};

pub(crate) use core::{build_authorization_url, csrf_checks};
pub(crate) use utils::{
    append_query, decode_return_to, encode_return_to, origin_of, sanitize_return_to,
    validate_origin,
};
