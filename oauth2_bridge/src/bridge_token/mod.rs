//! One-time bridging tokens handed from the callback to the front end.

mod errors;
mod jwt;

pub use errors::TokenError;
pub use jwt::{BRIDGE_TOKEN_TYPE, BridgeClaims, JwtTokenMinter, TokenMinter};
