//! Login flow coordination
//!
//! [`AuthBridge`] ties the ephemeral cookie store, the identity provider, the
//! identity mapper and the token minter together behind the three operations
//! the HTTP layer exposes:
//! - `start_login`: begin an Authorization Code + PKCE flow
//! - `authorized`: finish it on the provider's redirect
//! - `take_bridge_token`: hand the one-time bridging token to the front end

mod bridge;
mod errors;
mod oauth2;
mod token;

pub use bridge::AuthBridge;
pub use errors::CoordinationError;
pub use oauth2::STATE_LEN;
