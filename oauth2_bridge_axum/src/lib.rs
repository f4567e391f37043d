//! Axum integration for the oauth2-bridge identity bridge.
//!
//! Mount [`bridge_router`] into an application to expose, under the
//! configured route prefix:
//! - `GET {prefix}/oauth2/login?return_to=/path`
//! - `GET {prefix}/oauth2/authorized`
//! - `GET {prefix}/bridge-token`

mod error;
mod oauth2;
mod router;

pub use error::IntoResponseError;
pub use router::{bridge_router, bridge_router_no_trace};

pub use oauth2_bridge::{AuthBridge, BridgeConfig, CoordinationError};
