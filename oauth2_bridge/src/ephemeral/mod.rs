//! Short-lived, single-use secrets kept in HTTP-only cookies.
//!
//! Nothing is stored server-side: a value lives in the browser until its
//! `Max-Age` runs out or until its consumer reads it with [`EphemeralStore::take`].

mod cookie;
mod errors;

pub use cookie::{EphemeralStore, MAX_EPHEMERAL_TTL};
pub use errors::CookieError;
