use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CookieError {
    #[error("Invalid cookie name: {0}")]
    InvalidName(String),

    /// The value itself is never echoed back, only the cookie it was meant for.
    #[error("Invalid value for cookie {0}")]
    InvalidValue(String),

    #[error("Max-Age {requested}s exceeds the {limit}s limit for ephemeral cookies")]
    TtlTooLong { requested: u64, limit: u64 },

    #[error("Failed to build Set-Cookie header: {0}")]
    Header(String),
}
