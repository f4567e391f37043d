use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TokenError {
    #[error("Failed to mint bridging token: {0}")]
    Mint(String),

    #[error("Bridging token expired")]
    Expired,

    #[error("Invalid bridging token: {0}")]
    Invalid(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        }
    }
}
