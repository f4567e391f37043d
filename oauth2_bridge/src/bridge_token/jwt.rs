use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::errors::TokenError;

/// Value of the `typ` claim; keeps other HS256 tokens signed with the same
/// key from being accepted as bridging tokens.
pub const BRIDGE_TOKEN_TYPE: &str = "bridge";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeClaims {
    /// Local user id
    pub sub: String,
    pub provider: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub typ: String,
}

/// Issues the credential the front end trades for a session.
pub trait TokenMinter: Send + Sync {
    fn mint(&self, user_id: &str, provider: &str) -> Result<String, TokenError>;

    fn verify(&self, token: &str) -> Result<BridgeClaims, TokenError>;
}

/// HS256 JWT minter keyed with the bridge secret.
pub struct JwtTokenMinter {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl JwtTokenMinter {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }
}

impl TokenMinter for JwtTokenMinter {
    fn mint(&self, user_id: &str, provider: &str) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = BridgeClaims {
            sub: user_id.to_string(),
            provider: provider.to_string(),
            iat,
            exp: iat + self.ttl_secs as i64,
            jti: uuid::Uuid::new_v4().to_string(),
            typ: BRIDGE_TOKEN_TYPE.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Mint(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<BridgeClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<BridgeClaims>(token, &self.decoding_key, &validation)?.claims;
        if claims.typ != BRIDGE_TOKEN_TYPE {
            return Err(TokenError::Invalid(format!("unexpected typ {:?}", claims.typ)));
        }
        Ok(claims)
    }
}
