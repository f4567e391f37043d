use crate::oauth2::errors::OAuth2Error;
use crate::utils::{base64url_encode, gen_random_string, is_unreserved, sha256};

pub const PKCE_METHOD: &str = "S256";

/// PKCE code verifier and its S256 challenge, always produced together.
#[derive(Clone)]
pub struct PkcePair {
    verifier: String,
    challenge: String,
}

impl PkcePair {
    pub const VERIFIER_LEN: usize = 64;

    pub fn generate() -> Result<Self, OAuth2Error> {
        let verifier = gen_random_string(Self::VERIFIER_LEN)?;
        Self::from_verifier(verifier)
    }

    /// Rebuilds the pair from a stored verifier. RFC 7636 §4.1 limits the
    /// verifier to 43..=128 unreserved characters.
    pub fn from_verifier(verifier: String) -> Result<Self, OAuth2Error> {
        if !(43..=128).contains(&verifier.len()) {
            return Err(OAuth2Error::InvalidVerifier(format!(
                "length {} outside 43..=128",
                verifier.len()
            )));
        }
        if !is_unreserved(&verifier) {
            return Err(OAuth2Error::InvalidVerifier(
                "contains reserved characters".to_string(),
            ));
        }

        let challenge = challenge_for(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    pub fn method(&self) -> &'static str {
        PKCE_METHOD
    }
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// `base64url_no_pad(SHA-256(verifier))`
pub fn challenge_for(verifier: &str) -> String {
    base64url_encode(&sha256(verifier))
}
