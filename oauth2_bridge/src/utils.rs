use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SecureRandom;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// RFC 3986 unreserved characters: `ALPHA / DIGIT / "-" / "." / "_" / "~"`
const UNRESERVED: &[u8; 66] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

// Largest multiple of 66 below 256. Bytes at or above it are redrawn so that
// every character of the alphabet is equally likely.
const ACCEPT_BELOW: u8 = 198;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

/// Generates a string of `len` characters drawn from the unreserved alphabet
/// using the operating system CSPRNG.
pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut out = String::with_capacity(len);
    let mut buf = vec![0u8; len.max(16)];

    while out.len() < len {
        rng.fill(&mut buf)
            .map_err(|_| UtilError::Crypto("Failed to generate random bytes".to_string()))?;

        for byte in buf.iter().copied().filter(|b| *b < ACCEPT_BELOW) {
            if out.len() == len {
                break;
            }
            out.push(UNRESERVED[(byte % 66) as usize] as char);
        }
    }

    Ok(out)
}

pub fn sha256(input: &str) -> [u8; 32] {
    Sha256::digest(input.as_bytes()).into()
}

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))
}

/// Byte-exact comparison whose running time does not depend on where the
/// inputs first differ.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub(crate) fn is_unreserved(s: &str) -> bool {
    s.bytes().all(|b| UNRESERVED.contains(&b))
}
