//! Salted password hashing.
//!
//! Stored format is `<salt hex>$<digest hex>` where the digest is
//! SHA-256 over the salt followed by the password, stretched by
//! re-hashing [`ROUNDS`] times.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::hash::{from_hex, sha256, to_hex};
use crate::{CryptoError, Result};

const SALT_LEN: usize = 16;
const ROUNDS: usize = 10_000;

fn digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut input = Vec::with_capacity(salt.len() + password.len());
    input.extend_from_slice(salt);
    input.extend_from_slice(password.as_bytes());

    let mut out = sha256(&input);
    for _ in 1..ROUNDS {
        out = sha256(&out);
    }
    out
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::RandomnessUnavailable(e.to_string()))?;

    Ok(format!("{}${}", to_hex(&salt), to_hex(&digest(&salt, password))))
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let (salt_hex, digest_hex) = stored
        .split_once('$')
        .ok_or_else(|| CryptoError::MalformedHash("missing separator".to_string()))?;
    let salt = from_hex(salt_hex)
        .ok_or_else(|| CryptoError::MalformedHash("salt is not hex".to_string()))?;
    let expected = from_hex(digest_hex)
        .ok_or_else(|| CryptoError::MalformedHash("digest is not hex".to_string()))?;

    let actual = digest(&salt, password);
    // Constant-time comparison.
    let diff = actual
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    Ok(expected.len() == actual.len() && diff == 0)
}
