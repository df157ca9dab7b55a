//! Kursbot Cryptographic Primitives
//!
//! Password hashing and verification-code generation for user registration.

pub mod hash;
pub mod password;
pub mod code;

pub use hash::sha256;
pub use password::{hash_password, verify_password};
pub use code::verification_code;

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    #[error("System randomness unavailable: {0}")]
    RandomnessUnavailable(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
