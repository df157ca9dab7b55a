//! SHA-256 and hex helpers.

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex encoding.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decode lowercase or uppercase hex. Returns `None` on malformed input.
pub fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        assert_eq!(
            to_hex(&sha256(b"hello")),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hex_roundtrip() {
        let bytes = [0u8, 15, 16, 255];
        assert_eq!(to_hex(&bytes), "000f10ff");
        assert_eq!(from_hex("000f10ff").unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(from_hex("abc").is_none());
        assert!(from_hex("zz").is_none());
    }
}
