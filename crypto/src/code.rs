//! Verification code generation.

use rand::rngs::OsRng;
use rand::Rng;

/// Number of digits in a verification code.
pub const CODE_LEN: usize = 6;

/// Generate a numeric verification code, zero-padded to [`CODE_LEN`] digits.
pub fn verification_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:0width$}", n, width = CODE_LEN)
}
