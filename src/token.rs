//! Opaque session-token generation (C4).
//!
//! Tokens are 24 random bytes (192 bits) encoded as URL-safe base64 without padding, giving a
//! 32-character opaque string (invariant I4). Generation always draws from the OS entropy
//! source via [`rand::rngs::OsRng`] rather than a seeded PRNG - unlike the reference
//! implementation's single process-wide seed, there is no reason not to hit the OS CSPRNG on
//! every call in a Rust port.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

pub const TOKEN_BYTES: usize = 24;

/// Mint a fresh opaque session token.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
