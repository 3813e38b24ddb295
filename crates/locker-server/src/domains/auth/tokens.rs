use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use locker_core::SESSION_TOKEN_BYTES;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bearer token, base64url without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex sha256 of the token followed by the server pepper. Only this value is
/// persisted.
pub fn hash_token(token: &str, pepper: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(pepper.as_bytes());
    hex::encode(hasher.finalize())
}
