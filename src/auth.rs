use sha2::{Digest, Sha256};

/// Hash a bearer token for lookup against session_token (SHA-256 hex).
/// Tokens are issued by the identity provider; only their hash is stored.
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
