//! Credential primitives: salted password hashing and session tokens
//!
//! Pure functions only - no HTTP framework dependencies. The web service
//! layers cookie handling and middleware on top of these.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated salts, in bytes (hex-encoded to 32 chars)
const SALT_LEN: usize = 16;

/// Generate a random hex-encoded salt
pub fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; SALT_LEN] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hash a password with the given salt
///
/// SHA-256 over `salt || password`, hex-encoded. The salt is stored beside
/// the hash, so the same function serves both registration and verification.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a password attempt against a stored hash and salt
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    hash_password(password, salt) == stored_hash
}

/// Generate an unguessable session token
pub fn generate_session_token() -> String {
    // Two UUIDs worth of randomness; hyphens stripped for cookie friendliness
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
