//! One-way password encoding (argon2id, PHC string format).

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

pub fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow::anyhow!("argon2 hash: {e}"))
}

/// `Ok(false)` for a wrong password, `Err` only when the stored encoding
/// itself is unusable.
pub fn verify(plain: &str, encoded: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(encoded)
        .map_err(|e| anyhow::anyhow!("argon2 parse stored hash: {e}"))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("argon2 verify: {e}")),
    }
}

// argon2 is CPU bound; keep it off the async workers.
pub async fn hash_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash(&plain)).await?
}

pub async fn verify_blocking(plain: String, encoded: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify(&plain, &encoded)).await?
}
