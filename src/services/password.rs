use std::num::NonZeroU32;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::digest;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = digest::SHA256_OUTPUT_LEN;

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(thiserror::Error, Debug)]
pub enum PasswordError {
    #[error("Failed to generate salt")]
    SaltGeneration,

    #[error("Invalid password hash format")]
    InvalidFormat,
}

/// Hashes a password with PBKDF2-HMAC-SHA256 and a random salt.
///
/// Format: `pbkdf2-sha256$<iterations>$<base64 salt>$<base64 hash>`
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let rng = SystemRandom::new();

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| PasswordError::SaltGeneration)?;

    let iterations = NonZeroU32::new(ITERATIONS).ok_or(PasswordError::InvalidFormat)?;
    let mut credential = [0u8; CREDENTIAL_LEN];
    pbkdf2::derive(
        ALGORITHM,
        iterations,
        &salt,
        password.as_bytes(),
        &mut credential,
    );

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        ITERATIONS,
        STANDARD.encode(salt),
        STANDARD.encode(credential)
    ))
}

/// Checks a password against a stored hash in constant time
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let mut parts = stored.split('$');

    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(PasswordError::InvalidFormat);
    };

    if scheme != SCHEME {
        return Err(PasswordError::InvalidFormat);
    }

    let iterations = iterations
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(PasswordError::InvalidFormat)?;
    let salt = STANDARD
        .decode(salt)
        .map_err(|_| PasswordError::InvalidFormat)?;
    let hash = STANDARD
        .decode(hash)
        .map_err(|_| PasswordError::InvalidFormat)?;

    Ok(pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok())
}
