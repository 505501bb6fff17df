// Credential hashing
// Secrets are bcrypt-hashed before they reach the pharmacy repository

use bcrypt::hash;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to hash credential: {0}")]
pub struct CredentialError(#[from] bcrypt::BcryptError);

/// Hashes a plaintext secret with bcrypt at the given cost
///
/// # Example
/// ```
/// use pharmacy_directory_api::auth::password::hash_password;
///
/// let hash = hash_password("open-sesame", 4).expect("valid hash");
/// assert!(bcrypt::verify("open-sesame", &hash).unwrap());
/// ```
pub fn hash_password(password: &str, cost: u32) -> Result<String, CredentialError> {
    Ok(hash(password, cost)?)
}
