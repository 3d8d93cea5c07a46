use crate::error::Result;

/// Hashes a password with bcrypt at the default cost.
pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Checks a password against a stored bcrypt hash. A malformed hash counts
/// as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
