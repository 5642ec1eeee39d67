/// Password hashing and strength rules
///
/// Passwords are stored as Argon2id PHC strings (64 MB memory, 3 passes,
/// 4 lanes, 32-byte output). The parameters travel inside the hash, so
/// verification keeps working if they are raised later.
///
/// The strength rule is deliberately plain for a membership audience: at
/// least 8 characters, at least one letter and one digit, at most 128
/// characters.
///
/// # Example
///
/// ```
/// use memberhub_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("jardin2024")?;
///
/// assert!(verify_password("jardin2024", &hash)?);
/// assert!(!verify_password("jardin2025", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Password rejected by the strength rule
    #[error("{0}")]
    TooWeak(String),
}

fn argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash in constant time
///
/// Returns `Ok(false)` on mismatch; errors only for unusable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Checks a new password against the strength rule
///
/// # Example
///
/// ```
/// use memberhub_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("jardin2024").is_ok());
/// assert!(validate_password_strength("court1").is_err());
/// assert!(validate_password_strength("sanschiffre").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooWeak(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooWeak(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LENGTH
        )));
    }

    if !password.chars().any(char::is_alphabetic) {
        return Err(PasswordError::TooWeak(
            "Password must contain at least one letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::TooWeak(
            "Password must contain at least one digit".to_string(),
        ));
    }

    Ok(())
}
