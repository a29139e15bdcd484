// Password hashing and strength validation

use crate::error::{AuthError, AuthResult};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (bcrypt truncates beyond 72 bytes).
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Special characters at least one of which must appear.
pub const SPECIAL_CHARS: &str = "!@#$%^&*";

/// Validate the password strength rules.
///
/// Checks, in order: length ≥ 8, length ≤ 72, at least one uppercase
/// letter, at least one digit, at least one of `!@#$%^&*`.
///
/// # Errors
/// Returns `AuthError::WeakPassword` naming the first failed rule.
pub fn validate_password_strength(password: &str) -> AuthResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters long"
        )));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AuthError::WeakPassword(
            "password must contain at least one uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "password must contain at least one digit".to_string(),
        ));
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(AuthError::WeakPassword(format!(
            "password must contain at least one special character ({SPECIAL_CHARS})"
        )));
    }
    Ok(())
}

/// Hash a password with bcrypt.
///
/// Validates strength first, then runs bcrypt on the blocking thread
/// pool so the reactor is never stalled by key stretching.
///
/// # Errors
/// `AuthError::WeakPassword` if validation fails,
/// `AuthError::Hashing` if bcrypt fails.
pub async fn hash_password(password: &str, cost: u32) -> AuthResult<String> {
    validate_password_strength(password)?;

    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, cost).map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("task join error: {e}")))?
}

/// Verify a password against a stored bcrypt hash.
///
/// Runs on the blocking thread pool.
///
/// # Errors
/// `AuthError::PasswordMismatch` when the hash does not match,
/// `AuthError::Hashing` when the hash itself is malformed.
pub async fn verify_password(password: &str, hash: &str) -> AuthResult<()> {
    let password = password.to_string();
    let hash = hash.to_string();

    let matched = tokio::task::spawn_blocking(move || {
        bcrypt::verify(password, &hash).map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("task join error: {e}")))??;

    if matched {
        Ok(())
    } else {
        Err(AuthError::PasswordMismatch)
    }
}
