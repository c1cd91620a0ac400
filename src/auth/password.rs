use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::config::PasswordPolicy;

/// Hashes `plain` with argon2 under a freshly generated salt. Two calls
/// with the same input produce different hashes.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Checks `plain` against a stored PHC hash. A hash that fails to parse
/// counts as a mismatch, never an error.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "malformed password hash in storage");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Checks `plain` against the policy and reports the first rule it
/// breaks. Rules run in a fixed order: length bounds, uppercase,
/// lowercase, digit, special character.
pub fn validate_password_strength(policy: &PasswordPolicy, plain: &str) -> Result<(), String> {
    let length = plain.chars().count();
    if length < policy.min_length {
        return Err(format!(
            "Password must be at least {} characters long",
            policy.min_length
        ));
    }
    if length > policy.max_length {
        return Err(format!(
            "Password must not be longer than {} characters",
            policy.max_length
        ));
    }
    if !plain.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".into());
    }
    if !plain.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".into());
    }
    if !plain.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number".into());
    }
    if !plain.chars().any(|c| policy.special_chars.contains(c)) {
        return Err("Password must contain at least one special character".into());
    }
    Ok(())
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash));
    }

    #[test]
    fn hashing_is_salted() {
        let password = "Secur3P@ssw0rd";
        let first = hash_password(password).expect("hashing should succeed");
        let second = hash_password(password).expect("hashing should succeed");
        assert_ne!(first, second);
        assert!(verify_password(password, &first));
        assert!(verify_password(password, &second));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("Secur3P@ssw0rd").expect("hashing should succeed");
        assert!(!verify_password("Wr0ng!Password", &hash));
    }

    #[test]
    fn verify_treats_malformed_hash_as_mismatch() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("anything", ""));
    }
}
