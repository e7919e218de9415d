//! Argon2 password hashing.
//!
//! Also used to hash password-reset tokens before they are stored, so a
//! leaked database dump cannot be replayed against the reset endpoint.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::Error;

// Argon2id parameters per the RFC 9106 low-memory recommendation
const MEMORY_KIB: u32 = 19_456;
const ITERATIONS: u32 = 2;
const PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>, Error> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, None).map_err(|e| Error::Internal {
        operation: format!("create argon2 params: {e}"),
    })?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a secret with a fresh random salt.
pub fn hash_string(input: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?.hash_password(input.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash string: {e}"),
    })?;
    Ok(hash.to_string())
}

/// Check a secret against a stored hash.
///
/// The parameters come from the hash string itself, so hashes created under
/// older parameter choices keep verifying.
pub fn verify_string(input: &str, hash: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse hash: {e}"),
    })?;
    Ok(Argon2::default().verify_password(input.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_string("s3cret-passphrase").unwrap();
        assert!(verify_string("s3cret-passphrase", &hash).unwrap());
        assert!(!verify_string("wrong-passphrase", &hash).unwrap());
    }

    #[test]
    fn test_salting_makes_hashes_unique() {
        let a = hash_string("repeat").unwrap();
        let b = hash_string("repeat").unwrap();
        assert_ne!(a, b);
        assert!(verify_string("repeat", &a).unwrap());
        assert!(verify_string("repeat", &b).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_string("anything", "not-a-phc-string").is_err());
    }
}
