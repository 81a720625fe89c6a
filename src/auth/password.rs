//! Password hashing and verification for local accounts.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};

use crate::error::ConsoleError;

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    fn to_argon2(self) -> Result<Argon2<'static>, ConsoleError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| ConsoleError::Unexpected(format!("create argon2 params: {e}")))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

pub fn hash_password_with_params(
    input: &str,
    params: Argon2Params,
) -> Result<String, ConsoleError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ConsoleError::Unexpected(format!("encode salt: {e}")))?;

    let hash = params
        .to_argon2()?
        .hash_password(input.as_bytes(), &salt)
        .map_err(|e| ConsoleError::Unexpected(format!("hash password: {e}")))?;

    Ok(hash.to_string())
}

pub fn hash_password(input: &str) -> Result<String, ConsoleError> {
    hash_password_with_params(input, Argon2Params::default())
}

/// Verification uses the parameters embedded in the hash itself.
pub fn verify_password(input: &str, hash: &str) -> Result<bool, ConsoleError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ConsoleError::Unexpected(format!("parse password hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(input.as_bytes(), &parsed)
        .is_ok())
}

/// [`hash_password`] on a blocking thread, off the async runtime.
pub async fn hash_password_blocking(input: String) -> Result<String, ConsoleError> {
    tokio::task::spawn_blocking(move || hash_password(&input))
        .await
        .map_err(|e| ConsoleError::Unexpected(format!("spawn password hashing task: {e}")))?
}

/// [`verify_password`] on a blocking thread, off the async runtime.
pub async fn verify_password_blocking(input: String, hash: String) -> Result<bool, ConsoleError> {
    tokio::task::spawn_blocking(move || verify_password(&input, &hash))
        .await
        .map_err(|e| {
            ConsoleError::Unexpected(format!("spawn password verification task: {e}"))
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Argon2Params {
        Argon2Params {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password_with_params("correct horse", fast()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password_with_params("secret123", fast()).unwrap();
        let b = hash_password_with_params("secret123", fast()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn blocking_helpers_round_trip_off_the_runtime() {
        let hash = hash_password_blocking("correct horse".to_string())
            .await
            .unwrap();
        assert!(
            verify_password_blocking("correct horse".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(
            !verify_password_blocking("wrong horse".to_string(), hash)
                .await
                .unwrap()
        );
        assert!(
            verify_password_blocking("x".to_string(), "not-a-phc-string".to_string())
                .await
                .is_err()
        );
    }
}
