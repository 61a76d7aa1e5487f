//! Password hashing collaborator.

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};

/// One-way password hashing with a random salt embedded in the digest.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing digest.
    ///
    /// # Errors
    /// Returns an error if the hasher cannot be initialized or hashing fails.
    fn hash(&self, plaintext: &SecretString) -> Result<String>;

    /// Check a plaintext password against a stored digest. Malformed digests
    /// never verify.
    fn verify(&self, plaintext: &SecretString, digest: &str) -> bool;
}

/// Argon2id (v0x13, default params) producing PHC strings.
#[derive(Clone, Debug, Default)]
pub struct Argon2Hasher {
    params: argon2::Params,
}

impl Argon2Hasher {
    #[must_use]
    pub fn new(params: argon2::Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &SecretString) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.expose_secret().as_bytes(), &salt)
            .map_err(|_| anyhow!("failed to hash password"))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, plaintext: &SecretString, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2()
            .verify_password(plaintext.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }
}
