use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::config::{AuthConfig, HasherKind};
use crate::error::HashError;

const SALT_SIZE: usize = 16;
const DIGEST_SIZE: usize = 32;

/// Output of hashing a password for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    pub password_hash: String,
    pub salt: Option<String>,
}

/// A password hashing scheme. `verify` must compare in constant time and
/// must return `false` rather than fail on malformed stored material.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<HashedPassword, HashError>;

    fn verify(&self, password: &str, password_hash: &str, salt: Option<&str>) -> bool;

    /// Whether `password_hash` is material this scheme can verify against.
    /// A `false` here means `verify` would return without doing hash work.
    fn is_well_formed(&self, password_hash: &str, salt: Option<&str>) -> bool;
}

/// Argon2id with the crate's default cost parameters. The salt lives inside
/// the PHC string, so the record's separate salt column is unused.
#[derive(Debug, Default, Clone)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<HashedPassword, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| HashError::Failed(e.to_string()))?
            .to_string();

        Ok(HashedPassword {
            password_hash,
            salt: None,
        })
    }

    fn verify(&self, password: &str, password_hash: &str, _salt: Option<&str>) -> bool {
        match PasswordHash::new(password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn is_well_formed(&self, password_hash: &str, _salt: Option<&str>) -> bool {
        PasswordHash::new(password_hash).is_ok()
    }
}

/// Iterated salted SHA-256 for stores that keep the salt in its own column.
#[derive(Debug, Clone)]
pub struct Sha256Hasher {
    iterations: u32,
}

impl Sha256Hasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    fn digest(&self, password: &str, salt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        let mut result = hasher.finalize();

        for _ in 1..self.iterations {
            let mut h = Sha256::new();
            h.update(result);
            h.update(salt.as_bytes());
            result = h.finalize();
        }

        BASE64.encode(result)
    }
}

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, password: &str) -> Result<HashedPassword, HashError> {
        let mut salt_bytes = [0u8; SALT_SIZE];
        rand::thread_rng()
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| HashError::Failed(e.to_string()))?;
        let salt = BASE64.encode(salt_bytes);

        Ok(HashedPassword {
            password_hash: self.digest(password, &salt),
            salt: Some(salt),
        })
    }

    fn verify(&self, password: &str, password_hash: &str, salt: Option<&str>) -> bool {
        let attempt = self.digest(password, salt.unwrap_or_default());
        constant_time_eq(attempt.as_bytes(), password_hash.as_bytes())
    }

    fn is_well_formed(&self, password_hash: &str, _salt: Option<&str>) -> bool {
        BASE64
            .decode(password_hash)
            .map(|digest| digest.len() == DIGEST_SIZE)
            .unwrap_or(false)
    }
}

/// Builds the configured scheme.
pub fn hasher_from_config(config: &AuthConfig) -> Box<dyn PasswordHasher> {
    match config.hasher {
        HasherKind::Argon2 => Box::new(Argon2Hasher),
        HasherKind::Sha256 => Box::new(Sha256Hasher::new(config.sha256_iterations)),
    }
}

/// Byte comparison whose running time does not depend on where the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
