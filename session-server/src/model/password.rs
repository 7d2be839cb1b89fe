//! Password hashing and verification

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config;
use crate::model::error::Result;

/// Argon2id hasher with a configured cost
///
/// Produced hashes are PHC strings carrying the algorithm, version, cost parameters and salt, so
/// verification does not need anything besides the stored string.
#[derive(Debug, Clone)]
pub struct Hasher {
    params: Params,
}

impl Hasher {
    /// Creates a hasher, failing on invalid cost parameters
    pub fn new(config: config::Hashing) -> Result<Self, argon2::Error> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes the password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verifies the password against a stored hash
    ///
    /// Malformed hashes never verify. Cost parameters are taken from the hash itself, so hashes
    /// created with a different configuration still verify.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(hash) = PasswordHash::new(hash) else {
            return false;
        };

        self.argon2()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Hasher {
    Hasher::new(config::Hashing {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_own_hash() {
        let hasher = test_hasher();

        let hash = hasher.hash("pw1").unwrap();
        assert!(hasher.verify("pw1", &hash));
    }

    #[test]
    fn verify_wrong_password_fails() {
        let hasher = test_hasher();

        let hash = hasher.hash("pw1").unwrap();
        assert!(!hasher.verify("pw2", &hash));
        assert!(!hasher.verify("", &hash));
        assert!(!hasher.verify("PW1", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = test_hasher();

        let hash1 = hasher.hash("pw1").unwrap();
        let hash2 = hasher.hash("pw1").unwrap();
        assert_ne!(hash1, hash2);
        assert!(hasher.verify("pw1", &hash1));
        assert!(hasher.verify("pw1", &hash2));
    }

    #[test]
    fn hash_is_self_describing() {
        let hasher = test_hasher();

        let hash = hasher.hash("pw1").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        let hasher = test_hasher();

        assert!(!hasher.verify("pw1", ""));
        assert!(!hasher.verify("pw1", "pw1"));
        assert!(!hasher.verify("pw1", "$argon2id$v=19$garbage"));
    }

    #[test]
    fn verify_with_other_cost() {
        let stronger = Hasher::new(config::Hashing {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();

        let hash = stronger.hash("pw1").unwrap();
        assert!(test_hasher().verify("pw1", &hash));
    }

    #[test]
    fn invalid_cost_rejected() {
        Hasher::new(config::Hashing {
            memory_kib: 1024,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
    }
}
