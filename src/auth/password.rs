/// Password Hashing and Verification
///
/// bcrypt with a configurable cost. Every `hash` call draws a fresh salt,
/// so hashing the same password twice gives two different strings.

use std::sync::Arc;

use crate::error::PasswordError;

/// bcrypt only consumes the first 72 bytes of its input
pub const MAX_PASSWORD_BYTES: usize = 72;

const DUMMY_PASSWORD: &str = "timing-equalizer";

#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Hash verified against when the user does not exist, so a miss costs
    /// the same as a wrong password
    dummy_hash: Arc<String>,
}

impl PasswordHasher {
    /// Fails if bcrypt rejects the cost (valid range is 4..=31)
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Self {
            cost,
            dummy_hash: Arc::new(dummy_hash),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password for storage
    ///
    /// # Errors
    /// - `TooLong` if the password would be silently truncated by bcrypt
    /// - `Hash` if bcrypt itself fails
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong(MAX_PASSWORD_BYTES));
        }

        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Compare a candidate password with a stored hash
    ///
    /// A mismatch is `Ok(false)`; only a malformed stored hash is an error.
    pub fn verify(&self, candidate: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        if candidate.len() > MAX_PASSWORD_BYTES {
            // Could never have been stored; the comparison still checks the hash.
            bcrypt::verify(DUMMY_PASSWORD, stored_hash)
                .map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
            return Ok(false);
        }

        bcrypt::verify(candidate, stored_hash)
            .map_err(|e| PasswordError::MalformedHash(e.to_string()))
    }

    /// Burn one verification's worth of CPU without a real hash
    pub fn verify_dummy(&self, candidate: &str) {
        let _ = bcrypt::verify(candidate.as_bytes(), &self.dummy_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).expect("Failed to build hasher")
    }

    #[test]
    fn test_hash_password() {
        let hash = hasher().hash("secret").expect("Failed to hash password");

        assert_ne!("secret", hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hasher = hasher();
        for password in ["secret", "", "ünïcødé", "with spaces and 123"] {
            let hash = hasher.hash(password).expect("Failed to hash password");
            assert!(hasher.verify(password, &hash).unwrap(), "{:?}", password);
        }
    }

    #[test]
    fn test_verify_wrong_password() {
        let hasher = hasher();
        let hash = hasher.hash("secret").expect("Failed to hash password");

        assert!(!hasher.verify("Secret", &hash).unwrap());
        assert!(!hasher.verify("secret ", &hash).unwrap());
    }

    #[test]
    fn test_salt_is_fresh_per_call() {
        let hasher = hasher();
        let first = hasher.hash("secret").unwrap();
        let second = hasher.hash("secret").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("secret", &first).unwrap());
        assert!(hasher.verify("secret", &second).unwrap());
    }

    #[test]
    fn test_too_long_password() {
        let long_password = "a".repeat(MAX_PASSWORD_BYTES + 1);
        assert_eq!(
            hasher().hash(&long_password),
            Err(PasswordError::TooLong(MAX_PASSWORD_BYTES))
        );
    }

    #[test]
    fn test_max_length_password() {
        let hasher = hasher();
        let password = "a".repeat(MAX_PASSWORD_BYTES);
        let hash = hasher.hash(&password).unwrap();

        assert!(hasher.verify(&password, &hash).unwrap());
        assert!(!hasher.verify(&format!("{}b", password), &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        let result = hasher().verify("secret", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(PasswordError::MalformedHash(_))));
    }

    #[test]
    fn test_malformed_hash_with_too_long_candidate() {
        let long_password = "a".repeat(MAX_PASSWORD_BYTES + 1);
        let result = hasher().verify(&long_password, "not-a-bcrypt-hash");
        assert!(matches!(result, Err(PasswordError::MalformedHash(_))));
    }

    #[test]
    fn test_invalid_cost() {
        assert!(PasswordHasher::new(2).is_err());
        assert!(PasswordHasher::new(32).is_err());
    }
}
