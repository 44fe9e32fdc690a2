/// Hash a plaintext password with bcrypt at the given cost.
pub fn hash_password(plaintext: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, cost)
}

/// Verify plaintext against a stored hash - constant-time via bcrypt.
/// A malformed stored hash never verifies.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    #[test]
    fn hash_verifies_only_the_same_password() {
        let hash = hash_password("correct horse", COST).unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let h1 = hash_password("pw", COST).unwrap();
        let h2 = hash_password("pw", COST).unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("pw", &h1));
        assert!(verify_password("pw", &h2));
    }

    #[test]
    fn garbage_hash_does_not_verify() {
        assert!(!verify_password("pw", "not-a-bcrypt-hash"));
    }
}
