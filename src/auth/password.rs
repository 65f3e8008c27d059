use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

pub fn hash_password(password: &str) -> String {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub fn verify_password(password: &str, hashed: &str) -> Result<(), argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let parsed = PasswordHash::new(hashed)?;

    argon2.verify_password(password.as_bytes(), &parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_its_own_hash() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash).is_ok());
    }

    #[test]
    fn rejects_a_wrong_password() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter3", &hash).is_err());
    }

    #[test]
    fn salt_is_random_per_hash() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn rejects_a_malformed_hash() {
        assert!(verify_password("anything", "not-a-real-hash").is_err());
    }
}
