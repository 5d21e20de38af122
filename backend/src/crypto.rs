use rand::{distributions::Alphanumeric, Rng};

use crate::error::Result;

pub fn generate_random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_secret() {
        let secret = generate_random_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, generate_random_secret());
    }

    #[tokio::test]
    async fn test_hash_is_salted_and_verifies() {
        let first = hash_password("pw1", 4).await.unwrap();
        let second = hash_password("pw1", 4).await.unwrap();
        assert_ne!(first, second);
        assert!(verify_password("pw1", &first).await.unwrap());
        assert!(!verify_password("wrong", &first).await.unwrap());
    }
}
