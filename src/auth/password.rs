use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::PasswordPolicy;

/// Passwords rejected outright when `reject_common` is on.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "passw0rd", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football", "baseball",
    "welcome1", "welcome123", "admin123", "letmein1", "trustno1", "dragon123", "monkey123",
    "abc12345", "abcd1234", "11111111", "00000000", "123123123", "superman", "starwars",
    "whatever", "computer", "michelle", "jennifer", "1q2w3e4r", "zaq12wsx", "qazwsx123",
    "asdfghjkl", "changeme", "secret123", "testpass123", "student1", "student123",
];

/// Similarity ratio (2 * shared run / combined length) at which a password is rejected.
const MAX_SIMILARITY: f64 = 0.7;

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

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Checks `password` against `policy`; `attributes` are user-supplied values
/// (username, email, names) the password must not resemble.
/// Returns one message per failing rule.
pub fn check_strength(password: &str, policy: &PasswordPolicy, attributes: &[&str]) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < policy.min_length {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            policy.min_length
        ));
    }

    if policy.reject_similar {
        let lowered = password.to_lowercase();
        let similar = attributes
            .iter()
            .flat_map(|a| attribute_parts(a))
            .any(|part| too_similar(&lowered, &part));
        if similar {
            problems.push("The password is too similar to your personal information.".into());
        }
    }

    if policy.reject_common && COMMON_PASSWORDS.contains(&password.to_lowercase().trim()) {
        problems.push("This password is too common.".into());
    }

    if policy.reject_numeric && !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".into());
    }

    problems
}

/// The whole attribute plus its pieces split on non-alphanumerics
/// ("jane.doe@uni.ac" also yields "jane", "doe", ...).
fn attribute_parts(attribute: &str) -> Vec<String> {
    let lowered = attribute.trim().to_lowercase();
    if lowered.is_empty() {
        return Vec::new();
    }
    let mut parts: Vec<String> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|p| p.chars().count() >= 3)
        .map(str::to_string)
        .collect();
    parts.push(lowered);
    parts
}

fn too_similar(password: &str, attribute: &str) -> bool {
    if password.is_empty() || attribute.chars().count() < 3 {
        return false;
    }
    if password == attribute {
        return true;
    }
    let shared = longest_common_substring(password, attribute);
    let total = password.chars().count() + attribute.chars().count();
    (2 * shared) as f64 / total as f64 >= MAX_SIMILARITY
}

fn longest_common_substring(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = vec![0usize; b.len() + 1];
    let mut best = 0;
    for ca in &a {
        let mut cur = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                cur[j + 1] = prev[j] + 1;
                best = best.max(cur[j + 1]);
            }
        }
        prev = cur;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn strong_password_passes_default_policy() {
        let problems = check_strength("violet-Harbour-42", &PasswordPolicy::default(), &["teststudent"]);
        assert!(problems.is_empty(), "{problems:?}");
    }

    #[test]
    fn short_numeric_password_collects_every_problem() {
        let problems = check_strength("1234", &PasswordPolicy::default(), &[]);
        assert!(problems.iter().any(|p| p.contains("too short")));
        assert!(problems.iter().any(|p| p.contains("entirely numeric")));
    }

    #[test]
    fn common_password_rejected() {
        let problems = check_strength("Password123", &PasswordPolicy::default(), &[]);
        assert_eq!(problems, vec!["This password is too common.".to_string()]);
    }

    #[test]
    fn password_resembling_username_or_email_rejected() {
        let policy = PasswordPolicy::default();
        assert!(!check_strength("wanjiku2024", &policy, &["wanjiku2024"]).is_empty());
        assert!(!check_strength("ochieng.otieno1", &policy, &["x", "ochieng.otieno@uni.ac.ke"]).is_empty());
    }

    #[test]
    fn rules_can_be_switched_off() {
        let policy = PasswordPolicy {
            min_length: 4,
            reject_numeric: false,
            reject_common: false,
            reject_similar: false,
        };
        assert!(check_strength("12345678", &policy, &["12345678"]).is_empty());
    }

    #[test]
    fn longest_common_substring_counts_chars() {
        assert_eq!(longest_common_substring("abcdef", "zcdez"), 3);
        assert_eq!(longest_common_substring("abc", "xyz"), 0);
    }
}
