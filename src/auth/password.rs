//! Salted password credentials.
//!
//! A stored credential has the shape `salt,digest` where `digest` is the
//! hex SHA-256 of `username ++ password ++ salt`.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;
const SALT_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const SEPARATOR: char = ',';

/// Random salt of ASCII letters.
pub fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    (0..SALT_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SALT_CHARSET.len());
            SALT_CHARSET[idx] as char
        })
        .collect()
}

pub fn hash(username: &str, password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build the stored form `salt,digest`, generating a salt if none is given.
pub fn make_pw_hash(username: &str, password: &str, salt: Option<&str>) -> String {
    let salt = match salt {
        Some(s) => s.to_string(),
        None => generate_salt(),
    };
    let digest = hash(username, password, &salt);
    format!("{salt}{SEPARATOR}{digest}")
}

/// Check a candidate password against a stored credential.
/// Malformed credentials never verify.
pub fn verify(username: &str, password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once(SEPARATOR) else {
        return false;
    };
    if salt.is_empty() || digest.is_empty() {
        return false;
    }

    let candidate = hash(username, password, salt);
    bool::from(candidate.as_bytes().ct_eq(digest.as_bytes()))
}
