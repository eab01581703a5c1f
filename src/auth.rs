//! Credential handling: password hashing, bearer tokens, verification
//! codes and the email shape check.
//!
//! Passwords and verification codes are stored as salted, iterated
//! SHA-256 digests. Bearer tokens are random 256-bit values persisted
//! in the `tokens` table and presented in the `Authorization` header.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

const HASH_ITERATIONS: u32 = 10_000;

/// Minutes an email verification code stays valid.
pub const CODE_TTL_MINUTES: i64 = 10;

pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    let digest = iterate_sha256(&salt, password.as_bytes(), HASH_ITERATIONS);
    format!(
        "v1${}${}${}",
        HASH_ITERATIONS,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest),
    )
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some("v1"), Some(iters), Some(salt), Some(digest)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(iters) = iters.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (
        STANDARD_NO_PAD.decode(salt),
        STANDARD_NO_PAD.decode(digest),
    ) else {
        return false;
    };
    iterate_sha256(&salt, password.as_bytes(), iters).to_vec() == expected
}

fn iterate_sha256(salt: &[u8], secret: &[u8], iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret);
    let mut digest: [u8; 32] = hasher.finalize().into();
    for _ in 1..iterations {
        digest = Sha256::digest(digest).into();
    }
    digest
}

/// A fresh opaque bearer token.
pub fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A fresh 6-digit verification code, zero-padded.
pub fn new_verification_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

pub fn hash_code(code: &str) -> String {
    hash_password(code)
}

pub fn verify_code(code: &str, stored: &str) -> bool {
    verify_password(code, stored)
}

/// Email acceptance rule: 7-bit ASCII only, `local@domain.tld` shape
/// with a top-level label of at least two letters. Deliberately
/// permissive beyond that; generated documents render recipient lists
/// verbatim, so the point is to reject what would corrupt them, not to
/// implement the RFC.
pub fn is_valid_email(email: &str) -> bool {
    if !email.is_ascii() || email.is_empty() {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || !local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._%+-".contains(&b))
    {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    if host.is_empty()
        || !host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    {
        return false;
    }
    tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic())
}
