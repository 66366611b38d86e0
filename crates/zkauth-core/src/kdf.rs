//! Raw hash/KDF primitives (spec §4.3). Everything above this module
//! (master-key wrapping, identity derivation, signature seeding) is built
//! from these four functions.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{AuthError, Result};

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

/// PBKDF2-HMAC-SHA256, 100,000 iterations, used only for the Ed25519
/// signature seed (spec §4.6).
pub fn pbkdf2_sha256(salt: &[u8], password: &[u8], iterations: u32) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    out
}

/// HKDF-SHA256 extract-then-expand into `length` bytes.
pub fn hkdf(ikm: &[u8], salt: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut out = vec![0u8; length];
    hk.expand(info, &mut out)
        .map_err(|_| AuthError::invalid_input("HKDF output length too large for SHA-256"))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_32_bytes_and_stable() {
        let a = sha256(b"hello");
        let b = sha256(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn hmac_is_keyed() {
        let a = hmac_sha256(b"key1", b"msg");
        let b = hmac_sha256(b"key2", b"msg");
        assert_ne!(a, b);
    }

    #[test]
    fn pbkdf2_is_stable_and_keyed_by_salt() {
        let a = pbkdf2_sha256(b"salt-a", b"pw", 1000);
        let b = pbkdf2_sha256(b"salt-a", b"pw", 1000);
        let c = pbkdf2_sha256(b"salt-b", b"pw", 1000);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hkdf_produces_requested_length() {
        let out = hkdf(b"ikm", b"salt", b"info", 48).unwrap();
        assert_eq!(out.len(), 48);
    }

    #[test]
    fn hkdf_is_deterministic() {
        let a = hkdf(b"ikm", b"salt", b"ctx", 32).unwrap();
        let b = hkdf(b"ikm", b"salt", b"ctx", 32).unwrap();
        assert_eq!(a, b);
    }
}
