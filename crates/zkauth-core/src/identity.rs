//! Deterministic identity derivation (spec §4.6).
//!
//! Every function here is a pure function of `(userId, email, [purpose])`;
//! `userId` is assumed to carry >= 128 bits of entropy from the identity
//! provider, which is what makes the derived lookup identifiers
//! unenumerable without it.

use ed25519_dalek::SigningKey;
use uuid::Uuid;

use crate::kdf::{hmac_sha256, pbkdf2_sha256};

const LOOKUP_DOMAIN: &str = "zkauth-lookup-v3-decentralized";
const SEED_SALT: &str = "zkAuth-v1.9-ed25519-seed";
const PBKDF2_ITERATIONS: u32 = 100_000;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `hex(HMAC-SHA-256(key=userId, msg = "zkauth-lookup-v3-decentralized:" + normEmail + ":" + purpose))`.
pub fn derive(user_id: &str, email: &str, purpose: &str) -> String {
    let msg = format!("{LOOKUP_DOMAIN}:{}:{purpose}", normalize_email(email));
    hex::encode(hmac_sha256(user_id.as_bytes(), msg.as_bytes()))
}

/// `"zkauth:" + derive("base")[0..16]`.
pub fn user_identifier(user_id: &str, email: &str) -> String {
    format!("zkauth:{}", &derive(user_id, email, "base")[..16])
}

pub fn lookup_zcash(user_id: &str, email: &str) -> String {
    derive(user_id, email, "zcash:lookup")
}

pub fn lookup_starknet(user_id: &str, email: &str) -> String {
    derive(user_id, email, "starknet:lookup")
}

pub fn lookup_solana(user_id: &str, email: &str) -> String {
    derive(user_id, email, "solana:lookup")
}

/// `"zkauth_2fa:" + derive("2fa:lookup")`.
pub fn lookup_two_factor(user_id: &str, email: &str) -> String {
    format!("zkauth_2fa:{}", derive(user_id, email, "2fa:lookup"))
}

/// A v4-UUID-*shaped* string for the per-share opaque key `purpose` (one of
/// `data`, `iv`, `tag`, `proof`): the first 16 bytes of
/// `derive("share:<i>:<purpose>")`, with the version and variant nibbles
/// forced per RFC 4122 so the string looks and parses like a real UUID even
/// though it is fully deterministic rather than randomly generated.
pub fn share_key(user_id: &str, email: &str, index: u8, purpose: &str) -> String {
    let hex_digest = derive(user_id, email, &format!("share:{index}:{purpose}"));
    let mut bytes = [0u8; 16];
    let decoded = hex::decode(&hex_digest[..32]).expect("derive() always returns valid hex");
    bytes.copy_from_slice(&decoded);
    bytes[6] = (bytes[6] & 0x0f) | 0x40; // version 4
    bytes[8] = (bytes[8] & 0x3f) | 0x80; // RFC 4122 variant
    Uuid::from_bytes(bytes).to_string()
}

/// `pbkdf2(salt = "zkAuth-v1.9-ed25519-seed", password = userId + secretPhrase, 100_000, SHA-256)`,
/// with the classic Ed25519 clamp applied.
pub fn signature_seed(user_id: &str, secret_phrase: &str) -> [u8; 32] {
    let password = format!("{user_id}{secret_phrase}");
    let mut seed = pbkdf2_sha256(SEED_SALT.as_bytes(), password.as_bytes(), PBKDF2_ITERATIONS);
    seed[0] &= 0xf8;
    seed[31] = (seed[31] & 0x7f) | 0x40;
    seed
}

/// Build the Ed25519 signing keypair from the derived signature seed.
pub fn signing_key_from_seed(seed: &[u8; 32]) -> SigningKey {
    SigningKey::from_bytes(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = derive("uid-1", "User@Example.com", "base");
        let b = derive("uid-1", "  user@example.com  ", "base");
        assert_eq!(a, b);
    }

    #[test]
    fn derivation_is_domain_separated() {
        let a = derive("uid-1", "user@example.com", "zcash:lookup");
        let b = derive("uid-1", "user@example.com", "starknet:lookup");
        assert_ne!(a, b);
    }

    #[test]
    fn user_identifier_has_prefix() {
        let id = user_identifier("uid-1", "user@example.com");
        assert!(id.starts_with("zkauth:"));
        assert_eq!(id.len(), "zkauth:".len() + 16);
    }

    #[test]
    fn two_factor_lookup_has_prefix() {
        let id = lookup_two_factor("uid-1", "user@example.com");
        assert!(id.starts_with("zkauth_2fa:"));
    }

    #[test]
    fn share_key_is_uuid_shaped() {
        let key = share_key("uid-1", "user@example.com", 1, "data");
        let parsed = Uuid::parse_str(&key).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn share_key_differs_by_index_and_purpose() {
        let a = share_key("uid-1", "user@example.com", 1, "data");
        let b = share_key("uid-1", "user@example.com", 2, "data");
        let c = share_key("uid-1", "user@example.com", 1, "iv");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn signature_seed_is_clamped() {
        let seed = signature_seed("uid-1", "correct horse battery staple");
        assert_eq!(seed[0] & 0x07, 0);
        assert_eq!(seed[31] & 0xc0, 0x40);
    }

    #[test]
    fn signature_seed_yields_usable_signing_key() {
        let seed = signature_seed("uid-1", "secret");
        let signing_key = signing_key_from_seed(&seed);
        use ed25519_dalek::{Signer, Verifier};
        let sig = signing_key.sign(b"hello");
        assert!(signing_key.verifying_key().verify(b"hello", &sig).is_ok());
    }
}
