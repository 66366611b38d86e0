//! 256-bit master key lifecycle (spec §3, §4.4).

use num_bigint::BigUint;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{self, EncryptionResult};
use crate::error::{AuthError, Result};
use crate::field::FieldElement;
use crate::kdf::sha256;

/// A 32-byte user master key, held in both raw and lowercase-hex form.
///
/// Every generated key is strictly below the sharing field's modulus: the
/// modulus is ~254 bits, two bits short of a full 256-bit key, so `generate`
/// rejection-samples until the draw lands in range rather than masking bits,
/// which would bias the distribution and still leave some draws `>= p`
/// (spec §9 open question, resolved as option (a)). `fromHex` does not
/// re-sample an already-split key reconstructed via Lagrange interpolation,
/// since that value is already `< p` by construction.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    #[zeroize(skip)]
    raw_hex: String,
    raw: [u8; 32],
    /// Seconds since epoch.
    #[zeroize(skip)]
    pub created_at: i64,
}

impl MasterKey {
    /// Generate a fresh master key with a cryptographically secure RNG,
    /// rejection-sampled into the sharing field's range.
    pub fn generate() -> Self {
        let modulus = FieldElement::modulus();
        let mut raw = [0u8; 32];
        loop {
            rand::rngs::OsRng.fill_bytes(&mut raw);
            if BigUint::from_bytes_be(&raw) < modulus {
                break;
            }
        }
        MasterKey {
            raw_hex: hex::encode(raw),
            raw,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Parse a hex-encoded master key. Fails with `InvalidInput` unless it
    /// decodes to exactly 32 bytes.
    pub fn from_hex(h: &str) -> Result<Self> {
        let bytes = hex::decode(h).map_err(|_| AuthError::invalid_input("master key is not valid hex"))?;
        if bytes.len() != 32 {
            return Err(AuthError::invalid_input("master key must decode to 32 bytes"));
        }
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&bytes);
        Ok(MasterKey {
            raw_hex: h.to_lowercase(),
            raw,
            created_at: chrono::Utc::now().timestamp(),
        })
    }

    pub fn raw(&self) -> &[u8; 32] {
        &self.raw
    }

    pub fn key_hex(&self) -> &str {
        &self.raw_hex
    }

    /// `sha256(mk.raw)`, as lowercase hex.
    pub fn hash(&self) -> String {
        hex::encode(sha256(&self.raw))
    }

    /// `sha256(unhex(pk))`: the per-public-key AEAD key used to wrap
    /// individual share envelopes.
    pub fn derive_aead_key(pk_hex: &str) -> Result<[u8; 32]> {
        let pk_bytes = hex::decode(pk_hex).map_err(|_| AuthError::invalid_input("pk is not valid hex"))?;
        Ok(sha256(&pk_bytes))
    }

    pub fn encrypt_with_pk(pk_hex: &str, plaintext: &[u8]) -> Result<EncryptionResult> {
        let key = Self::derive_aead_key(pk_hex)?;
        aead::encrypt(&key, plaintext)
    }

    pub fn decrypt_with_pk(pk_hex: &str, envelope: &EncryptionResult) -> Result<Vec<u8>> {
        let key = Self::derive_aead_key(pk_hex)?;
        aead::decrypt(&key, envelope)
    }

    pub fn encrypt_data(&self, plaintext: &[u8]) -> Result<EncryptionResult> {
        aead::encrypt(&self.raw, plaintext)
    }

    pub fn decrypt_data(&self, envelope: &EncryptionResult) -> Result<Vec<u8>> {
        aead::decrypt(&self.raw, envelope)
    }

    /// `sha256("zkauth-wrap-v1:" + userId + ":" + lower(trim(email)))`: the
    /// key used to encrypt shares in credential-only login mode (spec
    /// §4.4/§4.8).
    pub fn derive_wrapping_key(user_id: &str, email: &str) -> [u8; 32] {
        let normalized = email.trim().to_lowercase();
        let msg = format!("zkauth-wrap-v1:{user_id}:{normalized}");
        sha256(msg.as_bytes())
    }

    /// `"zkauth:" + sha256(unhex(pk))[0..16 hex chars]`.
    pub fn generate_user_id(pk_hex: &str) -> Result<String> {
        let pk_bytes = hex::decode(pk_hex).map_err(|_| AuthError::invalid_input("pk is not valid hex"))?;
        let digest = sha256(&pk_bytes);
        Ok(format!("zkauth:{}", &hex::encode(digest)[..16]))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_round_trips_through_hex() {
        let mk = MasterKey::generate();
        let reparsed = MasterKey::from_hex(mk.key_hex()).unwrap();
        assert_eq!(mk.raw(), reparsed.raw());
    }

    #[test]
    fn generate_is_always_below_the_field_modulus() {
        for _ in 0..64 {
            let mk = MasterKey::generate();
            assert!(BigUint::from_bytes_be(mk.raw()) < FieldElement::modulus());
        }
    }

    #[test]
    fn split_combine_round_trips_to_the_original_key() {
        let mk = MasterKey::generate();
        let split = crate::sharing::split(&mk, 2, 3).unwrap();
        let combined = crate::sharing::combine(&split.shares[..2]).unwrap();
        assert_eq!(combined, mk.key_hex());
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(MasterKey::from_hex("aabb").is_err());
    }

    #[test]
    fn hash_depends_only_on_raw_and_is_64_hex_chars() {
        let mk = MasterKey::from_hex(&"11".repeat(32)).unwrap();
        let h = mk.hash();
        assert_eq!(h.len(), 64);
        let mk2 = MasterKey::from_hex(&"11".repeat(32)).unwrap();
        assert_eq!(h, mk2.hash());
    }

    #[test]
    fn encrypt_decrypt_data_round_trip() {
        let mk = MasterKey::generate();
        let env = mk.encrypt_data(b"application data").unwrap();
        let out = mk.decrypt_data(&env).unwrap();
        assert_eq!(out, b"application data");
    }

    #[test]
    fn wrapping_key_is_case_and_whitespace_insensitive() {
        let a = MasterKey::derive_wrapping_key("uid-1", "  User@Example.com ");
        let b = MasterKey::derive_wrapping_key("uid-1", "user@example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn user_id_is_deterministic() {
        let pk = "11".repeat(32);
        let a = MasterKey::generate_user_id(&pk).unwrap();
        let b = MasterKey::generate_user_id(&pk).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("zkauth:"));
    }
}
