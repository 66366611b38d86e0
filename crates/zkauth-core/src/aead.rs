//! AES-256-GCM envelope (spec §4.2): 12-byte random IV, 16-byte tag, empty
//! associated data. Ciphertext, IV, and tag travel separately in hex, which
//! is the canonical `EncryptionResult` shape used throughout the crate.

use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// The canonical AEAD envelope: `{ ciphertext, iv, tag }`, all lowercase hex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptionResult {
    pub ciphertext: String,
    pub iv: String,
    pub tag: String,
}

/// Encrypt `plaintext` under `key` (32 bytes) with a fresh random IV.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<EncryptionResult> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| AuthError::invalid_input("AES-256-GCM key must be 32 bytes"))?;
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let sealed = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
        .map_err(|_| AuthError::auth_failure("AEAD seal failed"))?;
    let split_at = sealed.len() - TAG_LEN;
    let (ct, tag) = sealed.split_at(split_at);

    Ok(EncryptionResult {
        ciphertext: hex::encode(ct),
        iv: hex::encode(iv),
        tag: hex::encode(tag),
    })
}

/// Decrypt an `EncryptionResult` under `key`. Any tag mismatch, truncation,
/// or malformed hex yields `AuthenticationFailure`.
pub fn decrypt(key: &[u8; 32], envelope: &EncryptionResult) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| AuthError::invalid_input("AES-256-GCM key must be 32 bytes"))?;

    let iv = hex::decode(&envelope.iv).map_err(|_| AuthError::auth_failure("malformed IV hex"))?;
    if iv.len() != IV_LEN {
        return Err(AuthError::auth_failure("IV must be 12 bytes"));
    }
    let ct = hex::decode(&envelope.ciphertext)
        .map_err(|_| AuthError::auth_failure("malformed ciphertext hex"))?;
    let tag = hex::decode(&envelope.tag).map_err(|_| AuthError::auth_failure("malformed tag hex"))?;
    if tag.len() != TAG_LEN {
        return Err(AuthError::auth_failure("tag must be 16 bytes"));
    }

    let mut sealed = ct;
    sealed.extend_from_slice(&tag);
    let nonce = Nonce::from_slice(&iv);

    cipher
        .decrypt(nonce, Payload { msg: &sealed, aad: &[] })
        .map_err(|_| AuthError::auth_failure("AEAD tag verification failed"))
}
