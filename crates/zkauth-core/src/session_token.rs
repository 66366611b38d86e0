//! Stateless, Ed25519-signed session tokens (spec §4.10).

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

const DEFAULT_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionPayload {
    pub zk_id: String,
    pub email: String,
    pub google_user_id: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub payload: SessionPayload,
    pub signature: String,
    pub public_key: String,
}

/// Sign `(zk_id, email, google_user_id)` into a session token valid for
/// `ttl_secs` (defaults to 30 days when `None`).
pub fn create(
    zk_id: &str,
    email: &str,
    google_user_id: &str,
    signing_key: &SigningKey,
    ttl_secs: Option<i64>,
) -> Result<SessionToken> {
    let iat = Utc::now().timestamp();
    let exp = iat + ttl_secs.unwrap_or(DEFAULT_TTL_SECS);
    let payload = SessionPayload {
        zk_id: zk_id.to_string(),
        email: email.to_string(),
        google_user_id: google_user_id.to_string(),
        iat,
        exp,
    };
    sign_payload(payload, signing_key)
}

fn sign_payload(payload: SessionPayload, signing_key: &SigningKey) -> Result<SessionToken> {
    let payload_json = serde_json::to_vec(&payload)
        .map_err(|e| AuthError::invalid_input(format!("failed to encode session payload: {e}")))?;
    let signature = signing_key.sign(&payload_json);
    Ok(SessionToken {
        payload,
        signature: hex::encode(signature.to_bytes()),
        public_key: hex::encode(signing_key.verifying_key().to_bytes()),
    })
}

/// Encode a token as `base64(JSON(token))` for the wire.
pub fn encode(token: &SessionToken) -> Result<String> {
    let json = serde_json::to_vec(token)
        .map_err(|e| AuthError::invalid_input(format!("failed to encode session token: {e}")))?;
    Ok(general_purpose::STANDARD.encode(json))
}

pub fn decode(wire: &str) -> Result<SessionToken> {
    let json = general_purpose::STANDARD
        .decode(wire)
        .map_err(|_| AuthError::auth_failure("malformed base64 session token"))?;
    serde_json::from_slice(&json).map_err(|_| AuthError::auth_failure("malformed session token JSON"))
}

/// Verify a token: parses, checks `exp`, and verifies the Ed25519
/// signature over the UTF-8 JSON of `payload`. Returns the verified
/// payload, or an error describing why verification failed.
pub fn verify(token: &SessionToken) -> Result<SessionPayload> {
    if token.payload.exp <= token.payload.iat {
        return Err(AuthError::auth_failure("exp must be after iat"));
    }
    if Utc::now().timestamp() > token.payload.exp {
        return Err(AuthError::SessionExpired);
    }

    let pk_bytes = hex::decode(&token.public_key)
        .map_err(|_| AuthError::auth_failure("malformed public key hex"))?;
    let pk_array: [u8; 32] = pk_bytes
        .try_into()
        .map_err(|_| AuthError::auth_failure("public key must be 32 bytes"))?;
    let verifying_key = VerifyingKey::from_bytes(&pk_array)
        .map_err(|_| AuthError::auth_failure("invalid Ed25519 public key"))?;

    let sig_bytes = hex::decode(&token.signature)
        .map_err(|_| AuthError::auth_failure("malformed signature hex"))?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| AuthError::auth_failure("signature must be 64 bytes"))?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_array);

    let payload_json = serde_json::to_vec(&token.payload)
        .map_err(|e| AuthError::invalid_input(format!("failed to re-encode payload: {e}")))?;

    verifying_key
        .verify(&payload_json, &signature)
        .map_err(|_| AuthError::auth_failure("signature verification failed"))?;

    Ok(token.payload.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn test_key() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    #[test]
    fn create_and_verify_round_trip() {
        let sk = test_key();
        let token = create("zk-1", "user@example.com", "g-1", &sk, None).unwrap();
        let verified = verify(&token).unwrap();
        assert_eq!(verified, token.payload);
    }

    #[test]
    fn tampered_payload_fails() {
        let sk = test_key();
        let mut token = create("zk-1", "user@example.com", "g-1", &sk, None).unwrap();
        token.payload.email = "attacker@example.com".to_string();
        assert!(verify(&token).is_err());
    }

    #[test]
    fn tampered_signature_fails() {
        let sk = test_key();
        let mut token = create("zk-1", "user@example.com", "g-1", &sk, None).unwrap();
        let mut sig = hex::decode(&token.signature).unwrap();
        sig[0] ^= 0x01;
        token.signature = hex::encode(sig);
        assert!(verify(&token).is_err());
    }

    #[test]
    fn expired_token_fails() {
        let sk = test_key();
        let now = Utc::now().timestamp();
        let payload = SessionPayload {
            zk_id: "zk-1".to_string(),
            email: "user@example.com".to_string(),
            google_user_id: "g-1".to_string(),
            iat: now - 1_000_000,
            exp: now - 999_999,
        };
        let token = sign_payload(payload, &sk).unwrap();
        assert!(matches!(verify(&token), Err(AuthError::SessionExpired)));
    }

    #[test]
    fn wire_round_trip() {
        let sk = test_key();
        let token = create("zk-1", "user@example.com", "g-1", &sk, None).unwrap();
        let wire = encode(&token).unwrap();
        let decoded = decode(&wire).unwrap();
        assert_eq!(verify(&decoded).unwrap(), token.payload);
    }
}
