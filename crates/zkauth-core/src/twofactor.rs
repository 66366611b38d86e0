//! Second-factor state: TOTP, backup codes, the encrypted envelope they're
//! stored in, and the signed email-OTP fast path (spec §4.9).

use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{self, EncryptionResult};
use crate::error::{AuthError, Result};
use crate::kdf::sha256;

const TOTP_DIGITS: u32 = 6;
const TOTP_PERIOD_SECS: u64 = 30;
const TOTP_WINDOW_STEPS: i64 = 1;
const TOTP_SECRET_BYTES: usize = 20;
const BACKUP_CODE_COUNT: usize = 8;
const BACKUP_CODE_LEN: usize = 8;
const BACKUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The second-factor state record (spec §3 `TwoFAState`). Canonical JSON
/// form is the cleartext sealed by `encrypt_with_master_key`.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TwoFaState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp_secret: Option<String>,
    pub totp_enabled: bool,
    pub totp_backup_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp_enabled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_otp_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_otp_enabled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[zeroize(skip)]
    pub security_email: Option<String>,
}

impl Default for TwoFaState {
    fn default() -> Self {
        TwoFaState {
            totp_secret: None,
            totp_enabled: false,
            totp_backup_codes: Vec::new(),
            totp_enabled_at: None,
            email_otp_enabled: None,
            email_otp_enabled_at: None,
            security_email: None,
        }
    }
}

/// Generate a fresh 20-byte TOTP secret, base32-encoded (no padding).
pub fn generate_totp_secret() -> String {
    let mut raw = [0u8; TOTP_SECRET_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &raw)
}

/// `otpauth://totp/<issuer>:<account>?secret=...&issuer=<issuer>&algorithm=SHA1&digits=6&period=30`.
pub fn generate_uri(secret: &str, account: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}&algorithm=SHA1&digits=6&period=30"
    )
}

fn hotp(secret_bytes: &[u8], counter: u64) -> Result<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret_bytes)
        .map_err(|_| AuthError::invalid_input("TOTP secret key is invalid"))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let truncated = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);
    let code = truncated % 10u32.pow(TOTP_DIGITS);
    Ok(format!("{code:0width$}", width = TOTP_DIGITS as usize))
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret)
        .ok_or_else(|| AuthError::invalid_input("TOTP secret is not valid base32"))
}

/// Generate the TOTP code for `secret` (base32) at Unix time `at_time`.
pub fn generate_at(secret: &str, at_time: u64) -> Result<String> {
    let secret_bytes = decode_secret(secret)?;
    let counter = at_time / TOTP_PERIOD_SECS;
    hotp(&secret_bytes, counter)
}

fn normalize_code(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Verify `code` against `secret` at `at_time`, accepting a window of
/// `+-1` step (`<= 30s` of nominal clock skew). Rejects malformed input
/// (anything but exactly six decimal digits) without comparing.
pub fn verify_totp_at(code: &str, secret: &str, at_time: u64) -> bool {
    let normalized = normalize_code(code);
    if normalized.len() != TOTP_DIGITS as usize || !normalized.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let secret_bytes = match decode_secret(secret) {
        Ok(b) => b,
        Err(_) => return false,
    };
    let current_step = at_time / TOTP_PERIOD_SECS;
    for delta in -TOTP_WINDOW_STEPS..=TOTP_WINDOW_STEPS {
        let step = current_step as i64 + delta;
        if step < 0 {
            continue;
        }
        if let Ok(expected) = hotp(&secret_bytes, step as u64) {
            if expected.as_bytes().ct_eq(normalized.as_bytes()).into() {
                return true;
            }
        }
    }
    false
}

pub fn verify_totp_now(code: &str, secret: &str) -> bool {
    let now = chrono::Utc::now().timestamp() as u64;
    verify_totp_at(code, secret, now)
}

/// Generate the 8 backup codes shown to the user (formatted `XXXX-XXXX`)
/// and the SHA-256 hashes to persist.
pub fn generate_backup_codes() -> (Vec<String>, Vec<String>) {
    let mut rng = rand::rngs::OsRng;
    let mut displayed = Vec::with_capacity(BACKUP_CODE_COUNT);
    let mut hashes = Vec::with_capacity(BACKUP_CODE_COUNT);
    for _ in 0..BACKUP_CODE_COUNT {
        let mut raw = String::with_capacity(BACKUP_CODE_LEN);
        for _ in 0..BACKUP_CODE_LEN {
            let idx = (rng.next_u32() as usize) % BACKUP_CODE_ALPHABET.len();
            raw.push(BACKUP_CODE_ALPHABET[idx] as char);
        }
        hashes.push(hex::encode(sha256(raw.as_bytes())));
        let (head, tail) = raw.split_at(4);
        displayed.push(format!("{head}-{tail}"));
    }
    (displayed, hashes)
}

fn normalize_backup_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// `true` iff the normalized hash of `code` is in `hashes`.
pub fn verify_backup(code: &str, hashes: &[String]) -> bool {
    let normalized = normalize_backup_code(code);
    let candidate = hex::encode(sha256(normalized.as_bytes()));
    hashes.iter().any(|h| {
        let eq: bool = h.as_bytes().ct_eq(candidate.as_bytes()).into();
        eq
    })
}

/// AEAD-GCM seal of `data` under the first 32 bytes of `unhex(master_key_hex)`,
/// or, if that does not decode to exactly 32 bytes, under
/// `sha256(unhex(master_key_hex))` (spec §4.9).
pub fn encrypt_with_master_key(data: &[u8], master_key_hex: &str) -> Result<EncryptionResult> {
    let key = envelope_key(master_key_hex)?;
    aead::encrypt(&key, data)
}

pub fn decrypt_with_master_key(envelope: &EncryptionResult, master_key_hex: &str) -> Result<Vec<u8>> {
    let key = envelope_key(master_key_hex)?;
    aead::decrypt(&key, envelope)
}

fn envelope_key(master_key_hex: &str) -> Result<[u8; 32]> {
    let raw = hex::decode(master_key_hex).map_err(|_| AuthError::invalid_input("master key is not valid hex"))?;
    if raw.len() == 32 {
        let mut key = [0u8; 32];
        key.copy_from_slice(&raw);
        Ok(key)
    } else {
        Ok(sha256(&raw))
    }
}

/// A signed email-OTP challenge the client can verify locally without a
/// round trip (spec §4.9). The server issues `signature` and `expires_at`;
/// the client recomputes both hashes and compares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedOtpChallenge {
    pub signature: String,
    pub expires_at: i64,
}

/// Server-side: issue a signed challenge for `code` bound to
/// `(email, user_id, master_key_hash)`.
pub fn issue_signed_otp(
    email: &str,
    user_id: &str,
    code: &str,
    master_key_hash: &str,
    expires_at: i64,
) -> SignedOtpChallenge {
    let inner = sha256(format!("{email}:{user_id}:{}", normalize_code(code)).as_bytes());
    let outer = sha256(format!("{}:{master_key_hash}", hex::encode(inner)).as_bytes());
    SignedOtpChallenge {
        signature: hex::encode(outer),
        expires_at,
    }
}

/// Client-side: does `challenge` match a locally entered `code`, and has it
/// not expired? A mismatch or expiry means the caller must fall back to a
/// server verify endpoint.
pub fn check_signed_otp(
    challenge: &SignedOtpChallenge,
    email: &str,
    user_id: &str,
    code: &str,
    master_key_hash: &str,
    now: i64,
) -> bool {
    if now > challenge.expires_at {
        return false;
    }
    let inner = sha256(format!("{email}:{user_id}:{}", normalize_code(code)).as_bytes());
    let outer = sha256(format!("{}:{master_key_hash}", hex::encode(inner)).as_bytes());
    let expected = hex::encode(outer);
    expected.as_bytes().ct_eq(challenge.signature.as_bytes()).into()
}

/// A record read from the external second-factor commit log (spec §4.9,
/// §11): `{ type, lookupKey, encryptedData, ... }`. Only `lookupKey` and
/// `encryptedData` are interpreted here; the memo transport, block time, and
/// signature fields are opaque to this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFaPointer {
    #[serde(rename = "type")]
    pub kind: String,
    pub lookup_key: String,
    pub encrypted_data: String,
    #[serde(default)]
    pub block_time: Option<i64>,
}

/// Given the pointers returned for a lookup key, decrypt and return the
/// state from the youngest record whose decrypted content parses as a
/// `TwoFaState` (duck-typed in the original protocol as "has a boolean
/// `totpEnabled`"; here that's just "deserializes as `TwoFaState`"). A
/// missing pointer is `Ok(None)`, not an error.
pub fn fetch_state(
    pointers: &[TwoFaPointer],
    lookup_key: &str,
    master_key_hex: &str,
) -> Result<Option<TwoFaState>> {
    let mut candidates: Vec<&TwoFaPointer> = pointers
        .iter()
        .filter(|p| p.kind == "2fa_secret" && p.lookup_key == lookup_key)
        .collect();
    candidates.sort_by_key(|p| p.block_time.unwrap_or(i64::MIN));

    for pointer in candidates.into_iter().rev() {
        if let Ok(bytes) = hex_or_passthrough(&pointer.encrypted_data) {
            if let Ok(state) = parse_state_bytes(&bytes, master_key_hex) {
                return Ok(Some(state));
            }
        }
    }
    Ok(None)
}

fn hex_or_passthrough(data: &str) -> Result<Vec<u8>> {
    Ok(data.as_bytes().to_vec())
}

fn parse_state_bytes(bytes: &[u8], master_key_hex: &str) -> Result<TwoFaState> {
    // The pointer's `encryptedData` is, by convention, either a cleartext
    // TwoFaState JSON string or a ciphertext blob carrying an
    // `EncryptionResult`; try the cheap case first.
    if let Ok(state) = serde_json::from_slice::<TwoFaState>(bytes) {
        return Ok(state);
    }
    let envelope: EncryptionResult = serde_json::from_slice(bytes)
        .map_err(|_| AuthError::auth_failure("2FA pointer payload is neither state JSON nor an envelope"))?;
    let plaintext = decrypt_with_master_key(&envelope, master_key_hex)?;
    serde_json::from_slice(&plaintext).map_err(|_| AuthError::auth_failure("decrypted 2FA state is not valid JSON"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc6238_test_vector() {
        // RFC 6238 Appendix B, SHA-1 case.
        let secret = "JBSWY3DPEHPK3PXP"; // base32("12345678901234567890")
        let code = generate_at(secret, 1_111_111_109).unwrap();
        assert_eq!(code, "081804");
    }

    #[test]
    fn verify_accepts_current_code() {
        let secret = generate_totp_secret();
        let now = 1_700_000_000u64;
        let code = generate_at(&secret, now).unwrap();
        assert!(verify_totp_at(&code, &secret, now));
    }

    #[test]
    fn verify_rejects_beyond_window() {
        let secret = generate_totp_secret();
        let now = 1_700_000_000u64;
        let code = generate_at(&secret, now).unwrap();
        assert!(!verify_totp_at(&code, &secret, now - 60));
    }

    #[test]
    fn verify_accepts_one_step_back() {
        let secret = generate_totp_secret();
        let now = 1_700_000_000u64;
        let code = generate_at(&secret, now).unwrap();
        assert!(verify_totp_at(&code, &secret, now - 30));
    }

    #[test]
    fn verify_rejects_malformed_code() {
        let secret = generate_totp_secret();
        assert!(!verify_totp_at("12a456", &secret, 1_700_000_000));
        assert!(!verify_totp_at("12345", &secret, 1_700_000_000));
        assert!(!verify_totp_at(" 1 2 3 4 5 6 ", &secret, 1_700_000_000));
    }

    #[test]
    fn backup_codes_round_trip() {
        let (displayed, hashes) = generate_backup_codes();
        assert_eq!(displayed.len(), 8);
        for code in &displayed {
            assert!(verify_backup(code, &hashes));
        }
        assert!(!verify_backup("ZZZZ-ZZZZ", &hashes));
    }

    #[test]
    fn backup_code_normalization_is_forgiving() {
        let (displayed, hashes) = generate_backup_codes();
        let messy = displayed[0].to_lowercase().replace('-', " ");
        assert!(verify_backup(&messy, &hashes));
    }

    #[test]
    fn envelope_round_trip_with_full_length_key() {
        let mk_hex = "11".repeat(32);
        let env = encrypt_with_master_key(b"totp state", &mk_hex).unwrap();
        let out = decrypt_with_master_key(&env, &mk_hex).unwrap();
        assert_eq!(out, b"totp state");
    }

    #[test]
    fn envelope_round_trip_with_short_key_substitutes_hash() {
        let mk_hex = "aabbcc";
        let env = encrypt_with_master_key(b"totp state", mk_hex).unwrap();
        let out = decrypt_with_master_key(&env, mk_hex).unwrap();
        assert_eq!(out, b"totp state");
    }

    #[test]
    fn signed_otp_accepts_matching_code_before_expiry() {
        let challenge = issue_signed_otp("user@example.com", "uid-1", "123456", "deadbeef", 1_000_000);
        assert!(check_signed_otp(
            &challenge,
            "user@example.com",
            "uid-1",
            "123456",
            "deadbeef",
            999_999
        ));
    }

    #[test]
    fn signed_otp_rejects_after_expiry() {
        let challenge = issue_signed_otp("user@example.com", "uid-1", "123456", "deadbeef", 1_000_000);
        assert!(!check_signed_otp(
            &challenge,
            "user@example.com",
            "uid-1",
            "123456",
            "deadbeef",
            1_000_001
        ));
    }

    #[test]
    fn signed_otp_rejects_wrong_code() {
        let challenge = issue_signed_otp("user@example.com", "uid-1", "123456", "deadbeef", 1_000_000);
        assert!(!check_signed_otp(
            &challenge,
            "user@example.com",
            "uid-1",
            "000000",
            "deadbeef",
            999_999
        ));
    }

    #[test]
    fn fetch_state_returns_none_when_missing() {
        let result = fetch_state(&[], "lookup-1", &"11".repeat(32)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn fetch_state_picks_youngest_record() {
        let mk_hex = "11".repeat(32);
        let old_state = TwoFaState {
            totp_enabled: false,
            ..Default::default()
        };
        let new_state = TwoFaState {
            totp_enabled: true,
            ..Default::default()
        };
        let pointers = vec![
            TwoFaPointer {
                kind: "2fa_secret".to_string(),
                lookup_key: "lookup-1".to_string(),
                encrypted_data: serde_json::to_string(&old_state).unwrap(),
                block_time: Some(1),
            },
            TwoFaPointer {
                kind: "2fa_secret".to_string(),
                lookup_key: "lookup-1".to_string(),
                encrypted_data: serde_json::to_string(&new_state).unwrap(),
                block_time: Some(2),
            },
        ];
        let fetched = fetch_state(&pointers, "lookup-1", &mk_hex).unwrap().unwrap();
        assert!(fetched.totp_enabled);
    }
}
