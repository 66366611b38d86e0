//! Threshold (T-of-N) secret sharing over the scalar field (spec §4.5).

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{self, EncryptionResult};
use crate::error::{AuthError, Result};
use crate::field::FieldElement;
use crate::masterkey::MasterKey;

/// A single point `(x, f(x))` of the secret polynomial, transport-encoded as
/// decimal strings. `x` is always in `1..=255`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ShareData {
    #[zeroize(skip)]
    pub x: u8,
    pub y: String,
}

impl ShareData {
    fn y_element(&self) -> Result<FieldElement> {
        FieldElement::from_decimal(&self.y)
    }
}

/// The result of a single `split` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitResult {
    pub shares: Vec<ShareData>,
    pub threshold: u8,
    pub total_shares: u8,
}

/// `{ shareIndex, encryptedData, iv, tag, chain, receipt? }` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedShare {
    pub share_index: u8,
    pub encrypted_data: String,
    pub iv: String,
    pub tag: String,
    pub chain: String,
    pub receipt: Option<String>,
}

/// Split `mk` into `total_shares` shares of which any `threshold` reconstruct
/// the original. Validates `2 <= threshold <= total_shares <= 255`.
pub fn split(mk: &MasterKey, threshold: u8, total_shares: u8) -> Result<SplitResult> {
    if threshold < 2 || threshold > total_shares {
        return Err(AuthError::invalid_input(
            "threshold must satisfy 2 <= threshold <= total_shares",
        ));
    }
    // total_shares <= 255 holds unconditionally since it is a u8.

    let secret = FieldElement::from_bytes_be_mod(mk.raw());

    let mut rng = rand::rngs::OsRng;
    let mut coefficients = Vec::with_capacity((threshold - 1) as usize);
    for _ in 1..threshold {
        coefficients.push(FieldElement::random(&mut rng));
    }

    let mut shares = Vec::with_capacity(total_shares as usize);
    for i in 1..=total_shares {
        let y = evaluate_polynomial(&secret, &coefficients, i);
        shares.push(ShareData {
            x: i,
            y: y.to_decimal(),
        });
    }

    Ok(SplitResult {
        shares,
        threshold,
        total_shares,
    })
}

fn evaluate_polynomial(secret: &FieldElement, coefficients: &[FieldElement], x: u8) -> FieldElement {
    let mut result = secret.clone();
    let x_elem = FieldElement::from_u64(x as u64);
    let mut power = x_elem.clone();
    for coeff in coefficients {
        result = result.add(&coeff.mul(&power));
        power = power.mul(&x_elem);
    }
    result
}

/// Reconstruct the 64-char zero-padded hex master key from at least
/// `threshold` (but really: any number, as long as it is `>= 2` and no `x`
/// repeats) distinct shares via Lagrange interpolation at `x = 0`.
///
/// Duplicate `x` values fail with `InvalidInput`.
pub fn combine(shares: &[ShareData]) -> Result<String> {
    if shares.len() < 2 {
        return Err(AuthError::invalid_input("need at least 2 shares to combine"));
    }
    let mut seen = std::collections::HashSet::new();
    for s in shares {
        if !seen.insert(s.x) {
            return Err(AuthError::invalid_input(format!("duplicate share index {}", s.x)));
        }
        if s.x == 0 {
            return Err(AuthError::invalid_input("share index must be in 1..=255"));
        }
    }

    let points: Vec<(FieldElement, FieldElement)> = shares
        .iter()
        .map(|s| Ok((FieldElement::from_u64(s.x as u64), s.y_element()?)))
        .collect::<Result<_>>()?;

    let mut secret = FieldElement::zero();
    for (j, (xj, yj)) in points.iter().enumerate() {
        let mut numerator = FieldElement::from_u64(1);
        let mut denominator = FieldElement::from_u64(1);
        for (k, (xk, _)) in points.iter().enumerate() {
            if j == k {
                continue;
            }
            numerator = numerator.mul(&xk.neg());
            denominator = denominator.mul(&xj.sub(xk));
        }
        let inv_denominator = denominator.inverse()?;
        let lagrange_coeff = numerator.mul(&inv_denominator);
        secret = secret.add(&yj.mul(&lagrange_coeff));
    }

    let bytes = secret.to_bytes_be_32();
    Ok(hex::encode(bytes))
}

/// Maps share index `1 -> "zcash"`, `2 -> "starknet"`, `3 -> "solana"`,
/// cycling through the enabled-backend ordering if there are more than 3.
///
/// `AuthCore::register` does not use this helper; it pairs share *i*
/// directly with the *i*-th enabled backend (spec §4.8). This function
/// exists for callers building their own assignment and disagrees with
/// `AuthCore`'s convention for `total_shares > enabled.len()`, exactly the
/// ambiguity spec §9 flags; it is kept as a documented, independent
/// convention rather than silently reconciled.
pub fn chain_for_index(index: u8, enabled_backends: &[&str]) -> Result<String> {
    if enabled_backends.is_empty() {
        return Err(AuthError::invalid_input("no enabled backends"));
    }
    if index == 0 {
        return Err(AuthError::invalid_input("share index must be >= 1"));
    }
    let pos = (index - 1) as usize % enabled_backends.len();
    Ok(enabled_backends[pos].to_string())
}

/// Encrypt a `ShareData` under `sha256(unhex(pk))` into an `EncryptedShare`
/// envelope tagged with `chain` (spec §4.5).
pub fn encrypt_share(share: &ShareData, idx: u8, chain: &str, pk_hex: &str) -> Result<EncryptedShare> {
    if share.x != idx {
        return Err(AuthError::invalid_input("share x must equal the assigned index"));
    }
    let plaintext = serde_json::to_vec(share)
        .map_err(|e| AuthError::invalid_input(format!("failed to encode share: {e}")))?;
    let EncryptionResult { ciphertext, iv, tag } = MasterKey::encrypt_with_pk(pk_hex, &plaintext)?;
    Ok(EncryptedShare {
        share_index: idx,
        encrypted_data: ciphertext,
        iv,
        tag,
        chain: chain.to_string(),
        receipt: None,
    })
}

/// Inverse of `encrypt_share`. The embedded JSON's `x` must equal
/// `envelope.share_index`.
pub fn decrypt_share(envelope: &EncryptedShare, pk_hex: &str) -> Result<ShareData> {
    let result = EncryptionResult {
        ciphertext: envelope.encrypted_data.clone(),
        iv: envelope.iv.clone(),
        tag: envelope.tag.clone(),
    };
    let plaintext = MasterKey::decrypt_with_pk(pk_hex, &result)?;
    let share: ShareData = serde_json::from_slice(&plaintext)
        .map_err(|_| AuthError::auth_failure("decrypted share is not valid JSON"))?;
    if share.x != envelope.share_index {
        return Err(AuthError::auth_failure("decrypted share index mismatch"));
    }
    Ok(share)
}
