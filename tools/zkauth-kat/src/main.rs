//! Standalone known-answer checker for zkauth's cryptographic primitives.
//! Deliberately has no dependency on `zkauth-core`: it reimplements just
//! enough of TOTP, AEAD, and field arithmetic to cross-check the literal
//! vectors against an independent code path.

use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha1::Sha1;

fn hotp(secret: &[u8], counter: u64) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let truncated = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);
    format!("{:06}", truncated % 1_000_000)
}

fn check_rfc6238() -> anyhow::Result<()> {
    // RFC 6238 Appendix B, SHA-1 row: secret = "12345678901234567890" (base32
    // JBSWY3DPEHPK3PXP), T = 1111111109, expected TOTP = 081804.
    let secret = base32_decode("JBSWY3DPEHPK3PXP");
    let counter = 1_111_111_109u64 / 30;
    let code = hotp(&secret, counter);
    if code != "081804" {
        anyhow::bail!("RFC 6238 vector mismatch: got {code}, want 081804");
    }
    println!("RFC 6238 TOTP vector: OK ({code})");
    Ok(())
}

fn base32_decode(s: &str) -> Vec<u8> {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
    let mut bits: u64 = 0;
    let mut bit_count = 0u32;
    let mut out = Vec::new();
    for c in s.bytes() {
        let val = ALPHABET.iter().position(|&b| b == c).expect("valid base32 char") as u64;
        bits = (bits << 5) | val;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
        }
    }
    out
}

fn check_aead_tamper() -> anyhow::Result<()> {
    let key = [0x42u8; 32];
    let iv = [0x24u8; 12];
    let plaintext = b"zkauth known-answer plaintext";

    let cipher = Aes256Gcm::new_from_slice(&key)?;
    let nonce = Nonce::from_slice(&iv);
    let mut ciphertext = cipher.encrypt(
        nonce,
        Payload {
            msg: plaintext,
            aad: &[],
        },
    )?;

    let round_tripped = cipher.decrypt(
        nonce,
        Payload {
            msg: &ciphertext,
            aad: &[],
        },
    )?;
    if round_tripped != plaintext {
        anyhow::bail!("AEAD round trip produced the wrong plaintext");
    }

    ciphertext[0] ^= 0x01;
    let tampered = cipher.decrypt(
        nonce,
        Payload {
            msg: &ciphertext,
            aad: &[],
        },
    );
    if tampered.is_ok() {
        anyhow::bail!("AEAD accepted a tampered ciphertext");
    }
    println!("AEAD round trip + tamper detection: OK");
    Ok(())
}

/// Toy 17-element field (`p = 17`) Lagrange reconstruction: small enough to
/// hand-verify, independent of the production BN254 modulus.
fn check_lagrange_toy_field() -> anyhow::Result<()> {
    let p = BigUint::from(17u32);
    let secret = BigUint::from(9u32);
    let coeff1 = BigUint::from(5u32); // f(x) = 9 + 5x mod 17, threshold 2

    let eval = |x: u32| -> BigUint { (&secret + &coeff1 * BigUint::from(x)) % &p };
    let points: Vec<(BigUint, BigUint)> = (1..=3u32).map(|x| (BigUint::from(x), eval(x))).collect();

    // Reconstruct from points[0] and points[2] (x=1, x=3).
    let (x0, y0) = &points[0];
    let (x2, y2) = &points[2];
    let chosen = [(x0.clone(), y0.clone()), (x2.clone(), y2.clone())];

    let mut secret_reconstructed = BigUint::zero();
    for (j, (xj, yj)) in chosen.iter().enumerate() {
        let mut numerator = BigUint::one();
        let mut denominator = BigUint::one();
        for (k, (xk, _)) in chosen.iter().enumerate() {
            if j == k {
                continue;
            }
            // Working mod p with all-nonnegative residues, so `-xk mod p` is
            // `p - (xk mod p)` to avoid a signed subtraction.
            numerator = (&numerator * (&p - xk % &p)) % &p;
            let diff = ((xj + &p) - xk) % &p;
            denominator = (&denominator * diff) % &p;
        }
        let inv_denominator = mod_inverse(&denominator, &p);
        let term = (yj * numerator * inv_denominator) % &p;
        secret_reconstructed = (secret_reconstructed + term) % &p;
    }

    if secret_reconstructed != secret {
        anyhow::bail!("Lagrange reconstruction mismatch: got {secret_reconstructed}, want {secret}");
    }
    println!("Toy-field Lagrange reconstruction: OK (secret={secret_reconstructed})");
    Ok(())
}

fn mod_inverse(a: &BigUint, p: &BigUint) -> BigUint {
    // Fermat's little theorem: a^(p-2) mod p, valid since p is prime here.
    a.modpow(&(p - BigUint::from(2u32)), p)
}

fn main() -> anyhow::Result<()> {
    check_rfc6238()?;
    check_aead_tamper()?;
    check_lagrange_toy_field()?;
    println!("KAT OK");
    Ok(())
}
