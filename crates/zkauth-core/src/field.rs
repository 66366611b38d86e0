//! Arithmetic modulo the BN254 scalar field prime.
//!
//! The modulus is about 254 bits, so a uniformly random 256-bit master key is
//! not always below it; `crate::masterkey` rejection-samples generated keys
//! until one lands below the modulus, so splitting is always invertible
//! (open question resolved in DESIGN.md: option (a), reject rather than
//! widen the field).

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use rand::RngCore;

use crate::error::{AuthError, Result};

/// `p = 21888242871839275222246405745257275088548364400416034343698204186575808495617`
const P_DECIMAL: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

static P: Lazy<BigUint> = Lazy::new(|| {
    P_DECIMAL
        .parse::<BigUint>()
        .expect("BN254 scalar field modulus is a valid decimal literal")
});

/// An element of the scalar field, always reduced to `[0, p)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldElement(BigUint);

impl FieldElement {
    pub fn modulus() -> BigUint {
        P.clone()
    }

    pub fn zero() -> Self {
        FieldElement(BigUint::zero())
    }

    /// Reduce an arbitrary big-endian byte string modulo `p`.
    pub fn from_bytes_be_mod(bytes: &[u8]) -> Self {
        let n = BigUint::from_bytes_be(bytes);
        FieldElement(n % &*P)
    }

    /// Parse a base-10 string (as used on the wire for `ShareData`).
    pub fn from_decimal(s: &str) -> Result<Self> {
        let n = s
            .parse::<BigUint>()
            .map_err(|_| AuthError::invalid_input(format!("not a decimal field element: {s}")))?;
        if n >= *P {
            return Err(AuthError::invalid_input("field element out of range"));
        }
        Ok(FieldElement(n))
    }

    pub fn from_u64(v: u64) -> Self {
        FieldElement(BigUint::from(v) % &*P)
    }

    pub fn to_decimal(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// 32-byte big-endian encoding, zero-padded.
    pub fn to_bytes_be_32(&self) -> [u8; 32] {
        let raw = self.0.to_bytes_be();
        let mut out = [0u8; 32];
        let start = 32 - raw.len();
        out[start..].copy_from_slice(&raw);
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: &Self) -> Self {
        FieldElement((&self.0 + &other.0) % &*P)
    }

    pub fn neg(&self) -> Self {
        if self.0.is_zero() {
            FieldElement::zero()
        } else {
            FieldElement(&*P - &self.0)
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Self) -> Self {
        FieldElement((&self.0 * &other.0) % &*P)
    }

    /// Modular inverse via the extended Euclidean algorithm.
    /// Fails with `InvalidInput` when `self` is zero (no inverse exists).
    pub fn inverse(&self) -> Result<Self> {
        if self.0.is_zero() {
            return Err(AuthError::invalid_input("cannot invert zero field element"));
        }
        let (mut old_r, mut r) = (BigInt::from_biguint(Sign::Plus, P.clone()), BigInt::from_biguint(Sign::Plus, self.0.clone()));
        let (mut old_s, mut s) = (BigInt::zero(), BigInt::one());

        while !r.is_zero() {
            let quotient = &old_r / &r;
            let new_r = &old_r - &quotient * &r;
            old_r = r;
            r = new_r;
            let new_s = &old_s - &quotient * &s;
            old_s = s;
            s = new_s;
        }
        // old_r is now gcd(p, self) == 1 since p is prime and self != 0 mod p.
        let p_signed = BigInt::from_biguint(Sign::Plus, P.clone());
        let mut inv = old_s % &p_signed;
        if inv.sign() == Sign::Minus {
            inv += &p_signed;
        }
        let (_, inv_bytes) = inv.to_bytes_be();
        Ok(FieldElement(BigUint::from_bytes_be(&inv_bytes)))
    }

    /// Uniform sampling modulo `p`: draw 32 random bytes from a cryptographic
    /// source and reduce. Bias is bounded by `2^256 mod p / 2^256 <= 2^-254`,
    /// negligible for any practical use.
    pub fn random(rng: &mut (impl RngCore + ?Sized)) -> Self {
        let mut buf = [0u8; 32];
        rng.fill_bytes(&mut buf);
        FieldElement::from_bytes_be_mod(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_round_trip() {
        let a = FieldElement::from_u64(12345);
        let inv = a.inverse().unwrap();
        let one = a.mul(&inv);
        assert_eq!(one.to_decimal(), "1");
    }

    #[test]
    fn inverse_of_zero_fails() {
        let z = FieldElement::zero();
        assert!(z.inverse().is_err());
    }

    #[test]
    fn add_neg_sub_consistent() {
        let a = FieldElement::from_u64(7);
        let b = FieldElement::from_u64(3);
        assert_eq!(a.sub(&b).to_decimal(), "4");
        assert_eq!(a.add(&b.neg()).to_decimal(), "4");
    }

    #[test]
    fn decimal_round_trip() {
        let a = FieldElement::from_u64(999999);
        let parsed = FieldElement::from_decimal(&a.to_decimal()).unwrap();
        assert_eq!(a, parsed);
    }

    #[test]
    fn random_is_in_range() {
        let mut rng = rand::rngs::OsRng;
        for _ in 0..32 {
            let f = FieldElement::random(&mut rng);
            assert!(f.0 < FieldElement::modulus());
        }
    }

    #[test]
    fn decimal_rejects_out_of_range() {
        let too_big = P_DECIMAL.to_string();
        assert!(FieldElement::from_decimal(&too_big).is_err());
    }
}
