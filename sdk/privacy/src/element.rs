//! Field Elements
//!
//! Every value that crosses into a circuit is an element of the BN254 scalar
//! field. `Element` is the single representation used for amounts, token
//! identifiers, commitments, nullifiers and Merkle nodes.
//!
//! ```text
//! text form:    0x + 64 hex chars (32 bytes, big-endian)
//! circuit form: decimal string (snarkjs witness JSON)
//! ```

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, Zero};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PrivacyError, Result};

/// An element of the BN254 scalar field
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(Fr);

impl Element {
    /// Wrap a raw field element
    pub fn new(f: Fr) -> Self {
        Self(f)
    }

    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The underlying field element
    pub fn to_fr(&self) -> Fr {
        self.0
    }

    /// Parse 32 big-endian bytes, rejecting values at or above the modulus
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let f = Fr::from_be_bytes_mod_order(bytes);
        let element = Self(f);
        if &element.to_be_bytes() != bytes {
            return Err(PrivacyError::NonCanonicalElement(format!(
                "0x{}",
                hex::encode(bytes)
            )));
        }
        Ok(element)
    }

    /// Interpret arbitrary big-endian bytes, reducing modulo the field order
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    /// 32-byte big-endian encoding
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let bytes = self.0.into_bigint().to_bytes_be();
        let mut arr = [0u8; 32];
        arr[32 - bytes.len()..].copy_from_slice(&bytes);
        arr
    }

    /// Parse `0x`-prefixed (or bare) hex of at most 32 bytes
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 64 {
            return Err(PrivacyError::InvalidEncoding(format!("bad hex length: {s}")));
        }
        let padded = format!("{digits:0>64}");
        let raw = hex::decode(&padded).map_err(|e| PrivacyError::InvalidEncoding(e.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&raw);
        Self::from_be_bytes(&arr)
    }

    /// Parse a decimal integer, rejecting values outside the field
    pub fn from_decimal_str(s: &str) -> Result<Self> {
        let value = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| PrivacyError::InvalidEncoding(format!("not a decimal integer: {s}")))?;
        let bytes = value.to_bytes_be();
        if bytes.len() > 32 {
            return Err(PrivacyError::NonCanonicalElement(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr[32 - bytes.len()..].copy_from_slice(&bytes);
        Self::from_be_bytes(&arr)
    }

    /// Decimal rendering used in circuit witness files
    pub fn to_decimal_string(&self) -> String {
        BigUint::from_bytes_be(&self.to_be_bytes()).to_string()
    }

    /// Sample a uniformly random element from 256 bits of RNG output
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self::from_be_bytes_mod_order(&bytes)
    }
}

impl From<Fr> for Element {
    fn from(f: Fr) -> Self {
        Self(f)
    }
}

impl From<u64> for Element {
    fn from(value: u64) -> Self {
        Self(Fr::from(value))
    }
}

impl From<u128> for Element {
    fn from(value: u128) -> Self {
        Self(Fr::from(value))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({self})")
    }
}

impl FromStr for Element {
    type Err = PrivacyError;

    /// Accepts `0x` hex or a plain decimal integer
    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("0x") {
            Self::from_hex(s)
        } else {
            Self::from_decimal_str(s)
        }
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
