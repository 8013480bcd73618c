//! Raw 20-byte account / token addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::element::Element;
use crate::error::{PrivacyError, Result};

pub const ADDRESS_LEN: usize = 20;

/// A raw address (token contract or withdrawal recipient)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; ADDRESS_LEN] =
            bytes
                .try_into()
                .map_err(|_| PrivacyError::InvalidAddressLength {
                    expected: ADDRESS_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Circuit encoding: the raw bytes read as a big-endian unsigned integer
    pub fn to_element(&self) -> Element {
        Element::from_be_bytes_mod_order(&self.0)
    }
}

impl FromStr for Address {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits).map_err(|e| PrivacyError::InvalidEncoding(e.to_string()))?;
        Self::from_slice(&raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
