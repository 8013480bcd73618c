//! Nullifiers
//!
//! ```text
//! Nullifier = H(commitment, secret)
//! ```
//!
//! The same commitment always yields the same nullifier, so the venue's
//! spent-set rejects a second withdrawal of one deposit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::commitment::{BlindingFactor, Commitment};
use crate::element::Element;
use crate::hash::FieldHasher;

/// A nullifier - unique tag for a spent commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nullifier(pub Element);

impl Nullifier {
    pub fn to_element(&self) -> Element {
        self.0
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Derive the nullifier for a commitment
pub fn derive_nullifier(
    hasher: &dyn FieldHasher,
    commitment: &Commitment,
    secret: &BlindingFactor,
) -> Nullifier {
    Nullifier(hasher.hash2(commitment.to_element(), secret.to_element()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{LinearHasher, PoseidonHasher};

    #[test]
    fn test_nullifier_deterministic() {
        let hasher = PoseidonHasher::new();
        let commitment = Commitment(Element::from(2u64));
        let secret = BlindingFactor::from_element(Element::from(1u64));

        let n1 = derive_nullifier(&hasher, &commitment, &secret);
        let n2 = derive_nullifier(&hasher, &commitment, &secret);

        assert_eq!(n1, n2, "same inputs should produce same nullifier");
    }

    #[test]
    fn test_nullifier_unique_per_commitment() {
        let hasher = PoseidonHasher::new();
        let secret = BlindingFactor::from_element(Element::from(1u64));

        let n1 = derive_nullifier(&hasher, &Commitment(Element::from(1u64)), &secret);
        let n2 = derive_nullifier(&hasher, &Commitment(Element::from(2u64)), &secret);

        assert_ne!(n1, n2, "different commitments should have different nullifiers");
    }

    #[test]
    fn test_nullifier_requires_secret() {
        let hasher = PoseidonHasher::new();
        let commitment = Commitment(Element::from(3u64));

        let n1 = derive_nullifier(
            &hasher,
            &commitment,
            &BlindingFactor::from_element(Element::from(1u64)),
        );
        let n2 = derive_nullifier(
            &hasher,
            &commitment,
            &BlindingFactor::from_element(Element::from(2u64)),
        );

        assert_ne!(n1, n2, "different secrets should produce different nullifiers");
    }

    #[test]
    fn test_fixed_value_under_linear_hash() {
        // commitment of 1_500_000 with blinding 7
        let commitment =
            Commitment(Element::from_decimal_str("2381976568446569244243622252022378980192").unwrap());
        let secret = BlindingFactor::from_element(Element::from(7u64));

        let n = derive_nullifier(&LinearHasher, &commitment, &secret);
        assert_eq!(
            n.to_element().to_decimal_string(),
            "4763953136893138488487244504044756460384"
        );
    }
}
