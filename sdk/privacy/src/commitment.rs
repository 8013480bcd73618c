//! Deposit Commitments
//!
//! ```text
//! Commitment = H(amount, blinding_factor)
//! ```
//!
//! Binds an amount without revealing it. Once published the commitment is a
//! public identifier (a leaf of the venue's append-only tree).

use std::fmt;
use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::hash::{FieldHasher, HasherId};
use crate::nullifier::Nullifier;

/// A deposit commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(pub Element);

impl Commitment {
    pub fn to_element(&self) -> Element {
        self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Client-held secret scalar. Never leaves the client except inside an
/// encrypted backup or an explicit export.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlindingFactor(Element);

impl BlindingFactor {
    /// Generate a fresh blinding factor from 256 bits of RNG output
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(Element::random(rng))
    }

    /// Use a known value (recovery and tests)
    pub fn from_element(e: Element) -> Self {
        Self(e)
    }

    pub fn to_element(&self) -> Element {
        self.0
    }
}

impl fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlindingFactor(<redacted>)")
    }
}

/// Commitment and nullifier derivation over a shared hasher
#[derive(Debug, Clone)]
pub struct CommitmentScheme {
    hasher: Arc<dyn FieldHasher>,
}

impl CommitmentScheme {
    pub fn new(hasher: Arc<dyn FieldHasher>) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &Arc<dyn FieldHasher> {
        &self.hasher
    }

    pub fn hasher_id(&self) -> HasherId {
        self.hasher.id()
    }

    /// C = H(amount, blinding)
    pub fn commit(&self, amount: Element, blinding: &BlindingFactor) -> Commitment {
        Commitment(self.hasher.hash2(amount, blinding.to_element()))
    }

    /// N = H(commitment, secret)
    pub fn nullify(&self, commitment: &Commitment, secret: &BlindingFactor) -> Nullifier {
        crate::nullifier::derive_nullifier(self.hasher.as_ref(), commitment, secret)
    }
}
