//! Two-to-one field hashing
//!
//! Commitments, nullifiers and Merkle nodes are all built from one 2-to-1
//! hash. Whatever hash is used here has to be the one the circuits constrain,
//! so every hasher carries an identifier that proof backends declare too.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use crate::element::Element;

/// Identifier a hasher and a proof backend must agree on
pub type HasherId = &'static str;

/// A 2-to-1 hash over field elements
pub trait FieldHasher: Send + Sync + fmt::Debug {
    fn id(&self) -> HasherId;

    fn hash2(&self, left: Element, right: Element) -> Element;
}

/// Poseidon sponge over BN254 Fr
///
/// Rate: 2, Capacity: 1
/// Rounds: 8 full, 57 partial, alpha 5
#[derive(Clone)]
pub struct PoseidonHasher {
    config: Arc<PoseidonConfig<Fr>>,
}

impl PoseidonHasher {
    pub const ID: HasherId = "poseidon-bn254-r2";

    pub fn new() -> Self {
        Self {
            config: Arc::new(poseidon_config()),
        }
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PoseidonHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseidonHasher").finish_non_exhaustive()
    }
}

impl FieldHasher for PoseidonHasher {
    fn id(&self) -> HasherId {
        Self::ID
    }

    fn hash2(&self, left: Element, right: Element) -> Element {
        let mut sponge = PoseidonSponge::new(&self.config);
        sponge.absorb(&left.to_fr());
        sponge.absorb(&right.to_fr());
        let result: Fr = sponge.squeeze_field_elements(1)[0];
        Element::new(result)
    }
}

fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits: u64 = 254;
    let rate: usize = 2;
    let capacity: usize = 1;
    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;
    let alpha: u64 = 5;
    let skip_matrices: u64 = 0;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        rate,
        full_rounds,
        partial_rounds,
        skip_matrices,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
}

/// `H(x, y) = x + y * 2^128`
///
/// Not collision resistant. Exists so tests can assert exact commitment and
/// nullifier values without a real hash in the way.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearHasher;

impl LinearHasher {
    pub const ID: HasherId = "linear-2^128";

    fn shift() -> Fr {
        // 2^64 * 2^64
        let two_64 = Fr::from(u64::MAX) + Fr::from(1u64);
        two_64 * two_64
    }
}

impl FieldHasher for LinearHasher {
    fn id(&self) -> HasherId {
        Self::ID
    }

    fn hash2(&self, left: Element, right: Element) -> Element {
        let mut acc = Fr::zero();
        acc += left.to_fr();
        acc += right.to_fr() * Self::shift();
        Element::new(acc)
    }
}

/// Config-facing hasher selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    #[default]
    Poseidon,
    Linear,
}

impl HasherKind {
    pub fn build(self) -> Arc<dyn FieldHasher> {
        match self {
            HasherKind::Poseidon => Arc::new(PoseidonHasher::new()),
            HasherKind::Linear => Arc::new(LinearHasher),
        }
    }
}

impl FromStr for HasherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poseidon" => Ok(HasherKind::Poseidon),
            "linear" => Ok(HasherKind::Linear),
            other => Err(format!("unknown hasher: {other}")),
        }
    }
}
