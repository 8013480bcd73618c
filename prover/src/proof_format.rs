//! On-chain Proof Layout
//!
//! Pairing-based verifiers on the EVM take a Groth16 proof as eight 256-bit
//! words. G2 coordinates live in Fq2 and the precompile expects the
//! imaginary part first, so B is written `[x1, x0]`, `[y1, y0]`.
//!
//! ```text
//! word: 0    1    2     3     4     5     6    7
//!       A.x  A.y  B.x1  B.x0  B.y1  B.y0  C.x  C.y
//! ```

use std::fmt;

use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::Proof;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shade_privacy::{Commitment, Element, Nullifier, ProofKind};

/// A 256-bit big-endian word
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Word(pub [u8; 32]);

impl Word {
    pub const ZERO: Word = Word([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn from_fq(f: Fq) -> Self {
        let bytes = f.into_bigint().to_bytes_be();
        let mut arr = [0u8; 32];
        arr[32 - bytes.len()..].copy_from_slice(&bytes);
        Self(arr)
    }

    /// Canonical base-field element, or `None` if the word is out of range
    pub fn to_fq(&self) -> Option<Fq> {
        let f = Fq::from_be_bytes_mod_order(&self.0);
        (Self::from_fq(f) == *self).then_some(f)
    }

    pub fn from_element(e: &Element) -> Self {
        Self(e.to_be_bytes())
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0x{})", hex::encode(self.0))
    }
}

impl Serialize for Word {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = raw
            .try_into()
            .map_err(|_| serde::de::Error::custom("word must be 32 bytes"))?;
        Ok(Word(arr))
    }
}

/// Groth16 proof in pairing-verifier order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidityProof {
    pub a: [Word; 2],
    pub b: [[Word; 2]; 2],
    pub c: [Word; 2],
}

impl SolidityProof {
    /// Reorder an arkworks proof, swapping the Fq2 limbs of B
    pub fn from_ark(proof: &Proof<Bn254>) -> Self {
        let (bx, by) = if proof.b.is_zero() {
            ([Word::ZERO; 2], [Word::ZERO; 2])
        } else {
            (
                [Word::from_fq(proof.b.x.c1), Word::from_fq(proof.b.x.c0)],
                [Word::from_fq(proof.b.y.c1), Word::from_fq(proof.b.y.c0)],
            )
        };

        Self {
            a: g1_words(&proof.a),
            b: [bx, by],
            c: g1_words(&proof.c),
        }
    }

    /// Rebuild the arkworks proof; `None` if any point is off-curve,
    /// outside the prime-order subgroup, or has a non-canonical coordinate
    pub fn to_ark(&self) -> Option<Proof<Bn254>> {
        let a = g1_from_words(&self.a)?;
        let c = g1_from_words(&self.c)?;

        let [bx, by] = &self.b;
        let b = if bx.iter().chain(by.iter()).all(Word::is_zero) {
            G2Affine::zero()
        } else {
            let x = Fq2::new(bx[1].to_fq()?, bx[0].to_fq()?);
            let y = Fq2::new(by[1].to_fq()?, by[0].to_fq()?);
            let p = G2Affine::new_unchecked(x, y);
            if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
                return None;
            }
            p
        };

        Some(Proof { a, b, c })
    }

    pub fn flatten(&self) -> [Word; 8] {
        [
            self.a[0], self.a[1], self.b[0][0], self.b[0][1], self.b[1][0], self.b[1][1],
            self.c[0], self.c[1],
        ]
    }

    pub fn from_words(w: &[Word; 8]) -> Self {
        Self {
            a: [w[0], w[1]],
            b: [[w[2], w[3]], [w[4], w[5]]],
            c: [w[6], w[7]],
        }
    }
}

fn g1_words(p: &G1Affine) -> [Word; 2] {
    if p.is_zero() {
        return [Word::ZERO; 2];
    }
    [Word::from_fq(p.x), Word::from_fq(p.y)]
}

fn g1_from_words(w: &[Word; 2]) -> Option<G1Affine> {
    if w[0].is_zero() && w[1].is_zero() {
        return Some(G1Affine::zero());
    }
    let p = G1Affine::new_unchecked(w[0].to_fq()?, w[1].to_fq()?);
    (p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve()).then_some(p)
}

/// What a caller submits to the on-chain verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub kind: ProofKind,
    pub proof: [Word; 8],
    pub public_signals: Vec<Element>,
    /// Commitment created by this operation (deposit, swap output)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
    /// Nullifier spent by this operation (withdraw, swap input)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullifier: Option<Nullifier>,
}

impl ProofBundle {
    pub fn new(kind: ProofKind, proof: [Word; 8], public_signals: Vec<Element>) -> Self {
        Self {
            kind,
            proof,
            public_signals,
            commitment: None,
            nullifier: None,
        }
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = Some(commitment);
        self
    }

    pub fn with_nullifier(mut self, nullifier: Nullifier) -> Self {
        self.nullifier = Some(nullifier);
        self
    }

    /// Public signals as verifier words
    pub fn public_words(&self) -> Vec<Word> {
        self.public_signals.iter().map(Word::from_element).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::CurveGroup;
    use ark_std::UniformRand;

    fn sample_proof() -> Proof<Bn254> {
        let mut rng = ark_std::test_rng();
        Proof {
            a: (ark_bn254::G1Projective::rand(&mut rng)).into_affine(),
            b: (ark_bn254::G2Projective::rand(&mut rng)).into_affine(),
            c: (ark_bn254::G1Projective::rand(&mut rng)).into_affine(),
        }
    }

    #[test]
    fn test_b_limbs_are_swapped() {
        let proof = sample_proof();
        let words = SolidityProof::from_ark(&proof).flatten();

        assert_eq!(words[0], Word::from_fq(proof.a.x));
        assert_eq!(words[1], Word::from_fq(proof.a.y));
        assert_eq!(words[2], Word::from_fq(proof.b.x.c1));
        assert_eq!(words[3], Word::from_fq(proof.b.x.c0));
        assert_eq!(words[4], Word::from_fq(proof.b.y.c1));
        assert_eq!(words[5], Word::from_fq(proof.b.y.c0));
        assert_eq!(words[6], Word::from_fq(proof.c.x));
        assert_eq!(words[7], Word::from_fq(proof.c.y));
    }

    #[test]
    fn test_words_rebuild_the_proof() {
        let proof = sample_proof();
        let words = SolidityProof::from_ark(&proof).flatten();
        let rebuilt = SolidityProof::from_words(&words).to_ark().unwrap();
        assert_eq!(rebuilt, proof);
    }

    #[test]
    fn test_off_curve_point_rejected() {
        let proof = sample_proof();
        let mut words = SolidityProof::from_ark(&proof).flatten();
        words[1].0[31] ^= 1;
        assert!(SolidityProof::from_words(&words).to_ark().is_none());
    }

    #[test]
    fn test_non_canonical_coordinate_rejected() {
        let proof = sample_proof();
        let mut words = SolidityProof::from_ark(&proof).flatten();
        words[6] = Word([0xff; 32]);
        assert!(SolidityProof::from_words(&words).to_ark().is_none());
    }

    #[test]
    fn test_bundle_serialization() {
        let bundle = ProofBundle::new(ProofKind::Deposit, [Word::ZERO; 8], vec![Element::from(1u64)])
            .with_commitment(Commitment(Element::from(2u64)));
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["kind"], "deposit");
        assert_eq!(json["proof"].as_array().unwrap().len(), 8);
        assert!(json.get("nullifier").is_none());
        assert!(json.get("publicSignals").is_some());

        let back: ProofBundle = serde_json::from_value(json).unwrap();
        assert_eq!(back, bundle);
    }
}
