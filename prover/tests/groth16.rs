//! End-to-end Groth16 proving with a small linear deposit circuit.
//!
//! The circuit enforces `commitment == amount + blinding * 2^128`, which is
//! the linear test hasher, and exposes `[commitment, token, amount]`.

use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_ff::{Field, Zero};
use ark_groth16::{Groth16, ProvingKey};
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use ark_snark::SNARK;
use shade_privacy::{
    Address, BlindingFactor, CircuitInputs, CommitmentScheme, Element, HasherId, LinearHasher,
    MerkleAuthPath, ProofKind,
};
use shade_prover::{
    ArtifactResolver, CircuitKeys, CircuitSynthesis, Groth16Backend, ProofBackend, ProverError,
    Word,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct LinearDepositCircuit {
    commitment: Option<Fr>,
    token: Option<Fr>,
    amount: Option<Fr>,
    blinding: Option<Fr>,
}

impl LinearDepositCircuit {
    fn dummy() -> Self {
        Self {
            commitment: Some(Fr::zero()),
            token: Some(Fr::zero()),
            amount: Some(Fr::zero()),
            blinding: Some(Fr::zero()),
        }
    }
}

impl ConstraintSynthesizer<Fr> for LinearDepositCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public inputs, in verifier order
        let commitment = FpVar::new_input(cs.clone(), || {
            self.commitment.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let _token = FpVar::new_input(cs.clone(), || {
            self.token.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let amount = FpVar::new_input(cs.clone(), || {
            self.amount.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let blinding = FpVar::new_witness(cs.clone(), || {
            self.blinding.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let shift = FpVar::new_constant(cs, Fr::from(2u64).pow([128u64]))?;

        let computed = amount + blinding * shift;
        computed.enforce_equal(&commitment)
    }
}

struct LinearDeposit {
    scheme: CommitmentScheme,
}

impl LinearDeposit {
    fn new() -> Self {
        Self {
            scheme: CommitmentScheme::new(Arc::new(LinearHasher)),
        }
    }
}

impl CircuitSynthesis for LinearDeposit {
    type Circuit = LinearDepositCircuit;

    fn hasher_id(&self) -> HasherId {
        LinearHasher::ID
    }

    fn supports(&self, kind: ProofKind) -> bool {
        kind == ProofKind::Deposit
    }

    fn synthesize(
        &self,
        inputs: &CircuitInputs,
    ) -> shade_prover::Result<(Self::Circuit, Vec<Element>)> {
        let CircuitInputs::Deposit(d) = inputs else {
            return Err(ProverError::UnsupportedKind(inputs.kind()));
        };
        let signals = inputs.public_signals(&self.scheme);
        let circuit = LinearDepositCircuit {
            commitment: Some(signals[0].to_fr()),
            token: Some(d.token.to_fr()),
            amount: Some(d.amount.to_fr()),
            blinding: Some(d.blinding_factor.to_element().to_fr()),
        };
        Ok((circuit, signals))
    }
}

fn setup() -> ProvingKey<Bn254> {
    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(0);
    let (pk, _vk) = Groth16::<Bn254>::circuit_specific_setup(LinearDepositCircuit::dummy(), &mut rng)
        .expect("setup failed");
    pk
}

fn token() -> Address {
    "0x00000000000000000000000000000000000000aa".parse().unwrap()
}

fn deposit() -> CircuitInputs {
    CircuitInputs::deposit(
        &token(),
        1_500_000,
        &BlindingFactor::from_element(Element::from(7u64)),
    )
    .unwrap()
}

#[test]
fn test_generate_and_verify() {
    let backend =
        Groth16Backend::with_keys(LinearDeposit::new(), [(ProofKind::Deposit, setup())]).unwrap();
    assert_eq!(backend.hasher_id(), LinearHasher::ID);

    let bundle = backend
        .generate(&deposit(), &CancellationToken::new())
        .unwrap();

    assert_eq!(bundle.kind, ProofKind::Deposit);
    assert_eq!(
        bundle.public_signals[0].to_decimal_string(),
        "2381976568446569244243622252022378980192"
    );
    assert!(bundle.proof.iter().all(|w| !w.is_zero()));
    assert!(backend.verify(bundle.kind, &bundle.proof, &bundle.public_signals));
}

#[test]
fn test_tampered_proof_rejected() {
    let backend =
        Groth16Backend::with_keys(LinearDeposit::new(), [(ProofKind::Deposit, setup())]).unwrap();
    let bundle = backend
        .generate(&deposit(), &CancellationToken::new())
        .unwrap();

    // Swapping the B limbs back is exactly the mistake the layout guards against
    let mut swapped = bundle.proof;
    swapped.swap(2, 3);
    swapped.swap(4, 5);
    assert!(!backend.verify(bundle.kind, &swapped, &bundle.public_signals));

    let mut garbage = bundle.proof;
    garbage[0] = Word([0x11; 32]);
    assert!(!backend.verify(bundle.kind, &garbage, &bundle.public_signals));
}

#[test]
fn test_wrong_public_signals_rejected() {
    let backend =
        Groth16Backend::with_keys(LinearDeposit::new(), [(ProofKind::Deposit, setup())]).unwrap();
    let bundle = backend
        .generate(&deposit(), &CancellationToken::new())
        .unwrap();

    let mut signals = bundle.public_signals.clone();
    signals[2] = Element::from(1_500_001u64);
    assert!(!backend.verify(bundle.kind, &bundle.proof, &signals));
    assert!(!backend.verify(bundle.kind, &bundle.proof, &signals[..2]));
}

#[test]
fn test_keys_load_from_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ArtifactResolver::new(dir.path());
    resolver.store(ProofKind::Deposit, &setup()).unwrap();

    let backend = Groth16Backend::from_artifacts(LinearDeposit::new(), resolver);
    let bundle = backend
        .generate(&deposit(), &CancellationToken::new())
        .unwrap();
    assert!(backend.verify(bundle.kind, &bundle.proof, &bundle.public_signals));
}

#[test]
fn test_loaded_keys_match_in_memory_keys() {
    let pk = setup();
    let dir = tempfile::tempdir().unwrap();
    let resolver = ArtifactResolver::new(dir.path());
    resolver.store(ProofKind::Deposit, &pk).unwrap();
    let vk_file = std::fs::read(resolver.verifying_key_path(ProofKind::Deposit)).unwrap();

    let loaded = resolver.load(ProofKind::Deposit).unwrap();
    let in_memory = CircuitKeys::new(pk).unwrap();
    assert_eq!(loaded.vk_hash(), in_memory.vk_hash());
    assert_eq!(loaded.vk_hash(), *blake3::hash(&vk_file).as_bytes());
}

#[test]
fn test_corrupt_verifying_key_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ArtifactResolver::new(dir.path());
    resolver.store(ProofKind::Deposit, &setup()).unwrap();
    std::fs::write(resolver.verifying_key_path(ProofKind::Deposit), [0xffu8; 16]).unwrap();

    assert!(matches!(
        resolver.load(ProofKind::Deposit),
        Err(ProverError::GenerationFailed(_))
    ));
}

#[test]
fn test_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let backend =
        Groth16Backend::from_artifacts(LinearDeposit::new(), ArtifactResolver::new(dir.path()));

    match backend.generate(&deposit(), &CancellationToken::new()) {
        Err(ProverError::MissingArtifact { kind, path }) => {
            assert_eq!(kind, ProofKind::Deposit);
            assert_eq!(path, dir.path().join("deposit.pk"));
        }
        other => panic!("expected MissingArtifact, got {other:?}"),
    }
}

#[test]
fn test_unsupported_kind() {
    let backend =
        Groth16Backend::with_keys(LinearDeposit::new(), [(ProofKind::Deposit, setup())]).unwrap();
    let recipient: Address = "0x00000000000000000000000000000000000000bb".parse().unwrap();
    let withdraw = CircuitInputs::withdraw(
        &token(),
        10,
        &BlindingFactor::from_element(Element::from(1u64)),
        &recipient,
        &MerkleAuthPath::new(vec![Element::zero()], 0),
        Element::zero(),
    )
    .unwrap();

    assert_eq!(
        backend
            .generate(&withdraw, &CancellationToken::new())
            .unwrap_err(),
        ProverError::UnsupportedKind(ProofKind::Withdraw)
    );
}

#[test]
fn test_cancelled_before_proving() {
    let backend =
        Groth16Backend::with_keys(LinearDeposit::new(), [(ProofKind::Deposit, setup())]).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(
        backend.generate(&deposit(), &cancel).unwrap_err(),
        ProverError::Cancelled
    );
}
