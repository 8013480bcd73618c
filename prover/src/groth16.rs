//! Groth16 Backend (Real ZK Proving)
//!
//! Generic over the circuit family: a [`CircuitSynthesis`] turns assembled
//! [`CircuitInputs`] into an arkworks constraint system plus the public
//! signals it will expose. Keys are loaded lazily per proof kind.
//!
//! ```text
//! {artifacts_dir}/deposit.pk   deposit.vk
//!                 withdraw.pk  withdraw.vk
//!                 swap.pk      swap.vk
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey, prepare_verifying_key};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use dashmap::DashMap;
use rand::rngs::OsRng;
use shade_privacy::{CircuitInputs, Element, HasherId, ProofKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::ProofBackend;
use crate::error::{ProverError, Result};
use crate::proof_format::{ProofBundle, SolidityProof, Word};

/// Builds the constraint system for one proof kind
pub trait CircuitSynthesis: Send + Sync + 'static {
    type Circuit: ConstraintSynthesizer<Fr>;

    /// Hash the circuits constrain commitments and nullifiers with
    fn hasher_id(&self) -> HasherId;

    fn supports(&self, kind: ProofKind) -> bool;

    /// Circuit with its witness assigned, plus the public signals in
    /// circuit order
    fn synthesize(&self, inputs: &CircuitInputs) -> Result<(Self::Circuit, Vec<Element>)>;
}

/// Locates proving and verifying keys on disk
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    dir: PathBuf,
}

impl ArtifactResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn proving_key_path(&self, kind: ProofKind) -> PathBuf {
        self.dir.join(format!("{kind}.pk"))
    }

    pub fn verifying_key_path(&self, kind: ProofKind) -> PathBuf {
        self.dir.join(format!("{kind}.vk"))
    }

    /// Load both keys for `kind`
    pub fn load(&self, kind: ProofKind) -> Result<CircuitKeys> {
        let pk_bytes = read_artifact(kind, &self.proving_key_path(kind))?;
        let vk_bytes = read_artifact(kind, &self.verifying_key_path(kind))?;

        let pk = ProvingKey::<Bn254>::deserialize_compressed(&pk_bytes[..]).map_err(|e| {
            ProverError::GenerationFailed(format!("failed to deserialize {kind} proving key: {e}"))
        })?;
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(&vk_bytes[..]).map_err(|e| {
            ProverError::GenerationFailed(format!("failed to deserialize {kind} verifying key: {e}"))
        })?;

        CircuitKeys::from_parts(pk, &vk)
    }

    /// Write keys produced by a circuit-specific setup
    pub fn store(&self, kind: ProofKind, pk: &ProvingKey<Bn254>) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let mut pk_bytes = Vec::new();
        pk.serialize_compressed(&mut pk_bytes)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let mut vk_bytes = Vec::new();
        pk.vk
            .serialize_compressed(&mut vk_bytes)
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        std::fs::write(self.proving_key_path(kind), pk_bytes)?;
        std::fs::write(self.verifying_key_path(kind), vk_bytes)
    }
}

fn read_artifact(kind: ProofKind, path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProverError::MissingArtifact {
            kind,
            path: path.to_path_buf(),
        },
        _ => ProverError::GenerationFailed(format!("failed to read {}: {e}", path.display())),
    })
}

/// Keys for one circuit
pub struct CircuitKeys {
    pk: ProvingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
    vk_hash: [u8; 32],
}

impl CircuitKeys {
    pub fn new(pk: ProvingKey<Bn254>) -> Result<Self> {
        let vk = pk.vk.clone();
        Self::from_parts(pk, &vk)
    }

    fn from_parts(pk: ProvingKey<Bn254>, vk: &VerifyingKey<Bn254>) -> Result<Self> {
        let mut vk_bytes = Vec::new();
        vk.serialize_compressed(&mut vk_bytes).map_err(|e| {
            ProverError::GenerationFailed(format!("failed to serialize verifying key: {e}"))
        })?;

        Ok(Self {
            pvk: prepare_verifying_key(vk),
            vk_hash: *blake3::hash(&vk_bytes).as_bytes(),
            pk,
        })
    }

    /// Hash of the verifying key, for matching against the deployed verifier
    pub fn vk_hash(&self) -> [u8; 32] {
        self.vk_hash
    }
}

/// Groth16 prover over BN254
pub struct Groth16Backend<S: CircuitSynthesis> {
    synthesis: S,
    artifacts: Option<ArtifactResolver>,
    keys: DashMap<ProofKind, Arc<CircuitKeys>>,
}

impl<S: CircuitSynthesis> Groth16Backend<S> {
    /// Load keys from `{dir}/{kind}.pk|.vk` on first use
    pub fn from_artifacts(synthesis: S, artifacts: ArtifactResolver) -> Self {
        Self {
            synthesis,
            artifacts: Some(artifacts),
            keys: DashMap::new(),
        }
    }

    /// Use keys already in memory
    pub fn with_keys(
        synthesis: S,
        keys: impl IntoIterator<Item = (ProofKind, ProvingKey<Bn254>)>,
    ) -> Result<Self> {
        let map = DashMap::new();
        for (kind, pk) in keys {
            map.insert(kind, Arc::new(CircuitKeys::new(pk)?));
        }
        Ok(Self {
            synthesis,
            artifacts: None,
            keys: map,
        })
    }

    /// Keys for `kind`, loading and caching them if needed
    pub fn keys(&self, kind: ProofKind) -> Result<Arc<CircuitKeys>> {
        if !self.synthesis.supports(kind) {
            return Err(ProverError::UnsupportedKind(kind));
        }
        if let Some(keys) = self.keys.get(&kind) {
            return Ok(keys.clone());
        }

        let Some(artifacts) = &self.artifacts else {
            return Err(ProverError::MissingArtifact {
                kind,
                path: PathBuf::from(format!("{kind}.pk")),
            });
        };

        let start = Instant::now();
        let loaded = Arc::new(artifacts.load(kind)?);
        info!(
            %kind,
            dir = %artifacts.dir().display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded circuit keys"
        );
        Ok(self.keys.entry(kind).or_insert(loaded).clone())
    }
}

impl<S: CircuitSynthesis> ProofBackend for Groth16Backend<S> {
    fn hasher_id(&self) -> HasherId {
        self.synthesis.hasher_id()
    }

    fn generate(&self, inputs: &CircuitInputs, cancel: &CancellationToken) -> Result<ProofBundle> {
        if cancel.is_cancelled() {
            return Err(ProverError::Cancelled);
        }

        let kind = inputs.kind();
        let keys = self.keys(kind)?;
        let (circuit, public_signals) = self.synthesis.synthesize(inputs)?;

        let start = Instant::now();
        let proof = Groth16::<Bn254>::prove(&keys.pk, circuit, &mut OsRng)
            .map_err(|e| ProverError::GenerationFailed(e.to_string()))?;

        // Proving itself is not interruptible
        if cancel.is_cancelled() {
            return Err(ProverError::Cancelled);
        }

        let words = SolidityProof::from_ark(&proof).flatten();
        info!(
            %kind,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generated Groth16 proof"
        );

        Ok(ProofBundle::new(kind, words, public_signals))
    }

    fn verify(&self, kind: ProofKind, proof: &[Word; 8], public_signals: &[Element]) -> bool {
        if public_signals.len() != kind.public_signal_count() {
            return false;
        }
        let Ok(keys) = self.keys(kind) else {
            return false;
        };
        let Some(proof) = SolidityProof::from_words(proof).to_ark() else {
            debug!(%kind, "proof words do not decode to curve points");
            return false;
        };

        let inputs: Vec<Fr> = public_signals.iter().map(Element::to_fr).collect();
        Groth16::<Bn254>::verify_with_processed_vk(&keys.pvk, &inputs, &proof).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        let resolver = ArtifactResolver::new("/var/lib/shade/keys");
        assert_eq!(
            resolver.proving_key_path(ProofKind::Withdraw),
            PathBuf::from("/var/lib/shade/keys/withdraw.pk")
        );
        assert_eq!(
            resolver.verifying_key_path(ProofKind::Swap),
            PathBuf::from("/var/lib/shade/keys/swap.vk")
        );
    }
}
