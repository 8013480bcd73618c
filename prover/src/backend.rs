//! Proof Backend Capability
//!
//! ```text
//! ┌──────────────┐  CircuitInputs   ┌──────────────────┐
//! │   Builder    │ ───────────────▶ │   ProofBackend   │
//! │              │ ◀─────────────── │ (Groth16 / Mock) │
//! └──────────────┘   ProofBundle    └──────────────────┘
//!                    8 words + public signals
//! ```
//!
//! Backends are black boxes: circuit encoding lives in `shade_privacy::inputs`
//! and the on-chain layout in [`crate::proof_format`].

use shade_privacy::{CircuitInputs, Element, HasherId, ProofKind};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::proof_format::{ProofBundle, Word};

/// Trait for ZK proof generation
pub trait ProofBackend: Send + Sync + 'static {
    /// Hash the backend's circuits constrain commitments and nullifiers with
    fn hasher_id(&self) -> HasherId;

    /// Generate a proof. CPU-bound and slow; call from a blocking context.
    ///
    /// Implementations poll `cancel` where they can and return
    /// [`crate::ProverError::Cancelled`] once it fires.
    fn generate(&self, inputs: &CircuitInputs, cancel: &CancellationToken) -> Result<ProofBundle>;

    /// Cheap local check before submission. Malformed input yields `false`.
    fn verify(&self, kind: ProofKind, proof: &[Word; 8], public_signals: &[Element]) -> bool;
}
