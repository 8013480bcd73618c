//! Shade Prover
//!
//! Turns assembled circuit inputs into proofs the on-chain verifier accepts.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────────┐
//! │  CircuitInputs  │ ──▶ │   ProofBackend   │ ──▶ │     ProofBundle     │
//! │ (shade-privacy) │     │  Groth16 / Mock  │     │ 8 words + signals   │
//! └─────────────────┘     └──────────────────┘     └─────────────────────┘
//!                                  ▲
//!                                  │ spawn_blocking, permits, cancel
//!                         ┌──────────────────┐
//!                         │  ProverService   │
//!                         └──────────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod groth16;
pub mod mock;
pub mod proof_format;
pub mod service;

pub use backend::ProofBackend;
pub use error::{ProverError, Result};
pub use groth16::{ArtifactResolver, CircuitKeys, CircuitSynthesis, Groth16Backend};
pub use mock::MockBackend;
pub use proof_format::{ProofBundle, SolidityProof, Word};
pub use service::{ProofJob, ProverService};
