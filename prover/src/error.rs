//! Error definitions for proof generation.
use std::path::PathBuf;
use std::time::Duration;

use shade_privacy::{PrivacyError, ProofKind};
use thiserror::Error;

/// Errors raised by proof backends and the prover service
///
/// None of these are retried: a failed proof almost always means bad inputs
/// or missing artifacts, not a transient condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// The backend could not produce a proof (bad witness, exhausted resources)
    #[error("proof generation failed: {0}")]
    GenerationFailed(String),

    /// Proving or verifying key not found
    #[error("missing {kind} circuit artifact at {}", path.display())]
    MissingArtifact { kind: ProofKind, path: PathBuf },

    /// Backend has no circuit for this operation
    #[error("no circuit available for {0} proofs")]
    UnsupportedKind(ProofKind),

    /// Caller aborted the proof
    #[error("proof generation cancelled")]
    Cancelled,

    /// Proof did not finish within the configured limit
    #[error("proof generation timed out after {0:?}")]
    Timeout(Duration),

    /// Inputs rejected before reaching the backend
    #[error(transparent)]
    Malformed(#[from] PrivacyError),
}

pub type Result<T> = std::result::Result<T, ProverError>;
