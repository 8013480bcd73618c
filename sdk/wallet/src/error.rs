use shade_privacy::{Commitment, Element, HasherId, PrivacyError, ProofKind};
use shade_prover::ProverError;
use thiserror::Error;

/// What the caller should do about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Inputs or password are wrong; retrying with the same values will fail again
    FixInputs,
    /// The secret is not in this store; restore a backup that has it
    RestoreBackup,
    /// A proof could be produced but the verifier would reject it
    RejectedOnSubmission,
    /// Prover or local storage failed
    Backend,
    /// Cancelled or timed out by the caller
    Aborted,
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("no secret recorded for commitment {0}")]
    SecretNotFound(Commitment),

    /// Wrong password, or the backup was modified
    #[error("backup authentication failed")]
    Authentication,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    InvalidField(#[from] PrivacyError),

    #[error("merkle root {0} is not a trusted root")]
    UntrustedRoot(Element),

    #[error("commitment {0} is already marked spent")]
    AlreadySpent(Commitment),

    #[error("hasher mismatch: store uses {store}, prover constrains {backend}")]
    HasherMismatch { store: HasherId, backend: HasherId },

    /// Returned public signals do not carry the values this builder derived
    #[error("{0} proof exposes unexpected public signals")]
    SignalMismatch(ProofKind),

    #[error("{0} proof failed local verification")]
    LocalVerificationFailed(ProofKind),

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error("backup storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("backup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl WalletError {
    pub fn class(&self) -> ErrorClass {
        match self {
            WalletError::SecretNotFound(_) => ErrorClass::RestoreBackup,
            WalletError::Authentication
            | WalletError::MalformedInput(_)
            | WalletError::InvalidField(_) => ErrorClass::FixInputs,
            WalletError::UntrustedRoot(_)
            | WalletError::AlreadySpent(_)
            | WalletError::SignalMismatch(_)
            | WalletError::LocalVerificationFailed(_) => ErrorClass::RejectedOnSubmission,
            WalletError::HasherMismatch { .. }
            | WalletError::Storage(_)
            | WalletError::Task(_) => ErrorClass::Backend,
            WalletError::Prover(e) => match e {
                ProverError::Cancelled | ProverError::Timeout(_) => ErrorClass::Aborted,
                ProverError::Malformed(_) => ErrorClass::FixInputs,
                _ => ErrorClass::Backend,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_classes() {
        let c = Commitment(Element::from(1u64));
        assert_eq!(WalletError::SecretNotFound(c).class(), ErrorClass::RestoreBackup);
        assert_eq!(WalletError::Authentication.class(), ErrorClass::FixInputs);
        assert_eq!(
            WalletError::UntrustedRoot(Element::zero()).class(),
            ErrorClass::RejectedOnSubmission
        );
        assert_eq!(
            WalletError::from(ProverError::Timeout(Duration::from_secs(1))).class(),
            ErrorClass::Aborted
        );
        assert_eq!(
            WalletError::from(ProverError::GenerationFailed("oom".into())).class(),
            ErrorClass::Backend
        );
        assert_eq!(
            WalletError::from(PrivacyError::ZeroAmount).class(),
            ErrorClass::FixInputs
        );
    }
}
