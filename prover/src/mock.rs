//! Mock backend - deterministic fake proofs
//!
//! Public signals are computed for real (from the circuit input layout), the
//! proof words are a keyed hash of them. Good enough to drive the builder end
//! to end without proving keys.

use std::time::{Duration, Instant};

use shade_privacy::{CircuitInputs, CommitmentScheme, Element, HasherId, ProofKind};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::ProofBackend;
use crate::error::{ProverError, Result};
use crate::proof_format::{ProofBundle, Word};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct MockBackend {
    scheme: CommitmentScheme,
    /// Simulated proving time
    delay: Duration,
}

impl MockBackend {
    pub fn new(scheme: CommitmentScheme) -> Self {
        Self {
            scheme,
            delay: Duration::ZERO,
        }
    }

    /// Create with simulated proving time (for cancellation tests)
    pub fn with_delay(scheme: CommitmentScheme, delay: Duration) -> Self {
        Self { scheme, delay }
    }

    fn proof_words(kind: ProofKind, public_signals: &[Element]) -> [Word; 8] {
        let mut hasher = blake3::Hasher::new_derive_key("shade-mock-proof-v1");
        hasher.update(kind.as_str().as_bytes());
        for signal in public_signals {
            hasher.update(&signal.to_be_bytes());
        }

        let mut out = [0u8; 256];
        hasher.finalize_xof().fill(&mut out);

        let mut words = [Word::ZERO; 8];
        for (word, chunk) in words.iter_mut().zip(out.chunks_exact(32)) {
            word.0.copy_from_slice(chunk);
        }
        words
    }

    fn simulate_work(&self, cancel: &CancellationToken) -> Result<()> {
        let deadline = Instant::now() + self.delay;
        loop {
            if cancel.is_cancelled() {
                return Err(ProverError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

impl ProofBackend for MockBackend {
    fn hasher_id(&self) -> HasherId {
        self.scheme.hasher_id()
    }

    fn generate(&self, inputs: &CircuitInputs, cancel: &CancellationToken) -> Result<ProofBundle> {
        self.simulate_work(cancel)?;

        let kind = inputs.kind();
        let public_signals = inputs.public_signals(&self.scheme);
        let proof = Self::proof_words(kind, &public_signals);
        debug!(%kind, "mock proof generated");

        Ok(ProofBundle::new(kind, proof, public_signals))
    }

    fn verify(&self, kind: ProofKind, proof: &[Word; 8], public_signals: &[Element]) -> bool {
        public_signals.len() == kind.public_signal_count()
            && Self::proof_words(kind, public_signals) == *proof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_privacy::{Address, BlindingFactor, LinearHasher};
    use std::sync::Arc;

    fn backend() -> MockBackend {
        MockBackend::new(CommitmentScheme::new(Arc::new(LinearHasher)))
    }

    fn deposit() -> CircuitInputs {
        let token: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        CircuitInputs::deposit(
            &token,
            1_500_000,
            &BlindingFactor::from_element(Element::from(7u64)),
        )
        .unwrap()
    }

    #[test]
    fn test_mock_prove_and_verify() {
        let backend = backend();
        let bundle = backend.generate(&deposit(), &CancellationToken::new()).unwrap();

        assert_eq!(bundle.kind, ProofKind::Deposit);
        assert_eq!(bundle.public_signals.len(), 3);
        assert!(backend.verify(bundle.kind, &bundle.proof, &bundle.public_signals));
    }

    #[test]
    fn test_mock_verify_fails_closed() {
        let backend = backend();
        let bundle = backend.generate(&deposit(), &CancellationToken::new()).unwrap();

        let mut tampered = bundle.proof;
        tampered[3].0[0] ^= 0xff;
        assert!(!backend.verify(bundle.kind, &tampered, &bundle.public_signals));
        assert!(!backend.verify(ProofKind::Withdraw, &bundle.proof, &bundle.public_signals));
        assert!(!backend.verify(bundle.kind, &bundle.proof, &bundle.public_signals[..2]));
    }

    #[test]
    fn test_cancelled_before_start() {
        let backend = MockBackend::with_delay(
            CommitmentScheme::new(Arc::new(LinearHasher)),
            Duration::from_secs(5),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            backend.generate(&deposit(), &cancel).unwrap_err(),
            ProverError::Cancelled
        );
    }
}
