//! Async Prover Service
//!
//! Runs proofs off the async runtime. Callers get a [`ProofJob`] handle they
//! can await, cancel, or let time out.
//!
//! ```text
//! submit() ──▶ tokio task ──▶ worker permit ──▶ spawn_blocking(generate)
//!                 │                                   │
//!                 └──── CancellationToken ────────────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use shade_privacy::{CircuitInputs, ProofKind};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::ProofBackend;
use crate::error::{ProverError, Result};
use crate::proof_format::ProofBundle;

/// Background proving with bounded parallelism
#[derive(Clone)]
pub struct ProverService {
    backend: Arc<dyn ProofBackend>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl ProverService {
    /// Start the service with at most `workers` proofs running at once
    pub fn start(backend: Arc<dyn ProofBackend>, workers: usize) -> Self {
        Self {
            backend,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn backend(&self) -> &Arc<dyn ProofBackend> {
        &self.backend
    }

    /// Queue a proof. Must be called from within a tokio runtime.
    pub fn submit(&self, inputs: CircuitInputs, cancel: CancellationToken) -> ProofJob {
        let id = Uuid::new_v4();
        let kind = inputs.kind();
        let backend = self.backend.clone();
        let permits = self.permits.clone();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let _permit = tokio::select! {
                _ = token.cancelled() => return Err(ProverError::Cancelled),
                permit = permits.acquire_owned() => permit.map_err(|_| {
                    ProverError::GenerationFailed("prover service shut down".to_string())
                })?,
            };

            debug!(%id, %kind, "proof job started");
            let start = Instant::now();
            let worker_token = token.clone();
            let result =
                tokio::task::spawn_blocking(move || backend.generate(&inputs, &worker_token))
                    .await
                    .map_err(|e| ProverError::GenerationFailed(format!("prover task failed: {e}")))?;

            match &result {
                Ok(_) => info!(
                    %id,
                    %kind,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "proof job finished"
                ),
                Err(e) => warn!(%id, %kind, error = %e, "proof job failed"),
            }
            result
        });

        ProofJob {
            id,
            kind,
            cancel,
            handle,
            deadline: self
                .timeout
                .map(|limit| (limit, tokio::time::Instant::now() + limit)),
        }
    }
}

/// Handle to one in-flight proof
pub struct ProofJob {
    id: Uuid,
    kind: ProofKind,
    cancel: CancellationToken,
    handle: JoinHandle<Result<ProofBundle>>,
    /// Timeout and the instant it expires, fixed at submission so time spent
    /// queued for a worker counts against it
    deadline: Option<(Duration, tokio::time::Instant)>,
}

impl ProofJob {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ProofKind {
        self.kind
    }

    /// Abort the proof. The backend stops at its next cancellation check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the proof. Cancellation wins over a result that is ready at
    /// the same time.
    pub async fn wait(self) -> Result<ProofBundle> {
        let ProofJob {
            id,
            cancel,
            handle,
            deadline,
            ..
        } = self;

        let joined = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(ProverError::GenerationFailed(format!(
                    "prover task failed: {e}"
                ))),
            }
        };

        let bounded = async {
            match deadline {
                Some((limit, at)) => match tokio::time::timeout_at(at, joined).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(%id, ?limit, "proof job timed out");
                        cancel.cancel();
                        Err(ProverError::Timeout(limit))
                    }
                },
                None => joined.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProverError::Cancelled),
            result = bounded => result,
        }
    }
}
