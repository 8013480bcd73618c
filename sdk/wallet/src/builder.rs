//! Transaction Builder
//!
//! ```text
//! deposit:  fresh blinding ─▶ commit ─▶ inputs ─▶ prove ─▶ record secret
//! withdraw: lock(C) ─▶ secret ─▶ nullify ─▶ root(path) ─▶ trusted? ─▶ prove ─▶ settle
//! swap:     lock(C_in) ─▶ withdraw side + fresh output secret ─▶ prove ─▶ settle + record
//! ```
//!
//! Every returned bundle has had its public signals checked against the
//! values derived here, and optionally verified with the backend.

use std::sync::Arc;

use rand::rngs::OsRng;
use shade_privacy::{
    Address, BlindingFactor, CircuitInputs, Commitment, Element, MerkleAuthPath, TrustedRoots,
};
use shade_prover::{ProofBundle, ProverService};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, WalletError};
use crate::secret::{ExportableSecret, SecretRecord};
use crate::store::SecretStore;

#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub token: Address,
    pub amount: u128,
}

#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    pub token: Address,
    pub amount: u128,
    pub commitment: Commitment,
    pub recipient: Address,
    pub merkle_proof: Vec<Element>,
    pub leaf_index: u64,
}

#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: u128,
    pub amount_out: u128,
    pub commitment: Commitment,
    pub merkle_proof: Vec<Element>,
    pub leaf_index: u64,
}

pub struct TransactionBuilder {
    store: Arc<SecretStore>,
    prover: ProverService,
    trusted_roots: Option<Arc<dyn TrustedRoots>>,
    verify_locally: bool,
}

impl TransactionBuilder {
    /// Fails if the store and the prover disagree on the hash function
    pub fn new(store: Arc<SecretStore>, prover: ProverService) -> Result<Self> {
        let store_hasher = store.scheme().hasher_id();
        let backend_hasher = prover.backend().hasher_id();
        if store_hasher != backend_hasher {
            return Err(WalletError::HasherMismatch {
                store: store_hasher,
                backend: backend_hasher,
            });
        }

        Ok(Self {
            store,
            prover,
            trusted_roots: None,
            verify_locally: false,
        })
    }

    /// Refuse withdraw and swap proofs against roots the ledger does not accept
    pub fn with_trusted_roots(mut self, roots: Arc<dyn TrustedRoots>) -> Self {
        self.trusted_roots = Some(roots);
        self
    }

    /// Verify each proof with the backend before returning it
    pub fn with_local_verification(mut self, enabled: bool) -> Self {
        self.verify_locally = enabled;
        self
    }

    pub fn store(&self) -> &Arc<SecretStore> {
        &self.store
    }

    pub async fn create_deposit(
        &self,
        req: DepositRequest,
        cancel: CancellationToken,
    ) -> Result<(ProofBundle, ExportableSecret)> {
        let blinding = BlindingFactor::random(&mut OsRng);
        self.create_deposit_with_blinding(req, blinding, cancel).await
    }

    /// Deposit with a caller-chosen blinding factor
    pub async fn create_deposit_with_blinding(
        &self,
        req: DepositRequest,
        blinding: BlindingFactor,
        cancel: CancellationToken,
    ) -> Result<(ProofBundle, ExportableSecret)> {
        let inputs = CircuitInputs::deposit(&req.token, req.amount, &blinding)?;
        let record = SecretRecord::new(self.store.scheme(), req.token, req.amount, blinding);
        debug!(commitment = %record.commitment, "deposit inputs assembled");

        let bundle = self.prove(inputs, cancel).await?;
        self.store.insert(record.clone()).await?;

        Ok((bundle.with_commitment(record.commitment), record))
    }

    pub async fn create_withdraw(
        &self,
        req: WithdrawRequest,
        cancel: CancellationToken,
    ) -> Result<ProofBundle> {
        let path = MerkleAuthPath::new(req.merkle_proof, req.leaf_index);
        path.validate()?;

        let guard = self.store.lock(&req.commitment).await;
        let record = self.store.require(&guard).await?;
        check_opening(&record, &req.token, req.amount)?;

        let scheme = self.store.scheme();
        let nullifier = scheme.nullify(&record.commitment, &record.blinding_factor);
        let root = path.compute_root(scheme.hasher().as_ref(), record.commitment.to_element());
        self.check_root(&root)?;

        let inputs = CircuitInputs::withdraw(
            &record.token,
            record.amount,
            &record.blinding_factor,
            &req.recipient,
            &path,
            root,
        )?;
        debug!(commitment = %record.commitment, %root, "withdraw inputs assembled");

        let bundle = self.prove(inputs, cancel).await?;
        self.store.settle(&guard).await;

        Ok(bundle.with_nullifier(nullifier))
    }

    pub async fn create_swap(
        &self,
        req: SwapRequest,
        cancel: CancellationToken,
    ) -> Result<(ProofBundle, ExportableSecret)> {
        let blinding_out = BlindingFactor::random(&mut OsRng);
        self.create_swap_with_blinding(req, blinding_out, cancel).await
    }

    /// Swap with a caller-chosen blinding factor for the output commitment
    pub async fn create_swap_with_blinding(
        &self,
        req: SwapRequest,
        blinding_out: BlindingFactor,
        cancel: CancellationToken,
    ) -> Result<(ProofBundle, ExportableSecret)> {
        let path = MerkleAuthPath::new(req.merkle_proof, req.leaf_index);
        path.validate()?;

        let guard = self.store.lock(&req.commitment).await;
        let input = self.store.require(&guard).await?;
        check_opening(&input, &req.token_in, req.amount_in)?;

        let scheme = self.store.scheme();
        let nullifier_in = scheme.nullify(&input.commitment, &input.blinding_factor);
        let root = path.compute_root(scheme.hasher().as_ref(), input.commitment.to_element());
        self.check_root(&root)?;

        let output = SecretRecord::new(scheme, req.token_out, req.amount_out, blinding_out);
        let inputs = CircuitInputs::swap(
            &input.token,
            &req.token_out,
            input.amount,
            req.amount_out,
            &input.blinding_factor,
            &blinding_out,
            &path,
            root,
        )?;
        debug!(
            commitment_in = %input.commitment,
            commitment_out = %output.commitment,
            %root,
            "swap inputs assembled"
        );

        let bundle = self.prove(inputs, cancel).await?;
        self.store.settle(&guard).await;
        drop(guard);
        self.store.insert(output.clone()).await?;

        Ok((
            bundle
                .with_nullifier(nullifier_in)
                .with_commitment(output.commitment),
            output,
        ))
    }

    fn check_root(&self, root: &Element) -> Result<()> {
        match &self.trusted_roots {
            Some(roots) if !roots.is_trusted(root) => Err(WalletError::UntrustedRoot(*root)),
            Some(_) => Ok(()),
            None => {
                warn!(%root, "no trusted root source configured, merkle root not checked");
                Ok(())
            }
        }
    }

    async fn prove(&self, inputs: CircuitInputs, cancel: CancellationToken) -> Result<ProofBundle> {
        let kind = inputs.kind();
        let expected = inputs.public_signals(self.store.scheme());

        let bundle = self.prover.submit(inputs, cancel).wait().await?;

        if bundle.kind != kind || bundle.public_signals != expected {
            return Err(WalletError::SignalMismatch(kind));
        }
        if self.verify_locally
            && !self
                .prover
                .backend()
                .verify(kind, &bundle.proof, &bundle.public_signals)
        {
            return Err(WalletError::LocalVerificationFailed(kind));
        }
        Ok(bundle)
    }
}

/// The request must name the token and amount the secret actually commits to
fn check_opening(record: &SecretRecord, token: &Address, amount: u128) -> Result<()> {
    if record.token != *token || record.amount != amount {
        return Err(WalletError::MalformedInput(format!(
            "token or amount does not match the secret for {}",
            record.commitment
        )));
    }
    Ok(())
}
