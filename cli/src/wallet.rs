//! Deposit, withdraw and backup inspection against the configured store.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use shade_config::{ProverBackendToml, ShadeConfig, SpentPolicyToml};
use shade_privacy::{Address, Element, RootHistory};
use shade_prover::{MockBackend, ProofBackend, ProverService};
use shade_wallet::{
    BackupTarget, DepositRequest, KdfParams, SecretStore, SpentPolicy, TransactionBuilder,
    WithdrawRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::hashing;

fn spent_policy(config: &ShadeConfig) -> SpentPolicy {
    match config.store.spent_policy {
        SpentPolicyToml::Retain => SpentPolicy::Retain,
        SpentPolicyToml::MarkSpent => SpentPolicy::MarkSpent,
    }
}

fn kdf_params(config: &ShadeConfig) -> KdfParams {
    KdfParams {
        m_cost_kib: config.store.kdf_memory_kib,
        t_cost: config.store.kdf_iterations,
        p_cost: 1,
    }
}

fn backup_target(config: &ShadeConfig) -> BackupTarget {
    BackupTarget::new(&config.store.backup_dir, config.store.backup_retention)
}

fn backend(config: &ShadeConfig) -> Result<Arc<dyn ProofBackend>> {
    match config.prover.backend {
        ProverBackendToml::Mock => {
            warn!("using mock prover backend, proofs will not verify on-chain");
            Ok(Arc::new(MockBackend::new(hashing::scheme(config))))
        }
        ProverBackendToml::Groth16 => bail!(
            "groth16 backend needs a circuit synthesizer; none is linked into this binary \
             (artifacts dir: {})",
            config.prover.artifacts_dir
        ),
    }
}

async fn open_store(config: &ShadeConfig, password: &str) -> Result<Arc<SecretStore>> {
    let store = SecretStore::load_latest(
        hashing::scheme(config),
        spent_policy(config),
        &backup_target(config),
        password,
    )
    .await
    .context("failed to open secret store")?;
    Ok(Arc::new(store))
}

fn builder(config: &ShadeConfig, store: Arc<SecretStore>) -> Result<TransactionBuilder> {
    let mut prover = ProverService::start(backend(config)?, config.prover.workers);
    if let Some(secs) = config.prover.proof_timeout_secs {
        prover = prover.with_timeout(Duration::from_secs(secs));
    }
    Ok(TransactionBuilder::new(store, prover)?.with_local_verification(config.prover.verify_locally))
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling proof");
            trigger.cancel();
        }
    });
    token
}

pub async fn deposit(
    config: &ShadeConfig,
    token: Address,
    amount: u128,
    password: &str,
) -> Result<()> {
    let store = open_store(config, password).await?;
    let builder = builder(config, store.clone())?;

    let (bundle, secret) = builder
        .create_deposit(DepositRequest { token, amount }, cancel_on_ctrl_c())
        .await
        .context("deposit failed")?;

    let path = store
        .persist(&backup_target(config), password, &kdf_params(config))
        .await
        .context("deposit proven but backup failed; save the secret below manually")?;
    info!(path = %path.display(), "backup updated");

    println!("{}", serde_json::to_string_pretty(&bundle)?);
    eprintln!("Exportable secret (keep it safe, it is required to withdraw):");
    eprintln!("{}", serde_json::to_string_pretty(&secret)?);
    Ok(())
}

pub async fn withdraw(
    config: &ShadeConfig,
    req: WithdrawRequest,
    trusted_roots: Vec<Element>,
    password: &str,
) -> Result<()> {
    let store = open_store(config, password).await?;
    let mut builder = builder(config, store.clone())?;

    if trusted_roots.is_empty() {
        if config.merkle.require_trusted_root {
            bail!("merkle.require_trusted_root is set; pass at least one --trusted-root");
        }
    } else {
        let mut history = RootHistory::new(config.merkle.root_history);
        for root in trusted_roots {
            history.push(root);
        }
        builder = builder.with_trusted_roots(Arc::new(RwLock::new(history)));
    }

    let bundle = builder
        .create_withdraw(req, cancel_on_ctrl_c())
        .await
        .context("withdraw failed")?;

    if store.policy() == SpentPolicy::MarkSpent {
        store
            .persist(&backup_target(config), password, &kdf_params(config))
            .await
            .context("withdraw proven but backup failed")?;
    }

    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

pub async fn list_secrets(config: &ShadeConfig, password: &str) -> Result<()> {
    let store = open_store(config, password).await?;
    let records = store.list().await;
    if records.is_empty() {
        println!("No secrets recorded.");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  token={}  amount={}{}",
            record.commitment,
            record.token,
            record.amount,
            if record.spent { "  (spent)" } else { "" }
        );
    }
    Ok(())
}
