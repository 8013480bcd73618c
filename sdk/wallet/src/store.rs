//! Secret Store
//!
//! Maps each commitment to the blinding factor that opens it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ SecretStore                                             │
//! │  gate:    RwLock<()>                                    │
//! │           read  = any commitment guard is outstanding   │
//! │           write = import swapping the whole map         │
//! │  locks:   DashMap<Commitment, Arc<Mutex<()>>>           │
//! │           held across lookup, proving and mark-spent    │
//! │  secrets: RwLock<HashMap<Commitment, SecretRecord>>     │
//! │           write lock = export snapshot / import swap    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Lock order is gate, then the per-commitment lock, then the map lock. A
//! task never holds two commitment guards at once. The map lock is never held
//! across proving or key derivation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use shade_privacy::{Commitment, CommitmentScheme};
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, RwLock};
use tracing::{debug, info, warn};

use crate::backup::{self, BackupNonce, BackupTarget, KdfParams};
use crate::error::{Result, WalletError};
use crate::secret::{SecretRecord, SpentPolicy};

type LockTable = DashMap<Commitment, Arc<Mutex<()>>>;

/// How a store starts its session
pub enum StoreInit {
    Empty,
    FromBackup { blob: Vec<u8>, password: String },
}

/// Exclusive access to one commitment's secret
///
/// Dropping the guard releases the commitment and forgets its lock entry
/// once nobody else is waiting on it.
pub struct CommitmentGuard {
    commitment: Commitment,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
    _gate: OwnedRwLockReadGuard<()>,
}

impl CommitmentGuard {
    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }
}

impl Drop for CommitmentGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.commitment, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

pub struct SecretStore {
    scheme: CommitmentScheme,
    policy: SpentPolicy,
    gate: Arc<RwLock<()>>,
    locks: Arc<LockTable>,
    secrets: RwLock<HashMap<Commitment, SecretRecord>>,
}

impl SecretStore {
    pub fn new(scheme: CommitmentScheme, policy: SpentPolicy) -> Self {
        Self {
            scheme,
            policy,
            gate: Arc::new(RwLock::new(())),
            locks: Arc::new(DashMap::new()),
            secrets: RwLock::new(HashMap::new()),
        }
    }

    pub async fn init(scheme: CommitmentScheme, policy: SpentPolicy, init: StoreInit) -> Result<Self> {
        let store = Self::new(scheme, policy);
        match init {
            StoreInit::Empty => {}
            StoreInit::FromBackup { blob, password } => {
                store.import_secrets(&blob, &password).await?;
            }
        }
        Ok(store)
    }

    /// Start from the newest backup in `target`, or empty if there is none
    pub async fn load_latest(
        scheme: CommitmentScheme,
        policy: SpentPolicy,
        target: &BackupTarget,
        password: &str,
    ) -> Result<Self> {
        let Some(path) = target.latest().await? else {
            info!(dir = %target.dir().display(), "no backup found, starting empty store");
            return Ok(Self::new(scheme, policy));
        };

        let blob = tokio::fs::read(&path).await?;
        let store = Self::init(
            scheme,
            policy,
            StoreInit::FromBackup {
                blob,
                password: password.to_string(),
            },
        )
        .await?;
        info!(path = %path.display(), secrets = store.len().await, "store restored from backup");
        Ok(store)
    }

    /// Encrypt the whole store with a fresh nonce and write it to `target`
    pub async fn persist(
        &self,
        target: &BackupTarget,
        password: &str,
        params: &KdfParams,
    ) -> Result<PathBuf> {
        let blob = self
            .export_secrets(password, &BackupNonce::random(), params)
            .await?;
        target.write(&blob).await
    }

    pub fn scheme(&self) -> &CommitmentScheme {
        &self.scheme
    }

    pub fn policy(&self) -> SpentPolicy {
        self.policy
    }

    /// Wait for exclusive access to `commitment`
    ///
    /// Blocks while an import is replacing the store, and makes later imports
    /// wait until the guard is dropped.
    pub async fn lock(&self, commitment: &Commitment) -> CommitmentGuard {
        let gate = self.gate.clone().read_owned().await;
        let mutex = self.locks.entry(*commitment).or_default().clone();
        let guard = mutex.lock_owned().await;
        debug!(%commitment, "commitment lock acquired");
        CommitmentGuard {
            commitment: *commitment,
            guard: Some(guard),
            locks: self.locks.clone(),
            _gate: gate,
        }
    }

    /// Record a secret. The record must open its commitment.
    pub async fn insert(&self, record: SecretRecord) -> Result<()> {
        record.validate(&self.scheme)?;
        let _guard = self.lock(&record.commitment).await;
        self.secrets.write().await.insert(record.commitment, record);
        Ok(())
    }

    pub async fn get(&self, commitment: &Commitment) -> Option<SecretRecord> {
        self.secrets.read().await.get(commitment).cloned()
    }

    /// Look up a secret while holding its lock
    pub async fn require(&self, guard: &CommitmentGuard) -> Result<SecretRecord> {
        let record = self
            .get(guard.commitment())
            .await
            .ok_or(WalletError::SecretNotFound(*guard.commitment()))?;
        if record.spent && self.policy == SpentPolicy::MarkSpent {
            return Err(WalletError::AlreadySpent(record.commitment));
        }
        Ok(record)
    }

    /// Apply the spent policy after a proof against this commitment succeeded
    pub async fn settle(&self, guard: &CommitmentGuard) {
        if self.policy != SpentPolicy::MarkSpent {
            return;
        }
        if let Some(record) = self.secrets.write().await.get_mut(guard.commitment()) {
            record.spent = true;
            debug!(commitment = %guard.commitment(), "secret marked spent");
        }
    }

    /// All records, ordered by commitment
    pub async fn list(&self) -> Vec<SecretRecord> {
        let mut records: Vec<SecretRecord> = self.secrets.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.commitment.cmp(&b.commitment));
        records
    }

    pub async fn len(&self) -> usize {
        self.secrets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.secrets.read().await.is_empty()
    }

    /// Encrypt every record under `password`
    ///
    /// The records are snapshotted under the map lock; key derivation and
    /// encryption run on the blocking pool after it is released.
    pub async fn export_secrets(
        &self,
        password: &str,
        nonce: &BackupNonce,
        params: &KdfParams,
    ) -> Result<Vec<u8>> {
        let (json, count) = {
            let secrets = self.secrets.write().await;
            let mut records: Vec<&SecretRecord> = secrets.values().collect();
            records.sort_by(|a, b| a.commitment.cmp(&b.commitment));
            let json = serde_json::to_vec(&records)
                .map_err(|e| WalletError::MalformedInput(format!("serialize secrets: {e}")))?;
            (json, records.len())
        };

        let password = password.to_string();
        let (nonce, params) = (*nonce, *params);
        let blob =
            tokio::task::spawn_blocking(move || backup::seal(&json, &password, &nonce, &params))
                .await??;
        info!(secrets = count, bytes = blob.len(), "secrets exported");
        Ok(blob)
    }

    /// Replace the store with the contents of `blob`
    ///
    /// Nothing changes unless the whole blob decrypts, parses and every
    /// record opens its commitment. The swap waits for every outstanding
    /// commitment guard to drop. Returns the number of records loaded.
    pub async fn import_secrets(&self, blob: &[u8], password: &str) -> Result<usize> {
        let blob = blob.to_vec();
        let password = password.to_string();
        let scheme = self.scheme.clone();
        let restored = tokio::task::spawn_blocking(move || decode_backup(&blob, &password, &scheme))
            .await?
            .inspect_err(|e| warn!(error = %e, "backup import rejected"))?;

        let _gate = self.gate.write().await;
        let mut secrets = self.secrets.write().await;
        let count = restored.len();
        *secrets = restored;
        info!(secrets = count, "secrets imported");
        Ok(count)
    }
}

fn decode_backup(
    blob: &[u8],
    password: &str,
    scheme: &CommitmentScheme,
) -> Result<HashMap<Commitment, SecretRecord>> {
    let json = backup::open(blob, password)?;
    let records: Vec<SecretRecord> = serde_json::from_slice(&json)
        .map_err(|e| WalletError::MalformedInput(format!("backup contents: {e}")))?;

    let mut restored = HashMap::with_capacity(records.len());
    for record in records {
        record.validate(scheme)?;
        restored.insert(record.commitment, record);
    }
    Ok(restored)
}
