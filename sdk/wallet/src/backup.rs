//! Encrypted Backups
//!
//! Password-based encryption of the secret list.
//!
//! ```text
//! ┌──────┬─────┬──────────────────────┬────────┬────────┬──────────────────┐
//! │ SHDB │ ver │ m_cost t_cost p_cost │  salt  │ nonce  │ ciphertext + tag │
//! │  4   │  1  │     3 x u32 BE       │   16   │   12   │       ...        │
//! └──────┴─────┴──────────────────────┴────────┴────────┴──────────────────┘
//!  \_____________________ header (associated data) ____/
//!
//! key = Argon2id(password, salt, m_cost, t_cost, p_cost)
//! ciphertext = ChaCha20-Poly1305(key, nonce, json(secrets), aad = header)
//! ```
//!
//! The nonce is supplied by the caller on every export and never reused by
//! this module.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, WalletError};

pub const MAGIC: &[u8; 4] = b"SHDB";
pub const VERSION: u8 = 1;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = 4 + 1 + 12 + SALT_LEN + NONCE_LEN;

/// Upper bounds on KDF cost read from a blob, so a hostile file cannot make
/// import allocate gigabytes
const MAX_M_COST_KIB: u32 = 1024 * 1024;
const MAX_T_COST: u32 = 64;
const MAX_P_COST: u32 = 16;

const FILE_PREFIX: &str = "shade-backup-";
const FILE_SUFFIX: &str = ".shdb";

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub m_cost_kib: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost_kib: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

impl KdfParams {
    /// Minimum cost. Only for tests and throwaway stores.
    pub fn light() -> Self {
        Self {
            m_cost_kib: 8,
            t_cost: 1,
            p_cost: 1,
        }
    }

    fn check_bounds(&self) -> Result<()> {
        if self.m_cost_kib > MAX_M_COST_KIB || self.t_cost > MAX_T_COST || self.p_cost > MAX_P_COST
        {
            return Err(WalletError::MalformedInput(format!(
                "kdf parameters out of range: {self:?}"
            )));
        }
        Ok(())
    }

    fn derive_key(&self, password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN]> {
        self.check_bounds()?;
        let params = Params::new(self.m_cost_kib, self.t_cost, self.p_cost, Some(KEY_LEN))
            .map_err(|e| WalletError::MalformedInput(format!("kdf parameters: {e}")))?;

        let mut key = [0u8; KEY_LEN];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| WalletError::MalformedInput(format!("key derivation: {e}")))?;
        Ok(key)
    }
}

/// Per-export nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupNonce([u8; NONCE_LEN]);

impl BackupNonce {
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

fn header(params: &KdfParams, salt: &[u8; SALT_LEN], nonce: &BackupNonce) -> Vec<u8> {
    let mut h = Vec::with_capacity(HEADER_LEN);
    h.extend_from_slice(MAGIC);
    h.push(VERSION);
    h.extend_from_slice(&params.m_cost_kib.to_be_bytes());
    h.extend_from_slice(&params.t_cost.to_be_bytes());
    h.extend_from_slice(&params.p_cost.to_be_bytes());
    h.extend_from_slice(salt);
    h.extend_from_slice(nonce.as_bytes());
    h
}

/// Encrypt `plaintext` under `password`
pub fn seal(
    plaintext: &[u8],
    password: &str,
    nonce: &BackupNonce,
    params: &KdfParams,
) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = params.derive_key(password, &salt)?;
    let header = header(params, &salt, nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|e| WalletError::MalformedInput(format!("encryption failed: {e}")))?;

    let mut blob = header;
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`seal`]
///
/// A damaged header is `MalformedInput`; a wrong password or any change to
/// the ciphertext or header contents is `Authentication`.
pub fn open(blob: &[u8], password: &str) -> Result<Vec<u8>> {
    if blob.len() < HEADER_LEN + 16 {
        return Err(WalletError::MalformedInput("backup too short".into()));
    }
    let (header, ciphertext) = blob.split_at(HEADER_LEN);
    if &header[..4] != MAGIC {
        return Err(WalletError::MalformedInput("not a shade backup".into()));
    }
    if header[4] != VERSION {
        return Err(WalletError::MalformedInput(format!(
            "unsupported backup version {}",
            header[4]
        )));
    }

    let word = |at: usize| {
        u32::from_be_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
    };
    let params = KdfParams {
        m_cost_kib: word(5),
        t_cost: word(9),
        p_cost: word(13),
    };
    let salt = &header[17..17 + SALT_LEN];
    let nonce = &header[17 + SALT_LEN..HEADER_LEN];

    let key = params.derive_key(password, salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| WalletError::Authentication)
}

/// Directory of numbered backup files
///
/// Files are named `shade-backup-{seq}-{utc}.shdb`. The sequence number, not
/// the clock, orders them: each write takes the highest existing number plus
/// one.
#[derive(Debug, Clone)]
pub struct BackupTarget {
    dir: PathBuf,
    /// Number of files kept after a write; 0 keeps everything
    retention: usize,
    writer: Arc<Mutex<()>>,
}

impl BackupTarget {
    pub fn new(dir: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            dir: dir.into(),
            retention,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `blob` to a new file, atomically, then prune old files
    pub async fn write(&self, blob: &[u8]) -> Result<PathBuf> {
        let _writer = self.writer.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut seq = self.list_numbered().await?.last().map_or(0, |(seq, _)| seq + 1);
        let (name, path) = loop {
            let name = format!(
                "{FILE_PREFIX}{seq:010}-{}{FILE_SUFFIX}",
                Utc::now().format("%Y%m%dT%H%M%S%3fZ")
            );
            let path = self.dir.join(&name);
            if !tokio::fs::try_exists(&path).await? {
                break (name, path);
            }
            seq += 1;
        };
        let tmp = self.dir.join(format!(".{name}.tmp"));

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(blob).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &path).await?;

        info!(path = %path.display(), seq, bytes = blob.len(), "backup written");
        self.prune().await?;
        Ok(path)
    }

    /// Backup files, oldest first
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .list_numbered()
            .await?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    async fn list_numbered(&self) -> Result<Vec<(u64, PathBuf)>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(seq) = sequence_of(&name.to_string_lossy()) {
                files.push((seq, entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    pub async fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list().await?.pop())
    }

    async fn prune(&self) -> Result<()> {
        if self.retention == 0 {
            return Ok(());
        }
        let files = self.list().await?;
        let excess = files.len().saturating_sub(self.retention);
        for old in &files[..excess] {
            debug!(path = %old.display(), "pruning old backup");
            tokio::fs::remove_file(old).await?;
        }
        Ok(())
    }
}

fn sequence_of(name: &str) -> Option<u64> {
    let rest = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    let (seq, _stamp) = rest.split_once('-')?;
    seq.parse().ok()
}
