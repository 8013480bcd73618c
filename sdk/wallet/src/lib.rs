//! Shade Wallet SDK
//!
//! Client-side half of the shielded protocol: holds the secrets that open
//! commitments, backs them up, and builds deposit / withdraw / swap proofs.
//!
//! ```text
//! TransactionBuilder
//!   ├── SecretStore       commitment → blinding factor, per-commitment locks
//!   │     └── backup      Argon2id + ChaCha20-Poly1305 blobs, rotated files
//!   ├── TrustedRoots      roots the ledger currently accepts (optional)
//!   └── ProverService     background proving, cancellation, timeout
//! ```

pub mod backup;
pub mod builder;
pub mod error;
pub mod secret;
pub mod store;

pub use backup::{BackupNonce, BackupTarget, KdfParams};
pub use builder::{DepositRequest, SwapRequest, TransactionBuilder, WithdrawRequest};
pub use error::{ErrorClass, Result, WalletError};
pub use secret::{ExportableSecret, SecretRecord, SpentPolicy};
pub use store::{CommitmentGuard, SecretStore, StoreInit};
