//! Shade Privacy SDK
//!
//! Commitment-protocol primitives for shielded deposits, withdrawals and
//! swaps on the venue.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Shielded Operation                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifier   │  │  Commitment  │  │   Merkle root         │ │
//! │  │  H(C, b)     │  │  H(v, b)     │  │   (from auth path)    │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │         Circuit inputs (deposit / withdraw / swap)       │   │
//! │  │  • named, ordered exactly as the circuit expects         │   │
//! │  │  • token and recipient addresses as field elements       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod address;
pub mod commitment;
pub mod element;
pub mod error;
pub mod hash;
pub mod inputs;
pub mod merkle;
pub mod nullifier;

pub use address::Address;
pub use commitment::{BlindingFactor, Commitment, CommitmentScheme};
pub use element::Element;
pub use error::PrivacyError;
pub use hash::{FieldHasher, HasherId, HasherKind, LinearHasher, PoseidonHasher};
pub use inputs::{CircuitInputs, DepositInputs, ProofKind, Signal, SwapInputs, WithdrawInputs};
pub use merkle::{MAX_TREE_DEPTH, MerkleAuthPath, RootHistory, TrustedRoots, merkle_root};
pub use nullifier::{Nullifier, derive_nullifier};
