use thiserror::Error;

/// Input that cannot be encoded into the circuit field or path layout.
///
/// Every variant is caught before anything reaches a proof backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    /// Bytes do not encode a canonical field element
    #[error("value is not a canonical field element: {0}")]
    NonCanonicalElement(String),

    /// Hex or decimal text could not be parsed
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Address of the wrong byte length
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidAddressLength { expected: usize, got: usize },

    /// Merkle path depth outside the supported range
    #[error("invalid merkle path depth {depth} (supported 1..={max})")]
    InvalidPathDepth { depth: usize, max: usize },

    /// Leaf index does not fit the path depth
    #[error("leaf index {index} out of range for depth {depth}")]
    LeafIndexOutOfRange { index: u64, depth: usize },

    /// Amount of zero for an operation that moves value
    #[error("amount must be non-zero")]
    ZeroAmount,
}

pub type Result<T> = std::result::Result<T, PrivacyError>;
