use thiserror::Error;

/// Failures surfaced by the ledger engine. A rejected call reports exactly
/// one of these and leaves state untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ForestError {
    #[error("caller is not the owner")]
    Unauthorized,
    #[error("signature does not match the authorized signer")]
    InvalidSignature,
    #[error("time is not the start of the current UTC day")]
    InvalidTime,
    #[error("record already exists for this key")]
    DuplicateData,
    #[error("zero address is not allowed")]
    ZeroAddress,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("missing 0x prefix: {0}")]
    MissingPrefix(String),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid secp256k1 signing key")]
    InvalidKey,
    #[error("signing failed: {0}")]
    Signing(#[from] k256::ecdsa::Error),
}
