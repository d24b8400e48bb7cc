//! Validation error taxonomy
//!
//! Every rejected transaction or block maps to exactly one variant, naming
//! the rule that failed.

use crate::core::codec::CodecError;
use crate::core::transaction::OutputRef;
use crate::crypto::KeyError;
use thiserror::Error;

/// Reasons a transaction or block is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed record: {0}")]
    Malformed(String),
    #[error("Referenced output {0} does not exist")]
    OutputNotFound(OutputRef),
    #[error("Output {0} is not addressed to the transaction's public key")]
    NotOwner(OutputRef),
    #[error("Output {0} is already claimed by pending transaction {1}")]
    DoubleSpendPending(OutputRef, String),
    #[error("Output {0} is already spent")]
    DoubleSpendConfirmed(OutputRef),
    #[error("Output {index} has invalid value {value} (minimum is 1)")]
    InvalidOutputValue { index: usize, value: u64 },
    #[error("Outputs total {output_sum} exceeds inputs total {input_sum}")]
    InsufficientInput { input_sum: u64, output_sum: u64 },
    #[error("Malformed public key: {0}")]
    MalformedKey(String),
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Signature is invalid")]
    InvalidSignature,
    #[error("Transaction {0} is already pending")]
    DuplicateTx(String),
    #[error("First transaction of the block is not a well-formed coinbase")]
    MissingCoinbase,
    #[error("Coinbase pays {actual}, expected block reward plus fees of {expected}")]
    BadCoinbaseValue { expected: u64, actual: u64 },
    #[error("Block header {actual} does not match previous block hash {expected}")]
    BadPreviousHash { expected: String, actual: String },
    #[error("Block hash {hash} does not start with {difficulty} zeroes")]
    InvalidProofOfWork { hash: String, difficulty: u32 },
    #[error("Block height {actual} should be {expected}")]
    HeightMismatch { expected: u64, actual: u64 },
    #[error("Block carries {count} transactions, allowed range is {min}..={max}")]
    TxCountOutOfRange { count: usize, min: usize, max: usize },
}

impl ValidationError {
    /// Stable snake_case name of the failed rule
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Malformed(_) => "malformed",
            ValidationError::OutputNotFound(_) => "output_not_found",
            ValidationError::NotOwner(_) => "not_owner",
            ValidationError::DoubleSpendPending(..) => "double_spend_pending",
            ValidationError::DoubleSpendConfirmed(_) => "double_spend_confirmed",
            ValidationError::InvalidOutputValue { .. } => "invalid_output_value",
            ValidationError::InsufficientInput { .. } => "insufficient_input",
            ValidationError::MalformedKey(_) => "malformed_key",
            ValidationError::MalformedSignature(_) => "malformed_signature",
            ValidationError::InvalidSignature => "invalid_signature",
            ValidationError::DuplicateTx(_) => "duplicate_tx",
            ValidationError::MissingCoinbase => "missing_coinbase",
            ValidationError::BadCoinbaseValue { .. } => "bad_coinbase_value",
            ValidationError::BadPreviousHash { .. } => "bad_previous_hash",
            ValidationError::InvalidProofOfWork { .. } => "invalid_proof_of_work",
            ValidationError::HeightMismatch { .. } => "height_mismatch",
            ValidationError::TxCountOutOfRange { .. } => "tx_count_out_of_range",
        }
    }
}

impl From<CodecError> for ValidationError {
    fn from(err: CodecError) -> Self {
        ValidationError::Malformed(err.to_string())
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::Malformed(err.to_string())
    }
}

impl From<KeyError> for ValidationError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::MalformedKey(msg) => ValidationError::MalformedKey(msg),
            KeyError::MalformedSignature(msg) => ValidationError::MalformedSignature(msg),
            KeyError::VerificationFailed => ValidationError::InvalidSignature,
            other => ValidationError::Malformed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_error_mapping() {
        assert_eq!(
            ValidationError::from(KeyError::VerificationFailed),
            ValidationError::InvalidSignature
        );
        assert_eq!(
            ValidationError::from(KeyError::MalformedKey("len".into())).kind(),
            "malformed_key"
        );
    }

    #[test]
    fn test_json_error_is_malformed() {
        let err = serde_json::from_str::<u64>("\"nope\"").unwrap_err();
        assert_eq!(ValidationError::from(err).kind(), "malformed");
    }
}
