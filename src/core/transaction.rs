//! Transaction records
//!
//! Implements the UTXO transaction model. Inputs reference committed outputs
//! by `(block height, transaction index, output index)`; the whole
//! transaction minus its [`AuthData`] is signed with secp256k1 ECDSA.

use crate::core::codec::{self, CodecError};
use crate::core::error::ValidationError;
use crate::crypto::{verify_signature, KeyError, KeyPair, DIGEST_LEN};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Number of hex characters in a transaction id (128 bits)
pub const TX_ID_HEX_LEN: usize = 32;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while building or signing a transaction
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
}

// =============================================================================
// Output references
// =============================================================================

/// Location of one output of one transaction in one committed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputRef {
    pub block_height: u64,
    pub tx_index: u32,
    pub output_index: u32,
}

impl OutputRef {
    pub fn new(block_height: u64, tx_index: u32, output_index: u32) -> Self {
        Self {
            block_height,
            tx_index,
            output_index,
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.block_height, self.tx_index, self.output_index
        )
    }
}

/// What an input spends: a committed output, or nothing for a coinbase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviousOutput {
    Coinbase,
    Output(OutputRef),
}

impl PreviousOutput {
    pub fn output_ref(&self) -> Option<OutputRef> {
        match self {
            PreviousOutput::Coinbase => None,
            PreviousOutput::Output(outpoint) => Some(*outpoint),
        }
    }
}

// =============================================================================
// Inputs, outputs and authorization
// =============================================================================

/// Transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TxInput {
    pub previous_output: PreviousOutput,
    /// Free-form payload, not checked against any locking script
    #[serde(with = "hex::serde")]
    pub signature_script: Vec<u8>,
}

impl TxInput {
    pub fn spending(outpoint: OutputRef) -> Self {
        Self {
            previous_output: PreviousOutput::Output(outpoint),
            signature_script: Vec::new(),
        }
    }

    pub fn coinbase() -> Self {
        Self {
            previous_output: PreviousOutput::Coinbase,
            signature_script: Vec::new(),
        }
    }
}

/// Transaction output, addressed to a public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TxOutput {
    /// Amount in minor units
    pub value: u64,
    /// Recipient public key bytes
    #[serde(with = "hex::serde")]
    pub pk_script: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, pk_script: Vec<u8>) -> Self {
        Self { value, pk_script }
    }

    /// Check if this output belongs to the given public key
    pub fn is_owned_by(&self, pk: &[u8]) -> bool {
        self.pk_script == pk
    }
}

/// Sender public key and signature over the rest of the transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthData {
    #[serde(with = "hex::serde")]
    pub pk: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

// =============================================================================
// Transaction
// =============================================================================

/// A ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    /// 128-bit identifier, lowercase hex
    pub tx_id: String,
    pub locktime: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub auth: AuthData,
}

/// The signed portion of a transaction: everything but `auth`
#[derive(Serialize)]
struct SigningView<'a> {
    tx_id: &'a str,
    locktime: u64,
    inputs: &'a [TxInput],
    outputs: &'a [TxOutput],
}

/// Generate a fresh random transaction id
pub fn new_tx_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

impl Transaction {
    /// Create a new unsigned transaction with a random id
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            tx_id: new_tx_id(),
            locktime: 0,
            inputs,
            outputs,
            auth: AuthData::default(),
        }
    }

    /// Create a coinbase transaction paying `value` to `recipient`
    pub fn coinbase(recipient: Vec<u8>, value: u64) -> Self {
        Self::new(vec![TxInput::coinbase()], vec![TxOutput::new(value, recipient)])
    }

    /// Zero-valued transaction skeleton
    pub fn template() -> Self {
        Self {
            tx_id: "0".repeat(TX_ID_HEX_LEN),
            locktime: 0,
            inputs: vec![TxInput::spending(OutputRef::new(0, 0, 0))],
            outputs: vec![TxOutput::new(0, Vec::new())],
            auth: AuthData::default(),
        }
    }

    /// Zero-valued coinbase skeleton
    pub fn coinbase_template() -> Self {
        Self {
            inputs: vec![TxInput::coinbase()],
            ..Self::template()
        }
    }

    /// True when the first input is the coinbase sentinel
    pub fn is_coinbase(&self) -> bool {
        matches!(
            self.inputs.first().map(|i| i.previous_output),
            Some(PreviousOutput::Coinbase)
        )
    }

    /// True for a coinbase with exactly one input and one output
    pub fn is_well_formed_coinbase(&self) -> bool {
        self.is_coinbase() && self.inputs.len() == 1 && self.outputs.len() == 1
    }

    /// Committed outputs this transaction consumes
    pub fn spent_outputs(&self) -> impl Iterator<Item = OutputRef> + '_ {
        self.inputs
            .iter()
            .filter_map(|input| input.previous_output.output_ref())
    }

    /// Sum of output values, `None` on overflow
    pub fn total_output(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, output| acc.checked_add(output.value))
    }

    /// Check the shape rules that need no ledger state
    pub fn check_structure(&self) -> Result<(), ValidationError> {
        if self.inputs.is_empty() {
            return Err(ValidationError::Malformed(format!(
                "transaction {} has no inputs",
                self.tx_id
            )));
        }
        if self.outputs.is_empty() {
            return Err(ValidationError::Malformed(format!(
                "transaction {} has no outputs",
                self.tx_id
            )));
        }
        if !is_valid_tx_id(&self.tx_id) {
            return Err(ValidationError::Malformed(format!(
                "transaction id should be {} hex characters, got {:?}",
                TX_ID_HEX_LEN, self.tx_id
            )));
        }
        if self.inputs.iter().skip(1).any(|i| i.previous_output == PreviousOutput::Coinbase) {
            return Err(ValidationError::Malformed(format!(
                "transaction {} uses a coinbase input outside the first position",
                self.tx_id
            )));
        }
        let mut seen = HashSet::new();
        if let Some(outpoint) = self.spent_outputs().find(|outpoint| !seen.insert(*outpoint)) {
            return Err(ValidationError::Malformed(format!(
                "transaction {} spends output {} more than once",
                self.tx_id, outpoint
            )));
        }
        Ok(())
    }

    /// Digest signed by the sender: the canonical hash without `auth`
    pub fn signing_hash(&self) -> Result<[u8; DIGEST_LEN], CodecError> {
        codec::hash(&SigningView {
            tx_id: &self.tx_id,
            locktime: self.locktime,
            inputs: &self.inputs,
            outputs: &self.outputs,
        })
    }

    /// Canonical hash of the full record
    pub fn hash_hex(&self) -> Result<String, CodecError> {
        codec::hash_hex(self)
    }

    /// Sign with the provided key pair, filling in `auth`
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        let digest = self.signing_hash()?;
        self.auth = AuthData {
            pk: key_pair.public_key_bytes(),
            signature: key_pair.sign(&digest)?,
        };
        Ok(())
    }

    /// Verify `auth.signature` over the signing hash under `auth.pk`.
    ///
    /// A coinbase has no sender, so it always passes.
    pub fn verify_signature(&self) -> Result<(), ValidationError> {
        if self.is_coinbase() {
            return Ok(());
        }
        let digest = self.signing_hash()?;
        verify_signature(&self.auth.pk, &digest, &self.auth.signature)?;
        Ok(())
    }
}

/// A transaction id is exactly 32 lowercase hex digits
pub fn is_valid_tx_id(tx_id: &str) -> bool {
    tx_id.len() == TX_ID_HEX_LEN && tx_id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_spend(owner: &KeyPair) -> Transaction {
        let mut tx = Transaction::new(
            vec![TxInput::spending(OutputRef::new(1, 0, 0))],
            vec![TxOutput::new(40, owner.public_key_bytes())],
        );
        tx.sign(owner).unwrap();
        tx
    }

    #[test]
    fn test_coinbase_transaction() {
        let tx = Transaction::coinbase(vec![1, 2, 3], 1000);
        assert!(tx.is_coinbase());
        assert!(tx.is_well_formed_coinbase());
        assert_eq!(tx.total_output(), Some(1000));
        assert_eq!(tx.spent_outputs().count(), 0);
        assert!(tx.check_structure().is_ok());
        assert!(tx.verify_signature().is_ok());
    }

    #[test]
    fn test_sign_and_verify() {
        let owner = KeyPair::generate();
        let tx = signed_spend(&owner);
        assert_eq!(tx.auth.pk, owner.public_key_bytes());
        assert!(tx.verify_signature().is_ok());
    }

    #[test]
    fn test_tampered_transaction_fails_verification() {
        let owner = KeyPair::generate();
        let mut tx = signed_spend(&owner);
        tx.outputs[0].value += 1;
        assert_eq!(tx.verify_signature(), Err(ValidationError::InvalidSignature));
    }

    #[test]
    fn test_swapped_public_key_fails_verification() {
        let signer = KeyPair::generate();
        let victim = KeyPair::generate();
        let mut tx = signed_spend(&signer);
        tx.auth.pk = victim.public_key_bytes();
        assert_eq!(tx.verify_signature(), Err(ValidationError::InvalidSignature));
    }

    #[test]
    fn test_malformed_auth() {
        let owner = KeyPair::generate();
        let mut tx = signed_spend(&owner);
        tx.auth.signature.truncate(10);
        assert!(matches!(
            tx.verify_signature(),
            Err(ValidationError::MalformedSignature(_))
        ));

        let mut tx = signed_spend(&owner);
        tx.auth.pk = vec![7; 5];
        assert!(matches!(
            tx.verify_signature(),
            Err(ValidationError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_signing_hash_excludes_auth() {
        let owner = KeyPair::generate();
        let tx = signed_spend(&owner);
        let mut unsigned = tx.clone();
        unsigned.auth = AuthData::default();
        assert_eq!(tx.signing_hash().unwrap(), unsigned.signing_hash().unwrap());
        assert_ne!(tx.hash_hex().unwrap(), unsigned.hash_hex().unwrap());
    }

    #[test]
    fn test_check_structure() {
        let mut tx = Transaction::template();
        assert!(tx.check_structure().is_ok());

        tx.tx_id = "abc".into();
        assert!(matches!(tx.check_structure(), Err(ValidationError::Malformed(_))));

        let mut tx = Transaction::template();
        tx.outputs.clear();
        assert!(matches!(tx.check_structure(), Err(ValidationError::Malformed(_))));

        let mut tx = Transaction::template();
        tx.inputs.push(TxInput::coinbase());
        assert!(matches!(tx.check_structure(), Err(ValidationError::Malformed(_))));

        let mut tx = Transaction::template();
        tx.inputs.push(tx.inputs[0].clone());
        assert!(matches!(tx.check_structure(), Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn test_tx_ids_are_unique_hex() {
        let a = new_tx_id();
        let b = new_tx_id();
        assert!(is_valid_tx_id(&a));
        assert_ne!(a, b);
        assert!(!is_valid_tx_id(&"g".repeat(TX_ID_HEX_LEN)));
    }

    #[test]
    fn test_uppercase_tx_id_is_malformed() {
        let mut tx = Transaction::template();
        tx.tx_id = "AB".repeat(TX_ID_HEX_LEN / 2);
        assert!(matches!(tx.check_structure(), Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn test_json_shape() {
        let tx = Transaction::coinbase_template();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["inputs"][0]["previous_output"], "coinbase");
        assert_eq!(json["outputs"][0]["value"], 0);

        let spend = Transaction::template();
        let json = serde_json::to_value(&spend).unwrap();
        assert_eq!(json["inputs"][0]["previous_output"]["output"]["block_height"], 0);

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, spend);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut json = serde_json::to_value(Transaction::template()).unwrap();
        json["extra"] = serde_json::json!(1);
        assert!(serde_json::from_value::<Transaction>(json).is_err());
    }
}
