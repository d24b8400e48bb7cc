//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Canonical codec (sorted-key JSON + SHA-256)
//! - Transactions and blocks (UTXO model, proof of work)
//! - Transaction and block validation rules
//! - The committed ledger and the UTXO index derived from it
//! - Supply schedule simulation

pub mod block;
pub mod codec;
pub mod consensus;
pub mod error;
pub mod ledger;
pub mod supply;
pub mod transaction;
pub mod utxo;
pub mod validator;

pub use block::Block;
pub use codec::{canonicalize, CodecError};
pub use consensus::validate_block;
pub use error::ValidationError;
pub use ledger::{ChainStats, Ledger, LedgerError};
pub use supply::{SupplyEra, SupplySchedule};
pub use transaction::{
    AuthData, OutputRef, PreviousOutput, Transaction, TransactionError, TxInput, TxOutput,
    TX_ID_HEX_LEN,
};
pub use utxo::{collect_utxos, UtxoEntry, UtxoLocation, UtxoSet};
pub use validator::{check_transaction, validate_transaction, TxAmounts, TxContext};
