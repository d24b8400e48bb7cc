//! Transaction validator
//!
//! Read-only checks of a single transaction against the committed ledger
//! and, when given, the pending pool. Rules run in a fixed order and the
//! first failure is returned.

use crate::core::error::ValidationError;
use crate::core::ledger::Ledger;
use crate::core::transaction::{OutputRef, Transaction};
use crate::mempool::Mempool;
use std::collections::HashSet;

/// State a transaction is checked against
#[derive(Clone, Copy)]
pub struct TxContext<'a> {
    pub ledger: &'a Ledger,
    /// Pending claims; `None` when validating inside a block
    pub mempool: Option<&'a Mempool>,
    /// Outputs consumed by earlier transactions of the block under validation
    pub block_spent: Option<&'a HashSet<OutputRef>>,
}

impl<'a> TxContext<'a> {
    /// Context for pool admission
    pub fn pending(ledger: &'a Ledger, mempool: &'a Mempool) -> Self {
        Self {
            ledger,
            mempool: Some(mempool),
            block_spent: None,
        }
    }

    /// Context for a transaction inside a candidate block
    pub fn in_block(ledger: &'a Ledger, block_spent: &'a HashSet<OutputRef>) -> Self {
        Self {
            ledger,
            mempool: None,
            block_spent: Some(block_spent),
        }
    }

    fn spent_in_block(&self, outpoint: &OutputRef) -> bool {
        self.block_spent
            .map(|spent| spent.contains(outpoint))
            .unwrap_or(false)
    }
}

/// Resolved input and output totals of a valid transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxAmounts {
    pub input_sum: u64,
    pub output_sum: u64,
}

impl TxAmounts {
    /// Surplus left to the block assembler; never underflows for a valid tx
    pub fn fee(&self) -> u64 {
        self.input_sum - self.output_sum
    }
}

/// Validate a transaction and report its amounts.
///
/// A coinbase passes once its shape is checked and reports zero amounts;
/// its value is settled at block level.
pub fn check_transaction(tx: &Transaction, ctx: &TxContext<'_>) -> Result<TxAmounts, ValidationError> {
    tx.check_structure()?;

    if tx.is_coinbase() {
        if !tx.is_well_formed_coinbase() {
            return Err(ValidationError::Malformed(format!(
                "coinbase {} must have exactly one input and one output",
                tx.tx_id
            )));
        }
        return Ok(TxAmounts::default());
    }

    let mut input_sum: u64 = 0;
    for outpoint in tx.spent_outputs() {
        let output = ctx
            .ledger
            .resolve_output(&outpoint)
            .ok_or(ValidationError::OutputNotFound(outpoint))?;

        if !output.is_owned_by(&tx.auth.pk) {
            return Err(ValidationError::NotOwner(outpoint));
        }

        if let Some(pool) = ctx.mempool {
            if let Some(claimant) = pool.claimant(&outpoint) {
                if claimant != tx.tx_id {
                    return Err(ValidationError::DoubleSpendPending(
                        outpoint,
                        claimant.to_string(),
                    ));
                }
            }
        }

        if ctx.ledger.is_spent(&outpoint) || ctx.spent_in_block(&outpoint) {
            return Err(ValidationError::DoubleSpendConfirmed(outpoint));
        }

        input_sum = input_sum.checked_add(output.value).ok_or_else(|| {
            ValidationError::Malformed(format!("input total of {} overflows", tx.tx_id))
        })?;
    }

    if let Some((index, output)) = tx.outputs.iter().enumerate().find(|(_, o)| o.value < 1) {
        return Err(ValidationError::InvalidOutputValue {
            index,
            value: output.value,
        });
    }

    let output_sum = tx.total_output().ok_or_else(|| {
        ValidationError::Malformed(format!("output total of {} overflows", tx.tx_id))
    })?;
    if output_sum > input_sum {
        return Err(ValidationError::InsufficientInput {
            input_sum,
            output_sum,
        });
    }

    tx.verify_signature()?;

    log::debug!(
        "Transaction {} valid: inputs {}, outputs {}",
        tx.tx_id,
        input_sum,
        output_sum
    );
    Ok(TxAmounts {
        input_sum,
        output_sum,
    })
}

/// Validate a transaction, discarding its amounts
pub fn validate_transaction(tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), ValidationError> {
    check_transaction(tx, ctx).map(|_| ())
}
