//! Unspent output index
//!
//! Derives the outputs spendable by a public key by scanning the committed
//! chain and, optionally, the pending pool. Nothing is stored; every query
//! rescans.

use crate::core::block::Block;
use crate::core::transaction::{OutputRef, Transaction};
use serde::Serialize;
use std::collections::HashSet;

/// Where an unspent output lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoLocation {
    /// Output of a committed transaction
    Confirmed(OutputRef),
    /// Output of a pending transaction, not yet addressable by height
    Pending { tx_id: String, output_index: u32 },
}

/// One unspent output and its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtxoEntry {
    pub location: UtxoLocation,
    pub value: u64,
}

/// Unspent outputs of a key and their total value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UtxoSet {
    pub entries: Vec<UtxoEntry>,
    pub total: u64,
}

/// Collect the unspent outputs addressed to `pk`.
///
/// Outputs are gathered from `blocks` and `pending`, then every output
/// referenced by an input anywhere in the same scope is dropped.
pub fn collect_utxos<'a, I>(pk: &[u8], blocks: &[Block], pending: I) -> UtxoSet
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let pending: Vec<&Transaction> = pending.into_iter().collect();
    let mut candidates = Vec::new();

    for block in blocks {
        for (tx_index, tx) in block.transactions.iter().enumerate() {
            for (output_index, output) in tx.outputs.iter().enumerate() {
                if output.is_owned_by(pk) {
                    candidates.push(UtxoEntry {
                        location: UtxoLocation::Confirmed(OutputRef::new(
                            block.height,
                            tx_index as u32,
                            output_index as u32,
                        )),
                        value: output.value,
                    });
                }
            }
        }
    }

    for tx in &pending {
        for (output_index, output) in tx.outputs.iter().enumerate() {
            if output.is_owned_by(pk) {
                candidates.push(UtxoEntry {
                    location: UtxoLocation::Pending {
                        tx_id: tx.tx_id.clone(),
                        output_index: output_index as u32,
                    },
                    value: output.value,
                });
            }
        }
    }

    let spent: HashSet<OutputRef> = blocks
        .iter()
        .flat_map(|block| block.transactions.iter())
        .chain(pending.iter().copied())
        .flat_map(|tx| tx.spent_outputs())
        .collect();

    let entries: Vec<UtxoEntry> = candidates
        .into_iter()
        .filter(|entry| match &entry.location {
            UtxoLocation::Confirmed(outpoint) => !spent.contains(outpoint),
            UtxoLocation::Pending { .. } => true,
        })
        .collect();

    let total = entries
        .iter()
        .fold(0u64, |acc, entry| acc.saturating_add(entry.value));

    UtxoSet { entries, total }
}
