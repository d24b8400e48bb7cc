//! Canonical codec
//!
//! Records are serialized through a `serde_json::Value` tree whose object
//! keys are re-inserted in sorted order, so the emitted bytes do not depend
//! on field declaration or insertion order. All amounts in the ledger are
//! fixed-width integers, so every number has exactly one textual
//! representation.

use crate::crypto::{sha256, DIGEST_LEN};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while canonicalizing a record
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serialize a record into its canonical byte form
pub fn canonicalize<T: Serialize + ?Sized>(record: &T) -> Result<Vec<u8>, CodecError> {
    let value = sort_keys(serde_json::to_value(record)?);
    Ok(serde_json::to_vec(&value)?)
}

// Holds even if serde_json is built with `preserve_order`.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// SHA-256 digest of the canonical form
pub fn hash<T: Serialize + ?Sized>(record: &T) -> Result<[u8; DIGEST_LEN], CodecError> {
    Ok(sha256(&canonicalize(record)?))
}

/// Hex-encoded SHA-256 digest of the canonical form
pub fn hash_hex<T: Serialize + ?Sized>(record: &T) -> Result<String, CodecError> {
    Ok(hex::encode(hash(record)?))
}
