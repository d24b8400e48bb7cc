//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing and the proof-of-work predicate
//! - ECDSA key management and verification (secp256k1)

pub mod hash;
pub mod keys;

pub use hash::{meets_difficulty, sha256, sha256_hex, DIGEST_LEN};
pub use keys::{
    parse_public_key, public_key_from_hex, sign_digest, verify_signature, KeyError, KeyPair,
    RAW_PUBLIC_KEY_LEN, SIGNATURE_LEN,
};
