//! ECDSA key management for the ledger
//!
//! Provides key pair generation, signing, and verification using
//! the secp256k1 elliptic curve. Public keys double as addresses.

use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

/// Length of a compact `r || s` signature
pub const SIGNATURE_LEN: usize = 64;

/// Length of a raw uncompressed point without the SEC1 `0x04` tag
pub const RAW_PUBLIC_KEY_LEN: usize = 64;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Malformed public key: {0}")]
    MalformedKey(String),
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Message digest must be 32 bytes, got {0}")]
    InvalidDigest(usize),
    #[error("Signature verification failed")]
    VerificationFailed,
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Public key bytes in compressed SEC1 form, used as the address
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.serialize().to_vec()
    }

    /// Public key as 64 raw bytes (uncompressed point without the tag)
    pub fn raw_public_key_bytes(&self) -> Vec<u8> {
        self.public_key.serialize_uncompressed()[1..].to_vec()
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Sign a 32-byte message digest with the private key
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_digest(&self.secret_key, digest)
    }
}

/// Parse a public key from its wire bytes.
///
/// Accepts 33-byte compressed and 65-byte uncompressed SEC1 encodings as
/// well as the 64-byte raw point.
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    let parsed = match bytes.len() {
        RAW_PUBLIC_KEY_LEN => {
            let mut tagged = Vec::with_capacity(RAW_PUBLIC_KEY_LEN + 1);
            tagged.push(0x04);
            tagged.extend_from_slice(bytes);
            PublicKey::from_slice(&tagged)
        }
        33 | 65 => PublicKey::from_slice(bytes),
        len => {
            return Err(KeyError::MalformedKey(format!(
                "unsupported key length {}",
                len
            )))
        }
    };
    parsed.map_err(|e| KeyError::MalformedKey(e.to_string()))
}

/// Parse a public key from a hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|e| KeyError::MalformedKey(e.to_string()))?;
    parse_public_key(&bytes)
}

fn digest_message(digest: &[u8]) -> Result<Message, KeyError> {
    if digest.len() != 32 {
        return Err(KeyError::InvalidDigest(digest.len()));
    }
    Message::from_digest_slice(digest).map_err(|_| KeyError::InvalidDigest(digest.len()))
}

/// Sign a message digest with a secret key, returning a compact signature
pub fn sign_digest(secret_key: &SecretKey, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::signing_only();
    let message = digest_message(digest)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact signature over a digest under the given public key bytes
pub fn verify_signature(
    public_key: &[u8],
    digest: &[u8],
    signature: &[u8],
) -> Result<(), KeyError> {
    let public_key = parse_public_key(public_key)?;

    if signature.len() != SIGNATURE_LEN {
        return Err(KeyError::MalformedSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            signature.len()
        )));
    }
    let mut sig = Signature::from_compact(signature)
        .map_err(|e| KeyError::MalformedSignature(e.to_string()))?;
    // libsecp256k1 only accepts low-S signatures
    sig.normalize_s();

    let message = digest_message(digest)?;
    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&message, &sig, &public_key)
        .map_err(|_| KeyError::VerificationFailed)
}
