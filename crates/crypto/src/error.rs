//! Error taxonomy for the trust primitives.
//!
//! Failures come in two tiers. Fatal errors mean a misconfigured environment
//! or a programming error and abort the calling operation. Recoverable errors
//! are the normal outcome of handling stale or attacker-supplied material and
//! are expected to be logged and acted upon by the caller. Signature checks
//! never produce an error at all; they answer `false`.

use thiserror::Error;

use crate::keys::KeyType;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RSA key length is incorrect: declared {declared}, found {actual}")]
    KeyLengthMismatch { declared: KeyType, actual: KeyType },

    #[error("Random generator has not been sufficiently seeded: {0}")]
    InsufficientEntropy(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Certificate construction failed at {context}: {diagnostic}")]
    CertificateConstruction { context: String, diagnostic: String },

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("PKCS#12 import failed: {0}")]
    Pkcs12Import(String),
}

impl CryptoError {
    /// Whether this error belongs to the fatal tier.
    pub fn is_fatal(&self) -> bool {
        match self {
            CryptoError::UnsupportedAlgorithm(_)
            | CryptoError::Io(_)
            | CryptoError::KeyLengthMismatch { .. }
            | CryptoError::InsufficientEntropy(_)
            | CryptoError::KeyGeneration(_)
            | CryptoError::CertificateConstruction { .. } => true,
            CryptoError::InvalidKeyFormat(_)
            | CryptoError::Signing(_)
            | CryptoError::KeyStore(_)
            | CryptoError::Pkcs12Import(_) => false,
        }
    }

    pub(crate) fn certificate(context: &str, stack: openssl::error::ErrorStack) -> Self {
        CryptoError::CertificateConstruction {
            context: context.to_string(),
            diagnostic: stack.to_string(),
        }
    }
}

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;
