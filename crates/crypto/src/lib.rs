//! Cryptographic primitives for the OTA update client trust layer.
//!
//! This crate provides what the update client needs to check signed metadata
//! and to provision device identity. Everything above it (metadata parsing,
//! trust-chain policy, transport) builds on these primitives.
//!
//! # Core Capabilities
//!
//! - **Digests**: SHA-256 / SHA-512, one-shot or streamed, in typed form
//! - **Keys**: typed public keys, JSON key descriptors, key identifiers
//! - **Signatures**: Ed25519 and RSA-PSS signing and verification
//! - **Provisioning**: RSA/Ed25519 key generation, X.509 certificates, CA
//!   signing, PKCS#12 import
//! - **Bootstrap**: one-time OpenSSL provider initialization
//!
//! # Security Principles
//!
//! - Verification answers `true`/`false` and never errors on untrusted input
//! - Unknown algorithms are rejected explicitly, never guessed
//! - Secrets are never logged and are zeroized after use
//!
//! Requires OpenSSL 3.

pub mod canonical;
pub mod certificate;
pub mod digest;
pub mod error;
pub mod keygen;
pub mod keys;
pub mod pkcs12;
pub mod provider;
pub mod signing;


pub use certificate::{
    distinguished_name_entries, extract_subject_cn, generate_certificate, CertificateParams,
    PendingCertificate, SubjectFields,
};
pub use digest::{
    sha256_digest, sha256_digest_hex, sha512_digest, sha512_digest_hex, Hash, HashType, Hasher,
};
pub use error::{CryptoError, Result};
pub use keygen::{
    ensure_rng_seeded, generate_ed25519_key_pair, generate_key_pair, generate_rsa_pkey,
    KeyPairPem, KeygenPolicy,
};
pub use keys::{identify_rsa_key_type, KeyType, PublicKey};
pub use pkcs12::{import_pkcs12, import_pkcs12_file, CertificateBundle};
pub use provider::{initialize_crypto_provider, provider_status, ProviderStatus};
pub use signing::{
    ed25519_sign, ed25519_verify, rsa_pss_sign, rsa_pss_verify, sign, try_sign, KeyStore,
    PemKeyStore, PrivateKeySource,
};
