//! Key pair generation.
//!
//! RSA pairs come out as PEM (SubjectPublicKeyInfo public key, PKCS#1
//! private key). Ed25519 pairs come out as upper-case hex: the 32-byte public
//! key and the 64-byte `seed || public` secret key.

use std::str::FromStr;

use ed25519_dalek::SigningKey;
use openssl::bn::BigNum;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};
use crate::keys::KeyType;
use crate::signing::{ED25519_KEYPAIR_BYTES, ED25519_SEED_BYTES};
use ota_trust_core::config::{KeygenConfig, DEFAULT_MIN_RSA_BITS};

const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// A freshly generated key pair in its textual form.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPairPem {
    pub public: String,
    pub private: String,
}

impl std::fmt::Debug for KeyPairPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairPem")
            .field("public", &self.public)
            .field("private", &"<redacted>")
            .finish()
    }
}

/// Probes the random number generators key generation depends on.
pub fn ensure_rng_seeded() -> Result<()> {
    let mut probe = [0u8; 16];
    getrandom::getrandom(&mut probe)
        .map_err(|e| CryptoError::InsufficientEntropy(format!("OS entropy source: {}", e)))?;
    openssl::rand::rand_bytes(&mut probe)
        .map_err(|e| CryptoError::InsufficientEntropy(format!("OpenSSL DRBG: {}", e)))?;
    probe.zeroize();
    Ok(())
}

/// Generates an RSA key with exponent 65537.
///
/// `min_bits` is a sanity floor, not a security policy; the historical
/// default of [`DEFAULT_MIN_RSA_BITS`] admits tiny test keys.
pub fn generate_rsa_pkey(bits: u32, min_bits: u32) -> Result<PKey<Private>> {
    if bits < min_bits {
        return Err(CryptoError::KeyGeneration(format!(
            "RSA key size {} is below the minimum of {} bits",
            bits, min_bits
        )));
    }
    ensure_rng_seeded()?;

    let exponent = BigNum::from_u32(RSA_PUBLIC_EXPONENT)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let rsa = Rsa::generate_with_e(bits, &exponent)
        .map_err(|e| CryptoError::KeyGeneration(format!("RSA {} bits: {}", bits, e)))?;
    PKey::from_rsa(rsa).map_err(|e| CryptoError::KeyGeneration(e.to_string()))
}

fn rsa_key_pair(bits: u32) -> Result<KeyPairPem> {
    let pkey = generate_rsa_pkey(bits, DEFAULT_MIN_RSA_BITS)?;
    let rsa = pkey
        .rsa()
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    let public = pkey
        .public_key_to_pem()
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let private = rsa
        .private_key_to_pem()
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    Ok(KeyPairPem {
        public: pem_to_string(public)?,
        private: pem_to_string(private)?,
    })
}

fn pem_to_string(pem: Vec<u8>) -> Result<String> {
    String::from_utf8(pem).map_err(|e| CryptoError::KeyGeneration(e.to_string()))
}

/// Generates an Ed25519 pair: `(public, secret)` as upper-case hex.
pub fn generate_ed25519_key_pair() -> Result<KeyPairPem> {
    let mut seed = [0u8; ED25519_SEED_BYTES];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|e| CryptoError::InsufficientEntropy(e.to_string()))?;

    let signing_key = SigningKey::from_bytes(&seed);
    seed.zeroize();

    let mut keypair: [u8; ED25519_KEYPAIR_BYTES] = signing_key.to_keypair_bytes();
    let pair = KeyPairPem {
        public: hex::encode_upper(signing_key.verifying_key().as_bytes()),
        private: hex::encode_upper(keypair),
    };
    keypair.zeroize();
    Ok(pair)
}

/// Generates a key pair of the requested type.
pub fn generate_key_pair(key_type: KeyType) -> Result<KeyPairPem> {
    match key_type {
        KeyType::Ed25519 => generate_ed25519_key_pair(),
        KeyType::Rsa2048 | KeyType::Rsa3072 | KeyType::Rsa4096 => match key_type.rsa_bits() {
            Some(bits) => rsa_key_pair(bits),
            None => Err(CryptoError::UnsupportedAlgorithm(key_type.to_string())),
        },
        KeyType::Unknown => Err(CryptoError::UnsupportedAlgorithm(format!(
            "cannot generate a key of type {}",
            key_type
        ))),
    }
}

/// Key generation settings taken from [`KeygenConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeygenPolicy {
    pub key_type: KeyType,
    pub min_rsa_bits: u32,
}

impl Default for KeygenPolicy {
    fn default() -> Self {
        Self {
            key_type: KeyType::Rsa2048,
            min_rsa_bits: DEFAULT_MIN_RSA_BITS,
        }
    }
}

impl KeygenPolicy {
    pub fn from_config(config: &KeygenConfig) -> Result<Self> {
        let key_type = KeyType::from_str(&config.key_type)?;
        if key_type == KeyType::Unknown {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "configured key type {}",
                config.key_type
            )));
        }
        Ok(Self {
            key_type,
            min_rsa_bits: config.min_rsa_bits,
        })
    }

    /// Generates a pair of the configured type.
    pub fn generate(&self) -> Result<KeyPairPem> {
        match self.key_type.rsa_bits() {
            Some(bits) if bits < self.min_rsa_bits => Err(CryptoError::KeyGeneration(format!(
                "RSA key size {} is below the minimum of {} bits",
                bits, self.min_rsa_bits
            ))),
            _ => generate_key_pair(self.key_type),
        }
    }
}
