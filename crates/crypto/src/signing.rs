//! Signing and verification - Ed25519 and RSA-PSS.
//!
//! RSA signatures use PKCS#1-PSS over SHA-256 with MGF1-SHA-256. The signer
//! always picks the maximum salt length the modulus allows; the verifier
//! recovers whatever salt length the signature carries instead of insisting
//! on one, so signatures issued under a different salt policy still verify.
//!
//! Private keys are given either as raw material or as a reference into an
//! external [`KeyStore`] such as an HSM.

use std::collections::HashMap;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use openssl::error::ErrorStack;
use openssl::md::Md;
use openssl::pkey::{Id, PKey, Private};
use openssl::pkey_ctx::PkeyCtx;
use openssl::rsa::Padding;
use openssl::sign::RsaPssSaltlen;
use zeroize::Zeroize;

use crate::digest::sha256_digest;
use crate::error::{CryptoError, Result};
use crate::keys::KeyType;

pub const ED25519_PUBLIC_KEY_BYTES: usize = 32;
pub const ED25519_SIGNATURE_BYTES: usize = 64;
pub const ED25519_SEED_BYTES: usize = 32;
/// Stored Ed25519 private keys are `seed || public key`.
pub const ED25519_KEYPAIR_BYTES: usize = 64;

/// `RSA_PSS_SALTLEN_AUTO`: on verification the salt length is read from the
/// encoded message.
const PSS_SALTLEN_AUTO: i32 = -2;

/// External private key storage, e.g. an HSM reached through PKCS#11.
pub trait KeyStore: Send + Sync {
    /// Loads the private key identified by `key_ref`.
    fn load_private_key(&self, key_ref: &str) -> Result<PKey<Private>>;
}

/// In-memory key store holding PEM private keys by reference.
#[derive(Default)]
pub struct PemKeyStore {
    keys: HashMap<String, String>,
}

impl PemKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key_ref: impl Into<String>, private_key_pem: impl Into<String>) {
        self.keys.insert(key_ref.into(), private_key_pem.into());
    }
}

impl KeyStore for PemKeyStore {
    fn load_private_key(&self, key_ref: &str) -> Result<PKey<Private>> {
        let pem = self
            .keys
            .get(key_ref)
            .ok_or_else(|| CryptoError::KeyStore(format!("no key stored under {}", key_ref)))?;
        PKey::private_key_from_pem(pem.as_bytes())
            .map_err(|e| CryptoError::KeyStore(format!("cannot load {}: {}", key_ref, e)))
    }
}

impl Drop for PemKeyStore {
    fn drop(&mut self) {
        for pem in self.keys.values_mut() {
            pem.zeroize();
        }
    }
}

/// Where the signing key comes from.
#[derive(Clone, Copy)]
pub enum PrivateKeySource<'a> {
    /// PEM private key for RSA, hex `seed || public` (or bare seed) for Ed25519.
    Material(&'a str),
    /// A key held by an external key store.
    Stored {
        store: &'a dyn KeyStore,
        key_ref: &'a str,
    },
}

/// Signs `message`, returning the raw signature bytes.
pub fn try_sign(key_type: KeyType, source: PrivateKeySource<'_>, message: &[u8]) -> Result<Vec<u8>> {
    match key_type {
        KeyType::Ed25519 => match source {
            PrivateKeySource::Material(hex_key) => {
                let mut key_bytes = hex::decode(hex_key.trim()).map_err(|e| {
                    CryptoError::InvalidKeyFormat(format!("Ed25519 key is not hex: {}", e))
                })?;
                let signature = ed25519_sign(&key_bytes, message);
                key_bytes.zeroize();
                signature
            }
            PrivateKeySource::Stored { store, key_ref } => {
                let pkey = store.load_private_key(key_ref)?;
                if pkey.id() != Id::ED25519 {
                    return Err(CryptoError::InvalidKeyFormat(format!(
                        "key {} is not an Ed25519 key",
                        key_ref
                    )));
                }
                let mut seed = pkey
                    .raw_private_key()
                    .map_err(|e| CryptoError::KeyStore(e.to_string()))?;
                let signature = ed25519_sign(&seed, message);
                seed.zeroize();
                signature
            }
        },
        KeyType::Rsa2048 | KeyType::Rsa3072 | KeyType::Rsa4096 => {
            let pkey = match source {
                PrivateKeySource::Material(pem) => PKey::private_key_from_pem(pem.as_bytes())
                    .map_err(|e| {
                        CryptoError::InvalidKeyFormat(format!("cannot read RSA private key: {}", e))
                    })?,
                PrivateKeySource::Stored { store, key_ref } => store.load_private_key(key_ref)?,
            };
            rsa_pss_sign(&pkey, message)
        }
        KeyType::Unknown => Err(CryptoError::UnsupportedAlgorithm(format!(
            "cannot sign with key type {}",
            key_type
        ))),
    }
}

/// Signs `message`; any failure is logged and yields an empty signature.
pub fn sign(key_type: KeyType, source: PrivateKeySource<'_>, message: &[u8]) -> Vec<u8> {
    match try_sign(key_type, source, message) {
        Ok(signature) => signature,
        Err(e) => {
            tracing::error!(key_type = %key_type, error = %e, "signing failed");
            Vec::new()
        }
    }
}

/// Detached Ed25519 signature. `private_key` is either the 64-byte
/// `seed || public` form or a bare 32-byte seed.
pub fn ed25519_sign(private_key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let signing_key = match private_key.len() {
        ED25519_KEYPAIR_BYTES => {
            let mut bytes = [0u8; ED25519_KEYPAIR_BYTES];
            bytes.copy_from_slice(private_key);
            let key = SigningKey::from_keypair_bytes(&bytes);
            bytes.zeroize();
            key.map_err(|e| CryptoError::InvalidKeyFormat(format!("Ed25519 key pair: {}", e)))?
        }
        ED25519_SEED_BYTES => {
            let mut bytes = [0u8; ED25519_SEED_BYTES];
            bytes.copy_from_slice(private_key);
            let key = SigningKey::from_bytes(&bytes);
            bytes.zeroize();
            key
        }
        other => {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "invalid Ed25519 key length: {} (expected {} or {})",
                other, ED25519_KEYPAIR_BYTES, ED25519_SEED_BYTES
            )))
        }
    };

    Ok(signing_key.sign(message).to_bytes().to_vec())
}

/// Checks a detached Ed25519 signature. Buffers shorter than the fixed key
/// and signature sizes are rejected outright.
pub fn ed25519_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    if public_key.len() < ED25519_PUBLIC_KEY_BYTES || signature.len() < ED25519_SIGNATURE_BYTES {
        return false;
    }

    let mut key_bytes = [0u8; ED25519_PUBLIC_KEY_BYTES];
    key_bytes.copy_from_slice(&public_key[..ED25519_PUBLIC_KEY_BYTES]);
    let verifying_key = match VerifyingKey::from_bytes(&key_bytes) {
        Ok(key) => key,
        Err(_) => return false,
    };

    let mut sig_bytes = [0u8; ED25519_SIGNATURE_BYTES];
    sig_bytes.copy_from_slice(&signature[..ED25519_SIGNATURE_BYTES]);
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key.verify_strict(message, &signature).is_ok()
}

fn signing_error(step: &'static str) -> impl FnOnce(ErrorStack) -> CryptoError {
    move |stack| {
        tracing::error!(step, openssl_error_stack = %stack, "RSA-PSS signing failed");
        CryptoError::Signing(format!("{}: {}", step, stack))
    }
}

/// RSA-PSS signature over the SHA-256 digest of `message`, maximum salt
/// length. The output is sized to the modulus.
pub fn rsa_pss_sign(pkey: &PKey<Private>, message: &[u8]) -> Result<Vec<u8>> {
    if pkey.id() != Id::RSA {
        return Err(CryptoError::InvalidKeyFormat(
            "RSA-PSS signing needs an RSA private key".to_string(),
        ));
    }

    let digest = sha256_digest(message);

    let mut ctx = PkeyCtx::new(pkey).map_err(signing_error("PkeyCtx::new"))?;
    ctx.sign_init().map_err(signing_error("sign_init"))?;
    ctx.set_rsa_padding(Padding::PKCS1_PSS)
        .map_err(signing_error("set_rsa_padding"))?;
    ctx.set_signature_md(Md::sha256())
        .map_err(signing_error("set_signature_md"))?;
    ctx.set_rsa_mgf1_md(Md::sha256())
        .map_err(signing_error("set_rsa_mgf1_md"))?;
    ctx.set_rsa_pss_saltlen(RsaPssSaltlen::MAXIMUM_LENGTH)
        .map_err(signing_error("set_rsa_pss_saltlen"))?;

    let mut signature = Vec::new();
    ctx.sign_to_vec(&digest, &mut signature)
        .map_err(signing_error("sign"))?;
    Ok(signature)
}

/// Verifies an RSA-PSS signature against a PEM public key.
///
/// Returns `false` for a bad signature and for any malformed input.
pub fn rsa_pss_verify(public_key_pem: &str, signature: &[u8], message: &[u8]) -> bool {
    let pkey = match PKey::public_key_from_pem(public_key_pem.as_bytes()) {
        Ok(pkey) => pkey,
        Err(stack) => {
            tracing::debug!(openssl_error_stack = %stack, "cannot read RSA public key");
            return false;
        }
    };
    if pkey.id() != Id::RSA {
        return false;
    }

    let digest = sha256_digest(message);

    let result = PkeyCtx::new(&pkey).and_then(|mut ctx| {
        ctx.verify_init()?;
        ctx.set_rsa_padding(Padding::PKCS1_PSS)?;
        ctx.set_signature_md(Md::sha256())?;
        ctx.set_rsa_mgf1_md(Md::sha256())?;
        ctx.set_rsa_pss_saltlen(RsaPssSaltlen::custom(PSS_SALTLEN_AUTO))?;
        ctx.verify(&digest, signature)
    });

    match result {
        Ok(valid) => valid,
        Err(stack) => {
            tracing::debug!(openssl_error_stack = %stack, "RSA-PSS verification rejected signature");
            false
        }
    }
}
