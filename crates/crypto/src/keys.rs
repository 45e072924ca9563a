//! Public key representation for trust metadata.
//!
//! A [`PublicKey`] is an algorithm tag plus the encoded key material as it
//! appears in metadata: a PEM public key for RSA, hex of the raw 32 bytes
//! for Ed25519. Keys parsed from untrusted metadata never fail to construct;
//! anything malformed becomes [`KeyType::Unknown`], which verifies nothing.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use openssl::rsa::Rsa;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::canonical::to_canonical_bytes;
use crate::digest::sha256_digest_hex;
use crate::error::{CryptoError, Result};
use crate::signing::{ed25519_verify, rsa_pss_verify};

/// Key algorithm. The order is total and `Unknown` sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum KeyType {
    Ed25519,
    Rsa2048,
    Rsa3072,
    Rsa4096,
    #[default]
    Unknown,
}

impl KeyType {
    pub fn is_rsa(&self) -> bool {
        matches!(self, KeyType::Rsa2048 | KeyType::Rsa3072 | KeyType::Rsa4096)
    }

    pub fn rsa_bits(&self) -> Option<u32> {
        match self {
            KeyType::Rsa2048 => Some(2048),
            KeyType::Rsa3072 => Some(3072),
            KeyType::Rsa4096 => Some(4096),
            KeyType::Ed25519 | KeyType::Unknown => None,
        }
    }

    /// Only the three Uptane RSA sizes map to a known type.
    pub fn from_rsa_bits(bits: u32) -> Self {
        match bits {
            2048 => KeyType::Rsa2048,
            3072 => KeyType::Rsa3072,
            4096 => KeyType::Rsa4096,
            _ => KeyType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ED25519",
            KeyType::Rsa2048 => "RSA2048",
            KeyType::Rsa3072 => "RSA3072",
            KeyType::Rsa4096 => "RSA4096",
            KeyType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_matches('"').to_ascii_uppercase().as_str() {
            "ED25519" => Ok(KeyType::Ed25519),
            "RSA2048" => Ok(KeyType::Rsa2048),
            "RSA3072" => Ok(KeyType::Rsa3072),
            "RSA4096" => Ok(KeyType::Rsa4096),
            "UNKNOWN" => Ok(KeyType::Unknown),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "key type {}",
                other
            ))),
        }
    }
}

impl Serialize for KeyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for KeyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Infers the key type of a PEM-encoded RSA public key from its modulus size.
///
/// Anything that is not an RSA public key, or an RSA key of a size other
/// than 2048/3072/4096 bits, is `Unknown`.
pub fn identify_rsa_key_type(public_key_pem: &str) -> KeyType {
    let rsa = match Rsa::public_key_from_pem(public_key_pem.as_bytes()) {
        Ok(rsa) => rsa,
        Err(_) => return KeyType::Unknown,
    };

    let bits = rsa.size() * 8;
    let key_type = KeyType::from_rsa_bits(bits);
    if key_type == KeyType::Unknown {
        tracing::warn!(bits, "weird RSA key length");
    }
    key_type
}

/// A public key as carried in trust metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PublicKey {
    key_type: KeyType,
    value: String,
}

impl PublicKey {
    /// Creates a key with an explicitly declared type.
    ///
    /// For RSA types the modulus size of `value` must match the declaration.
    pub fn new(value: impl Into<String>, key_type: KeyType) -> Result<Self> {
        let value = value.into();
        if key_type.is_rsa() {
            let actual = identify_rsa_key_type(&value);
            if actual != key_type {
                return Err(CryptoError::KeyLengthMismatch {
                    declared: key_type,
                    actual,
                });
            }
        }
        Ok(Self { key_type, value })
    }

    /// Reads a PEM public key from disk. Content that does not parse as an
    /// RSA public key yields an `Unknown` key.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let value = std::fs::read_to_string(path)?;
        let key_type = identify_rsa_key_type(&value);
        Ok(Self { key_type, value })
    }

    /// Parses a metadata key descriptor
    /// `{"keytype": "...", "keyval": {"public": "..."}}`.
    ///
    /// The descriptor comes from untrusted metadata, so any structural
    /// problem produces `{Unknown, ""}` instead of an error.
    pub fn from_uptane(descriptor: &Value) -> Self {
        let keytype = descriptor.get("keytype").and_then(Value::as_str);
        let public = descriptor
            .get("keyval")
            .filter(|keyval| keyval.is_object())
            .and_then(|keyval| keyval.get("public"))
            .and_then(Value::as_str);

        let (keytype, public) = match (keytype, public) {
            (Some(keytype), Some(public)) => (keytype.to_ascii_lowercase(), public),
            _ => {
                tracing::debug!("malformed key descriptor");
                return Self::default();
            }
        };

        let key_type = match keytype.as_str() {
            "ed25519" => KeyType::Ed25519,
            "rsa" => {
                let key_type = identify_rsa_key_type(public);
                if key_type == KeyType::Unknown {
                    tracing::warn!("couldn't identify length of RSA key");
                }
                key_type
            }
            _ => KeyType::Unknown,
        };

        Self {
            key_type,
            value: public.to_string(),
        }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_known(&self) -> bool {
        self.key_type != KeyType::Unknown
    }

    /// Checks a base64 `signature` over `message`.
    ///
    /// Never fails: malformed keys or signatures simply do not verify.
    /// Surrounding whitespace on the signature text and on an Ed25519 hex
    /// key is ignored, so values copied with a trailing newline still decode.
    pub fn verify_signature(&self, signature: &str, message: &[u8]) -> bool {
        match self.key_type {
            KeyType::Ed25519 => {
                let public = match hex::decode(self.value.trim()) {
                    Ok(bytes) => bytes,
                    Err(_) => return false,
                };
                let signature = match STANDARD.decode(signature.trim()) {
                    Ok(bytes) => bytes,
                    Err(_) => return false,
                };
                ed25519_verify(&public, &signature, message)
            }
            KeyType::Rsa2048 | KeyType::Rsa3072 | KeyType::Rsa4096 => {
                match STANDARD.decode(signature.trim()) {
                    Ok(signature) => rsa_pss_verify(&self.value, &signature, message),
                    Err(_) => false,
                }
            }
            KeyType::Unknown => false,
        }
    }

    /// Inverse of [`PublicKey::from_uptane`].
    pub fn to_uptane(&self) -> Value {
        let keytype = match self.key_type {
            KeyType::Rsa2048 | KeyType::Rsa3072 | KeyType::Rsa4096 => "RSA",
            KeyType::Ed25519 => "ED25519",
            KeyType::Unknown => "unknown",
        };
        json!({
            "keytype": keytype,
            "keyval": { "public": self.value },
        })
    }

    /// Key identifier: lower-case hex SHA-256 of the canonical JSON string of
    /// the key material, with trailing newlines removed first.
    pub fn key_id(&self) -> String {
        let trimmed = self.value.trim_end_matches('\n');
        sha256_digest_hex(&to_canonical_bytes(&Value::String(trimmed.to_string())))
    }
}
