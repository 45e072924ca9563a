//! Content digests: one-shot and streamed SHA-256 / SHA-512.
//!
//! Two textual forms coexist. The `sha*_digest_hex` helpers return
//! lower-case hex, while a [`Hash`] always stores its digest upper-cased.
//! Compare through the same accessor, never across the two forms.

use std::fmt;
use std::io::{ErrorKind, Read};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::{CryptoError, Result};
use ota_trust_core::config::{DigestConfig, DEFAULT_STREAM_CHUNK_SIZE};

/// Digest algorithm. Declaration order is strength order: lower sorts first
/// and wins when several hashes of the same content are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    Sha256,
    Sha512,
    Unknown,
}

impl HashType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashType::Sha256 => "sha256",
            HashType::Sha512 => "sha512",
            HashType::Unknown => "unknown",
        }
    }

    /// Maps a metadata hash name to a type. Unrecognized names are `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "sha256" => HashType::Sha256,
            "sha512" => HashType::Sha512,
            _ => HashType::Unknown,
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 of `data`.
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// SHA-512 of `data`.
pub fn sha512_digest(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Sha512::digest(data));
    out
}

/// Lower-case hex SHA-256 of `data`.
pub fn sha256_digest_hex(data: &[u8]) -> String {
    hex::encode(sha256_digest(data))
}

/// Lower-case hex SHA-512 of `data`.
pub fn sha512_digest_hex(data: &[u8]) -> String {
    hex::encode(sha512_digest(data))
}

enum HasherState {
    Sha256(Sha256),
    Sha512(Sha512),
}

/// Incremental hasher.
///
/// Single owner, fed sequentially through `&mut self`. [`Hasher::finalize`]
/// consumes the hasher, so a finished stream cannot be extended or digested
/// twice; start a new hasher for a new stream.
pub struct Hasher {
    hash_type: HashType,
    state: HasherState,
}

impl Hasher {
    pub fn new(hash_type: HashType) -> Result<Self> {
        let state = match hash_type {
            HashType::Sha256 => HasherState::Sha256(Sha256::new()),
            HashType::Sha512 => HasherState::Sha512(Sha512::new()),
            HashType::Unknown => {
                tracing::error!(hash_type = %hash_type, "unsupported type of hashing");
                return Err(CryptoError::UnsupportedAlgorithm(format!(
                    "hash type {}",
                    hash_type
                )));
            }
        };
        Ok(Self { hash_type, state })
    }

    pub fn hash_type(&self) -> HashType {
        self.hash_type
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha256(h) => h.update(data),
            HasherState::Sha512(h) => h.update(data),
        }
    }

    /// Upper-case hex digest of everything fed so far.
    pub fn finalize_hex(self) -> String {
        match self.state {
            HasherState::Sha256(h) => hex::encode_upper(h.finalize()),
            HasherState::Sha512(h) => hex::encode_upper(h.finalize()),
        }
    }

    pub fn finalize(self) -> Hash {
        let hash_type = self.hash_type;
        Hash::new(hash_type, self.finalize_hex())
    }
}

/// A typed digest value. The digest text is always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash {
    hash_type: HashType,
    digest: String,
}

impl Hash {
    pub fn new(hash_type: HashType, digest: impl AsRef<str>) -> Self {
        Self {
            hash_type,
            digest: digest.as_ref().to_ascii_uppercase(),
        }
    }

    /// Builds a hash from a metadata type name such as `"sha256"`.
    pub fn from_type_name(type_name: &str, digest: impl AsRef<str>) -> Self {
        Self::new(HashType::from_name(type_name), digest)
    }

    /// One-shot digest of an in-memory buffer.
    pub fn generate(hash_type: HashType, data: &[u8]) -> Result<Self> {
        let digest = match hash_type {
            HashType::Sha256 => hex::encode_upper(sha256_digest(data)),
            HashType::Sha512 => hex::encode_upper(sha512_digest(data)),
            HashType::Unknown => {
                return Err(CryptoError::UnsupportedAlgorithm(format!(
                    "hash type {}",
                    hash_type
                )))
            }
        };
        Ok(Self { hash_type, digest })
    }

    /// Digests a stream to exhaustion in 64 KiB chunks.
    ///
    /// Returns the hash and the number of bytes consumed.
    pub fn generate_from_reader<R: Read>(hash_type: HashType, reader: R) -> Result<(Self, u64)> {
        Self::generate_from_reader_with_chunk(hash_type, reader, DEFAULT_STREAM_CHUNK_SIZE)
    }

    /// Digests a stream using the configured chunk size.
    pub fn generate_from_reader_with_config<R: Read>(
        config: &DigestConfig,
        hash_type: HashType,
        reader: R,
    ) -> Result<(Self, u64)> {
        Self::generate_from_reader_with_chunk(hash_type, reader, config.stream_chunk_size)
    }

    pub fn generate_from_reader_with_chunk<R: Read>(
        hash_type: HashType,
        mut reader: R,
        chunk_size: usize,
    ) -> Result<(Self, u64)> {
        let mut hasher = Hasher::new(hash_type)?;
        let mut buffer = vec![0u8; chunk_size.max(1)];
        let mut total: u64 = 0;

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CryptoError::Io(e)),
            };
            hasher.update(&buffer[..read]);
            total += read as u64;
        }

        tracing::debug!(hash_type = %hash_type, bytes = total, "digested stream");
        Ok((hasher.finalize(), total))
    }

    pub fn hash_type(&self) -> HashType {
        self.hash_type
    }

    pub fn type_name(&self) -> &'static str {
        self.hash_type.as_str()
    }

    /// Upper-case hex digest.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Short identifier for a set of hashes of the same content: the first 12
    /// lower-case hex characters of the strongest known hash, or `(unknown)`.
    pub fn short_tag(hashes: &[Hash]) -> String {
        hashes
            .iter()
            .filter(|h| h.hash_type < HashType::Unknown)
            .min_by_key(|h| h.hash_type)
            .map(|h| h.digest.chars().take(12).collect::<String>().to_ascii_lowercase())
            .unwrap_or_else(|| "(unknown)".to_string())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash: {}", self.digest)
    }
}
