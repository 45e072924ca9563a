//! Configuration for the trust primitive layer.
//!
//! Every section and field is optional; a missing value falls back to the
//! defaults below, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Historical floor for ad-hoc RSA generation. Only meant for short test keys.
pub const DEFAULT_MIN_RSA_BITS: u32 = 31;

/// Chunk size used when digesting a stream.
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrustConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub keygen: KeygenConfig,
    #[serde(default)]
    pub certificate: CertificateConfig,
    #[serde(default)]
    pub digest: DigestConfig,
}

/// Which OpenSSL providers the bootstrap tries to load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub load_legacy: bool,
    #[serde(default = "default_true")]
    pub load_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeygenConfig {
    /// Key type name, e.g. `RSA2048` or `ED25519`.
    #[serde(default = "default_key_type")]
    pub key_type: String,
    #[serde(default = "default_min_rsa_bits")]
    pub min_rsa_bits: u32,
}

/// Parameters for generated device certificates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateConfig {
    #[serde(default = "default_certificate_rsa_bits")]
    pub rsa_bits: u32,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default = "default_common_name")]
    pub common_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigestConfig {
    #[serde(default = "default_stream_chunk_size")]
    pub stream_chunk_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_key_type() -> String {
    "RSA2048".to_string()
}

fn default_min_rsa_bits() -> u32 {
    DEFAULT_MIN_RSA_BITS
}

fn default_certificate_rsa_bits() -> u32 {
    2048
}

fn default_validity_days() -> u32 {
    365
}

fn default_common_name() -> String {
    "ota-device".to_string()
}

fn default_stream_chunk_size() -> usize {
    DEFAULT_STREAM_CHUNK_SIZE
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            load_legacy: true,
            load_default: true,
        }
    }
}

impl Default for KeygenConfig {
    fn default() -> Self {
        Self {
            key_type: default_key_type(),
            min_rsa_bits: DEFAULT_MIN_RSA_BITS,
        }
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            rsa_bits: default_certificate_rsa_bits(),
            validity_days: default_validity_days(),
            country: String::new(),
            state: String::new(),
            organization: String::new(),
            common_name: default_common_name(),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
        }
    }
}

impl TrustConfig {
    /// Load and validate a configuration file.
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded trust configuration");
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.digest.stream_chunk_size == 0 {
            return Err(Error::Config(
                "digest.stream_chunk_size must be greater than zero".to_string(),
            ));
        }

        if self.certificate.validity_days == 0 {
            return Err(Error::Config(
                "certificate.validity_days must be greater than zero".to_string(),
            ));
        }

        if self.certificate.common_name.is_empty() {
            return Err(Error::Config(
                "certificate.common_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
