//! Shared fixtures for the integration tests

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ota_trust_core::TrustConfig;
use ota_trust_crypto::{
    generate_certificate, initialize_crypto_provider, sign, CertificateParams, KeyPairPem,
    KeyType, PrivateKeySource,
};

/// Configuration used throughout the suite: small RSA keys keep certificate
/// tests fast.
pub const TEST_CONFIG: &str = r#"
[provider]
load_legacy = true
load_default = true

[keygen]
key_type = "RSA2048"

[certificate]
rsa_bits = 1024
validity_days = 30
country = "DE"
organization = "OTA Test Fleet"
common_name = "integration-ecu"

[digest]
stream_chunk_size = 4096
"#;

/// Installs the test log subscriber and runs the provider bootstrap.
pub fn setup() -> TrustConfig {
    let _ = ota_trust_core::logging::try_init();
    let config = TrustConfig::from_toml_str(TEST_CONFIG).expect("test config is valid");
    initialize_crypto_provider(&config.provider);
    config
}

/// Signs `message` with raw key material and base64-encodes the result the
/// way signatures appear in metadata.
pub fn sign_base64(key_type: KeyType, pair: &KeyPairPem, message: &[u8]) -> String {
    STANDARD.encode(sign(
        key_type,
        PrivateKeySource::Material(&pair.private),
        message,
    ))
}

/// A self-signed CA written to disk.
pub struct TestCa {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_pem: String,
}

impl TestCa {
    pub fn create(dir: &Path, common_name: &str) -> Result<Self> {
        let params = CertificateParams::new(common_name)
            .rsa_bits(1024)
            .self_signed(true);
        let (key_pem, cert_pem) = generate_certificate(&params)?.serialize()?;

        let cert_path = dir.join("ca.pem");
        let key_path = dir.join("ca.key");
        fs::write(&cert_path, &cert_pem).context("writing CA certificate")?;
        fs::write(&key_path, &key_pem).context("writing CA key")?;

        Ok(Self {
            cert_path,
            key_path,
            cert_pem,
        })
    }
}
