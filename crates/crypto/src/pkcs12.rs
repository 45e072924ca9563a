//! PKCS#12 bundle import.
//!
//! A bundle supplied by the backend carries the device key, its certificate
//! and the CA chain. A bad bundle or password is an expected operational
//! failure, so every error here is the recoverable [`CryptoError::Pkcs12Import`].

use std::path::Path;

use openssl::pkcs12::Pkcs12;
use openssl::x509::X509Ref;

use crate::error::{CryptoError, Result};

/// PEM material extracted from a PKCS#12 container.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    /// PKCS#8 private key.
    pub private_key_pem: String,
    /// Leaf certificate followed by every CA certificate.
    pub certificate_pem: String,
    /// CA certificates in container order.
    pub ca_chain_pem: String,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("private_key_pem", &"<redacted>")
            .field("certificate_pem", &self.certificate_pem)
            .field("ca_chain_pem", &self.ca_chain_pem)
            .finish()
    }
}

fn import_error(what: &str) -> impl FnOnce(openssl::error::ErrorStack) -> CryptoError + '_ {
    move |stack| {
        tracing::warn!(openssl_error_stack = %stack, "{}", what);
        CryptoError::Pkcs12Import(format!("{}: {}", what, stack))
    }
}

fn cert_pem(cert: &X509Ref) -> Result<String> {
    let pem = cert
        .to_pem()
        .map_err(import_error("cannot encode certificate"))?;
    String::from_utf8(pem).map_err(|e| CryptoError::Pkcs12Import(e.to_string()))
}

/// Unpacks a DER-encoded PKCS#12 container.
pub fn import_pkcs12(der: &[u8], password: &str) -> Result<CertificateBundle> {
    let container = Pkcs12::from_der(der).map_err(import_error("cannot parse PKCS#12 container"))?;
    let parsed = container
        .parse2(password)
        .map_err(import_error("cannot decrypt PKCS#12 container"))?;

    let pkey = parsed
        .pkey
        .ok_or_else(|| CryptoError::Pkcs12Import("container holds no private key".to_string()))?;
    let cert = parsed
        .cert
        .ok_or_else(|| CryptoError::Pkcs12Import("container holds no certificate".to_string()))?;

    let private_key_pem = pkey
        .private_key_to_pem_pkcs8()
        .map_err(import_error("cannot encode private key"))?;
    let private_key_pem = String::from_utf8(private_key_pem)
        .map_err(|e| CryptoError::Pkcs12Import(e.to_string()))?;

    let mut ca_chain_pem = String::new();
    if let Some(chain) = parsed.ca.as_ref() {
        for ca in chain.iter() {
            ca_chain_pem.push_str(&cert_pem(ca)?);
        }
    }

    let mut certificate_pem = cert_pem(&cert)?;
    certificate_pem.push_str(&ca_chain_pem);

    Ok(CertificateBundle {
        private_key_pem,
        certificate_pem,
        ca_chain_pem,
    })
}

/// Reads and unpacks a PKCS#12 file. Read failures are `Io` errors.
pub fn import_pkcs12_file<P: AsRef<Path>>(path: P, password: &str) -> Result<CertificateBundle> {
    let der = std::fs::read(path.as_ref())?;
    tracing::debug!(path = %path.as_ref().display(), bytes = der.len(), "importing PKCS#12 bundle");
    import_pkcs12(&der, password)
}
