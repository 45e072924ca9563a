//! X.509 certificate generation and signing for device provisioning.
//!
//! A certificate is built around a freshly generated RSA key. It can be
//! self-signed on the spot (test and bootstrap use only) or left pending and
//! signed afterwards under a CA whose certificate and key live on disk.

use std::fs;
use std::path::Path;

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509NameRef, X509};
use rand::Rng;

use crate::error::{CryptoError, Result};
use crate::keygen::generate_rsa_pkey;
use ota_trust_core::config::{CertificateConfig, DEFAULT_MIN_RSA_BITS};

/// Serial numbers are drawn uniformly from `[0, SERIAL_LIMIT)`.
const SERIAL_LIMIT: u32 = 1 << 20;

/// X.509 version field value for a v3 certificate.
const X509_V3: i32 = 2;

/// Subject distinguished name. Empty fields are left out of the DN; the
/// common name is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFields {
    pub country: String,
    pub state: String,
    pub organization: String,
    pub common_name: String,
}

impl SubjectFields {
    pub fn with_common_name(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateParams {
    pub rsa_bits: u32,
    pub validity_days: u32,
    pub subject: SubjectFields,
    pub self_sign: bool,
    pub min_rsa_bits: u32,
}

impl CertificateParams {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            rsa_bits: 2048,
            validity_days: 365,
            subject: SubjectFields::with_common_name(common_name),
            self_sign: false,
            min_rsa_bits: DEFAULT_MIN_RSA_BITS,
        }
    }

    pub fn from_config(config: &CertificateConfig) -> Self {
        Self {
            rsa_bits: config.rsa_bits,
            validity_days: config.validity_days,
            subject: SubjectFields {
                country: config.country.clone(),
                state: config.state.clone(),
                organization: config.organization.clone(),
                common_name: config.common_name.clone(),
            },
            self_sign: false,
            min_rsa_bits: DEFAULT_MIN_RSA_BITS,
        }
    }

    pub fn rsa_bits(mut self, bits: u32) -> Self {
        self.rsa_bits = bits;
        self
    }

    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    pub fn subject(mut self, subject: SubjectFields) -> Self {
        self.subject = subject;
        self
    }

    pub fn self_signed(mut self, self_sign: bool) -> Self {
        self.self_sign = self_sign;
        self
    }

    pub fn min_rsa_bits(mut self, bits: u32) -> Self {
        self.min_rsa_bits = bits;
        self
    }
}

fn step(context: &'static str) -> impl FnOnce(ErrorStack) -> CryptoError {
    move |openssl_error_stack| {
        tracing::error!(context, ?openssl_error_stack, "certificate construction failed");
        CryptoError::certificate(context, openssl_error_stack)
    }
}

fn build_subject_name(subject: &SubjectFields) -> Result<X509Name> {
    let mut name = X509NameBuilder::new().map_err(step("X509_NAME_new"))?;

    let fields = [
        (Nid::COUNTRYNAME, subject.country.as_str()),
        (Nid::STATEORPROVINCENAME, subject.state.as_str()),
        (Nid::ORGANIZATIONNAME, subject.organization.as_str()),
        (Nid::COMMONNAME, subject.common_name.as_str()),
    ];
    for (nid, value) in fields.iter().filter(|(_, value)| !value.is_empty()) {
        name.append_entry_by_nid(*nid, value)
            .map_err(step("X509_NAME_add_entry"))?;
    }

    Ok(name.build())
}

/// A certificate under construction together with its private key.
pub struct PendingCertificate {
    builder: X509Builder,
    key: PKey<Private>,
    subject: X509Name,
}

/// Builds a v3 certificate for a newly generated RSA key.
pub fn generate_certificate(params: &CertificateParams) -> Result<PendingCertificate> {
    if params.subject.common_name.is_empty() {
        return Err(CryptoError::CertificateConstruction {
            context: "subject".to_string(),
            diagnostic: "common name must not be empty".to_string(),
        });
    }

    let key = generate_rsa_pkey(params.rsa_bits, params.min_rsa_bits)?;

    let mut builder = X509::builder().map_err(step("X509_new"))?;
    builder.set_version(X509_V3).map_err(step("X509_set_version"))?;

    let serial = rand::thread_rng().gen_range(0..SERIAL_LIMIT);
    let serial = BigNum::from_u32(serial)
        .and_then(|bn| bn.to_asn1_integer())
        .map_err(step("ASN1_INTEGER_set"))?;
    builder
        .set_serial_number(&serial)
        .map_err(step("X509_set_serialNumber"))?;

    let subject = build_subject_name(&params.subject)?;
    builder
        .set_subject_name(&subject)
        .map_err(step("X509_set_subject_name"))?;

    let not_before = Asn1Time::days_from_now(0).map_err(step("X509_gmtime_adj"))?;
    let not_after = Asn1Time::days_from_now(params.validity_days)
        .map_err(step("X509_gmtime_adj"))?;
    builder
        .set_not_before(&not_before)
        .map_err(step("X509_set_notBefore"))?;
    builder
        .set_not_after(&not_after)
        .map_err(step("X509_set_notAfter"))?;

    builder.set_pubkey(&key).map_err(step("X509_set_pubkey"))?;

    let mut pending = PendingCertificate {
        builder,
        key,
        subject,
    };

    if params.self_sign {
        pending.self_sign()?;
        tracing::info!(
            common_name = %params.subject.common_name,
            "generated a self-signed certificate; it should not be used in production"
        );
    }

    Ok(pending)
}

impl PendingCertificate {
    fn self_sign(&mut self) -> Result<()> {
        self.builder
            .set_issuer_name(&self.subject)
            .map_err(step("X509_set_issuer_name"))?;
        self.builder
            .sign(&self.key, MessageDigest::sha256())
            .map_err(step("X509_sign"))?;
        Ok(())
    }

    /// Re-signs the certificate under a CA. The CA subject becomes the issuer.
    pub fn sign_with_ca<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        ca_cert_path: P,
        ca_key_path: Q,
    ) -> Result<()> {
        let ca_cert_pem = read_ca_file(ca_cert_path.as_ref(), "read CA certificate")?;
        let ca_key_pem = read_ca_file(ca_key_path.as_ref(), "read CA private key")?;

        let ca_cert = X509::from_pem(&ca_cert_pem).map_err(step("PEM_read_X509"))?;
        let ca_key =
            PKey::private_key_from_pem(&ca_key_pem).map_err(step("PEM_read_PrivateKey"))?;

        self.builder
            .set_issuer_name(ca_cert.subject_name())
            .map_err(step("X509_set_issuer_name"))?;
        self.builder
            .sign(&ca_key, MessageDigest::sha256())
            .map_err(step("X509_sign"))?;

        tracing::debug!(ca = %ca_cert_path.as_ref().display(), "certificate signed under CA");
        Ok(())
    }

    pub fn private_key(&self) -> &PKey<Private> {
        &self.key
    }

    /// Returns `(PKCS#1 RSA private key PEM, certificate PEM)`.
    pub fn serialize(self) -> Result<(String, String)> {
        let rsa = self.key.rsa().map_err(step("EVP_PKEY_get1_RSA"))?;
        let key_pem = rsa
            .private_key_to_pem()
            .map_err(step("PEM_write_RSAPrivateKey"))?;
        let cert_pem = self
            .builder
            .build()
            .to_pem()
            .map_err(step("PEM_write_X509"))?;

        Ok((pem_string(key_pem)?, pem_string(cert_pem)?))
    }

    /// Finishes the certificate, handing back the X.509 object and its key.
    pub fn into_x509(self) -> (X509, PKey<Private>) {
        (self.builder.build(), self.key)
    }
}

fn read_ca_file(path: &Path, context: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "cannot read CA material");
        CryptoError::CertificateConstruction {
            context: context.to_string(),
            diagnostic: format!("{}: {}", path.display(), e),
        }
    })
}

fn pem_string(pem: Vec<u8>) -> Result<String> {
    String::from_utf8(pem).map_err(|e| CryptoError::CertificateConstruction {
        context: "PEM encoding".to_string(),
        diagnostic: e.to_string(),
    })
}

/// Common name of the certificate's subject.
pub fn extract_subject_cn(cert_pem: &str) -> Result<String> {
    let cert = X509::from_pem(cert_pem.as_bytes()).map_err(step("PEM_read_X509"))?;
    let entry = cert
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .ok_or_else(|| CryptoError::CertificateConstruction {
            context: "subject".to_string(),
            diagnostic: "certificate has no common name".to_string(),
        })?;
    let cn = std::str::from_utf8(entry.data().as_slice()).map_err(|e| {
        CryptoError::CertificateConstruction {
            context: "subject".to_string(),
            diagnostic: format!("common name is not UTF-8: {}", e),
        }
    })?;
    Ok(cn.to_string())
}

/// DN entries in order, as `(field, raw value)`.
pub fn distinguished_name_entries(name: &X509NameRef) -> Vec<(Nid, Vec<u8>)> {
    name.entries()
        .map(|entry| (entry.object().nid(), entry.data().as_slice().to_vec()))
        .collect()
}
