//! Device provisioning: certificates, CA signing and PKCS#12 bundles

use crate::test_utils::{setup, TestCa};
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::stack::Stack;
use openssl::x509::X509;
use ota_trust_crypto::{
    distinguished_name_entries, extract_subject_cn, generate_certificate, import_pkcs12,
    CertificateParams, CryptoError, KeyType, PublicKey,
};
use tempfile::TempDir;

#[test]
fn test_self_signed_test_certificate() {
    setup();
    let params = CertificateParams::new("test").rsa_bits(2048).self_signed(true);
    let (key_pem, cert_pem) = generate_certificate(&params).unwrap().serialize().unwrap();

    let cert = X509::from_pem(cert_pem.as_bytes()).unwrap();
    let key = PKey::private_key_from_pem(key_pem.as_bytes()).unwrap();
    assert!(cert.verify(&key).unwrap());
    assert_eq!(extract_subject_cn(&cert_pem).unwrap(), "test");

    // The embedded key is a usable metadata key
    let public_pem_bytes = cert.public_key().unwrap().public_key_to_pem().unwrap();
    let public_pem = String::from_utf8(public_pem_bytes).unwrap();
    assert!(PublicKey::new(public_pem, KeyType::Rsa2048).is_ok());
}

#[test]
fn test_configured_device_certificate_signed_by_ca() -> anyhow::Result<()> {
    let config = setup();
    let dir = TempDir::new()?;
    tracing::info!("Step 1: creating CA");
    let ca = TestCa::create(dir.path(), "OTA Root CA")?;

    tracing::info!("Step 2: issuing device certificate from configuration");
    let mut pending = generate_certificate(&CertificateParams::from_config(&config.certificate))?;
    pending.sign_with_ca(&ca.cert_path, &ca.key_path)?;
    let (_, cert_pem) = pending.serialize()?;

    let cert = X509::from_pem(cert_pem.as_bytes())?;
    let ca_cert = X509::from_pem(ca.cert_pem.as_bytes())?;

    assert_eq!(
        distinguished_name_entries(cert.issuer_name()),
        distinguished_name_entries(ca_cert.subject_name())
    );
    let ca_public = ca_cert.public_key()?;
    assert!(cert.verify(&ca_public)?);
    assert_eq!(extract_subject_cn(&cert_pem)?, "integration-ecu");

    let subject = distinguished_name_entries(cert.subject_name());
    assert_eq!(subject.len(), 3);
    assert_eq!(subject[0].1, b"DE".to_vec());
    Ok(())
}

#[test]
fn test_pkcs12_round_trip() -> anyhow::Result<()> {
    setup();
    let dir = TempDir::new()?;
    let ca = TestCa::create(dir.path(), "OTA Root CA")?;

    let mut pending = generate_certificate(&CertificateParams::new("ecu-1").rsa_bits(1024))?;
    pending.sign_with_ca(&ca.cert_path, &ca.key_path)?;
    let (leaf, key) = pending.into_x509();
    let ca_cert = X509::from_pem(ca.cert_pem.as_bytes())?;

    let mut chain = Stack::new()?;
    chain.push(ca_cert)?;
    let der = Pkcs12::builder()
        .name("ecu-1")
        .pkey(&key)
        .cert(&leaf)
        .ca(chain)
        .build2("fleet-secret")?
        .to_der()?;

    tracing::info!(bytes = der.len(), "importing PKCS#12 bundle");
    let bundle = import_pkcs12(&der, "fleet-secret")?;

    let imported_key = PKey::private_key_from_pem(bundle.private_key_pem.as_bytes())?;
    assert!(key.public_eq(&imported_key));

    let certs = X509::stack_from_pem(bundle.certificate_pem.as_bytes())?;
    assert_eq!(certs.len(), 2);
    assert_eq!(certs[0].to_der()?, leaf.to_der()?);
    assert_eq!(bundle.ca_chain_pem, ca.cert_pem);
    Ok(())
}

/// Subject common names of every certificate in a PEM bundle, in order.
fn subject_names(pem: &str) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for cert in X509::stack_from_pem(pem.as_bytes())? {
        names.push(extract_subject_cn(&String::from_utf8(cert.to_pem()?)?)?);
    }
    Ok(names)
}

#[test]
fn test_pkcs12_chain_order() -> anyhow::Result<()> {
    setup();
    let dir = TempDir::new()?;
    let root = TestCa::create(dir.path(), "OTA Root CA")?;

    let mut leaf = generate_certificate(&CertificateParams::new("ecu-3").rsa_bits(1024))?;
    leaf.sign_with_ca(&root.cert_path, &root.key_path)?;
    let (leaf, key) = leaf.into_x509();

    let intermediate_params = CertificateParams::new("OTA Fleet CA")
        .rsa_bits(1024)
        .self_signed(true);
    let (intermediate, _) = generate_certificate(&intermediate_params)?.into_x509();
    let root_cert = X509::from_pem(root.cert_pem.as_bytes())?;

    let mut chain = Stack::new()?;
    chain.push(intermediate.clone())?;
    chain.push(root_cert.clone())?;
    let der = Pkcs12::builder()
        .pkey(&key)
        .cert(&leaf)
        .ca(chain)
        .build2("fleet-secret")?
        .to_der()?;

    let bundle = import_pkcs12(&der, "fleet-secret")?;

    assert_eq!(
        subject_names(&bundle.certificate_pem)?,
        vec!["ecu-3", "OTA Fleet CA", "OTA Root CA"]
    );
    assert_eq!(
        subject_names(&bundle.ca_chain_pem)?,
        vec!["OTA Fleet CA", "OTA Root CA"]
    );
    Ok(())
}

#[test]
fn test_pkcs12_wrong_password() {
    setup();
    let params = CertificateParams::new("ecu-2").rsa_bits(1024).self_signed(true);
    let (leaf, key) = generate_certificate(&params).unwrap().into_x509();
    let der = Pkcs12::builder()
        .pkey(&key)
        .cert(&leaf)
        .build2("right")
        .unwrap()
        .to_der()
        .unwrap();

    match import_pkcs12(&der, "wrong") {
        Err(err @ CryptoError::Pkcs12Import(_)) => assert!(!err.is_fatal()),
        other => panic!("expected a PKCS#12 import error, got {:?}", other),
    }
}
