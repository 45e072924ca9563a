//! Signature round trips through the public key descriptor API

use crate::test_utils::{setup, sign_base64};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Padding;
use openssl::sign::{RsaPssSaltlen, Signer};
use ota_trust_crypto::{
    generate_key_pair, sign, KeyType, PemKeyStore, PrivateKeySource, PublicKey,
};

const MESSAGE: &[u8] = br#"{"signed":{"_type":"Targets","version":7}}"#;

fn assert_round_trip(key_type: KeyType) {
    let pair = generate_key_pair(key_type).unwrap();
    let public = PublicKey::new(pair.public.clone(), key_type).unwrap();

    let signature = sign_base64(key_type, &pair, MESSAGE);
    assert!(!signature.is_empty(), "{} produced no signature", key_type);
    assert!(public.verify_signature(&signature, MESSAGE));

    // A different message must not verify
    assert!(!public.verify_signature(&signature, b"tampered"));
}

#[test]
fn test_ed25519_round_trip() {
    setup();
    assert_round_trip(KeyType::Ed25519);
}

#[test]
fn test_rsa2048_round_trip() {
    setup();
    assert_round_trip(KeyType::Rsa2048);
}

#[test]
fn test_rsa3072_round_trip() {
    setup();
    assert_round_trip(KeyType::Rsa3072);
}

#[test]
fn test_rsa4096_round_trip() {
    setup();
    assert_round_trip(KeyType::Rsa4096);
}

#[test]
fn test_rsa_signature_sized_to_modulus() {
    setup();
    let pair = generate_key_pair(KeyType::Rsa3072).unwrap();
    let signature = sign(KeyType::Rsa3072, PrivateKeySource::Material(&pair.private), MESSAGE);
    assert_eq!(signature.len(), 384);
}

#[test]
fn test_signature_from_other_key_rejected() {
    setup();
    let signer = generate_key_pair(KeyType::Ed25519).unwrap();
    let other = generate_key_pair(KeyType::Ed25519).unwrap();
    let public = PublicKey::new(other.public.clone(), KeyType::Ed25519).unwrap();

    let signature = sign_base64(KeyType::Ed25519, &signer, MESSAGE);
    assert!(!public.verify_signature(&signature, MESSAGE));
}

#[test]
fn test_malformed_signatures_rejected() {
    setup();
    let pair = generate_key_pair(KeyType::Rsa2048).unwrap();
    let public = PublicKey::new(pair.public.clone(), KeyType::Rsa2048).unwrap();

    assert!(!public.verify_signature("", MESSAGE));
    assert!(!public.verify_signature("!!not base64!!", MESSAGE));
    assert!(!public.verify_signature(&STANDARD.encode([0u8; 256]), MESSAGE));

    let unknown = PublicKey::default();
    assert!(!unknown.verify_signature(&sign_base64(KeyType::Rsa2048, &pair, MESSAGE), MESSAGE));
}

#[test]
fn test_digest_length_salt_verifies() {
    setup();
    let pair = generate_key_pair(KeyType::Rsa2048).unwrap();
    let pkey = PKey::private_key_from_pem(pair.private.as_bytes()).unwrap();

    // Signature produced by a signer using salt length = digest length
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey).unwrap();
    signer.set_rsa_padding(Padding::PKCS1_PSS).unwrap();
    signer.set_rsa_mgf1_md(MessageDigest::sha256()).unwrap();
    signer.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH).unwrap();
    signer.update(MESSAGE).unwrap();
    let signature = signer.sign_to_vec().unwrap();

    let public = PublicKey::new(pair.public.clone(), KeyType::Rsa2048).unwrap();
    assert!(public.verify_signature(&STANDARD.encode(signature), MESSAGE));
}

#[test]
fn test_key_store_signing() {
    setup();
    let pair = generate_key_pair(KeyType::Rsa2048).unwrap();
    let public = PublicKey::new(pair.public.clone(), KeyType::Rsa2048).unwrap();

    let mut store = PemKeyStore::new();
    store.insert("pkcs11:token=ecu;object=primary", pair.private.clone());

    let signature = sign(
        KeyType::Rsa2048,
        PrivateKeySource::Stored {
            store: &store,
            key_ref: "pkcs11:token=ecu;object=primary",
        },
        MESSAGE,
    );
    assert!(public.verify_signature(&STANDARD.encode(&signature), MESSAGE));

    let missing = sign(
        KeyType::Rsa2048,
        PrivateKeySource::Stored {
            store: &store,
            key_ref: "pkcs11:token=ecu;object=secondary",
        },
        MESSAGE,
    );
    assert!(missing.is_empty());
}
