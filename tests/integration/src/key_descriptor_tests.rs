//! Key descriptors, key identifiers and content digests

use std::io::Cursor;

use crate::test_utils::setup;
use ota_trust_crypto::{
    generate_key_pair, identify_rsa_key_type, sha256_digest_hex, Hash, HashType, KeyType,
    PublicKey,
};
use serde_json::json;

#[test]
fn test_streamed_digest_matches_one_shot() {
    let config = setup();
    let payload: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 256) as u8).collect();

    for hash_type in [HashType::Sha256, HashType::Sha512] {
        let (streamed, read) =
            Hash::generate_from_reader_with_config(&config.digest, hash_type, Cursor::new(&payload))
                .unwrap();
        assert_eq!(read, payload.len() as u64);
        assert_eq!(streamed, Hash::generate(hash_type, &payload).unwrap());

        let (default_chunked, _) =
            Hash::generate_from_reader(hash_type, Cursor::new(&payload)).unwrap();
        assert_eq!(default_chunked, streamed);
    }
}

#[test]
fn test_short_tag_prefers_sha256() {
    let hashes = [
        Hash::generate(HashType::Sha256, b"x").unwrap(),
        Hash::generate(HashType::Sha512, b"x").unwrap(),
    ];
    let tag = Hash::short_tag(&hashes);
    assert_eq!(tag.len(), 12);
    assert_eq!(tag, sha256_digest_hex(b"x")[..12]);
}

#[test]
fn test_key_id_ignores_trailing_newlines() {
    setup();
    let pair = generate_key_pair(KeyType::Rsa2048).unwrap();
    let trimmed = pair.public.trim_end_matches('\n').to_string();

    let with_newline = PublicKey::new(format!("{}\n", trimmed), KeyType::Rsa2048).unwrap();
    let with_many = PublicKey::new(format!("{}\n\n\n", trimmed), KeyType::Rsa2048).unwrap();
    let without = PublicKey::new(trimmed, KeyType::Rsa2048).unwrap();

    assert_eq!(with_newline.key_id(), without.key_id());
    assert_eq!(with_many.key_id(), without.key_id());
    assert_eq!(without.key_id().len(), 64);
}

#[test]
fn test_descriptor_round_trip() {
    setup();
    for key_type in [KeyType::Ed25519, KeyType::Rsa2048] {
        let pair = generate_key_pair(key_type).unwrap();
        let key = PublicKey::new(pair.public.clone(), key_type).unwrap();

        let parsed = PublicKey::from_uptane(&key.to_uptane());
        assert_eq!(parsed, key);
        assert_eq!(parsed.key_id(), key.key_id());
    }
}

#[test]
fn test_generated_rsa_keys_infer_their_type() {
    setup();
    for key_type in [KeyType::Rsa2048, KeyType::Rsa3072, KeyType::Rsa4096] {
        let pair = generate_key_pair(key_type).unwrap();
        assert_eq!(identify_rsa_key_type(&pair.public), key_type);
    }

    let odd = openssl::rsa::Rsa::generate(1024).unwrap();
    let odd_pem = String::from_utf8(odd.public_key_to_pem().unwrap()).unwrap();
    assert_eq!(identify_rsa_key_type(&odd_pem), KeyType::Unknown);
}

#[test]
fn test_malformed_descriptors_are_unknown() {
    let descriptors = [
        json!(null),
        json!([]),
        json!({}),
        json!({"keytype": 5, "keyval": {"public": "abc"}}),
        json!({"keytype": "ed25519"}),
        json!({"keytype": "ed25519", "keyval": "abc"}),
        json!({"keytype": "ed25519", "keyval": {"public": 12}}),
        json!({"keytype": "dsa", "keyval": {"public": "abc"}}),
        json!({"keytype": "rsa", "keyval": {"public": "not a pem"}}),
    ];

    for descriptor in descriptors.iter() {
        let key = PublicKey::from_uptane(descriptor);
        assert_eq!(key.key_type(), KeyType::Unknown, "descriptor {}", descriptor);
        assert!(!key.is_known());
    }
}
