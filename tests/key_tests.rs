// tests/key_tests.rs
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use encrypted_keyring::error::CoreError;
use encrypted_keyring::{generate_secret, CipherAlgorithm, Key};

mod common;

fn sample_bytes(len: usize) -> Vec<u8> {
    // spread over the whole byte range so '+' and '/' show up in the encoding
    (0..len).map(|i| (i * 37 + 251) as u8).collect()
}

#[test]
fn test_raw_secret_of_exact_length_is_split_in_half() {
    common::setup();
    let mut secret = vec![0xaau8; 32];
    secret.extend(vec![0xbbu8; 32]);

    let key = Key::for_algorithm(1, &secret, CipherAlgorithm::Aes256Gcm).unwrap();
    assert_eq!(key.id(), 1);
    assert_eq!(key.size(), 32);
    assert_eq!(key.signing_key(), &[0xaa; 32][..]);
    assert_eq!(key.encryption_key(), &[0xbb; 32][..]);
}

#[test]
fn test_raw_length_wins_over_base64_interpretation() {
    // 32 ASCII chars are also valid base64, but the raw length matches first
    let secret = "A".repeat(32);
    let key = Key::for_algorithm(1, &secret, CipherAlgorithm::Aes128Cbc).unwrap();
    assert_eq!(key.signing_key(), &[b'A'; 16][..]);
    assert_eq!(key.encryption_key(), &[b'A'; 16][..]);
}

#[test]
fn test_strict_base64_secret() {
    let bytes = sample_bytes(64);
    let key = Key::for_algorithm(7, STANDARD.encode(&bytes), CipherAlgorithm::Aes256Cbc).unwrap();
    assert_eq!(key.signing_key(), &bytes[..32]);
    assert_eq!(key.encryption_key(), &bytes[32..]);
}

#[test]
fn test_base64_with_line_breaks_is_accepted() {
    let bytes = sample_bytes(48);
    let encoded = STANDARD.encode(&bytes);
    let wrapped = format!("{}\n{}\n", &encoded[..30], &encoded[30..]);

    let key = Key::for_algorithm(2, wrapped, CipherAlgorithm::Aes192Cbc).unwrap();
    assert_eq!(key.signing_key(), &bytes[..24]);
    assert_eq!(key.encryption_key(), &bytes[24..]);
}

#[test]
fn test_url_safe_unpadded_base64_is_accepted() {
    let bytes = sample_bytes(64);
    let encoded = URL_SAFE_NO_PAD.encode(&bytes);

    let key = Key::for_algorithm(3, encoded, CipherAlgorithm::Aes256Gcm).unwrap();
    assert_eq!(key.signing_key(), &bytes[..32]);
    assert_eq!(key.encryption_key(), &bytes[32..]);
}

#[test]
fn test_wrong_length_reports_expected_and_actual() {
    let secret = STANDARD.encode([1u8; 10]);
    let err = Key::for_algorithm(1, secret, CipherAlgorithm::Aes256Gcm).unwrap_err();

    assert!(matches!(
        err,
        CoreError::InvalidSecret {
            expected: 64,
            actual: 10
        }
    ));
    assert_eq!(err.to_string(), "Secret must be 64 bytes; got 10");
}

#[test]
fn test_expected_length_follows_algorithm() {
    let err = Key::for_algorithm(1, STANDARD.encode([0u8; 20]), CipherAlgorithm::Aes128Cbc)
        .unwrap_err();
    assert_eq!(err.to_string(), "Secret must be 32 bytes; got 20");
}

#[test]
fn test_display_and_debug_hide_key_material() {
    let key = Key::for_algorithm(3, vec![0x42u8; 64], CipherAlgorithm::Aes256Gcm).unwrap();

    assert_eq!(key.to_string(), "#<Key id=3>");
    let debug = format!("{key:?}");
    assert!(debug.contains("id: 3"));
    assert!(!debug.contains("66")); // 0x42
    assert!(!debug.contains("signing"));
}

#[test]
fn test_generated_secrets_are_random_and_decodable() {
    for algo in CipherAlgorithm::ALL {
        let a = generate_secret(algo);
        let b = generate_secret(algo);
        assert_ne!(a, b);

        assert_eq!(STANDARD.decode(&a).unwrap().len(), algo.key_size() * 2);
        let key = Key::for_algorithm(1, &a, algo).unwrap();
        assert_eq!(key.size(), algo.key_size());
    }
}

#[test]
fn test_cipher_names_parse_case_insensitively() {
    assert_eq!(
        "AES_128_CBC".parse::<CipherAlgorithm>().unwrap(),
        CipherAlgorithm::Aes128Cbc
    );
    assert_eq!(
        "aes-256-gcm".parse::<CipherAlgorithm>().unwrap(),
        CipherAlgorithm::Aes256Gcm
    );
    assert!("des".parse::<CipherAlgorithm>().is_err());
    assert_eq!(CipherAlgorithm::default(), CipherAlgorithm::Aes256Gcm);
}

#[test]
fn test_raw_strict_and_wrapped_forms_yield_the_same_key() {
    let raw = sample_bytes(32);
    let strict = STANDARD.encode(&raw);
    let wrapped = format!("{strict}\n");

    let keys: Vec<Key> = [raw.clone(), strict.into_bytes(), wrapped.into_bytes()]
        .into_iter()
        .map(|secret| Key::for_algorithm(1, secret, CipherAlgorithm::Aes128Cbc).unwrap())
        .collect();

    for key in &keys {
        assert_eq!(key.signing_key(), &raw[..16]);
        assert_eq!(key.encryption_key(), &raw[16..]);
    }
}
