// tests/support.rs
//! Fixtures: deterministic secrets, keyrings and model schemas

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use encrypted_keyring::model::{EncryptedField, JsonEncoder, ModelSchema};
use encrypted_keyring::{CipherAlgorithm, Keyring};

/// A base64 secret of `2 * algorithm.key_size()` bytes, all equal to `fill`.
#[allow(dead_code)]
pub fn secret(algorithm: CipherAlgorithm, fill: u8) -> String {
    STANDARD.encode(vec![fill; algorithm.key_size() * 2])
}

/// AES-256-GCM keyring holding key 1.
#[allow(dead_code)]
pub fn keyring_v1() -> Arc<Keyring> {
    let algo = CipherAlgorithm::Aes256Gcm;
    Arc::new(Keyring::from_secrets([(1, secret(algo, 0x11))], "pepper", algo).expect("keyring"))
}

/// Adds key 2 to `keyring` (rotation).
#[allow(dead_code)]
pub fn rotate_to_v2(keyring: &Keyring) {
    keyring
        .add_key(2, secret(keyring.algorithm(), 0x22))
        .expect("add key 2");
}

/// `users` model: `email` (with digest), `token`, `preferences` (JSON).
#[allow(dead_code)]
pub fn user_schema(keyring: Arc<Keyring>) -> Arc<ModelSchema> {
    ModelSchema::builder(keyring)
        .field(EncryptedField::new("email").with_digest())
        .encrypt("token")
        .encrypt_with("preferences", JsonEncoder)
        .build()
        .expect("schema")
}
