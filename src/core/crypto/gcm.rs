// src/core/crypto/gcm.rs
//! AES-256-GCM strategy: envelope parts: `[iv, auth_tag, ciphertext]`

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::RngCore;

use super::{open_envelope, seal_envelope, CipherStrategy};
use crate::consts::{GCM_IV_SIZE, GCM_TAG_SIZE};
use crate::enums::CipherAlgorithm;
use crate::error::{CoreError, Result};
use crate::key_ops::Key;

#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcm;

impl AesGcm {
    fn cipher(key: &Key) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(key.encryption_key())
            .map_err(|e| CoreError::Cipher(format!("cipher init: {e}")))
    }
}

impl CipherStrategy for AesGcm {
    fn algorithm(&self) -> CipherAlgorithm {
        CipherAlgorithm::Aes256Gcm
    }

    fn encrypt(&self, key: &Key, plaintext: &[u8]) -> Result<String> {
        let cipher = Self::cipher(key)?;

        let mut iv = [0u8; GCM_IV_SIZE];
        rand::rng().fill_bytes(&mut iv);

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|e| CoreError::Cipher(format!("aes-256-gcm: {e}")))?;

        tracing::debug!(key_id = key.id(), algorithm = "aes-256-gcm", "encrypt");
        seal_envelope(key, &[iv.as_slice(), tag.as_slice(), buffer.as_slice()])
    }

    fn decrypt(&self, key: &Key, envelope: &str) -> Result<Vec<u8>> {
        let parts = open_envelope(key, envelope, self.envelope_parts())?;
        let (iv, tag, ciphertext) = (&parts[0], &parts[1], &parts[2]);

        if iv.len() != GCM_IV_SIZE || tag.len() != GCM_TAG_SIZE {
            return Err(CoreError::MalformedEnvelope(format!(
                "expected {GCM_IV_SIZE}-byte iv and {GCM_TAG_SIZE}-byte tag; got {} and {}",
                iv.len(),
                tag.len()
            )));
        }

        let cipher = Self::cipher(key)?;
        let mut buffer = ciphertext.clone();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(iv),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|e| CoreError::Cipher(format!("aes-256-gcm: {e}")))?;

        tracing::debug!(key_id = key.id(), algorithm = "aes-256-gcm", "decrypt");
        Ok(buffer)
    }
}
