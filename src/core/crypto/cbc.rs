// src/core/crypto/cbc.rs
//! AES-CBC strategies (128/192/256-bit keys)
//!
//! CBC carries no integrity of its own; the envelope HMAC is the only thing
//! standing between a tampered ciphertext and the padding oracle.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use super::{open_envelope, seal_envelope, CipherStrategy};
use crate::consts::CBC_IV_SIZE;
use crate::enums::CipherAlgorithm;
use crate::error::{CoreError, Result};
use crate::key_ops::Key;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Envelope parts: `[iv, ciphertext]`
#[derive(Debug, Clone, Copy)]
pub struct AesCbc {
    algorithm: CipherAlgorithm,
}

impl AesCbc {
    /// `algorithm` must be one of the CBC variants.
    pub const fn new(algorithm: CipherAlgorithm) -> Self {
        Self { algorithm }
    }

    fn encrypt_raw(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = match self.algorithm {
            CipherAlgorithm::Aes128Cbc => Aes128CbcEnc::new_from_slices(key, iv)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            CipherAlgorithm::Aes192Cbc => Aes192CbcEnc::new_from_slices(key, iv)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            CipherAlgorithm::Aes256Cbc => Aes256CbcEnc::new_from_slices(key, iv)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            other => return Err(not_cbc(other)),
        };
        Ok(ciphertext)
    }

    fn decrypt_raw(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let plaintext = match self.algorithm {
            CipherAlgorithm::Aes128Cbc => Aes128CbcDec::new_from_slices(key, iv)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            CipherAlgorithm::Aes192Cbc => Aes192CbcDec::new_from_slices(key, iv)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            CipherAlgorithm::Aes256Cbc => Aes256CbcDec::new_from_slices(key, iv)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            other => return Err(not_cbc(other)),
        };
        plaintext.map_err(|e| CoreError::Cipher(format!("{}: {e}", self.algorithm)))
    }
}

impl CipherStrategy for AesCbc {
    fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    fn encrypt(&self, key: &Key, plaintext: &[u8]) -> Result<String> {
        let mut iv = [0u8; CBC_IV_SIZE];
        rand::rng().fill_bytes(&mut iv);

        let ciphertext = self.encrypt_raw(key.encryption_key(), &iv, plaintext)?;
        tracing::debug!(key_id = key.id(), algorithm = %self.algorithm, "encrypt");
        seal_envelope(key, &[iv.as_slice(), ciphertext.as_slice()])
    }

    fn decrypt(&self, key: &Key, envelope: &str) -> Result<Vec<u8>> {
        let parts = open_envelope(key, envelope, self.envelope_parts())?;
        let (iv, ciphertext) = (&parts[0], &parts[1]);

        if iv.len() != CBC_IV_SIZE {
            return Err(CoreError::MalformedEnvelope(format!(
                "iv must be {CBC_IV_SIZE} bytes; got {}",
                iv.len()
            )));
        }

        tracing::debug!(key_id = key.id(), algorithm = %self.algorithm, "decrypt");
        self.decrypt_raw(key.encryption_key(), iv, ciphertext)
    }
}

fn init_error(e: aes::cipher::InvalidLength) -> CoreError {
    CoreError::Cipher(format!("cipher init: {e}"))
}

fn not_cbc(algorithm: CipherAlgorithm) -> CoreError {
    CoreError::Cipher(format!("{algorithm} is not a CBC mode"))
}
