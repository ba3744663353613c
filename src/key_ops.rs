// src/key_ops.rs
//! Key decoding, representation and generation
//!
//! A configured secret is decoded into raw bytes and split in half: the first
//! half signs envelopes, the second half encrypts them.

use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use rand::RngCore;

use secure_gate::RevealSecret;

use crate::aliases::{KeyMaterial, RawSecret};
use crate::enums::CipherAlgorithm;
use crate::error::{CoreError, Result};

/// Accepts padded or unpadded input once whitespace and URL-safe characters
/// have been normalised.
const PERMISSIVE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One versioned signing + encryption key pair.
pub struct Key {
    id: u32,
    signing_key: KeyMaterial,
    encryption_key: KeyMaterial,
}

impl Key {
    /// Decode `secret` and split it into two halves of `size` bytes each.
    ///
    /// The secret may be raw bytes of exactly `2 * size`, strict base64, or
    /// base64 with newlines, URL-safe characters or missing padding.
    pub fn new(id: u32, secret: impl AsRef<[u8]>, size: usize) -> Result<Self> {
        let raw = decode_secret(secret.as_ref(), size * 2);
        let bytes = raw.expose_secret();

        if bytes.len() != size * 2 {
            return Err(CoreError::InvalidSecret {
                expected: size * 2,
                actual: bytes.len(),
            });
        }

        let (signing, encryption) = bytes.split_at(size);
        Ok(Self {
            id,
            signing_key: KeyMaterial::new(signing.to_vec()),
            encryption_key: KeyMaterial::new(encryption.to_vec()),
        })
    }

    /// Build a key sized for `algorithm`.
    pub fn for_algorithm(
        id: u32,
        secret: impl AsRef<[u8]>,
        algorithm: CipherAlgorithm,
    ) -> Result<Self> {
        Self::new(id, secret, algorithm.key_size())
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn signing_key(&self) -> &[u8] {
        self.signing_key.expose_secret()
    }

    #[inline]
    pub fn encryption_key(&self) -> &[u8] {
        self.encryption_key.expose_secret()
    }

    /// Length of each half in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.encryption_key.expose_secret().len()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("id", &self.id).finish_non_exhaustive()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<Key id={}>", self.id)
    }
}

/// Raw length match first, then strict base64, then permissive base64.
fn decode_secret(input: &[u8], expected: usize) -> RawSecret {
    if input.len() == expected {
        return RawSecret::new(input.to_vec());
    }

    if let Ok(decoded) = STANDARD.decode(input) {
        return RawSecret::new(decoded);
    }

    let normalised: Vec<u8> = input
        .iter()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|&b| match b {
            b'-' => b'+',
            b'_' => b'/',
            other => other,
        })
        .collect();

    match PERMISSIVE.decode(&normalised) {
        Ok(decoded) => RawSecret::new(decoded),
        // Not base64 at all: report the size of what we were given
        Err(_) => RawSecret::new(input.to_vec()),
    }
}

/// Generate a fresh random secret for `algorithm`, base64 encoded.
pub fn generate_secret(algorithm: CipherAlgorithm) -> String {
    let mut bytes = vec![0u8; algorithm.key_size() * 2];
    rand::rng().fill_bytes(&mut bytes);
    let secret = RawSecret::new(bytes);
    STANDARD.encode(secret.expose_secret())
}
