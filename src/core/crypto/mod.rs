// src/core/crypto/mod.rs
//! Pure cryptographic operations: no I/O, no database
//!
//! Every strategy produces the same envelope shape:
//!
//! ```text
//! base64( b64(hmac) "--" b64(iv) ["--" b64(auth_tag)] "--" b64(ciphertext) )
//! ```
//!
//! The HMAC-SHA256 (keyed by the signing half of the key) covers everything
//! after the first separator, and is checked in constant time before any
//! other part of the envelope is looked at.

mod cbc;
mod gcm;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::consts::ENVELOPE_SEPARATOR;
use crate::enums::CipherAlgorithm;
use crate::error::{CoreError, Result};
use crate::key_ops::Key;

pub use cbc::AesCbc;
pub use gcm::AesGcm;

type HmacSha256 = Hmac<Sha256>;

/// A symmetric scheme turning plaintext into a signed envelope and back.
pub trait CipherStrategy: Send + Sync {
    /// Algorithm this strategy implements
    fn algorithm(&self) -> CipherAlgorithm;

    /// Required length of each key half
    fn key_size(&self) -> usize {
        self.algorithm().key_size()
    }

    /// Envelope parts after the HMAC: iv, the tag for authenticated modes,
    /// then the ciphertext
    fn envelope_parts(&self) -> usize {
        if self.algorithm().is_authenticated() {
            3
        } else {
            2
        }
    }

    fn encrypt(&self, key: &Key, plaintext: &[u8]) -> Result<String>;

    fn decrypt(&self, key: &Key, envelope: &str) -> Result<Vec<u8>>;
}

static AES_128_CBC: AesCbc = AesCbc::new(CipherAlgorithm::Aes128Cbc);
static AES_192_CBC: AesCbc = AesCbc::new(CipherAlgorithm::Aes192Cbc);
static AES_256_CBC: AesCbc = AesCbc::new(CipherAlgorithm::Aes256Cbc);
static AES_256_GCM: AesGcm = AesGcm;

/// Resolve the stateless strategy for `algorithm`.
pub fn strategy_for(algorithm: CipherAlgorithm) -> &'static dyn CipherStrategy {
    match algorithm {
        CipherAlgorithm::Aes128Cbc => &AES_128_CBC,
        CipherAlgorithm::Aes192Cbc => &AES_192_CBC,
        CipherAlgorithm::Aes256Cbc => &AES_256_CBC,
        CipherAlgorithm::Aes256Gcm => &AES_256_GCM,
    }
}

/// Encrypt with the strategy selected by `algorithm`.
pub fn encrypt(algorithm: CipherAlgorithm, key: &Key, plaintext: &[u8]) -> Result<String> {
    strategy_for(algorithm).encrypt(key, plaintext)
}

/// Decrypt with the strategy selected by `algorithm`.
pub fn decrypt(algorithm: CipherAlgorithm, key: &Key, envelope: &str) -> Result<Vec<u8>> {
    strategy_for(algorithm).decrypt(key, envelope)
}

/// HMAC-SHA256 of `data` keyed by `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| CoreError::Cipher(format!("hmac: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Compare two byte strings without exiting early.
///
/// Every byte of the longer input is visited whatever the position of the
/// first difference; a length mismatch is folded into the accumulator.
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    let (diff, _) = xor_fold(a, b);
    diff == 0
}

/// Returns the accumulated difference and the number of positions examined.
fn xor_fold(a: &[u8], b: &[u8]) -> (u8, usize) {
    let len = a.len().max(b.len());
    let mut diff = u8::from(a.len() != b.len());
    let mut examined = 0;

    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
        examined += 1;
    }

    (diff, examined)
}

/// Sign `parts` and wrap everything into the outer base64 envelope.
pub(crate) fn seal_envelope(key: &Key, parts: &[&[u8]]) -> Result<String> {
    let body = join_parts(parts);
    let hmac = hmac_sha256(key.signing_key(), &body)?;

    let mut framed = STANDARD.encode(hmac).into_bytes();
    framed.extend_from_slice(ENVELOPE_SEPARATOR);
    framed.extend_from_slice(&body);

    Ok(STANDARD.encode(framed))
}

/// Verify the envelope's HMAC and return its decoded parts (hmac excluded).
pub(crate) fn open_envelope(
    key: &Key,
    envelope: &str,
    expected_parts: usize,
) -> Result<Vec<Vec<u8>>> {
    let framed = STANDARD.decode(envelope.trim())?;

    let (provided_b64, body) = match find_separator(&framed) {
        Some(at) => (&framed[..at], &framed[at + ENVELOPE_SEPARATOR.len()..]),
        None => (&framed[..], &[][..]),
    };

    let expected = hmac_sha256(key.signing_key(), body)?;
    let provided = STANDARD.decode(provided_b64).unwrap_or_default();

    if !secure_compare(&expected, &provided) {
        return Err(CoreError::InvalidAuthentication {
            expected: STANDARD.encode(&expected),
            actual: String::from_utf8_lossy(provided_b64).into_owned(),
        });
    }

    let parts = split_parts(body)?;
    if parts.len() != expected_parts {
        return Err(CoreError::MalformedEnvelope(format!(
            "expected {expected_parts} parts, got {}",
            parts.len()
        )));
    }
    Ok(parts)
}

fn join_parts(parts: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            body.extend_from_slice(ENVELOPE_SEPARATOR);
        }
        body.extend_from_slice(STANDARD.encode(part).as_bytes());
    }
    body
}

fn split_parts(body: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut parts = Vec::new();
    let mut rest = body;
    loop {
        match find_separator(rest) {
            Some(at) => {
                parts.push(STANDARD.decode(&rest[..at])?);
                rest = &rest[at + ENVELOPE_SEPARATOR.len()..];
            }
            None => {
                parts.push(STANDARD.decode(rest)?);
                return Ok(parts);
            }
        }
    }
}

fn find_separator(data: &[u8]) -> Option<usize> {
    data.windows(ENVELOPE_SEPARATOR.len())
        .position(|window| window == ENVELOPE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_fold_visits_every_byte_on_early_mismatch() {
        let a = [0xffu8; 32];
        let mut b = [0xffu8; 32];
        b[0] = 0;
        assert_eq!(xor_fold(&a, &b), (0xff, 32));
    }

    #[test]
    fn xor_fold_visits_every_byte_on_late_mismatch() {
        let a = [7u8; 32];
        let mut b = [7u8; 32];
        b[31] = 6;
        let (diff, examined) = xor_fold(&a, &b);
        assert_ne!(diff, 0);
        assert_eq!(examined, 32);
    }

    #[test]
    fn xor_fold_covers_longer_input_on_length_mismatch() {
        let (diff, examined) = xor_fold(&[1, 2, 3], &[1, 2, 3, 4, 5]);
        assert_ne!(diff, 0);
        assert_eq!(examined, 5);
    }

    #[test]
    fn secure_compare_matches_equality() {
        assert!(secure_compare(b"signature", b"signature"));
        assert!(!secure_compare(b"signature", b"signaturf"));
        assert!(!secure_compare(b"", b"x"));
        assert!(secure_compare(b"", b""));
    }

    #[test]
    fn parts_split_back_in_order() {
        let body = join_parts(&[&b"iv"[..], &b""[..], &b"ciphertext"[..]]);
        let parts = split_parts(&body).unwrap();
        assert_eq!(parts, vec![b"iv".to_vec(), Vec::new(), b"ciphertext".to_vec()]);
    }
}
