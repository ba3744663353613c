// src/core/keyring.rs
//! Versioned keyring: the highest key id encrypts, every id decrypts
//!
//! Keys are only ever added. Rows encrypted under an old key keep decrypting
//! through the key id stored next to them until a save migrates them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::crypto::{self, hmac_sha256};
use crate::enums::CipherAlgorithm;
use crate::error::{CoreError, Result};
use crate::key_ops::Key;

/// Output of [`Keyring::encrypt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encrypted {
    pub ciphertext: String,
    pub key_id: u32,
    pub digest: String,
}

pub struct Keyring {
    keys: RwLock<BTreeMap<u32, Arc<Key>>>,
    digest_salt: String,
    algorithm: CipherAlgorithm,
}

impl Keyring {
    /// An empty keyring. Encrypting or decrypting fails until a key is added.
    pub fn new(algorithm: CipherAlgorithm, digest_salt: impl Into<String>) -> Self {
        Self {
            keys: RwLock::new(BTreeMap::new()),
            digest_salt: digest_salt.into(),
            algorithm,
        }
    }

    /// Build a keyring from `(id, secret)` pairs. Must contain at least one key.
    pub fn from_secrets<I, S>(
        secrets: I,
        digest_salt: impl Into<String>,
        algorithm: CipherAlgorithm,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: AsRef<[u8]>,
    {
        let mut keys = BTreeMap::new();
        for (id, secret) in secrets {
            if id == 0 {
                return Err(CoreError::InvalidKeyId { id, current: 0 });
            }
            keys.insert(id, Arc::new(Key::for_algorithm(id, secret, algorithm)?));
        }

        if keys.is_empty() {
            return Err(CoreError::EmptyKeyring);
        }

        Ok(Self {
            keys: RwLock::new(keys),
            digest_salt: digest_salt.into(),
            algorithm,
        })
    }

    /// Rotation: add a key whose id is above every existing id.
    pub fn add_key(&self, id: u32, secret: impl AsRef<[u8]>) -> Result<Arc<Key>> {
        let key = Arc::new(Key::for_algorithm(id, secret, self.algorithm)?);

        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let current = keys.keys().next_back().copied().unwrap_or(0);
        if id <= current {
            return Err(CoreError::InvalidKeyId { id, current });
        }
        keys.insert(id, Arc::clone(&key));
        drop(keys);

        tracing::info!(key_id = id, previous_key_id = current, "keyring rotated");
        Ok(key)
    }

    /// The key with the highest id, if any.
    pub fn current_key(&self) -> Option<Arc<Key>> {
        self.read_keys().values().next_back().cloned()
    }

    pub fn get(&self, id: u32) -> Option<Arc<Key>> {
        self.read_keys().get(&id).cloned()
    }

    pub fn key_ids(&self) -> Vec<u32> {
        self.read_keys().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.read_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_keys().is_empty()
    }

    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    /// Encrypt under `previous_key_id` when that key still exists, otherwise
    /// under the current key.
    pub fn encrypt(&self, plaintext: &[u8], previous_key_id: Option<u32>) -> Result<Encrypted> {
        let key = previous_key_id
            .and_then(|id| self.get(id))
            .or_else(|| self.current_key())
            .ok_or(CoreError::EmptyKeyring)?;

        let ciphertext = crypto::encrypt(self.algorithm, &key, plaintext)?;
        Ok(Encrypted {
            ciphertext,
            key_id: key.id(),
            digest: self.digest(plaintext)?,
        })
    }

    /// Decrypt with exactly the key `key_id`; never falls back to another key.
    pub fn decrypt(&self, ciphertext: &str, key_id: u32) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Err(CoreError::EmptyKeyring);
        }
        let key = self.get(key_id).ok_or(CoreError::KeyNotFound(key_id))?;
        crypto::decrypt(self.algorithm, &key, ciphertext)
    }

    /// Hex HMAC-SHA256 of `plaintext` keyed by the digest salt.
    pub fn digest(&self, plaintext: &[u8]) -> Result<String> {
        Ok(hex::encode(hmac_sha256(self.digest_salt.as_bytes(), plaintext)?))
    }

    fn read_keys(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<u32, Arc<Key>>> {
        self.keys.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring")
            .field("key_ids", &self.key_ids())
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
