// src/file_ops.rs
//! Encrypted secrets files and their key files
//!
//! A secrets file holds exactly one envelope, produced with a single
//! unversioned key. Writes go through a temp file in the target directory
//! followed by a rename, so readers only ever see a complete envelope.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use secure_gate::RevealSecret;

use crate::aliases::PlainText;
use crate::core::crypto;
use crate::enums::CipherAlgorithm;
use crate::error::{CoreError, Result};
use crate::key_ops::{generate_secret, Key};

/// Key id used for the single, unversioned key of a secrets file
pub const FILE_KEY_ID: u32 = 0;

pub struct EncryptedFile {
    path: PathBuf,
    key: Key,
    algorithm: CipherAlgorithm,
}

impl EncryptedFile {
    pub fn new(path: impl Into<PathBuf>, key: Key, algorithm: CipherAlgorithm) -> Self {
        Self {
            path: path.into(),
            key,
            algorithm,
        }
    }

    /// Open `path` with a secret decoded for `algorithm`.
    pub fn with_secret(
        path: impl Into<PathBuf>,
        secret: impl AsRef<[u8]>,
        algorithm: CipherAlgorithm,
    ) -> Result<Self> {
        let key = Key::for_algorithm(FILE_KEY_ID, secret, algorithm)?;
        Ok(Self::new(path, key, algorithm))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and decrypt the whole file.
    pub fn read(&self) -> Result<PlainText> {
        let envelope = fs::read_to_string(&self.path)?;
        let plaintext = crypto::decrypt(self.algorithm, &self.key, &envelope)?;
        Ok(PlainText::new(plaintext))
    }

    pub fn read_to_string(&self) -> Result<String> {
        let plaintext = self.read()?;
        Ok(String::from_utf8(plaintext.expose_secret().clone())?)
    }

    pub fn read_json<T: DeserializeOwned>(&self) -> Result<T> {
        let plaintext = self.read()?;
        Ok(serde_json::from_slice(plaintext.expose_secret())?)
    }

    /// Encrypt `plaintext` and atomically replace the file.
    pub fn write(&self, plaintext: &[u8]) -> Result<()> {
        let envelope = crypto::encrypt(self.algorithm, &self.key, plaintext)?;
        let tmp = self.stage(envelope.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| CoreError::Io(e.error))?;

        tracing::debug!(path = %self.path.display(), algorithm = %self.algorithm, "wrote encrypted file");
        Ok(())
    }

    pub fn write_json<T: Serialize>(&self, value: &T) -> Result<()> {
        self.write(&serde_json::to_vec_pretty(value)?)
    }

    /// Like `write`, but refuses to replace an existing file.
    pub fn create(&self, plaintext: &[u8]) -> Result<()> {
        if self.exists() {
            return Err(self.conflict());
        }

        let envelope = crypto::encrypt(self.algorithm, &self.key, plaintext)?;
        let tmp = self.stage(envelope.as_bytes())?;
        tmp.persist_noclobber(&self.path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                self.conflict()
            } else {
                CoreError::Io(e.error)
            }
        })?;
        Ok(())
    }

    /// Read-modify-write of the decrypted contents.
    pub fn update<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(Vec<u8>) -> Result<Vec<u8>>,
    {
        let current = if self.exists() {
            self.read()?.expose_secret().clone()
        } else {
            Vec::new()
        };
        let updated = PlainText::new(edit(current)?);
        self.write(updated.expose_secret())
    }

    fn stage(&self, contents: &[u8]) -> Result<NamedTempFile> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".ekr-secrets-")
            .tempfile_in(&dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }

    fn conflict(&self) -> CoreError {
        tracing::warn!(path = %self.path.display(), "refusing to overwrite encrypted file");
        CoreError::AlreadyExists(self.path.clone())
    }
}

impl std::fmt::Debug for EncryptedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFile")
            .field("path", &self.path)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Write a fresh random secret to `path`. Never overwrites an existing file.
pub fn generate_key_file<P: AsRef<Path>>(path: P, algorithm: CipherAlgorithm) -> Result<String> {
    let path = path.as_ref();
    if path.exists() {
        tracing::warn!(path = %path.display(), "refusing to overwrite key file");
        return Err(CoreError::AlreadyExists(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let secret = generate_secret(algorithm);
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => CoreError::AlreadyExists(path.to_path_buf()),
            _ => CoreError::Io(e),
        })?;
    writeln!(file, "{secret}")?;

    tracing::info!(path = %path.display(), algorithm = %algorithm, "generated key file");
    Ok(secret)
}

/// Load the key stored in `path` (surrounding whitespace ignored).
pub fn read_key_file<P: AsRef<Path>>(path: P, algorithm: CipherAlgorithm) -> Result<Key> {
    let contents = fs::read_to_string(path.as_ref())?;
    Key::for_algorithm(FILE_KEY_ID, contents.trim(), algorithm)
}
