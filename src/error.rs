// src/error.rs
//! Public error type for the entire crate

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Secret must be {expected} bytes; got {actual}")]
    InvalidSecret { expected: usize, actual: usize },

    #[error("Invalid authentication; expected {expected}, got {actual}")]
    InvalidAuthentication { expected: String, actual: String },

    #[error("key={0} is not available on keyring")]
    KeyNotFound(u32),

    #[error("keyring has no keys; configure at least one key before encrypting")]
    EmptyKeyring,

    #[error("key id {id} must be greater than the current key id {current}")]
    InvalidKeyId { id: u32, current: u32 },

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Cipher operation failed: {0}")]
    Cipher(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decrypted value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Encoder error: {0}")]
    Encoder(#[from] serde_json::Error),

    #[error("{0} is not an encrypted attribute of this model")]
    UnknownAttribute(String),

    #[error("{0:?} is not a valid SQL identifier")]
    InvalidIdentifier(String),

    #[error("{} already exists; refusing to overwrite", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
