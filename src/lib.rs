// src/lib.rs
//! encrypted-keyring: versioned, rotatable encryption for sensitive data
//!
//! Features:
//! - AES-256-GCM and AES-128/192/256-CBC envelopes, HMAC-SHA256 signed
//! - Keyrings of versioned keys with lazy, save-time rotation
//! - Encrypted record attributes with digest columns for equality lookups
//! - Single-key encrypted secrets files with atomic writes

pub mod aliases;
pub mod config;
pub mod consts;
pub mod core;
pub mod db;
pub mod enums;
pub mod error;
pub mod file_ops;
pub mod key_ops;
pub mod model;

// Re-export everything users need at the crate root
pub use crate::core::{Encrypted, Keyring};
pub use config::load as load_config;
pub use db::{open_record_db, RecordTable};
pub use enums::CipherAlgorithm;
pub use error::{CoreError, Result as CoreResult};
pub use file_ops::EncryptedFile;
pub use key_ops::{generate_secret, Key};
pub use model::{EncryptedRecord, JsonEncoder, ModelSchema};
