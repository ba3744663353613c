// src/model/attribute.rs
//! Encrypted field descriptors and value encoders

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::consts::{DIGEST_COLUMN_SUFFIX, ENCRYPTED_COLUMN_PREFIX};
use crate::error::Result;

/// Serializes attribute values before encryption and after decryption.
pub trait Encoder: Send + Sync {
    fn dump(&self, value: &Value) -> Result<String>;

    fn parse(&self, raw: &str) -> Result<Value>;
}

/// Values are plain strings. Non-string values are stored as their JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoder;

impl Encoder for RawEncoder {
    fn dump(&self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn parse(&self, raw: &str) -> Result<Value> {
        Ok(Value::String(raw.to_owned()))
    }
}

/// Structured values round-trip through `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn dump(&self, value: &Value) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn parse(&self, raw: &str) -> Result<Value> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// One encrypted attribute declared on a model.
#[derive(Clone)]
pub struct EncryptedField {
    name: String,
    encoder: Arc<dyn Encoder>,
    digest: bool,
}

impl EncryptedField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoder: Arc::new(RawEncoder),
            digest: false,
        }
    }

    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Maintain a `<name>_digest` column for equality lookups.
    pub fn with_digest(mut self) -> Self {
        self.digest = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    pub fn has_digest(&self) -> bool {
        self.digest
    }

    pub fn encrypted_column(&self) -> String {
        format!("{ENCRYPTED_COLUMN_PREFIX}{}", self.name)
    }

    pub fn digest_column(&self) -> Option<String> {
        self.digest
            .then(|| format!("{}{DIGEST_COLUMN_SUFFIX}", self.name))
    }
}

impl fmt::Debug for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedField")
            .field("name", &self.name)
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}
