// src/model/schema.rs
//! Model registration: which fields are encrypted, with which keyring
//!
//! A schema is built once per record type and shared behind an `Arc`. A
//! subtype that needs a different keyring derives its own schema with
//! [`ModelSchema::with_keyring`] instead of mutating the parent's.

use std::sync::Arc;

use crate::consts::DEFAULT_KEYRING_COLUMN;
use crate::core::Keyring;
use crate::error::{CoreError, Result};
use crate::model::attribute::{EncryptedField, Encoder};

#[derive(Debug)]
pub struct ModelSchema {
    keyring: Arc<Keyring>,
    keyring_column: String,
    fields: Vec<EncryptedField>,
}

impl ModelSchema {
    pub fn builder(keyring: Arc<Keyring>) -> SchemaBuilder {
        SchemaBuilder {
            keyring,
            keyring_column: DEFAULT_KEYRING_COLUMN.to_owned(),
            fields: Vec::new(),
        }
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    pub fn keyring_column(&self) -> &str {
        &self.keyring_column
    }

    pub fn fields(&self) -> &[EncryptedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&EncryptedField> {
        self.fields
            .iter()
            .find(|field| field.name() == name)
            .ok_or_else(|| CoreError::UnknownAttribute(name.to_owned()))
    }

    /// Same fields and columns, different keyring.
    pub fn with_keyring(&self, keyring: Arc<Keyring>) -> Result<Arc<Self>> {
        if keyring.is_empty() {
            return Err(CoreError::EmptyKeyring);
        }
        Ok(Arc::new(Self {
            keyring,
            keyring_column: self.keyring_column.clone(),
            fields: self.fields.clone(),
        }))
    }

    /// Every persisted column, key id column first.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![self.keyring_column.clone()];
        for field in &self.fields {
            columns.push(field.encrypted_column());
            columns.extend(field.digest_column());
        }
        columns
    }
}

pub struct SchemaBuilder {
    keyring: Arc<Keyring>,
    keyring_column: String,
    fields: Vec<EncryptedField>,
}

impl SchemaBuilder {
    /// Encrypted string field
    pub fn encrypt(self, name: impl Into<String>) -> Self {
        self.field(EncryptedField::new(name))
    }

    /// Encrypted field serialized through `encoder`
    pub fn encrypt_with(self, name: impl Into<String>, encoder: impl Encoder + 'static) -> Self {
        self.field(EncryptedField::new(name).with_encoder(encoder))
    }

    pub fn field(mut self, field: EncryptedField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn keyring_column(mut self, column: impl Into<String>) -> Self {
        self.keyring_column = column.into();
        self
    }

    /// Validate names and refuse an empty keyring.
    pub fn build(self) -> Result<Arc<ModelSchema>> {
        if self.keyring.is_empty() {
            return Err(CoreError::EmptyKeyring);
        }

        validate_identifier(&self.keyring_column)?;
        for (i, field) in self.fields.iter().enumerate() {
            validate_identifier(field.name())?;
            if self.fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(CoreError::Config(format!(
                    "attribute {} declared twice",
                    field.name()
                )));
            }
        }

        Ok(Arc::new(ModelSchema {
            keyring: self.keyring,
            keyring_column: self.keyring_column,
            fields: self.fields,
        }))
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidIdentifier(name.to_owned()))
    }
}
