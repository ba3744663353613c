// src/model/record.rs
//! A record instance: persisted columns plus the per-field cleartext cache

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::model::attribute::EncryptedField;
use crate::model::schema::ModelSchema;

/// A single column value as the record store sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    #[default]
    Null,
    Integer(i64),
    Text(String),
}

impl ColumnValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

/// Column name → value. Missing columns read as `Null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Row(BTreeMap<String, ColumnValue>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> &ColumnValue {
        static NULL: ColumnValue = ColumnValue::Null;
        self.0.get(column).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column: impl Into<String>, value: ColumnValue) {
        self.0.insert(column.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnValue)> {
        self.0.iter()
    }
}

pub struct EncryptedRecord {
    schema: Arc<ModelSchema>,
    id: Option<i64>,
    row: Row,
    cache: HashMap<String, Value>,
}

impl EncryptedRecord {
    /// A new, unsaved record.
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self::from_row(schema, None, Row::new())
    }

    /// A record loaded from stored columns. Nothing is decrypted yet.
    pub fn from_row(schema: Arc<ModelSchema>, id: Option<i64>, row: Row) -> Self {
        Self {
            schema,
            id,
            row,
            cache: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    /// Key id the stored ciphertexts were encrypted with.
    pub fn keyring_id(&self) -> Option<u32> {
        self.row
            .get(self.schema.keyring_column())
            .as_i64()
            .and_then(|id| u32::try_from(id).ok())
    }

    /// Stored envelope for `name`, if any.
    pub fn ciphertext(&self, name: &str) -> Result<Option<&str>> {
        let field = self.schema.field(name)?;
        Ok(self.row.get(&field.encrypted_column()).as_str())
    }

    /// Stored lookup digest for `name`, if the field keeps one.
    pub fn digest(&self, name: &str) -> Result<Option<&str>> {
        let field = self.schema.field(name)?;
        Ok(field
            .digest_column()
            .and_then(|column| self.row.get(&column).as_str()))
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Encrypt and store `value`. `Null` or an empty encoding clears the field.
    ///
    /// Keeps using the record's stored key id so ordinary writes do not move
    /// the row to a new key; [`before_save`](Self::before_save) does that.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let field = self.schema.field(name)?.clone();
        self.cache.remove(name);

        let encoded = match value {
            Value::Null => None,
            ref other => Some(field.encoder().dump(other)?).filter(|s| !s.is_empty()),
        };

        match encoded {
            Some(encoded) => self.write_encrypted(&field, &encoded, self.keyring_id()),
            None => {
                self.clear(&field);
                Ok(())
            }
        }
    }

    /// Serialize `value` to JSON and store it through the field's encoder.
    pub fn set_as<T: Serialize>(&mut self, name: &str, value: &T) -> Result<()> {
        self.set(name, serde_json::to_value(value)?)
    }

    /// Decrypted value of `name`; cached after the first decrypt.
    pub fn get(&mut self, name: &str) -> Result<Option<Value>> {
        if let Some(value) = self.cache.get(name) {
            return Ok(Some(value.clone()));
        }

        let field = self.schema.field(name)?;
        let stored = self.row.get(&field.encrypted_column()).as_str();
        let Some(ciphertext) = stored.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let key_id = self
            .keyring_id()
            .ok_or_else(|| CoreError::MalformedEnvelope(format!("{name} has no key id")))?;
        let plaintext = self.schema.keyring().decrypt(ciphertext, key_id)?;
        let value = field.encoder().parse(&String::from_utf8(plaintext)?)?;

        self.cache.insert(name.to_owned(), value.clone());
        Ok(Some(value))
    }

    /// `get` for string fields.
    pub fn get_string(&mut self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name)?.map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    /// `get` deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>> {
        self.get(name)?
            .map(|value| serde_json::from_value(value).map_err(CoreError::from))
            .transpose()
    }

    /// Rotation migration: re-encrypt every field holding a value under the
    /// keyring's current key and record that key id. A record with no
    /// encrypted values left gets a `NULL` key id.
    ///
    /// All values are decrypted before anything is rewritten, since the key id
    /// column is shared by every field of the row.
    pub fn before_save(&mut self) -> Result<()> {
        let fields = self.schema.fields().to_vec();

        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            if let Some(value) = self.get(field.name())? {
                values.push((field, value));
            }
        }

        let previous = self.keyring_id();
        if values.is_empty() {
            // nothing is encrypted, so no key id applies
            self.row.set(self.schema.keyring_column(), ColumnValue::Null);
        }
        for (field, value) in values {
            let encoded = field.encoder().dump(&value)?;
            self.write_encrypted(field, &encoded, None)?;
            self.cache.insert(field.name().to_owned(), value);
        }

        if let (Some(from), Some(to)) = (previous, self.keyring_id()) {
            if from != to {
                tracing::debug!(record_id = ?self.id, from, to, "migrated record to current key");
            }
        }
        Ok(())
    }

    /// Same as `before_save`; the record store persists right after.
    pub fn rotate_keys(&mut self) -> Result<()> {
        self.before_save()
    }

    fn write_encrypted(
        &mut self,
        field: &EncryptedField,
        encoded: &str,
        previous_key_id: Option<u32>,
    ) -> Result<()> {
        let encrypted = self
            .schema
            .keyring()
            .encrypt(encoded.as_bytes(), previous_key_id)?;

        self.row.set(
            field.encrypted_column(),
            ColumnValue::Text(encrypted.ciphertext),
        );
        self.row.set(
            self.schema.keyring_column(),
            ColumnValue::Integer(i64::from(encrypted.key_id)),
        );
        if let Some(column) = field.digest_column() {
            self.row.set(column, ColumnValue::Text(encrypted.digest));
        }
        Ok(())
    }

    fn clear(&mut self, field: &EncryptedField) {
        self.row.set(field.encrypted_column(), ColumnValue::Null);
        if let Some(column) = field.digest_column() {
            self.row.set(column, ColumnValue::Null);
        }
    }
}

impl std::fmt::Debug for EncryptedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedRecord")
            .field("id", &self.id)
            .field("keyring_id", &self.keyring_id())
            .finish_non_exhaustive()
    }
}
