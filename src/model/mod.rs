// src/model/mod.rs
//! Encrypted attribute binding
//!
//! A record type registers its encrypted fields once in a [`ModelSchema`];
//! each [`EncryptedRecord`] then encrypts on write, decrypts (and caches) on
//! read, and migrates every field to the current key before it is saved.

pub mod attribute;
pub mod record;
pub mod schema;

pub use attribute::{Encoder, EncryptedField, JsonEncoder, RawEncoder};
pub use record::{ColumnValue, EncryptedRecord, Row};
pub use schema::{ModelSchema, SchemaBuilder};
