// src/db/record_db_ops.rs
//! Record table operations
//!
//! This module persists [`EncryptedRecord`]s into a SQLite table whose
//! columns follow the model schema: `id`, the key id column, then
//! `encrypted_<field>` and optional `<field>_digest` per encrypted field.
//! Every save runs the record's before-save migration first, so saving is
//! what moves rows onto the newest key.

use std::collections::BTreeMap;
use std::sync::Arc;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::model::schema::validate_identifier;
use crate::model::{ColumnValue, EncryptedRecord, ModelSchema, Row};

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            ColumnValue::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            ColumnValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for ColumnValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(ColumnValue::Null),
            ValueRef::Integer(i) => Ok(ColumnValue::Integer(i)),
            ValueRef::Text(_) => value.as_str().map(|s| ColumnValue::Text(s.to_owned())),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

pub struct RecordTable<'c> {
    conn: &'c Connection,
    table: String,
    schema: Arc<ModelSchema>,
    columns: Vec<String>,
}

impl<'c> RecordTable<'c> {
    /// Bind `schema` to `table`, creating the table and its indexes if needed.
    pub fn create(conn: &'c Connection, table: &str, schema: Arc<ModelSchema>) -> Result<Self> {
        validate_identifier(table)?;
        let columns = schema.columns();

        let mut ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    {} INTEGER",
            schema.keyring_column()
        );
        for field in schema.fields() {
            ddl.push_str(&format!(",\n    {} TEXT", field.encrypted_column()));
            if let Some(digest) = field.digest_column() {
                ddl.push_str(&format!(",\n    {digest} TEXT"));
            }
        }
        ddl.push_str("\n);\n");

        ddl.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table}({col});\n",
            col = schema.keyring_column()
        ));
        for digest in schema.fields().iter().filter_map(|f| f.digest_column()) {
            ddl.push_str(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{digest} ON {table}({digest});\n"
            ));
        }

        conn.execute_batch(&ddl)?;

        Ok(Self {
            conn,
            table: table.to_owned(),
            schema,
            columns,
        })
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// A fresh, unsaved record bound to this table's schema.
    pub fn build(&self) -> EncryptedRecord {
        EncryptedRecord::new(Arc::clone(&self.schema))
    }

    /// Migrate the record to the current key, then insert or update it.
    pub fn save(&self, record: &mut EncryptedRecord) -> Result<i64> {
        record.before_save()?;
        self.persist(record)
    }

    /// Force the rotation migration and persist immediately.
    pub fn rotate_and_save(&self, record: &mut EncryptedRecord) -> Result<i64> {
        record.rotate_keys()?;
        self.persist(record)
    }

    pub fn find(&self, id: i64) -> Result<Option<EncryptedRecord>> {
        let sql = format!("{} WHERE id = ?1", self.select_sql());
        let found = self
            .conn
            .query_row(&sql, [id], |row| self.map_row(row))
            .optional()?;

        Ok(found.map(|(id, row)| self.load(id, row)))
    }

    /// Equality search through `<field>_digest`, no decryption involved.
    pub fn find_by_digest(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<EncryptedRecord>> {
        let field = self.schema.field(field)?;
        let column = field.digest_column().ok_or_else(|| {
            CoreError::Config(format!("{} has no digest column", field.name()))
        })?;

        let encoded = field.encoder().dump(&value.into())?;
        let digest = self.schema.keyring().digest(encoded.as_bytes())?;

        let sql = format!("{} WHERE {column} = ?1 ORDER BY id", self.select_sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([digest], |row| self.map_row(row))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, row) = row?;
            records.push(self.load(id, row));
        }
        Ok(records)
    }

    /// Re-encrypt every row not yet on the current key, in one transaction.
    ///
    /// Returns the number of rows whose key id changed. Rows with no
    /// encrypted values left drop their key id instead.
    pub fn rotate_all(&self) -> Result<usize> {
        let current = self
            .schema
            .keyring()
            .current_key()
            .ok_or(CoreError::EmptyKeyring)?
            .id();

        let tx = self.conn.unchecked_transaction()?;
        let stale: Vec<i64> = {
            let sql = format!(
                "SELECT id FROM {} WHERE {kc} IS NOT NULL AND {kc} != ?1 ORDER BY id",
                self.table,
                kc = self.schema.keyring_column()
            );
            let mut stmt = tx.prepare(&sql)?;
            let ids = stmt.query_map([current], |row| row.get(0))?;
            ids.collect::<rusqlite::Result<_>>()?
        };

        let mut migrated = 0;
        for id in &stale {
            if let Some(mut record) = self.find(*id)? {
                let before = record.keyring_id();
                self.rotate_and_save(&mut record)?;
                if record.keyring_id() != before {
                    migrated += 1;
                }
            }
        }
        tx.commit()?;

        tracing::info!(
            table = %self.table,
            key_id = current,
            stale = stale.len(),
            migrated,
            "rotation sweep finished"
        );
        Ok(migrated)
    }

    /// Number of rows stored under each key id.
    pub fn key_version_counts(&self) -> Result<BTreeMap<u32, usize>> {
        let sql = format!(
            "SELECT {kc}, COUNT(*) FROM {} WHERE {kc} IS NOT NULL GROUP BY {kc}",
            self.table,
            kc = self.schema.keyring_column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (key_id, count) = row?;
            counts.insert(key_id, count as usize);
        }
        Ok(counts)
    }

    fn persist(&self, record: &mut EncryptedRecord) -> Result<i64> {
        let values: Vec<&ColumnValue> = self
            .columns
            .iter()
            .map(|column| record.row().get(column))
            .collect();

        match record.id() {
            Some(id) => {
                let assignments: Vec<String> = self
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| format!("{column} = ?{}", i + 1))
                    .collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE id = {id}",
                    self.table,
                    assignments.join(", ")
                );
                self.conn.execute(&sql, params_from_iter(values))?;
                Ok(id)
            }
            None => {
                let placeholders: Vec<String> =
                    (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    self.table,
                    self.columns.join(", "),
                    placeholders.join(", ")
                );
                self.conn.execute(&sql, params_from_iter(values))?;
                let id = self.conn.last_insert_rowid();
                record.set_id(id);
                Ok(id)
            }
        }
    }

    fn select_sql(&self) -> String {
        format!("SELECT id, {} FROM {}", self.columns.join(", "), self.table)
    }

    fn map_row(&self, row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, Row)> {
        let id: i64 = row.get(0)?;
        let mut stored = Row::new();
        for (i, column) in self.columns.iter().enumerate() {
            stored.set(column.clone(), row.get::<_, ColumnValue>(i + 1)?);
        }
        Ok((id, stored))
    }

    fn load(&self, id: i64, row: Row) -> EncryptedRecord {
        EncryptedRecord::from_row(Arc::clone(&self.schema), Some(id), row)
    }
}

impl std::fmt::Debug for RecordTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordTable")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}
