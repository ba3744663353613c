// src/db/mod.rs
//! SQLite-backed record store for encrypted models

pub mod record_db_conn;
pub mod record_db_ops;

pub use record_db_conn::open_record_db;
pub use record_db_ops::RecordTable;
