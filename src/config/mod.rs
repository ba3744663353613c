// src/config/mod.rs
//! Configuration system for encrypted-keyring
//!
//! Central, lazy-loaded global config with TOML + env overrides.

pub use app::{load, load_from, Config, KeyringConfig, SecretsConfig};

mod app;
mod defaults;
