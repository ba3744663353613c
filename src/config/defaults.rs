// src/config/defaults.rs
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::app::{Config, SecretsConfig};
use crate::enums::CipherAlgorithm;

pub const DEFAULT_SECRETS_PATH: &str = "config/secrets.enc";
pub const DEFAULT_SECRETS_KEY_PATH: &str = "config/secrets.key";

/// No keyrings: every lookup fails until one is configured.
pub fn default_config() -> Config {
    Config {
        keyrings: BTreeMap::new(),
        secrets: None,
    }
}

pub fn default_secrets() -> SecretsConfig {
    SecretsConfig {
        path: PathBuf::from(DEFAULT_SECRETS_PATH),
        key_path: PathBuf::from(DEFAULT_SECRETS_KEY_PATH),
        cipher: CipherAlgorithm::default(),
    }
}
