// src/config/app.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fmt, fs};

use once_cell::sync::OnceCell;
use serde::Deserialize;

use super::defaults::*;
use crate::consts::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, KEYRING_ENV_PREFIX, SECRETS_KEY_ENV};
use crate::core::Keyring;
use crate::enums::CipherAlgorithm;
use crate::error::{CoreError, Result};
use crate::file_ops::{read_key_file, EncryptedFile, FILE_KEY_ID};
use crate::key_ops::Key;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub keyrings: BTreeMap<String, KeyringConfig>,
    #[serde(default)]
    pub secrets: Option<SecretsConfig>,
}

#[derive(Clone, Deserialize, Default)]
pub struct KeyringConfig {
    /// Key id (as a string, TOML keys always are) → secret
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
    #[serde(default)]
    pub digest_salt: String,
    #[serde(default)]
    pub cipher: CipherAlgorithm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretsConfig {
    pub path: PathBuf,
    pub key_path: PathBuf,
    #[serde(default)]
    pub cipher: CipherAlgorithm,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Process-wide config, loaded on first use.
///
/// A missing file yields the empty default config; broken TOML is an error.
pub fn load() -> Result<&'static Config> {
    CONFIG.get_or_try_init(|| {
        let config_path =
            env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            load_from(&config_path)
        } else {
            tracing::warn!(path = %config_path, "config file not found; using built-in defaults");
            let mut conf = default_config();
            conf.apply_env_overrides()?;
            Ok(conf)
        }
    })
}

/// Load `path` and apply environment overrides, bypassing the global.
pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path.as_ref())?;
    let mut conf = Config::from_toml_str(&content)?;
    conf.apply_env_overrides()?;
    Ok(conf)
}

impl Config {
    /// Parse TOML only; no environment lookups.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `EKR_KEYRING_<NAME>='{"1":"secret"}'` replaces the keys of keyring `name`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        for (var, value) in env::vars() {
            let Some(name) = var.strip_prefix(KEYRING_ENV_PREFIX) else {
                continue;
            };
            let keys: BTreeMap<String, String> = serde_json::from_str(&value)
                .map_err(|e| CoreError::Config(format!("{var} is not a JSON object: {e}")))?;

            tracing::debug!(keyring = %name.to_ascii_lowercase(), "keys overridden from environment");
            self.keyrings
                .entry(name.to_ascii_lowercase())
                .or_default()
                .keys = keys;
        }
        Ok(())
    }

    /// Build the named keyring. Unknown names and empty keyrings fail fast.
    pub fn keyring(&self, name: &str) -> Result<Keyring> {
        self.keyrings
            .get(name)
            .ok_or_else(|| CoreError::Config(format!("keyring {name:?} is not configured")))?
            .build()
    }

    pub fn secrets(&self) -> SecretsConfig {
        self.secrets.clone().unwrap_or_else(default_secrets)
    }

    /// The secrets file, keyed by `EKR_SECRETS_KEY` or else the key file.
    pub fn secrets_file(&self) -> Result<EncryptedFile> {
        let secrets = self.secrets();
        let key = match env::var(SECRETS_KEY_ENV) {
            Ok(secret) => Key::for_algorithm(FILE_KEY_ID, secret.trim(), secrets.cipher)?,
            Err(_) => read_key_file(&secrets.key_path, secrets.cipher)?,
        };
        Ok(EncryptedFile::new(secrets.path, key, secrets.cipher))
    }
}

impl KeyringConfig {
    pub fn build(&self) -> Result<Keyring> {
        let mut secrets = Vec::with_capacity(self.keys.len());
        for (id, secret) in &self.keys {
            let id: u32 = id
                .trim()
                .parse()
                .map_err(|_| CoreError::Config(format!("key id {id:?} is not a positive integer")))?;
            secrets.push((id, secret.as_str()));
        }
        Keyring::from_secrets(secrets, self.digest_salt.clone(), self.cipher)
    }
}

impl fmt::Debug for KeyringConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyringConfig")
            .field("key_ids", &self.keys.keys().collect::<Vec<_>>())
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}
