// src/consts.rs
//! Shared constants: envelope framing, sizes and column defaults

/// Separator between the base64 parts of an envelope
pub const ENVELOPE_SEPARATOR: &[u8] = b"--";

/// HMAC-SHA256 output size in bytes
pub const HMAC_SIZE: usize = 32;

/// CBC initialisation vector size (one AES block)
pub const CBC_IV_SIZE: usize = 16;

/// GCM nonce size (96 bits)
pub const GCM_IV_SIZE: usize = 12;

/// GCM authentication tag size (128 bits)
pub const GCM_TAG_SIZE: usize = 16;

/// Default name of the column holding the key id a row was encrypted with
pub const DEFAULT_KEYRING_COLUMN: &str = "keyring_id";

/// Prefix of the column holding an attribute's envelope
pub const ENCRYPTED_COLUMN_PREFIX: &str = "encrypted_";

/// Suffix of the column holding an attribute's lookup digest
pub const DIGEST_COLUMN_SUFFIX: &str = "_digest";

/// Env var pointing at the TOML config file
pub const CONFIG_PATH_ENV: &str = "EKR_CONFIG";

/// Config file used when `EKR_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "keyring.toml";

/// Prefix of per-keyring env overrides (`EKR_KEYRING_USERS={"1":"..."}`)
pub const KEYRING_ENV_PREFIX: &str = "EKR_KEYRING_";

/// Env var overriding the secrets key file
pub const SECRETS_KEY_ENV: &str = "EKR_SECRETS_KEY";
